//! PNG encoding. Lossless, so there is no quality parameter.

use image::codecs::png::PngEncoder;
use image::ImageEncoder;

use super::{color_type, validate, EncodeError};
use crate::decode::PixelLayout;
use crate::format::Format;

/// Encode RGB or RGBA pixel data to PNG bytes.
pub fn encode_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height, layout)?;

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(pixels, width, height, color_type(layout))
        .map_err(|e| EncodeError::EncodingFailed {
            format: Format::Png,
            message: e.to_string(),
        })?;

    Ok(buffer)
}
