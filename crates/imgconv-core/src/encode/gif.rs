//! GIF encoding.
//!
//! Single-frame output through the `image` crate's GIF encoder, which
//! quantizes to a 256-colour palette. There is no quality parameter.

use image::codecs::gif::GifEncoder;

use super::{color_type, validate, EncodeError};
use crate::decode::PixelLayout;
use crate::format::Format;

/// GIF logical screen edges are 16-bit.
const MAX_EDGE: u32 = u16::MAX as u32;

/// Quantizer speed (1 = best, 30 = fastest).
const QUANTIZER_SPEED: i32 = 10;

/// Encode RGB or RGBA pixel data to GIF bytes.
pub fn encode_gif(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height, layout)?;
    if width > MAX_EDGE || height > MAX_EDGE {
        return Err(EncodeError::DimensionsTooLarge {
            format: Format::Gif,
            width,
            height,
            max: MAX_EDGE,
        });
    }

    let mut buffer = Vec::new();
    {
        // The trailer is written when the encoder drops.
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, QUANTIZER_SPEED);
        encoder
            .encode(pixels, width, height, color_type(layout))
            .map_err(|e| EncodeError::EncodingFailed {
                format: Format::Gif,
                message: e.to_string(),
            })?;
    }

    Ok(buffer)
}
