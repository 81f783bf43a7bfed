//! WebP encoding.
//!
//! Native builds encode lossy VP8 through libwebp, with quality 1-100 mapped
//! directly onto libwebp's 0-100 quality factor. libwebp cannot be built for
//! `wasm32-unknown-unknown`, so wasm builds fall back to the `image` crate's
//! pure-Rust encoder, which only writes lossless VP8L and ignores quality.

use super::{validate, EncodeError};
use crate::decode::PixelLayout;
use crate::format::Format;

/// WebP canvas edges are stored in 14 bits.
const MAX_EDGE: u32 = 16_383;

/// Encode RGB or RGBA pixel data to WebP bytes.
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height, layout)?;
    if width > MAX_EDGE || height > MAX_EDGE {
        return Err(EncodeError::DimensionsTooLarge {
            format: Format::Webp,
            width,
            height,
            max: MAX_EDGE,
        });
    }

    let quality = quality.clamp(1, 100);
    log::trace!("webp: {}x{} at quality {}", width, height, quality);
    encode_backend(pixels, width, height, layout, quality)
}

#[cfg(not(target_arch = "wasm32"))]
fn encode_backend(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    let encoder = match layout {
        PixelLayout::Rgb8 => webp::Encoder::from_rgb(pixels, width, height),
        PixelLayout::Rgba8 => webp::Encoder::from_rgba(pixels, width, height),
    };
    let memory = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| EncodeError::EncodingFailed {
            format: Format::Webp,
            message: format!("{:?}", e),
        })?;
    Ok(memory.to_vec())
}

#[cfg(target_arch = "wasm32")]
fn encode_backend(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    _quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    use image::codecs::webp::WebPEncoder;
    use image::ImageEncoder;

    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(pixels, width, height, super::color_type(layout))
        .map_err(|e| EncodeError::EncodingFailed {
            format: Format::Webp,
            message: e.to_string(),
        })?;
    Ok(buffer)
}
