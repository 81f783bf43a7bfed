//! Image encoding for the transcoding pipeline.
//!
//! This module provides functionality for:
//! - Encoding surfaces to JPEG and WebP with a scalar quality setting
//! - Encoding surfaces to PNG and GIF (quality has no effect)
//! - Flattening alpha for targets that cannot store it
//!
//! All encoders validate dimensions and buffer length before touching the
//! backend, and write into an in-memory buffer.

mod gif;
mod jpeg;
mod png;
mod webp;

use image::ExtendedColorType;
use thiserror::Error;

use crate::decode::{DecodedSurface, PixelLayout};
use crate::format::Format;

pub use gif::encode_gif;
pub use jpeg::encode_jpeg;
pub use png::encode_png;
pub use webp::encode_webp;

/// Errors that can occur while encoding a surface.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The target container cannot hold an image this large
    #[error("{format} cannot encode {width}x{height}: maximum edge is {max}")]
    DimensionsTooLarge {
        format: Format,
        width: u32,
        height: u32,
        max: u32,
    },

    /// Backend encoding failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed { format: Format, message: String },
}

/// Encode a surface into `format`.
///
/// `quality` is passed to formats that support it and ignored otherwise.
/// Surfaces with alpha are flattened when the target has no alpha channel.
pub fn encode_surface(
    surface: DecodedSurface,
    format: Format,
    quality: Option<u8>,
) -> Result<Vec<u8>, EncodeError> {
    let surface = if format.capabilities().supports_alpha {
        surface
    } else {
        surface.into_rgb()
    };
    let quality = quality.unwrap_or(crate::settings::DEFAULT_QUALITY);
    let (w, h, layout) = (surface.width, surface.height, surface.layout);

    match format {
        Format::Jpeg => encode_jpeg(&surface.pixels, w, h, quality),
        Format::Png => encode_png(&surface.pixels, w, h, layout),
        Format::Webp => encode_webp(&surface.pixels, w, h, layout, quality),
        Format::Gif => encode_gif(&surface.pixels, w, h, layout),
    }
}

/// Check dimensions and buffer length shared by every encoder.
pub(crate) fn validate(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * layout.channels();
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

pub(crate) fn color_type(layout: PixelLayout) -> ExtendedColorType {
    match layout {
        PixelLayout::Rgb8 => ExtendedColorType::Rgb8,
        PixelLayout::Rgba8 => ExtendedColorType::Rgba8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_surface(width: u32, height: u32) -> DecodedSurface {
        let pixels = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 64, 200, 128])
            .collect();
        DecodedSurface::new(width, height, PixelLayout::Rgba8, pixels)
    }

    #[test]
    fn test_encode_surface_every_format() {
        for format in Format::ALL {
            let bytes = encode_surface(rgba_surface(12, 8), format, Some(75)).unwrap();
            let guessed = image::guess_format(&bytes).unwrap();
            let expected = image::ImageFormat::from_mime_type(format.mime_type()).unwrap();
            assert_eq!(guessed, expected, "format {format}");
        }
    }

    #[test]
    fn test_jpeg_flattens_alpha() {
        let bytes = encode_surface(rgba_surface(4, 4), Format::Jpeg, Some(90)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_png_keeps_alpha() {
        let bytes = encode_surface(rgba_surface(4, 4), Format::Png, None).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn test_quality_ignored_for_png() {
        let a = encode_surface(rgba_surface(6, 6), Format::Png, Some(10)).unwrap();
        let b = encode_surface(rgba_surface(6, 6), Format::Png, Some(100)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_dimension_surface_fails() {
        let surface = DecodedSurface {
            width: 0,
            height: 3,
            layout: PixelLayout::Rgb8,
            pixels: vec![],
        };
        let result = encode_surface(surface, Format::Webp, Some(80));
        assert!(matches!(result, Err(EncodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let result = validate(&[0u8; 11], 2, 2, PixelLayout::Rgb8);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidPixelData {
                expected: 12,
                actual: 11
            })
        ));
    }
}
