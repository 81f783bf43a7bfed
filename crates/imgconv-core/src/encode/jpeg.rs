//! JPEG encoding.
//!
//! Uses the `image` crate's baseline JPEG encoder. JPEG has no alpha
//! channel, so callers pass RGB data.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;

use super::{color_type, validate, EncodeError};
use crate::decode::PixelLayout;
use crate::format::Format;

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality, clamped to 1-100
///
/// # Quality Guidelines
///
/// * 90-100: High quality, suitable for archival or further editing
/// * 80-90: Good quality, recommended for most uses
/// * 60-80: Medium quality, acceptable for web/social media
/// * Below 60: Low quality, visible artifacts
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height, PixelLayout::Rgb8)?;

    let quality = quality.clamp(1, 100);
    let mut buffer = Cursor::new(Vec::new());

    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(pixels, width, height, color_type(PixelLayout::Rgb8))
        .map_err(|e| EncodeError::EncodingFailed {
            format: Format::Jpeg,
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Encoding always produces valid JPEG when given valid input.
        #[test]
        fn prop_valid_input_produces_valid_jpeg(
            (width, height) in (1u32..=40, 1u32..=40),
            quality in 1u8..=100,
        ) {
            let pixels = vec![128u8; (width as usize) * (height as usize) * 3];

            let jpeg_bytes = encode_jpeg(&pixels, width, height, quality).unwrap();

            prop_assert_eq!(&jpeg_bytes[0..2], &[0xFF, 0xD8], "Should have SOI marker");
            let len = jpeg_bytes.len();
            prop_assert_eq!(&jpeg_bytes[len - 2..], &[0xFF, 0xD9], "Should have EOI marker");
        }

        /// Property: Same input always produces same output (deterministic).
        #[test]
        fn prop_deterministic_output(
            (width, height) in (1u32..=20, 1u32..=20),
            quality in 1u8..=100,
        ) {
            let pixels = vec![100u8; (width as usize) * (height as usize) * 3];

            let first = encode_jpeg(&pixels, width, height, quality).unwrap();
            let second = encode_jpeg(&pixels, width, height, quality).unwrap();

            prop_assert_eq!(first, second, "Same input should produce same output");
        }

        /// Property: Invalid pixel data length always returns error.
        #[test]
        fn prop_invalid_pixel_length_returns_error(
            (width, height) in (1u32..=30, 1u32..=30),
            delta in 1usize..=10,
            grow in any::<bool>(),
        ) {
            let expected = (width as usize) * (height as usize) * 3;
            let actual = if grow { expected + delta } else { expected.saturating_sub(delta) };
            prop_assume!(actual != expected);

            let result = encode_jpeg(&vec![128u8; actual], width, height, 90);
            let rejected = matches!(result, Err(EncodeError::InvalidPixelData { .. }));
            prop_assert!(
                rejected,
                "expected InvalidPixelData for {} bytes, got {:?}",
                actual,
                result
            );
        }
    }
}
