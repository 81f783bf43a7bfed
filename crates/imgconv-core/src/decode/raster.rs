//! Raster decoding with format sniffing and EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, DecodedSurface, Orientation};
use crate::settings::PipelineConfig;

/// Decode image bytes into a pixel surface.
///
/// `declared_type` is a MIME hint. The byte signature wins when it is
/// recognized, so a mislabeled PNG still decodes as PNG.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if no supported format matches.
/// Returns `DecodeError::TooLarge` if the header exceeds `max_decoded_pixels`.
/// Returns `DecodeError::CorruptedFile` if the data is truncated or malformed.
pub fn decode_surface(
    bytes: &[u8],
    declared_type: &str,
    config: &PipelineConfig,
) -> Result<DecodedSurface, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    let hint = ImageFormat::from_mime_type(declared_type);

    // Header-only pass so oversized images are refused before allocating.
    let (width, height) = open_reader(bytes, hint)?
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    check_pixel_limit(width, height, config.max_decoded_pixels)?;

    let img = open_reader(bytes, hint)?
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let img = if config.apply_orientation {
        apply_orientation(img, extract_orientation(bytes))
    } else {
        img
    };

    let surface = DecodedSurface::from_dynamic(img);
    if surface.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(surface)
}

fn open_reader(
    bytes: &[u8],
    hint: Option<ImageFormat>,
) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let mut reader = ImageReader::new(Cursor::new(bytes));
    if let Some(format) = hint {
        reader.set_format(format);
    }
    let reader = reader
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    Ok(reader)
}

fn check_pixel_limit(width: u32, height: u32, limit: u64) -> Result<(), DecodeError> {
    if width as u64 * height as u64 > limit {
        return Err(DecodeError::TooLarge {
            width,
            height,
            limit,
        });
    }
    Ok(())
}

/// Extract EXIF orientation from container bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
