//! Core types for image decoding.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not recognized as any supported image format.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The header reports more pixels than the pipeline accepts.
    #[error("Image too large: {width}x{height} exceeds the {limit} pixel limit")]
    TooLarge { width: u32, height: u32, limit: u64 },

    /// The image decoded to zero width or height.
    #[error("Image has no pixels")]
    Empty,
}

/// Channel layout of a decoded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelLayout {
    /// 3 bytes per pixel.
    Rgb8,
    /// 4 bytes per pixel, straight alpha.
    Rgba8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded pixel surface.
///
/// Owned by exactly one in-flight transcode and dropped right after encode.
#[derive(Debug, Clone)]
pub struct DecodedSurface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel layout of `pixels`.
    pub layout: PixelLayout,
    /// Pixel data in row-major order.
    /// Length should be width * height * layout.channels().
    pub pixels: Vec<u8>,
}

impl DecodedSurface {
    pub fn new(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * layout.channels(),
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            layout,
            pixels,
        }
    }

    /// Build a surface from a decoded image, keeping alpha only if present.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        if img.color().has_alpha() {
            let rgba = img.into_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                width,
                height,
                layout: PixelLayout::Rgba8,
                pixels: rgba.into_raw(),
            }
        } else {
            let rgb = img.into_rgb8();
            let (width, height) = rgb.dimensions();
            Self {
                width,
                height,
                layout: PixelLayout::Rgb8,
                pixels: rgb.into_raw(),
            }
        }
    }

    /// Convert back into an `image` buffer. `None` if the buffer length is wrong.
    pub fn into_dynamic(self) -> Option<DynamicImage> {
        match self.layout {
            PixelLayout::Rgb8 => image::RgbImage::from_raw(self.width, self.height, self.pixels)
                .map(DynamicImage::ImageRgb8),
            PixelLayout::Rgba8 => image::RgbaImage::from_raw(self.width, self.height, self.pixels)
                .map(DynamicImage::ImageRgba8),
        }
    }

    /// Drop the alpha channel, if any.
    pub fn into_rgb(self) -> Self {
        match self.layout {
            PixelLayout::Rgb8 => self,
            PixelLayout::Rgba8 => {
                let pixels = self
                    .pixels
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                Self {
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Rgb8,
                    pixels,
                }
            }
        }
    }

    /// Add an opaque alpha channel, if missing.
    pub fn into_rgba(self) -> Self {
        match self.layout {
            PixelLayout::Rgba8 => self,
            PixelLayout::Rgb8 => {
                let pixels = self
                    .pixels
                    .chunks_exact(3)
                    .flat_map(|px| [px[0], px[1], px[2], 255])
                    .collect();
                Self {
                    width: self.width,
                    height: self.height,
                    layout: PixelLayout::Rgba8,
                    pixels,
                }
            }
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.layout == PixelLayout::Rgba8
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Expected buffer length for the surface's dimensions and layout.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.channels()
    }

    /// Check if this is an empty/invalid surface.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}
