//! Fixtures and codec doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::codec::{CodecRegistry, FormatEncoder};
use crate::decode::{DecodedSurface, PixelLayout};
use crate::encode::{encode_jpeg, encode_png, EncodeError};
use crate::engine::CancellationToken;
use crate::format::Format;
use crate::source::{ImageSource, SourceId};

fn gradient(width: u32, height: u32, channels: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(1)) as u8);
            pixels.push((y * 255 / height.max(1)) as u8);
            pixels.push(128);
            if channels == 4 {
                pixels.push(((x + y) * 20 % 256) as u8);
            }
        }
    }
    pixels
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_jpeg(&gradient(width, height, 3), width, height, 90).unwrap()
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&gradient(width, height, 3), width, height, PixelLayout::Rgb8).unwrap()
}

pub fn translucent_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&gradient(width, height, 4), width, height, PixelLayout::Rgba8).unwrap()
}

/// A valid JPEG grown to exactly `total` bytes with COM segments.
pub fn padded_jpeg(total: usize) -> Vec<u8> {
    let base = gradient_jpeg(16, 16);
    assert!(base.len() + 4 <= total, "base JPEG already {} bytes", base.len());

    let mut padding = Vec::new();
    let mut remaining = total - base.len();
    while remaining >= 4 {
        let mut take = remaining.min(65_537);
        if (1..4).contains(&(remaining - take)) {
            take -= 4;
        }
        let length = (take - 2) as u16;
        padding.extend_from_slice(&[0xFF, 0xFE]);
        padding.extend_from_slice(&length.to_be_bytes());
        padding.extend(std::iter::repeat(b'x').take(take - 4));
        remaining -= take;
    }
    assert_eq!(remaining, 0);

    let mut bytes = base[..2].to_vec();
    bytes.extend(padding);
    bytes.extend_from_slice(&base[2..]);
    bytes
}

pub fn jpeg_source(name: &str, width: u32, height: u32) -> ImageSource {
    ImageSource::new(SourceId::next(), name, "image/jpeg", gradient_jpeg(width, height))
}

pub fn padded_jpeg_source(name: &str, total: usize) -> ImageSource {
    ImageSource::new(SourceId::next(), name, "image/jpeg", padded_jpeg(total))
}

pub fn png_source(name: &str, width: u32, height: u32) -> ImageSource {
    ImageSource::new(SourceId::next(), name, "image/png", translucent_png(width, height))
}

pub fn corrupt_source(name: &str) -> ImageSource {
    ImageSource::new(
        SourceId::next(),
        name,
        "image/jpeg",
        b"\xFF\xD8 this is not really a jpeg".to_vec(),
    )
}

/// Raster registry with `encoder` replacing the default for its format.
pub fn registry_with(encoder: impl FormatEncoder + 'static) -> CodecRegistry {
    let mut registry = CodecRegistry::default();
    registry.register_encoder(Arc::new(encoder));
    registry
}

/// Always produces `len` bytes.
pub struct FixedSizeEncoder {
    format: Format,
    len: usize,
}

impl FixedSizeEncoder {
    pub fn new(format: Format, len: usize) -> Self {
        Self { format, len }
    }
}

impl FormatEncoder for FixedSizeEncoder {
    fn format(&self) -> Format {
        self.format
    }

    fn encode(
        &self,
        _surface: DecodedSurface,
        _quality: Option<u8>,
    ) -> Result<Vec<u8>, EncodeError> {
        Ok(vec![0u8; self.len])
    }
}

/// Always refuses.
pub struct FailingEncoder(pub Format);

impl FormatEncoder for FailingEncoder {
    fn format(&self) -> Format {
        self.0
    }

    fn encode(
        &self,
        surface: DecodedSurface,
        _quality: Option<u8>,
    ) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::EncodingFailed {
            format: self.0,
            message: format!("refused {}x{}", surface.width, surface.height),
        })
    }
}

/// Cancels `token` on its `nth` call (1-based), then encodes a tiny payload.
pub struct CancellingEncoder {
    format: Format,
    token: CancellationToken,
    nth: usize,
    calls: AtomicUsize,
}

impl CancellingEncoder {
    pub fn new(format: Format, token: CancellationToken, nth: usize) -> Self {
        Self {
            format,
            token,
            nth,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FormatEncoder for CancellingEncoder {
    fn format(&self) -> Format {
        self.format
    }

    fn encode(
        &self,
        _surface: DecodedSurface,
        _quality: Option<u8>,
    ) -> Result<Vec<u8>, EncodeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.nth {
            self.token.cancel();
        }
        Ok(vec![1, 2, 3])
    }
}
