//! Conversion settings and pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::format::Format;

/// Lowest accepted quality value.
pub const MIN_QUALITY: u8 = 1;
/// Highest accepted quality value.
pub const MAX_QUALITY: u8 = 100;
/// Quality used when none is given.
pub const DEFAULT_QUALITY: u8 = 80;

/// Target format and quality for one conversion run.
///
/// Quality is always held in `1..=100`. Out-of-range input is clamped, never
/// rejected. Formats without a quality axis ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSettings {
    format: Format,
    quality: u8,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: Format::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl ConversionSettings {
    pub fn new(format: Format, quality: i64) -> Self {
        Self {
            format,
            quality: clamp_quality(quality),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Clamped quality in `1..=100`.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Quality to hand to the encoder, or `None` when the format ignores it.
    pub fn effective_quality(&self) -> Option<u8> {
        self.format
            .capabilities()
            .supports_quality
            .then_some(self.quality)
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    pub fn set_quality(&mut self, quality: i64) {
        self.quality = clamp_quality(quality);
    }
}

/// Clamp an arbitrary integer into the valid quality range.
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(MIN_QUALITY as i64, MAX_QUALITY as i64) as u8
}

/// Tunables for the transcoding pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Images whose header reports more pixels than this fail to decode.
    pub max_decoded_pixels: u64,
    /// Apply EXIF orientation while decoding.
    pub apply_orientation: bool,
    /// Worker count for parallel batches. 0 means one per core, 1 forces
    /// sequential processing. Ignored without the `parallel` feature.
    pub max_parallelism: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_decoded_pixels: 100_000_000,
            apply_orientation: true,
            max_parallelism: 0,
        }
    }
}
