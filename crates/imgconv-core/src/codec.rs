//! Codec adapter: the polymorphic boundary between the engine and the
//! format backends.
//!
//! A [`CodecRegistry`] owns one [`SurfaceDecoder`] and one
//! [`FormatEncoder`] per supported output format. Adding a format means
//! registering another encoder; the engine never branches on format.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::decode::{self, DecodeError, DecodedSurface};
use crate::encode::{self, EncodeError};
use crate::format::{Capabilities, Format};
use crate::settings::{ConversionSettings, PipelineConfig};
use crate::source::ImageSource;

/// The requested output format has no registered encoder.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("No encoder registered for {0}")]
pub struct UnsupportedFormatError(pub Format);

/// Turns source bytes into a pixel surface.
pub trait SurfaceDecoder: Send + Sync {
    fn decode(&self, source: &ImageSource) -> Result<DecodedSurface, DecodeError>;
}

/// Turns a pixel surface into one output format.
pub trait FormatEncoder: Send + Sync {
    fn format(&self) -> Format;

    fn capabilities(&self) -> Capabilities {
        self.format().capabilities()
    }

    /// `quality` is `None` when the format has no quality axis.
    fn encode(&self, surface: DecodedSurface, quality: Option<u8>) -> Result<Vec<u8>, EncodeError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct RasterDecoder {
    config: PipelineConfig,
}

impl RasterDecoder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl SurfaceDecoder for RasterDecoder {
    fn decode(&self, source: &ImageSource) -> Result<DecodedSurface, DecodeError> {
        decode::decode_surface(source.bytes(), source.declared_type(), &self.config)
    }
}

/// Encoder for one format backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterEncoder {
    format: Format,
}

impl RasterEncoder {
    pub fn new(format: Format) -> Self {
        Self { format }
    }
}

impl FormatEncoder for RasterEncoder {
    fn format(&self) -> Format {
        self.format
    }

    fn encode(&self, surface: DecodedSurface, quality: Option<u8>) -> Result<Vec<u8>, EncodeError> {
        encode::encode_surface(surface, self.format, quality)
    }
}

/// The set of available codecs.
#[derive(Clone)]
pub struct CodecRegistry {
    decoder: Arc<dyn SurfaceDecoder>,
    encoders: Vec<Arc<dyn FormatEncoder>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_config(PipelineConfig::default())
    }
}

impl CodecRegistry {
    /// Registry with the raster decoder and an encoder for every format.
    pub fn with_config(config: PipelineConfig) -> Self {
        let mut registry = Self::empty(Arc::new(RasterDecoder::new(config)));
        for format in Format::ALL {
            registry.register_encoder(Arc::new(RasterEncoder::new(format)));
        }
        registry
    }

    /// Registry with a decoder and no encoders.
    pub fn empty(decoder: Arc<dyn SurfaceDecoder>) -> Self {
        Self {
            decoder,
            encoders: Vec::new(),
        }
    }

    /// Register an encoder, replacing any existing one for the same format.
    pub fn register_encoder(&mut self, encoder: Arc<dyn FormatEncoder>) {
        let format = encoder.format();
        self.encoders.retain(|e| e.format() != format);
        self.encoders.push(encoder);
    }

    pub fn formats(&self) -> Vec<Format> {
        self.encoders.iter().map(|e| e.format()).collect()
    }

    pub fn decoder(&self) -> &dyn SurfaceDecoder {
        self.decoder.as_ref()
    }

    /// Resolve the encoder for `settings`, once per batch.
    pub fn resolve(
        &self,
        settings: &ConversionSettings,
    ) -> Result<ResolvedCodec<'_>, UnsupportedFormatError> {
        let format = settings.format();
        let encoder = self
            .encoders
            .iter()
            .find(|e| e.format() == format)
            .ok_or(UnsupportedFormatError(format))?;

        let quality = encoder
            .capabilities()
            .supports_quality
            .then_some(settings.quality());

        Ok(ResolvedCodec {
            decoder: self.decoder.as_ref(),
            encoder: encoder.as_ref(),
            quality,
        })
    }
}

/// Decoder, encoder and effective quality for one batch.
#[derive(Clone, Copy)]
pub struct ResolvedCodec<'a> {
    decoder: &'a dyn SurfaceDecoder,
    encoder: &'a dyn FormatEncoder,
    quality: Option<u8>,
}

impl ResolvedCodec<'_> {
    pub fn format(&self) -> Format {
        self.encoder.format()
    }

    /// Quality handed to the encoder; `None` when the format ignores it.
    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    pub fn decode(&self, source: &ImageSource) -> Result<DecodedSurface, DecodeError> {
        self.decoder.decode(source)
    }

    pub fn encode(&self, surface: DecodedSurface) -> Result<Vec<u8>, EncodeError> {
        self.encoder.encode(surface, self.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceId;
    use crate::test_support::{gradient_jpeg, FixedSizeEncoder};

    #[test]
    fn test_default_registry_has_every_format() {
        let registry = CodecRegistry::default();
        assert_eq!(registry.formats(), Format::ALL.to_vec());
    }

    #[test]
    fn test_resolve_unsupported_format() {
        let mut registry = CodecRegistry::empty(Arc::new(RasterDecoder::default()));
        registry.register_encoder(Arc::new(RasterEncoder::new(Format::Png)));

        let settings = ConversionSettings::new(Format::Gif, 50);
        assert_eq!(
            registry.resolve(&settings).err(),
            Some(UnsupportedFormatError(Format::Gif))
        );
    }

    #[test]
    fn test_resolve_drops_quality_for_lossless() {
        let registry = CodecRegistry::default();

        let gif = registry.resolve(&ConversionSettings::new(Format::Gif, 10)).unwrap();
        assert_eq!(gif.quality(), None);

        let jpeg = registry.resolve(&ConversionSettings::new(Format::Jpeg, 65)).unwrap();
        assert_eq!(jpeg.quality(), Some(65));
    }

    #[test]
    fn test_register_replaces_same_format() {
        let mut registry = CodecRegistry::default();
        registry.register_encoder(Arc::new(FixedSizeEncoder::new(Format::Webp, 42)));

        assert_eq!(registry.formats().len(), 4);
        let source = ImageSource::new(SourceId::new(1), "a.jpg", "image/jpeg", gradient_jpeg(4, 4));
        let codec = registry.resolve(&ConversionSettings::new(Format::Webp, 80)).unwrap();
        let surface = codec.decode(&source).unwrap();
        assert_eq!(codec.encode(surface).unwrap().len(), 42);
    }

    #[test]
    fn test_raster_round_trip_through_resolved_codec() {
        let registry = CodecRegistry::default();
        let codec = registry.resolve(&ConversionSettings::new(Format::Png, 80)).unwrap();
        let source = ImageSource::new(SourceId::new(2), "a.jpg", "image/jpeg", gradient_jpeg(6, 3));

        let bytes = codec.encode(codec.decode(&source).unwrap()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
    }
}
