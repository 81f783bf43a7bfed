//! Imgconv Core - batch image transcoding
//!
//! This crate converts a batch of in-memory images (JPEG, PNG, WebP, GIF)
//! into one target format, reports per-item and aggregate size savings, and
//! tracks the lifetime of every produced artifact.
//!
//! The entry point is [`BatchSession`]; [`TranscodeEngine`] can be used
//! directly when no session state is wanted.

pub mod aggregate;
pub mod batch;
pub mod codec;
pub mod decode;
pub mod encode;
pub mod engine;
pub mod format;
pub mod lifecycle;
pub mod outcome;
pub mod settings;
pub mod source;

#[cfg(test)]
mod test_support;

pub use aggregate::{format_file_size, BatchSummary, ResultAggregator};
pub use batch::{BatchId, BatchSession, BatchState, Deliverable};
pub use codec::{CodecRegistry, FormatEncoder, SurfaceDecoder, UnsupportedFormatError};
pub use decode::{decode_surface, DecodeError, DecodedSurface, PixelLayout};
pub use encode::{encode_surface, EncodeError};
pub use engine::{BatchError, CancellationToken, TranscodeEngine};
pub use format::{Capabilities, Format, FormatParseError};
pub use lifecycle::{Handle, Lease, ReleaseStatus, Resource, ResourceRegistry};
pub use outcome::{ConversionOutcome, EncodedArtifact, ErrorKind, FailureReason};
pub use settings::{clamp_quality, ConversionSettings, PipelineConfig};
pub use source::{ImageSource, SourceFile, SourceId};
