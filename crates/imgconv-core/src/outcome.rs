//! Per-item conversion outcomes and encoded artifacts.

use bytes::Bytes;
use serde::Serialize;

use crate::format::Format;
use crate::source::{suggested_file_name, SourceId};

/// Encoded output for one source.
///
/// The byte buffer has a single owner. A session moves it into its resource
/// registry and keeps a detached copy (metadata and length, no bytes) in the
/// outcome list, so releasing the handle frees the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub source_id: SourceId,
    /// Original name of the source, used to derive the delivery name.
    pub source_name: String,
    pub format: Format,
    /// Byte length of the original source.
    pub original_byte_length: usize,
    bytes: Bytes,
    byte_length: usize,
}

impl EncodedArtifact {
    pub fn new(
        source_id: SourceId,
        source_name: impl Into<String>,
        format: Format,
        bytes: impl Into<Bytes>,
        original_byte_length: usize,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            source_id,
            source_name: source_name.into(),
            format,
            original_byte_length,
            byte_length: bytes.len(),
            bytes,
        }
    }

    /// Encoded size. Still reported after the bytes were detached.
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Encoded bytes, empty once detached.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn is_detached(&self) -> bool {
        self.bytes.is_empty() && self.byte_length > 0
    }

    /// Split into the bytes-owning artifact and a metadata-only copy.
    pub fn detach(self) -> (Self, Self) {
        let metadata = Self {
            source_id: self.source_id,
            source_name: self.source_name.clone(),
            format: self.format,
            original_byte_length: self.original_byte_length,
            bytes: Bytes::new(),
            byte_length: self.byte_length,
        };
        (self, metadata)
    }

    /// `<original-base-name>.<target-extension>`
    pub fn file_name(&self) -> String {
        suggested_file_name(&self.source_name, self.format)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Decode,
    Encode,
}

/// Why an item failed, kept as data so the batch can continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureReason {
    pub fn decode(err: impl ToString) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: err.to_string(),
        }
    }

    pub fn encode(err: impl ToString) -> Self {
        Self {
            kind: ErrorKind::Encode,
            message: err.to_string(),
        }
    }
}

/// Result of converting one source.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Success {
        artifact: EncodedArtifact,
        compression_ratio_percent: f64,
    },
    Failure {
        source_id: SourceId,
        reason: FailureReason,
    },
}

impl ConversionOutcome {
    /// Build a success, computing the clamped compression ratio.
    pub fn success(artifact: EncodedArtifact) -> Self {
        let compression_ratio_percent = compression_percent(
            artifact.original_byte_length as u64,
            artifact.byte_length() as u64,
        );
        ConversionOutcome::Success {
            artifact,
            compression_ratio_percent,
        }
    }

    pub fn failure(source_id: SourceId, reason: FailureReason) -> Self {
        ConversionOutcome::Failure { source_id, reason }
    }

    pub fn source_id(&self) -> SourceId {
        match self {
            ConversionOutcome::Success { artifact, .. } => artifact.source_id,
            ConversionOutcome::Failure { source_id, .. } => *source_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    pub fn artifact(&self) -> Option<&EncodedArtifact> {
        match self {
            ConversionOutcome::Success { artifact, .. } => Some(artifact),
            ConversionOutcome::Failure { .. } => None,
        }
    }

    /// Move a success's bytes out, leaving a metadata-only outcome behind.
    pub fn detach(self) -> (Option<EncodedArtifact>, ConversionOutcome) {
        match self {
            ConversionOutcome::Success {
                artifact,
                compression_ratio_percent,
            } => {
                let (owned, metadata) = artifact.detach();
                let outcome = ConversionOutcome::Success {
                    artifact: metadata,
                    compression_ratio_percent,
                };
                (Some(owned), outcome)
            }
            failure => (None, failure),
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            ConversionOutcome::Success { .. } => None,
            ConversionOutcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Space saved as a percentage of `original`, never negative.
///
/// Growth reports 0. An empty original reports 0.
pub fn compression_percent(original: u64, converted: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = original as f64 - converted as f64;
    (saved / original as f64 * 100.0).max(0.0)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the ratio always lies in [0, 100].
        #[test]
        fn prop_ratio_in_range(original in 0u64..=10_000_000, converted in 0u64..=20_000_000) {
            let ratio = compression_percent(original, converted);
            prop_assert!((0.0..=100.0).contains(&ratio));
        }
    }
}
