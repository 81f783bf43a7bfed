//! JavaScript-facing views of batch results.
//!
//! Outcomes and summaries cross the boundary as plain objects through
//! `serde-wasm-bindgen`. Artifacts are exposed as a wrapper class so their
//! bytes are only copied into JS memory on request.

use bytes::Bytes;
use imgconv_core::outcome::compression_percent;
use imgconv_core::{ConversionOutcome, EncodedArtifact, ErrorKind, Format, ImageSource};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// One converted file.
#[wasm_bindgen]
pub struct JsArtifact {
    file_name: String,
    mime_type: String,
    original_byte_length: usize,
    compression_ratio: f64,
    bytes: Bytes,
}

#[wasm_bindgen]
impl JsArtifact {
    /// Suggested download name, e.g. `holiday.webp`.
    #[wasm_bindgen(getter)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    #[wasm_bindgen(getter)]
    pub fn original_byte_length(&self) -> usize {
        self.original_byte_length
    }

    /// Percentage saved against the original, 0 when the file grew.
    #[wasm_bindgen(getter)]
    pub fn compression_ratio(&self) -> f64 {
        self.compression_ratio
    }

    /// Encoded bytes as a `Uint8Array`.
    ///
    /// Note: This copies the artifact into JavaScript memory.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl JsArtifact {
    /// Wrap a live artifact. The bytes are shared, not copied.
    pub(crate) fn from_artifact(artifact: &EncodedArtifact) -> Self {
        Self {
            file_name: artifact.file_name(),
            mime_type: artifact.mime_type().to_string(),
            original_byte_length: artifact.original_byte_length,
            compression_ratio: compression_percent(
                artifact.original_byte_length as u64,
                artifact.byte_length() as u64,
            ),
            bytes: artifact.bytes().clone(),
        }
    }
}

/// Plain-object view of one outcome, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutcomeView {
    pub source_name: String,
    pub success: bool,
    pub original_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeView {
    pub(crate) fn new(source: &ImageSource, outcome: &ConversionOutcome) -> Self {
        let mut view = OutcomeView {
            source_name: source.name().to_string(),
            success: outcome.is_success(),
            original_size: source.byte_length(),
            file_name: None,
            converted_size: None,
            compression_ratio: None,
            error_kind: None,
            error: None,
        };
        match outcome {
            ConversionOutcome::Success {
                artifact,
                compression_ratio_percent,
            } => {
                view.file_name = Some(artifact.file_name());
                view.converted_size = Some(artifact.byte_length());
                view.compression_ratio = Some(*compression_ratio_percent);
            }
            ConversionOutcome::Failure { reason, .. } => {
                view.error_kind = Some(match reason.kind {
                    ErrorKind::Decode => "decode",
                    ErrorKind::Encode => "encode",
                });
                view.error = Some(reason.message.clone());
            }
        }
        view
    }
}

pub(crate) fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn parse_format(value: &str) -> Result<Format, JsValue> {
    value.parse::<Format>().map_err(to_js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgconv_core::{FailureReason, SourceId};

    fn source(len: usize) -> ImageSource {
        ImageSource::new(SourceId::new(7), "photo.jpeg", "image/jpeg", vec![0u8; len])
    }

    fn artifact(converted: usize) -> EncodedArtifact {
        EncodedArtifact::new(
            SourceId::new(7),
            "photo.jpeg",
            Format::Webp,
            vec![1u8; converted],
            1_000,
        )
    }

    fn success(converted: usize) -> ConversionOutcome {
        ConversionOutcome::success(artifact(converted))
    }

    #[test]
    fn test_artifact_wrapper() {
        let js = JsArtifact::from_artifact(&artifact(250));
        assert_eq!(js.file_name(), "photo.webp");
        assert_eq!(js.mime_type(), "image/webp");
        assert_eq!(js.byte_length(), 250);
        assert_eq!(js.original_byte_length(), 1_000);
        assert_eq!(js.compression_ratio(), 75.0);
        assert_eq!(js.bytes(), vec![1u8; 250]);
    }

    #[test]
    fn test_outcome_view_of_detached_artifact() {
        let (_, detached) = success(400).detach();
        let view = OutcomeView::new(&source(1_000), &detached);
        assert_eq!(view.converted_size, Some(400));
        assert_eq!(view.compression_ratio, Some(60.0));
    }

    #[test]
    fn test_outcome_view_success() {
        let view = OutcomeView::new(&source(1_000), &success(400));
        assert!(view.success);
        assert_eq!(view.file_name.as_deref(), Some("photo.webp"));
        assert_eq!(view.converted_size, Some(400));
        assert_eq!(view.compression_ratio, Some(60.0));
        assert!(view.error.is_none());
    }

    #[test]
    fn test_outcome_view_failure() {
        let failed =
            ConversionOutcome::failure(SourceId::new(7), FailureReason::encode("too wide"));
        let view = OutcomeView::new(&source(10), &failed);
        assert!(!view.success);
        assert_eq!(view.error_kind, Some("encode"));
        assert_eq!(view.error.as_deref(), Some("too wide"));
        assert_eq!(view.original_size, 10);
    }

    #[test]
    fn test_parse_format_accepts_aliases() {
        assert_eq!(parse_format("JPG").ok(), Some(Format::Jpeg));
        assert_eq!(parse_format(" gif ").ok(), Some(Format::Gif));
    }
}
