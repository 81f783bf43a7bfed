//! Batch converter bindings.
//!
//! [`BatchConverter`] wraps a core `BatchSession` and owns the object URLs
//! created for its artifacts.
//!
//! # Example
//!
//! ```typescript
//! import { BatchConverter } from '@imgconv/wasm';
//!
//! const converter = new BatchConverter();
//! const contents = await Promise.all(files.map(async f => new Uint8Array(await f.arrayBuffer())));
//! converter.submit_sources(files.map(f => f.name), files.map(f => f.type), contents);
//! converter.set_settings('webp', 80);
//!
//! const summary = converter.convert();
//! console.log(`${summary.successCount}/${summary.itemCount} converted`);
//!
//! const url = converter.artifact_url(0);
//! link.href = url;
//! // after the download started
//! converter.release_url(url);
//! ```

use std::collections::BTreeMap;

use imgconv_core::{
    BatchError, BatchSession, BatchSummary, Handle, PipelineConfig, ResourceRegistry, SourceFile,
};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::object_url::ObjectUrl;
use crate::types::{parse_format, to_js_error, JsArtifact, OutcomeView};

/// Converts a batch of images to one format and hands out download URLs.
#[wasm_bindgen]
pub struct BatchConverter {
    session: BatchSession,
    urls: ResourceRegistry<ObjectUrl>,
    /// Artifact handle to its published URL.
    published: BTreeMap<Handle, (Handle, String)>,
}

#[wasm_bindgen]
impl BatchConverter {
    /// Create a converter. `config` is an optional plain object with any of
    /// `max_decoded_pixels`, `apply_orientation` and `max_parallelism`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<BatchConverter, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            PipelineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };
        Ok(Self::with_config(config))
    }

    /// Replace the batch. Entries whose type is not `image/*` are dropped.
    ///
    /// Returns the number of sources accepted. URLs and artifacts of the
    /// previous batch are released.
    pub fn submit_sources(
        &mut self,
        names: Vec<String>,
        types: Vec<String>,
        contents: Array,
    ) -> Result<usize, JsValue> {
        if names.len() != types.len() || names.len() != contents.length() as usize {
            return Err(JsValue::from_str(
                "names, types and contents must have the same length",
            ));
        }

        let files = names
            .into_iter()
            .zip(types)
            .zip(contents.iter())
            .map(|((name, declared_type), bytes)| {
                let bytes = bytes
                    .dyn_into::<Uint8Array>()
                    .map_err(|_| JsValue::from_str("contents must be Uint8Array values"))?;
                Ok(SourceFile::new(name, declared_type, bytes.to_vec()))
            })
            .collect::<Result<Vec<_>, JsValue>>()?;

        Ok(self.submit_files(files))
    }

    /// Set the target format (`jpeg`, `jpg`, `png`, `webp`, `gif`) and
    /// quality. Quality is clamped to 1-100.
    pub fn set_settings(&mut self, format: &str, quality: i32) -> Result<(), JsValue> {
        let format = parse_format(format)?;
        self.session.set_settings(format, quality as i64);
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.session.settings().format().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> u8 {
        self.session.settings().quality()
    }

    /// Convert every source. Returns the batch summary.
    ///
    /// # Errors
    ///
    /// Fails when no sources are loaded or the format has no encoder. Items
    /// that fail to decode or encode do not fail the call; see `outcomes`.
    pub fn convert(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.run().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&summary).map_err(to_js_error)
    }

    pub fn summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.summary()).map_err(to_js_error)
    }

    /// Per-source results in input order.
    pub fn outcomes(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.outcome_views()).map_err(to_js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn artifact_count(&self) -> usize {
        self.session.artifacts().len()
    }

    pub fn artifact(&self, index: usize) -> Option<JsArtifact> {
        self.session
            .artifacts()
            .get(index)
            .map(JsArtifact::from_artifact)
    }

    /// Object URL for the artifact at `index`. Repeated calls return the
    /// same URL until it is released.
    pub fn artifact_url(&mut self, index: usize) -> Result<String, JsValue> {
        let deliverable = self
            .session
            .deliverables()
            .into_iter()
            .nth(index)
            .ok_or_else(|| JsValue::from_str(&format!("No artifact at index {}", index)))?;

        if let Some((_, url)) = self.published.get(&deliverable.handle) {
            return Ok(url.clone());
        }

        let lease = self
            .session
            .lease(deliverable.handle)
            .ok_or_else(|| JsValue::from_str("Artifact was already released"))?;
        let url = lease
            .with(|artifact| ObjectUrl::create(artifact.bytes(), artifact.mime_type()))
            .ok_or_else(|| JsValue::from_str("Artifact was already released"))??;

        let href = url.as_str().to_string();
        let url_handle = self.urls.register(url);
        self.published
            .insert(deliverable.handle, (url_handle, href.clone()));
        Ok(href)
    }

    /// Revoke a URL returned by `artifact_url`. Returns false if it was not
    /// live.
    pub fn release_url(&mut self, url: &str) -> bool {
        let Some(artifact) = self
            .published
            .iter()
            .find(|(_, (_, href))| href == url)
            .map(|(artifact, _)| *artifact)
        else {
            return false;
        };

        if let Some((url_handle, _)) = self.published.remove(&artifact) {
            self.urls.release(url_handle);
        }
        true
    }

    #[wasm_bindgen(getter)]
    pub fn live_urls(&self) -> usize {
        self.urls.live_count()
    }

    /// Revoke every URL, release every artifact and drop the sources.
    pub fn clear(&mut self) {
        self.revoke_urls();
        self.session.clear();
    }
}

impl BatchConverter {
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            session: BatchSession::with_config(config),
            urls: ResourceRegistry::new(),
            published: BTreeMap::new(),
        }
    }

    pub(crate) fn submit_files(&mut self, files: Vec<SourceFile>) -> usize {
        self.revoke_urls();
        self.session.submit_sources(files);
        self.session.sources().len()
    }

    pub(crate) fn run(&mut self) -> Result<BatchSummary, BatchError> {
        self.revoke_urls();
        self.session.convert()
    }

    pub(crate) fn outcome_views(&self) -> Vec<OutcomeView> {
        let sources = self.session.sources();
        self.session
            .outcomes()
            .iter()
            .filter_map(|outcome| {
                let source = sources.iter().find(|s| s.id() == outcome.source_id())?;
                Some(OutcomeView::new(source, outcome))
            })
            .collect()
    }

    fn revoke_urls(&mut self) {
        let revoked = self.urls.release_all();
        if revoked > 0 {
            log::debug!("revoked {} object URL(s)", revoked);
        }
        self.published.clear();
    }
}


/// Tests that create real Blobs and object URLs. Run with `wasm-pack test`.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use imgconv_core::encode::encode_png;
    use imgconv_core::PixelLayout;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn converted() -> BatchConverter {
        let mut converter = BatchConverter::new(JsValue::UNDEFINED).unwrap();
        let pixels = vec![10u8; 6 * 6 * 3];
        let png = encode_png(&pixels, 6, 6, PixelLayout::Rgb8).unwrap();

        let contents = Array::new();
        contents.push(&Uint8Array::from(png.as_slice()));
        contents.push(&Uint8Array::from(png.as_slice()));
        let accepted = converter
            .submit_sources(
                vec!["one.png".into(), "two.png".into()],
                vec!["image/png".into(), "image/png".into()],
                contents,
            )
            .unwrap();
        assert_eq!(accepted, 2);

        converter.set_settings("webp", 70).unwrap();
        converter.convert().unwrap();
        converter
    }

    #[wasm_bindgen_test]
    fn test_constructor_accepts_partial_config() {
        #[derive(serde::Serialize)]
        struct Partial {
            max_parallelism: usize,
        }
        let config = serde_wasm_bindgen::to_value(&Partial { max_parallelism: 1 }).unwrap();
        assert!(BatchConverter::new(config).is_ok());
    }

    #[wasm_bindgen_test]
    fn test_rejects_unknown_format() {
        let mut converter = BatchConverter::new(JsValue::NULL).unwrap();
        assert!(converter.set_settings("tiff", 80).is_err());
    }

    #[wasm_bindgen_test]
    fn test_rejects_mismatched_lengths() {
        let mut converter = BatchConverter::new(JsValue::UNDEFINED).unwrap();
        let result = converter.submit_sources(vec!["a.png".into()], vec![], Array::new());
        assert!(result.is_err());
    }

    #[wasm_bindgen_test]
    fn test_artifact_url_is_stable_until_released() {
        let mut converter = converted();

        let first = converter.artifact_url(0).unwrap();
        assert!(first.starts_with("blob:"));
        assert_eq!(converter.artifact_url(0).unwrap(), first);
        assert_eq!(converter.live_urls(), 1);

        assert!(converter.release_url(&first));
        assert!(!converter.release_url(&first));
        assert_eq!(converter.live_urls(), 0);
        assert!(converter.artifact_url(0).unwrap().starts_with("blob:"));
    }

    #[wasm_bindgen_test]
    fn test_clear_revokes_everything() {
        let mut converter = converted();
        converter.artifact_url(0).unwrap();
        converter.artifact_url(1).unwrap();
        assert_eq!(converter.live_urls(), 2);

        converter.clear();
        assert_eq!(converter.live_urls(), 0);
        assert!(converter.artifact_url(0).is_err());
    }

    #[wasm_bindgen_test]
    fn test_reconvert_revokes_previous_urls() {
        let mut converter = converted();
        converter.artifact_url(0).unwrap();

        converter.set_settings("png", 80).unwrap();
        converter.convert().unwrap();
        assert_eq!(converter.live_urls(), 0);
    }
}
