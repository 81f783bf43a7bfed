//! Batch session: the inbound interface and its state machine.
//!
//! ```text
//! Empty --submit--> SourcesLoaded --convert--> Converting --settled--> Completed
//!   ^                    |   ^                     |                      |
//!   +------clear---------+   +------cancelled------+                      |
//!                            +---------------submit (releases artifacts)--+
//! ```
//!
//! Artifacts are registered with the session's [`ResourceRegistry`] as each
//! item settles, and released on cancellation, resubmission, `clear` or drop.

use std::sync::Mutex;

use bytes::Bytes;
use serde::Serialize;

use crate::aggregate::{BatchSummary, ResultAggregator};
use crate::engine::{BatchError, CancellationToken, TranscodeEngine};
use crate::format::Format;
use crate::lifecycle::{Handle, Lease, ReleaseStatus, ResourceRegistry};
use crate::outcome::{ConversionOutcome, EncodedArtifact};
use crate::settings::{ConversionSettings, PipelineConfig};
use crate::source::{ImageSource, SourceFile, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchState {
    Empty,
    SourcesLoaded,
    Converting,
    Completed,
}

/// Identifies one submitted set of sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BatchId(u64);

impl BatchId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One artifact ready to hand to the delivery layer.
#[derive(Debug, Clone)]
pub struct Deliverable {
    pub handle: Handle,
    pub source_id: SourceId,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Debug)]
pub struct BatchSession {
    engine: TranscodeEngine,
    settings: ConversionSettings,
    state: BatchState,
    batch_id: Option<BatchId>,
    next_batch: u64,
    sources: Vec<ImageSource>,
    aggregator: ResultAggregator,
    resources: ResourceRegistry<EncodedArtifact>,
    /// Artifact handles of the current batch, in output order.
    handles: Vec<(SourceId, Handle)>,
    cancel: CancellationToken,
}

impl Default for BatchSession {
    fn default() -> Self {
        Self::new(TranscodeEngine::default())
    }
}

impl BatchSession {
    pub fn new(engine: TranscodeEngine) -> Self {
        Self {
            engine,
            settings: ConversionSettings::default(),
            state: BatchState::Empty,
            batch_id: None,
            next_batch: 1,
            sources: Vec::new(),
            aggregator: ResultAggregator::new(),
            resources: ResourceRegistry::new(),
            handles: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::new(TranscodeEngine::with_config(config))
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn batch_id(&self) -> Option<BatchId> {
        self.batch_id
    }

    pub fn sources(&self) -> &[ImageSource] {
        &self.sources
    }

    pub fn settings(&self) -> ConversionSettings {
        self.settings
    }

    /// Replace the current batch with the image-typed subset of `files`.
    ///
    /// Non-image entries are dropped silently. Artifacts of the previous
    /// batch are released first. If nothing survives the filter the session
    /// is left `Empty`.
    pub fn submit_sources(&mut self, files: impl IntoIterator<Item = SourceFile>) -> BatchId {
        self.discard_results();

        let mut skipped = 0usize;
        self.sources = files
            .into_iter()
            .filter_map(|file| {
                let source = ImageSource::from_file(file);
                skipped += usize::from(source.is_none());
                source
            })
            .collect();
        if skipped > 0 {
            log::debug!("skipped {} non-image file(s)", skipped);
        }

        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        self.batch_id = Some(id);
        self.cancel = CancellationToken::new();
        self.state = if self.sources.is_empty() {
            BatchState::Empty
        } else {
            BatchState::SourcesLoaded
        };
        id
    }

    /// Update target format and quality. Quality is clamped, never rejected.
    pub fn set_settings(&mut self, format: Format, quality: i64) {
        self.settings = ConversionSettings::new(format, quality);
    }

    /// Token that cancels the current batch. Grab it before `convert` to
    /// cancel from another thread.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Convert the loaded sources with the current settings.
    ///
    /// Re-running a completed batch releases the previous artifacts first.
    ///
    /// # Errors
    ///
    /// `BatchError::NoSources` when nothing is loaded,
    /// `BatchError::UnsupportedFormat` before any source is touched, and
    /// `BatchError::Cancelled` when the token fires. After a cancellation no
    /// outcomes are exposed and every artifact of the run has been released.
    pub fn convert(&mut self) -> Result<BatchSummary, BatchError> {
        if self.sources.is_empty() {
            return Err(BatchError::NoSources);
        }
        if self.state == BatchState::Completed {
            self.discard_results();
        }
        self.state = BatchState::Converting;

        let registered: Mutex<Vec<(usize, SourceId, Handle)>> = Mutex::new(Vec::new());
        let resources = &self.resources;
        let result = self.engine.convert_batch_observed(
            &self.sources,
            &self.settings,
            &self.cancel,
            &|index, outcome| {
                if let Some(artifact) = outcome.artifact() {
                    let handle = resources.register(artifact.clone());
                    registered
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .push((index, artifact.source_id, handle));
                }
            },
        );
        let mut registered = registered
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match result {
            Ok(outcomes) => {
                registered.sort_by_key(|(index, _, _)| *index);
                self.handles = registered.into_iter().map(|(_, id, h)| (id, h)).collect();
                // The registry holds the only copy of each buffer from here on.
                for outcome in outcomes {
                    let (_, metadata) = outcome.detach();
                    self.aggregator.record(metadata);
                }
                self.state = BatchState::Completed;

                let summary = self.aggregator.summary();
                log::info!(
                    "batch complete: {}/{} converted, {:.1}% saved",
                    summary.success_count,
                    summary.item_count,
                    summary.aggregate_compression_percent
                );
                Ok(summary)
            }
            Err(err) => {
                for (_, _, handle) in registered {
                    self.resources.release(handle);
                }
                if err == BatchError::Cancelled {
                    self.cancel = CancellationToken::new();
                }
                self.state = BatchState::SourcesLoaded;
                Err(err)
            }
        }
    }

    /// Summary of the current outcomes. Empty unless `Completed`.
    pub fn summary(&self) -> BatchSummary {
        self.aggregator.summary()
    }

    /// Per-source outcomes in input order. Successful outcomes carry the
    /// artifact's metadata only; the bytes live behind its handle.
    pub fn outcomes(&self) -> &[ConversionOutcome] {
        self.aggregator.outcomes()
    }

    /// Artifacts that have not been released, in input order.
    pub fn artifacts(&self) -> Vec<EncodedArtifact> {
        self.handles
            .iter()
            .filter_map(|(_, handle)| self.resources.available(*handle, EncodedArtifact::clone))
            .collect()
    }

    /// Unreleased artifacts paired with their handles and delivery names.
    pub fn deliverables(&self) -> Vec<Deliverable> {
        self.handles
            .iter()
            .filter_map(|(source_id, handle)| {
                self.resources.available(*handle, |artifact| Deliverable {
                    handle: *handle,
                    source_id: *source_id,
                    file_name: artifact.file_name(),
                    mime_type: artifact.mime_type(),
                    bytes: artifact.bytes().clone(),
                })
            })
            .collect()
    }

    pub fn handle_for(&self, source_id: SourceId) -> Option<Handle> {
        self.handles
            .iter()
            .find(|(id, _)| *id == source_id)
            .map(|(_, handle)| *handle)
    }

    /// Pin an artifact while it is being delivered.
    pub fn lease(&self, handle: Handle) -> Option<Lease<'_, EncodedArtifact>> {
        self.resources.lease(handle)
    }

    /// Release one artifact after its delivery completed. Idempotent.
    pub fn release(&self, handle: Handle) -> ReleaseStatus {
        self.resources.release(handle)
    }

    pub fn live_resources(&self) -> usize {
        self.resources.live_count()
    }

    pub fn released_resources(&self) -> u64 {
        self.resources.released_count()
    }

    /// Release everything and return to `Empty`.
    pub fn clear(&mut self) {
        self.discard_results();
        self.sources.clear();
        self.batch_id = None;
        self.state = BatchState::Empty;
    }

    fn discard_results(&mut self) {
        self.resources.release_all();
        self.aggregator.clear();
        self.handles.clear();
    }
}
