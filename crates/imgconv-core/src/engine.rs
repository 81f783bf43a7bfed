//! Transcode engine: decode, encode and measure every source of a batch.
//!
//! Items are independent. A failing item becomes a `Failure` outcome and the
//! batch moves on. Output index `i` always corresponds to input index `i`,
//! whether items run sequentially or on the `parallel` worker pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::codec::{CodecRegistry, ResolvedCodec, UnsupportedFormatError};
use crate::outcome::{ConversionOutcome, EncodedArtifact, FailureReason};
use crate::settings::{ConversionSettings, PipelineConfig};
use crate::source::ImageSource;

/// Batch-fatal errors. Per-item failures never surface here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormatError),

    #[error("Batch was cancelled")]
    Cancelled,

    #[error("No sources loaded")]
    NoSources,
}

/// Caller-driven cancellation flag, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called once per settled item with its input index.
pub type OutcomeObserver<'a> = &'a (dyn Fn(usize, &ConversionOutcome) + Sync);

#[derive(Debug, Clone, Default)]
pub struct TranscodeEngine {
    registry: CodecRegistry,
    config: PipelineConfig,
}

impl TranscodeEngine {
    pub fn new(registry: CodecRegistry, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Engine with the default raster codecs built from `config`.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::new(CodecRegistry::with_config(config.clone()), config)
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert every source, returning one outcome per source in input order.
    ///
    /// # Errors
    ///
    /// `BatchError::UnsupportedFormat` before any source is touched when no
    /// encoder handles `settings.format()`. `BatchError::Cancelled` when
    /// `cancel` fires; completed outcomes are discarded in that case.
    pub fn convert_batch(
        &self,
        sources: &[ImageSource],
        settings: &ConversionSettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConversionOutcome>, BatchError> {
        self.convert_batch_observed(sources, settings, cancel, &|_, _| {})
    }

    /// Like [`convert_batch`](Self::convert_batch), reporting each outcome to
    /// `observer` as soon as it settles. Completion order may differ from
    /// input order when running in parallel.
    pub fn convert_batch_observed(
        &self,
        sources: &[ImageSource],
        settings: &ConversionSettings,
        cancel: &CancellationToken,
        observer: OutcomeObserver<'_>,
    ) -> Result<Vec<ConversionOutcome>, BatchError> {
        let codec = self.registry.resolve(settings)?;
        log::info!(
            "converting {} source(s) to {} (quality {:?})",
            sources.len(),
            codec.format(),
            codec.quality()
        );

        let slots = self.run_items(sources, &codec, cancel, observer);

        if cancel.is_cancelled() {
            log::info!("batch cancelled; discarding settled outcomes");
            return Err(BatchError::Cancelled);
        }

        let outcomes: Vec<ConversionOutcome> = slots
            .into_iter()
            .collect::<Option<_>>()
            .ok_or(BatchError::Cancelled)?;

        log::debug!(
            "batch settled: {}/{} succeeded",
            outcomes.iter().filter(|o| o.is_success()).count(),
            outcomes.len()
        );
        Ok(outcomes)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_items(
        &self,
        sources: &[ImageSource],
        codec: &ResolvedCodec<'_>,
        cancel: &CancellationToken,
        observer: OutcomeObserver<'_>,
    ) -> Vec<Option<ConversionOutcome>> {
        run_sequential(sources, codec, cancel, observer)
    }

    #[cfg(feature = "parallel")]
    fn run_items(
        &self,
        sources: &[ImageSource],
        codec: &ResolvedCodec<'_>,
        cancel: &CancellationToken,
        observer: OutcomeObserver<'_>,
    ) -> Vec<Option<ConversionOutcome>> {
        use rayon::prelude::*;

        if self.config.max_parallelism == 1 || sources.len() < 2 {
            return run_sequential(sources, codec, cancel, observer);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_parallelism)
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                log::warn!("worker pool unavailable, running sequentially: {}", err);
                return run_sequential(sources, codec, cancel, observer);
            }
        };

        // Indexed collect reassembles results in input order.
        pool.install(|| {
            sources
                .par_iter()
                .enumerate()
                .map(|(index, source)| run_item(index, source, codec, cancel, observer))
                .collect()
        })
    }
}

fn run_sequential(
    sources: &[ImageSource],
    codec: &ResolvedCodec<'_>,
    cancel: &CancellationToken,
    observer: OutcomeObserver<'_>,
) -> Vec<Option<ConversionOutcome>> {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| run_item(index, source, codec, cancel, observer))
        .collect()
}

/// `None` means the item was abandoned because of cancellation.
fn run_item(
    index: usize,
    source: &ImageSource,
    codec: &ResolvedCodec<'_>,
    cancel: &CancellationToken,
    observer: OutcomeObserver<'_>,
) -> Option<ConversionOutcome> {
    if cancel.is_cancelled() {
        return None;
    }
    let outcome = convert_one(source, codec, cancel)?;
    observer(index, &outcome);
    Some(outcome)
}

/// Decode, encode and measure one source.
fn convert_one(
    source: &ImageSource,
    codec: &ResolvedCodec<'_>,
    cancel: &CancellationToken,
) -> Option<ConversionOutcome> {
    let surface = match codec.decode(source) {
        Ok(surface) => surface,
        Err(err) => {
            log::warn!("{} ({}): decode failed: {}", source.id(), source.name(), err);
            return Some(ConversionOutcome::failure(source.id(), FailureReason::decode(err)));
        }
    };

    if cancel.is_cancelled() {
        return None;
    }

    let bytes = match codec.encode(surface) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("{} ({}): encode failed: {}", source.id(), source.name(), err);
            return Some(ConversionOutcome::failure(source.id(), FailureReason::encode(err)));
        }
    };

    if cancel.is_cancelled() {
        return None;
    }

    Some(ConversionOutcome::success(EncodedArtifact::new(
        source.id(),
        source.name(),
        codec.format(),
        bytes,
        source.byte_length(),
    )))
}
