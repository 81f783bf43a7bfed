//! Result aggregation: per-item outcomes reduced into batch statistics.

use serde::Serialize;

use crate::outcome::{compression_percent, ConversionOutcome, EncodedArtifact};

/// Aggregate statistics for a batch. Derived from outcomes, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub item_count: usize,
    pub success_count: usize,
    /// Original bytes of the sources that converted successfully.
    pub total_original_bytes: u64,
    pub total_converted_bytes: u64,
    pub aggregate_compression_percent: f64,
}

impl BatchSummary {
    pub fn failure_count(&self) -> usize {
        self.item_count - self.success_count
    }

    /// Bytes saved across the batch, 0 when the batch grew.
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_bytes
            .saturating_sub(self.total_converted_bytes)
    }
}

/// Ordered outcome list, one entry per source id.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    outcomes: Vec<ConversionOutcome>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. A second record for the same source id replaces
    /// the first in place, keeping its position.
    pub fn record(&mut self, outcome: ConversionOutcome) {
        let id = outcome.source_id();
        match self.outcomes.iter_mut().find(|o| o.source_id() == id) {
            Some(existing) => *existing = outcome,
            None => self.outcomes.push(outcome),
        }
    }

    pub fn outcomes(&self) -> &[ConversionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Recompute the summary from the current outcomes.
    pub fn summary(&self) -> BatchSummary {
        let (total_original_bytes, total_converted_bytes) = self
            .artifacts()
            .fold((0u64, 0u64), |(orig, conv), a| {
                (
                    orig + a.original_byte_length as u64,
                    conv + a.byte_length() as u64,
                )
            });

        BatchSummary {
            item_count: self.outcomes.len(),
            success_count: self.outcomes.iter().filter(|o| o.is_success()).count(),
            total_original_bytes,
            total_converted_bytes,
            aggregate_compression_percent: compression_percent(
                total_original_bytes,
                total_converted_bytes,
            ),
        }
    }

    /// Artifacts of successful outcomes, in recorded order.
    pub fn artifacts(&self) -> impl Iterator<Item = &EncodedArtifact> {
        self.outcomes.iter().filter_map(|o| o.artifact())
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }
}

/// Human-readable byte size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::format::Format;
    use crate::source::SourceId;

    proptest! {
        /// Property: any sequence of records leaves one outcome per distinct id
        /// and the summary never double counts.
        #[test]
        fn prop_one_outcome_per_id(
            records in prop::collection::vec((0u64..5, 1usize..500, 0usize..500), 0..30),
        ) {
            let mut agg = ResultAggregator::new();
            let mut latest = std::collections::BTreeMap::new();

            for (id, original, converted) in &records {
                agg.record(ConversionOutcome::success(EncodedArtifact::new(
                    SourceId::new(*id),
                    "x.png",
                    Format::Gif,
                    vec![0u8; *converted],
                    *original,
                )));
                latest.insert(*id, (*original as u64, *converted as u64));
            }

            let summary = agg.summary();
            prop_assert_eq!(summary.item_count, latest.len());
            let original: u64 = latest.values().map(|v| v.0).sum();
            let converted: u64 = latest.values().map(|v| v.1).sum();
            prop_assert_eq!(summary.total_original_bytes, original);
            prop_assert_eq!(summary.total_converted_bytes, converted);
            prop_assert!(summary.aggregate_compression_percent >= 0.0);
        }
    }
}
