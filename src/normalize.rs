//! Batched, AI-delegated canonicalization of free-form dates

use crate::dataset::TabularDataset;
use crate::decode::{decode_string_map, Decoded};
use crate::processing_log::ProcessingLog;
use crate::progress::ProgressReporter;
use crate::prompts::date_normalization_prompt;
use crate::transformer::{TransformRequest, Transformer};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Distinct values sent per transformer call
pub const DEFAULT_NORMALIZATION_BATCH_SIZE: usize = 100;

/// Which column to normalize, and whether to do it at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationRequest {
    pub column: String,
    pub enabled: bool,
}

impl NormalizationRequest {
    pub fn enabled(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            enabled: true,
        }
    }
}

/// Counters for one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub distinct_values: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub rewritten_rows: usize,
}

impl NormalizationReport {
    pub fn has_errors(&self) -> bool {
        self.failed_batches > 0
    }
}

/// Rewrites one column to `YYYY-MM-DD` through the transformer.
///
/// Failures never escape: a batch whose call or answer is unusable keeps its
/// original values and leaves a warning in the log.
pub struct BatchNormalizer<'a> {
    transformer: &'a dyn Transformer,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> BatchNormalizer<'a> {
    pub fn new(transformer: &'a dyn Transformer, batch_size: usize) -> Self {
        Self {
            transformer,
            batch_size: batch_size.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn normalize(
        &self,
        dataset: &TabularDataset,
        column: &str,
        log: &mut ProcessingLog,
    ) -> TabularDataset {
        self.normalize_with_report(dataset, column, log).0
    }

    pub fn normalize_with_report(
        &self,
        dataset: &TabularDataset,
        column: &str,
        log: &mut ProcessingLog,
    ) -> (TabularDataset, NormalizationReport) {
        let mut report = NormalizationReport::default();

        let Some(index) = dataset.column_index(column) else {
            log.warn(format!(
                "Date normalization column '{}' does not exist in the data; normalization skipped.",
                column
            ));
            return (dataset.clone(), report);
        };

        let distinct: IndexSet<&str> = dataset
            .rows()
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|value| !value.is_empty())
            .collect();
        report.distinct_values = distinct.len();

        if distinct.is_empty() {
            log.info(format!(
                "Date normalization on '{}': no values to normalize.",
                column
            ));
            return (dataset.clone(), report);
        }

        let values: Vec<&str> = distinct.into_iter().collect();
        let batches: Vec<&[&str]> = values.chunks(self.batch_size).collect();
        report.batches = batches.len();

        let mut progress = ProgressReporter::new_for_batches(batches.len() as u64, self.show_progress);
        let mut mapping: IndexMap<String, String> = IndexMap::new();

        for (number, batch) in batches.iter().enumerate() {
            match self.run_batch(batch) {
                Ok(converted) => mapping.extend(converted),
                Err(reason) => {
                    report.failed_batches += 1;
                    log.warn(format!(
                        "Date normalization batch {}/{} ({} values) failed and was left unchanged: {}",
                        number + 1,
                        batches.len(),
                        batch.len(),
                        reason
                    ));
                }
            }
            progress.batch_done();
        }
        progress.finish_batches("done");

        report.rewritten_rows = dataset
            .rows()
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|value| mapping.get(*value).is_some_and(|mapped| mapped.as_str() != *value))
            .count();

        let result = dataset.map_column(index, |value| match value {
            Some(original) => Some(
                mapping
                    .get(original)
                    .cloned()
                    .unwrap_or_else(|| original.to_string()),
            ),
            None => None,
        });

        if report.has_errors() {
            log.warn(format!(
                "Date normalization on '{}' completed with partial errors: {} of {} batch(es) failed; {} rows rewritten",
                column, report.failed_batches, report.batches, report.rewritten_rows
            ));
        } else {
            log.info(format!(
                "Date normalization on '{}' completed: {} distinct value(s) in {} batch(es); {} rows rewritten",
                column, report.distinct_values, report.batches, report.rewritten_rows
            ));
        }

        (result, report)
    }

    /// One transformer round-trip; only keys from this batch are kept
    fn run_batch(&self, batch: &[&str]) -> Result<IndexMap<String, String>, String> {
        let request = TransformRequest::deterministic(date_normalization_prompt(batch));
        let text = self
            .transformer
            .transform(&request)
            .map_err(|e| e.to_string())?;

        match decode_string_map(&text) {
            Decoded::Parsed(map) => Ok(map
                .into_iter()
                .filter(|(key, _)| batch.contains(&key.as_str()))
                .collect()),
            Decoded::Unparseable => Err("response was not a JSON object".to_string()),
        }
    }
}
