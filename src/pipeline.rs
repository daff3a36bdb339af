//! One processing run: ingest, diff, filter, normalize, select, save

use crate::dataset::TabularDataset;
use crate::diff::DiffEngine;
use crate::error::{Result, TabdeltaError};
use crate::ingest::{read_table, RawTable};
use crate::normalize::{BatchNormalizer, DEFAULT_NORMALIZATION_BATCH_SIZE};
use crate::processing_log::ProcessingLog;
use crate::request::ProcessRequest;
use crate::select::SemanticRowSelector;
use crate::store::SnapshotStore;
use crate::transformer::Transformer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SUCCESS_MESSAGE: &str = "Processing completed successfully.";

/// External collaborators, built once at start-up and shared read-only
#[derive(Clone, Default)]
pub struct PipelineCapabilities {
    pub transformer: Option<Arc<dyn Transformer>>,
    pub store: Option<Arc<dyn SnapshotStore>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub normalization_batch_size: usize,
    pub show_progress: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            normalization_batch_size: DEFAULT_NORMALIZATION_BATCH_SIZE,
            show_progress: false,
        }
    }
}

/// Result of one run, shaped like the JSON response clients expect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub message: String,
    pub log: Vec<String>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    /// BOM-prefixed CSV; absent when the run failed
    #[serde(rename = "csvData", skip_serializing_if = "Option::is_none", default)]
    pub csv_data: Option<String>,
    #[serde(skip)]
    pub dataset: Option<TabularDataset>,
}

impl PipelineOutcome {
    fn failure(error: &TabdeltaError, mut log: ProcessingLog) -> Self {
        log.warn(format!("Processing aborted: {}", error));
        Self {
            success: false,
            message: error.to_string(),
            log: log.into_entries(),
            row_count: 0,
            csv_data: None,
            dataset: None,
        }
    }
}

/// Executes requests against injected capabilities
pub struct Pipeline {
    capabilities: PipelineCapabilities,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(capabilities: PipelineCapabilities, settings: PipelineSettings) -> Self {
        Self {
            capabilities,
            settings,
        }
    }

    /// Run one request.
    ///
    /// Only an unreadable latest table, a diff without shared columns, or a
    /// failure to serialize the result abort the run. Everything else is
    /// logged and skipped.
    pub fn run(
        &self,
        latest: Option<RawTable>,
        previous: Option<RawTable>,
        request: &ProcessRequest,
    ) -> PipelineOutcome {
        let mut log = ProcessingLog::new();
        match self.execute(latest, previous, request, &mut log) {
            Ok((dataset, csv)) => PipelineOutcome {
                success: true,
                message: SUCCESS_MESSAGE.to_string(),
                log: log.into_entries(),
                row_count: dataset.len(),
                csv_data: Some(csv),
                dataset: Some(dataset),
            },
            Err(e) => PipelineOutcome::failure(&e, log),
        }
    }

    fn execute(
        &self,
        latest: Option<RawTable>,
        previous: Option<RawTable>,
        request: &ProcessRequest,
        log: &mut ProcessingLog,
    ) -> Result<(TabularDataset, String)> {
        let latest_raw = latest.ok_or(TabdeltaError::MissingLatest)?;
        let latest = read_table(&latest_raw.bytes)?;
        log.info(format!(
            "Loaded latest table '{}' ({} rows, {} columns)",
            latest_raw.name,
            latest.len(),
            latest.columns().len()
        ));

        let mut current = match self.resolve_previous(previous, request, log) {
            Some(previous) => DiffEngine::diff(&latest, &previous, log)?,
            None => {
                log.info("No previous table; every latest row is kept.");
                latest
            }
        };

        current = request.filter_chain().apply(current, log);
        current = self.normalize_stage(current, request, log);
        current = self.select_stage(current, request, log);

        let csv = current.to_csv_with_bom()?;
        if let Some(name) = &request.save_result {
            self.save_stage(&csv, name, log);
        }

        Ok((current, csv))
    }

    /// Previous table from the request, else from the store when asked
    fn resolve_previous(
        &self,
        previous: Option<RawTable>,
        request: &ProcessRequest,
        log: &mut ProcessingLog,
    ) -> Option<TabularDataset> {
        let (name, bytes) = match previous {
            Some(raw) => (raw.name, raw.bytes),
            None if request.previous_from_store => {
                let Some(store) = &self.capabilities.store else {
                    log.warn("No snapshot store is configured; diff skipped.");
                    return None;
                };
                match store.load_previous() {
                    Ok(Some(snapshot)) => (
                        format!("stored snapshot {}", snapshot.record.name),
                        snapshot.bytes,
                    ),
                    Ok(None) => {
                        log.info("No previous snapshot has been stored yet; diff skipped.");
                        return None;
                    }
                    Err(e) => {
                        log.warn(format!("Could not load the stored snapshot; diff skipped: {}", e));
                        return None;
                    }
                }
            }
            None => return None,
        };

        match read_table(&bytes) {
            Ok(dataset) => {
                log.info(format!(
                    "Loaded previous table '{}' ({} rows, {} columns)",
                    name,
                    dataset.len(),
                    dataset.columns().len()
                ));
                Some(dataset)
            }
            Err(e) => {
                log.warn(format!("Previous table '{}' could not be read; diff skipped: {}", name, e));
                None
            }
        }
    }

    fn normalize_stage(
        &self,
        current: TabularDataset,
        request: &ProcessRequest,
        log: &mut ProcessingLog,
    ) -> TabularDataset {
        let Some(column) = request.normalization_column() else {
            return current;
        };
        if current.is_empty() {
            log.info("Date normalization skipped: no rows left.");
            return current;
        }
        let Some(transformer) = &self.capabilities.transformer else {
            log.warn("Date normalization skipped: no AI transformer is configured.");
            return current;
        };

        BatchNormalizer::new(transformer.as_ref(), self.settings.normalization_batch_size)
            .with_progress(self.settings.show_progress)
            .normalize(&current, column, log)
    }

    fn select_stage(
        &self,
        current: TabularDataset,
        request: &ProcessRequest,
        log: &mut ProcessingLog,
    ) -> TabularDataset {
        let Some(instruction) = request.instruction() else {
            return current;
        };
        if current.is_empty() {
            log.info("AI selection skipped: no rows left.");
            return current;
        }
        let Some(transformer) = &self.capabilities.transformer else {
            log.warn("AI selection skipped: no AI transformer is configured.");
            return current;
        };

        SemanticRowSelector::new(transformer.as_ref())
            .with_progress(self.settings.show_progress)
            .select(&current, instruction, log)
    }

    fn save_stage(&self, csv: &str, name: &str, log: &mut ProcessingLog) {
        let Some(store) = &self.capabilities.store else {
            log.warn("Result not saved: no snapshot store is configured.");
            return;
        };
        match store.save_latest(csv.as_bytes(), name) {
            Ok(record) => log.info(format!(
                "Saved the result as snapshot '{}' for the next comparison.",
                record.name
            )),
            Err(e) => log.warn(format!("Result could not be saved: {}", e)),
        }
    }
}
