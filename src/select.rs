//! Natural-language row selection delegated to the transformer

use crate::dataset::TabularDataset;
use crate::decode::{decode_id_list, Decoded};
use crate::processing_log::ProcessingLog;
use crate::progress::ProgressReporter;
use crate::prompts::{row_selection_prompt, ROW_ID_COLUMN};
use crate::transformer::{TransformRequest, Transformer};
use std::collections::HashSet;

/// Asks the transformer which row ids satisfy an instruction and keeps those rows
pub struct SemanticRowSelector<'a> {
    transformer: &'a dyn Transformer,
    show_progress: bool,
}

impl<'a> SemanticRowSelector<'a> {
    pub fn new(transformer: &'a dyn Transformer) -> Self {
        Self {
            transformer,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Select rows matching `instruction`.
    ///
    /// Any failure returns the dataset unchanged. Ids the model invents are
    /// discarded; survivors keep dataset order.
    pub fn select(
        &self,
        dataset: &TabularDataset,
        instruction: &str,
        log: &mut ProcessingLog,
    ) -> TabularDataset {
        if dataset.is_empty() {
            log.info("AI selection skipped: no rows to select from.");
            return dataset.clone();
        }

        let id_column = dataset.unused_column_name(ROW_ID_COLUMN);
        let table = match dataset.to_csv_with_ids(&id_column) {
            Ok(table) => table,
            Err(e) => {
                log.warn(format!("AI selection skipped: could not serialize the data: {}", e));
                return dataset.clone();
            }
        };

        let request =
            TransformRequest::deterministic(row_selection_prompt(&table, &id_column, instruction));

        let mut progress = ProgressReporter::new_minimal();
        if self.show_progress {
            progress = ProgressReporter::new_for_batches(0, true);
            progress.start_request("Selecting rows with AI...");
        }
        let response = self.transformer.transform(&request);
        progress.finish_request("done");

        let text = match response {
            Ok(text) => text,
            Err(e) => {
                log.warn(format!(
                    "AI selection failed; all {} rows were kept: {}",
                    dataset.len(),
                    e
                ));
                return dataset.clone();
            }
        };

        let ids = match decode_id_list(&text) {
            Decoded::Parsed(ids) => ids,
            Decoded::Unparseable => {
                log.warn(format!(
                    "AI selection returned an unreadable answer; all {} rows were kept.",
                    dataset.len()
                ));
                return dataset.clone();
            }
        };

        let present: HashSet<usize> = dataset.ids().into_iter().collect();
        let requested: HashSet<usize> = ids.into_iter().collect();
        let (valid, invented): (HashSet<usize>, HashSet<usize>) =
            requested.into_iter().partition(|id| present.contains(id));

        if !invented.is_empty() {
            let mut sample: Vec<usize> = invented.iter().copied().collect();
            sample.sort_unstable();
            sample.truncate(5);
            log.warn(format!(
                "AI selection returned {} unknown row id(s) that were ignored (e.g. {:?})",
                invented.len(),
                sample
            ));
        }

        let result = dataset.select_ids(&valid);
        log.info(format!(
            "AI selection: \"{}\" ({} rows -> {} rows)",
            instruction.trim(),
            dataset.len(),
            result.len()
        ));
        result
    }
}
