//! "New since last snapshot" detection over shared columns

use crate::dataset::TabularDataset;
use crate::error::{Result, TabdeltaError};
use crate::processing_log::ProcessingLog;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Computes the rows of a latest snapshot that have no counterpart in a previous one
pub struct DiffEngine;

impl DiffEngine {
    /// Columns present in both datasets, in `latest` order
    pub fn common_columns(latest: &TabularDataset, previous: &TabularDataset) -> Vec<String> {
        let previous_names: HashSet<&String> = previous.columns().iter().collect();
        latest
            .columns()
            .iter()
            .filter(|name| previous_names.contains(name))
            .cloned()
            .collect()
    }

    /// Left anti-join of `latest` against `previous` on their common columns.
    ///
    /// Every `latest` row is tested independently, so duplicates survive or
    /// drop together. Missing cells match missing cells. The result keeps all
    /// of `latest`'s columns and row order, with fresh row identifiers.
    pub fn diff(
        latest: &TabularDataset,
        previous: &TabularDataset,
        log: &mut ProcessingLog,
    ) -> Result<TabularDataset> {
        let common = Self::common_columns(latest, previous);
        if common.is_empty() {
            return Err(TabdeltaError::no_common_columns(
                latest.columns(),
                previous.columns(),
            ));
        }

        let latest_idx = Self::column_positions(latest, &common);
        let previous_idx = Self::column_positions(previous, &common);

        let previous_keys: HashSet<Vec<Option<&str>>> = previous
            .rows()
            .iter()
            .map(|row| previous_idx.iter().map(|&i| row.get(i)).collect())
            .collect();

        let unmatched: HashSet<usize> = latest
            .rows()
            .par_iter()
            .filter(|row| {
                let key: Vec<Option<&str>> = latest_idx.iter().map(|&i| row.get(i)).collect();
                !previous_keys.contains(&key)
            })
            .map(|row| row.id())
            .collect();

        let result = latest.select_ids(&unmatched).renumbered();

        log.info(format!(
            "Diff: compared on {} shared column(s); {} rows in latest -> {} new rows",
            common.len(),
            latest.len(),
            result.len()
        ));

        Ok(result)
    }

    fn column_positions(dataset: &TabularDataset, names: &[String]) -> Vec<usize> {
        let positions: HashMap<&str, usize> = dataset
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        names
            .iter()
            .filter_map(|name| positions.get(name.as_str()).copied())
            .collect()
    }
}
