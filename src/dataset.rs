//! In-memory tabular dataset with stable row identity

use crate::error::{Result, TabdeltaError};
use std::collections::HashSet;

/// UTF-8 byte-order marker prepended to CSV output for spreadsheet tools
pub const UTF8_BOM: &str = "\u{feff}";

/// A cell is either text or explicitly missing
pub type Cell = Option<String>;

/// A single row with its load-time identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: usize,
    cells: Vec<Cell>,
}

impl Row {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Value at column position, `None` when missing
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }
}

/// Ordered columns plus ordered rows.
///
/// Column order is significant and survives every operation. Row ids are
/// assigned 0..n at construction and are never renumbered by selection;
/// only [`TabularDataset::renumbered`] hands out fresh ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularDataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TabularDataset {
    /// Create an empty dataset with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a dataset from positional rows, assigning ids in order
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let width = columns.len();
        let mut built = Vec::with_capacity(rows.len());

        for (id, cells) in rows.into_iter().enumerate() {
            if cells.len() != width {
                return Err(TabdeltaError::invalid_input(format!(
                    "Row {} has {} cells but the dataset has {} columns",
                    id,
                    cells.len(),
                    width
                )));
            }
            built.push(Row { id, cells });
        }

        Ok(Self {
            columns,
            rows: built,
        })
    }

    /// Build a dataset from string literals; empty strings become missing cells
    pub fn from_text_rows(columns: &[&str], rows: &[Vec<&str>]) -> Result<Self> {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                    .collect()
            })
            .collect();
        Self::from_rows(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Identifiers of all present rows, in row order
    pub fn ids(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// `base`, or `base_1`, `base_2`, ... when a column already has that name
    pub fn unused_column_name(&self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.has_column(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }

    /// Values of one column in row order
    pub fn column_values(&self, index: usize) -> Vec<Option<&str>> {
        self.rows.iter().map(|r| r.get(index)).collect()
    }

    /// Keep the rows matching `keep`, preserving order and ids
    pub fn retain_rows<F>(&self, keep: F) -> Self
    where
        F: Fn(&Row) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Project onto the given identifiers, in dataset order
    pub fn select_ids(&self, ids: &HashSet<usize>) -> Self {
        self.retain_rows(|row| ids.contains(&row.id))
    }

    /// Rewrite one column cell-by-cell; other columns and ids are untouched
    pub fn map_column<F>(&self, index: usize, rewrite: F) -> Self
    where
        F: Fn(Option<&str>) -> Cell,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                if let Some(cell) = cells.get_mut(index) {
                    *cell = rewrite(row.get(index));
                }
                Row { id: row.id, cells }
            })
            .collect();

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Same contents with fresh identifiers 0..n
    pub fn renumbered(self) -> Self {
        let rows = self
            .rows
            .into_iter()
            .enumerate()
            .map(|(id, row)| Row { id, cells: row.cells })
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Serialize as CSV with a header row; missing cells are empty fields
    pub fn to_csv(&self) -> Result<String> {
        self.write_csv(None)
    }

    /// CSV prefixed with a UTF-8 byte-order marker
    pub fn to_csv_with_bom(&self) -> Result<String> {
        Ok(format!("{}{}", UTF8_BOM, self.to_csv()?))
    }

    /// CSV with a leading identifier column, used to show row ids to a model
    pub fn to_csv_with_ids(&self, id_header: &str) -> Result<String> {
        self.write_csv(Some(id_header))
    }

    fn write_csv(&self, id_header: Option<&str>) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

        let mut header: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
        if let Some(h) = id_header {
            header.push(h);
        }
        header.extend(self.columns.iter().map(|c| c.as_str()));
        writer.write_record(&header)?;

        for row in &self.rows {
            let id = row.id.to_string();
            let mut record: Vec<&str> = Vec::with_capacity(header.len());
            if id_header.is_some() {
                record.push(&id);
            }
            record.extend(row.cells.iter().map(|c| c.as_deref().unwrap_or("")));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| TabdeltaError::Io(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| TabdeltaError::invalid_input(format!("CSV output is not UTF-8: {}", e)))
    }
}
