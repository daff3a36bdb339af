//! Append-only audit trail returned to the caller

use serde::Serialize;

/// Ordered, human-readable record of what a request did.
///
/// Entries are never reordered or edited once pushed. Every entry is also
/// forwarded to the `log` facade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessingLog {
    entries: Vec<String>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress line
    pub fn info(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        log::info!("{}", entry);
        self.entries.push(entry);
    }

    /// Record a degradation the caller should know about
    pub fn warn(&mut self, entry: impl Into<String>) {
        let entry = format!("Warning: {}", entry.into());
        log::warn!("{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|s| s.as_str())
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}
