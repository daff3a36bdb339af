//! Output formatting utilities

use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::PipelineOutcome;
use crate::store::{SnapshotRecord, StoreStats};

/// Everything the `status` command reports
#[derive(Debug, serde::Serialize)]
pub struct StatusReport {
    pub workspace: String,
    pub model: String,
    pub ai_configured: bool,
    pub normalization_batch_size: usize,
    pub transformer_timeout_secs: u64,
    pub store: StoreStats,
    pub snapshots: Vec<SnapshotRecord>,
}

impl StatusReport {
    pub fn new(
        workspace: &std::path::Path,
        config: &AppConfig,
        store: StoreStats,
        snapshots: Vec<SnapshotRecord>,
    ) -> Self {
        Self {
            workspace: workspace.display().to_string(),
            model: config.model.clone(),
            ai_configured: config.api_key.is_some(),
            normalization_batch_size: config.normalization_batch_size,
            transformer_timeout_secs: config.transformer_timeout_secs,
            store,
            snapshots,
        }
    }
}

/// Pretty printer for tabdelta output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the outcome of a processing run
    pub fn print_outcome(outcome: &PipelineOutcome) {
        if outcome.success {
            println!("✅ {}", outcome.message);
        } else {
            println!("❌ {}", outcome.message);
        }

        if !outcome.log.is_empty() {
            println!("📋 Processing log:");
            for (i, entry) in outcome.log.iter().enumerate() {
                let prefix = if i == outcome.log.len() - 1 { "└─" } else { "├─" };
                println!("{} {}", prefix, entry);
            }
        }

        if outcome.success {
            println!("📊 Rows in result: {}", outcome.row_count);
        }
    }

    /// Print workspace status
    pub fn print_status(report: &StatusReport) {
        println!("📊 Tabdelta Workspace: {}", report.workspace);
        let ai = if report.ai_configured {
            format!("✅ {}", report.model)
        } else {
            "❌ not configured (set GEMINI_API_KEY)".to_string()
        };
        println!("├─ AI transformer: {}", ai);
        println!("├─ Normalization batch size: {}", report.normalization_batch_size);
        println!("├─ Transformer timeout: {}s", report.transformer_timeout_secs);
        println!("├─ Stored snapshots: {}", report.store.snapshot_count);
        println!("├─ Snapshot size: {}", format_bytes(report.store.total_body_size));
        println!(
            "└─ Latest: {}",
            report.store.latest.as_deref().unwrap_or("(none)")
        );

        Self::print_snapshot_list(&report.snapshots);
    }

    /// Print stored snapshots
    pub fn print_snapshot_list(snapshots: &[SnapshotRecord]) {
        if snapshots.is_empty() {
            println!("No snapshots stored.");
            return;
        }

        println!("📸 Stored Snapshots:");
        for (i, record) in snapshots.iter().enumerate() {
            let prefix = if i == snapshots.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {} ({}, {})",
                prefix,
                record.name,
                record.created.format("%Y-%m-%d %H:%M:%S"),
                format_bytes(record.size)
            );
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format an outcome, leaving out the CSV body when it was written elsewhere
    pub fn format_outcome(outcome: &PipelineOutcome, include_csv: bool) -> Result<String> {
        let mut json = serde_json::to_value(outcome)?;
        if !include_csv {
            if let Some(object) = json.as_object_mut() {
                object.remove("csvData");
            }
        }
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
