//! Command-line interface for tabdelta

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dates::parse_lenient_date;
use crate::filter::{DateRangeFilter, SearchMode};

#[derive(Parser)]
#[command(name = "tabdelta")]
#[command(about = "Find new rows between two table exports, then filter and refine them with AI")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override workspace location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize tabdelta workspace
    Init {
        /// Overwrite an existing config.json
        #[arg(long)]
        force: bool,
    },

    /// Process the latest export: diff, filter, normalize and select
    Process {
        /// Latest export (CSV, UTF-8 or Shift_JIS)
        latest: PathBuf,

        /// Previous export to diff against
        #[arg(long, conflicts_with = "from_store")]
        previous: Option<PathBuf>,

        /// Diff against the snapshot saved by an earlier run
        #[arg(long)]
        from_store: bool,

        /// Keep rows whose date is on or after DATE, as COLUMN=DATE (repeatable)
        #[arg(long = "date-filter", value_parser = parse_date_filter)]
        date_filters: Vec<DateRangeFilter>,

        /// Column searched for keywords
        #[arg(long)]
        keyword_column: Option<String>,

        /// Keyword to search for (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// File with one keyword per line
        #[arg(long)]
        keywords_file: Option<PathBuf>,

        /// How keywords combine: "and" or "or"
        #[arg(long, default_value = "or", value_parser = SearchMode::parse)]
        search_type: SearchMode,

        /// Column whose dates are normalized to YYYY-MM-DD with AI
        #[arg(long)]
        normalize_column: Option<String>,

        /// Natural-language instruction for AI row selection
        #[arg(long)]
        select: Option<String>,

        /// JSON file of form fields; command-line options take precedence
        #[arg(long)]
        params: Option<PathBuf>,

        /// Save the result in the store under this name
        #[arg(long)]
        save_as: Option<String>,

        /// Write the resulting CSV here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Hide progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Save a table in the store as the next previous snapshot
    Save {
        /// Table to store
        input: PathBuf,

        /// Snapshot name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// Export the stored previous snapshot
    LoadPrevious {
        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show workspace, store and AI configuration
    Status {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Parse `COLUMN=DATE` into a date-range filter
pub fn parse_date_filter(s: &str) -> Result<DateRangeFilter, String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid date filter: '{}'. Use COLUMN=DATE", s))?;

    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Invalid date filter: '{}'. Column name is empty", s));
    }

    let min_date: NaiveDate = parse_lenient_date(value)
        .ok_or_else(|| format!("Invalid date in filter: '{}'", value.trim()))?;

    Ok(DateRangeFilter {
        column: column.to_string(),
        min_date,
    })
}
