//! Error types for tabdelta operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabdeltaError>;

#[derive(Error, Debug)]
pub enum TabdeltaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "Could not recognise the file encoding (tried: {tried}). Save the file as UTF-8 or Shift_JIS.{}",
        last_parse_error_suffix(.last_parse_error)
    )]
    UnrecognizedEncoding {
        tried: String,
        /// CSV error from the last encoding whose decoding succeeded
        last_parse_error: Option<String>,
    },

    #[error("No latest table was supplied")]
    MissingLatest,

    #[error("The snapshots share no columns and cannot be compared (latest: [{latest}], previous: [{previous}])")]
    NoCommonColumns { latest: String, previous: String },

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("Transformer error: {0}")]
    Transformer(#[from] crate::transformer::TransformerError),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Snapshot store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TabdeltaError {
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn no_common_columns(latest: &[String], previous: &[String]) -> Self {
        Self::NoCommonColumns {
            latest: latest.join(", "),
            previous: previous.join(", "),
        }
    }
}

fn last_parse_error_suffix(error: &Option<String>) -> String {
    match error {
        Some(e) => format!(" Last CSV error: {}", e),
        None => String::new(),
    }
}
