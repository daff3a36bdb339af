//! # tabdelta
//!
//! Finds the records that are new in the latest export of a table, narrows
//! them with date and keyword filters, and refines the result with an AI
//! model: free-form dates are normalized and rows are selected from a
//! natural-language instruction.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod decode;
pub mod diff;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod processing_log;
pub mod progress;
pub mod prompts;
pub mod request;
pub mod select;
pub mod store;
pub mod transformer;
pub mod workspace;

pub use dataset::TabularDataset;
pub use diff::DiffEngine;
pub use error::{Result, TabdeltaError};
pub use filter::{FilterChain, FilterSpec};
pub use normalize::BatchNormalizer;
pub use pipeline::{Pipeline, PipelineCapabilities, PipelineOutcome, PipelineSettings};
pub use processing_log::ProcessingLog;
pub use request::ProcessRequest;
pub use select::SemanticRowSelector;
pub use store::{SnapshotStore, WorkspaceStore};
pub use transformer::Transformer;
pub use workspace::TabdeltaWorkspace;

/// Current format version for tabdelta files
pub const FORMAT_VERSION: &str = "1.0.0";
