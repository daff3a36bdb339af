//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for transformer batches
#[derive(Debug)]
pub struct ProgressReporter {
    pub batches_pb: Option<ProgressBar>,
    pub request_pb: Option<ProgressBar>,
    show_progress: bool,
}

impl ProgressReporter {
    /// Create progress reporter for a run of normalization batches
    pub fn new_for_batches(total_batches: u64, show_progress: bool) -> Self {
        let batches_pb = if show_progress && total_batches > 0 {
            Some(create_progress_bar(total_batches, "Normalizing dates"))
        } else {
            None
        };

        Self {
            batches_pb,
            request_pb: None,
            show_progress,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            batches_pb: None,
            request_pb: None,
            show_progress: false,
        }
    }

    /// Show a spinner while a single transformer call is in flight
    pub fn start_request(&mut self, message: &str) {
        if self.show_progress && self.request_pb.is_none() {
            self.request_pb = Some(create_spinner(message));
        }
    }

    pub fn finish_request(&mut self, message: &str) {
        if let Some(pb) = self.request_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Advance the batch bar by one
    pub fn batch_done(&mut self) {
        if let Some(pb) = &self.batches_pb {
            pb.inc(1);
        }
    }

    pub fn finish_batches(&mut self, message: &str) {
        if let Some(pb) = self.batches_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // Ensure all progress bars are cleaned up silently
        if let Some(pb) = self.batches_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.request_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}/{len:3} batches {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
