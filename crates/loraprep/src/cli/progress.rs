//! Terminal progress reporting.

use indicatif::{ProgressBar, ProgressStyle};
use loraprep_core::{ProgressEvent, ProgressSink};

/// Create a progress bar matching the rest of the CLI.
///
/// A zero `total` leaves the length open until the first item starts.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

/// Feeds caption pipeline events into a progress bar.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new() -> Self {
        Self {
            bar: create_progress_bar(0),
        }
    }
}

impl Default for BarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarSink {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { item, total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_message(item.file_name());
            }
            ProgressEvent::Persisted { .. } => self.bar.inc(1),
            ProgressEvent::Failed { item, reason } => {
                self.bar.inc(1);
                self.bar
                    .println(format!("  failed {}: {reason}", item.file_name()));
            }
            ProgressEvent::Finished { .. } => self.bar.finish_and_clear(),
        }
    }
}
