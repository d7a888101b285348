//! Batch caption pipeline: scan → caption → refine (optional) → persist.
//!
//! Items run strictly one after another. A failure on one image marks that
//! item failed and the batch moves on; only run-level problems (missing
//! input, output collision, empty dataset) abort the run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::PipelineError;
use crate::llm::{Captioner, Refiner, StyleDirective};
use crate::output::OutputDirectory;
use crate::types::{CaptionResult, ImageItem, ItemStatus, NamingStrategy, RunSummary};

use super::discovery::ImageScanner;

/// What a single caption run should do.
#[derive(Debug, Clone)]
pub struct CaptionJob {
    /// Dataset directory to read images from
    pub input_dir: PathBuf,
    /// Fresh directory to write images and captions into
    pub output_dir: PathBuf,
    /// Prompt sent with every image
    pub prompt: String,
    /// How output files are named
    pub naming: NamingStrategy,
    /// Refine every caption towards this directive, when set
    pub refine: Option<StyleDirective>,
    /// Pause between items while refining
    pub item_delay: Duration,
}

/// Events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Work on an item started.
    Started {
        item: ImageItem,
        total: usize,
    },
    /// An item was written to the output directory.
    Persisted { result: CaptionResult },
    /// An item was skipped after an error.
    Failed { item: ImageItem, reason: String },
    /// Every item has been handled.
    Finished { summary: RunSummary },
}

/// Receives progress events (spinners, logs, tests).
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// One entry per scanned item, in scan order
    pub results: Vec<CaptionResult>,
}

/// Sequential caption pipeline.
pub struct CaptionPipeline {
    scanner: ImageScanner,
    captioner: Captioner,
    refiner: Option<Refiner>,
}

impl CaptionPipeline {
    pub fn new(scanner: ImageScanner, captioner: Captioner) -> Self {
        Self {
            scanner,
            captioner,
            refiner: None,
        }
    }

    /// Attach the refinement client used by jobs that carry a directive.
    pub fn with_refiner(mut self, refiner: Refiner) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Run a job to completion.
    ///
    /// The input is scanned before the output directory is created, so a
    /// missing or empty dataset leaves no output behind.
    pub async fn run(
        &self,
        job: &CaptionJob,
        progress: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let items = self.scanner.scan(&job.input_dir)?;
        if items.is_empty() {
            return Err(PipelineError::EmptyDataset(job.input_dir.clone()));
        }

        let refiner = match (&job.refine, &self.refiner) {
            (Some(directive), Some(refiner)) => Some((directive, refiner)),
            (Some(_), None) => {
                tracing::warn!("Refinement requested but no refinement provider configured");
                None
            }
            _ => None,
        };

        let output = OutputDirectory::create(&job.output_dir)?;
        tracing::info!(
            "Found {} image(s) to caption via {}",
            items.len(),
            self.captioner.provider_name()
        );

        let total = items.len();
        let mut summary = RunSummary {
            total,
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(total);
        let collisions = output_collisions(&items, &job.naming);

        for (position, item) in items.into_iter().enumerate() {
            progress.on_event(&ProgressEvent::Started {
                item: item.clone(),
                total,
            });

            let mut result = CaptionResult::new(item);
            match collisions.get(&result.item.ordinal_index) {
                Some(first) => {
                    result.status =
                        ItemStatus::Failed(format!("Output name collides with {first}"));
                }
                None => {
                    if self.advance(&mut result, job, refiner, &output).await {
                        summary.refined += 1;
                    }
                }
            }

            match &result.status {
                ItemStatus::Failed(reason) => {
                    summary.failed += 1;
                    tracing::error!("Failed: {:?} - {}", result.item.source_path, reason);
                    progress.on_event(&ProgressEvent::Failed {
                        item: result.item.clone(),
                        reason: reason.clone(),
                    });
                }
                _ => {
                    summary.persisted += 1;
                    tracing::info!("Processed: {}", result.item.file_name());
                    progress.on_event(&ProgressEvent::Persisted {
                        result: result.clone(),
                    });
                }
            }
            debug_assert!(result.status.is_terminal());
            results.push(result);

            // Throttle between refinement calls, whatever the item's outcome
            if refiner.is_some() && position + 1 < total && !job.item_delay.is_zero() {
                tokio::time::sleep(job.item_delay).await;
            }
        }

        if summary.failed > 0 {
            tracing::warn!(
                "Captioning: {} persisted, {} failed in {:?}",
                summary.persisted,
                summary.failed,
                elapsed(&output)
            );
        } else {
            tracing::info!(
                "Captioning: {} persisted in {:?}",
                summary.persisted,
                elapsed(&output)
            );
        }
        progress.on_event(&ProgressEvent::Finished {
            summary: summary.clone(),
        });

        Ok(RunReport { summary, results })
    }

    /// Drive one item from `Pending` to `Persisted` or `Failed`.
    ///
    /// Returns true when a refined caption was persisted.
    async fn advance(
        &self,
        result: &mut CaptionResult,
        job: &CaptionJob,
        refiner: Option<(&StyleDirective, &Refiner)>,
        output: &OutputDirectory,
    ) -> bool {
        let path = result.item.source_path.clone();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                result.status = ItemStatus::Failed(format!("Failed to read image: {e}"));
                return false;
            }
        };

        match self.captioner.caption(bytes, &path, &job.prompt).await {
            Ok(text) => {
                result.caption_text = text;
                result.status = ItemStatus::Captioned;
            }
            Err(e) => {
                result.status = ItemStatus::Failed(e.to_string());
                return false;
            }
        }

        if let Some((directive, refiner)) = refiner {
            let outcome = refiner.refine(&result.caption_text, directive).await;
            if outcome.refined {
                result.status = ItemStatus::Refined;
            }
            result.caption_text = outcome.text;
        }

        let refined = result.status == ItemStatus::Refined;
        match output.persist(&result.item, &result.caption_text, &job.naming) {
            Ok(written) => {
                result.output_path = Some(written);
                result.status = ItemStatus::Persisted;
                refined
            }
            Err(e) => {
                result.status = ItemStatus::Failed(e.to_string());
                false
            }
        }
    }
}

fn elapsed(output: &OutputDirectory) -> Duration {
    output.created_at().elapsed().unwrap_or_default()
}

/// Items whose output files would clash with an earlier item's.
///
/// Keyed by ordinal index; the value names the earlier source file. Names
/// compare case-insensitively so `a.JPG` and `a.jpg` clash on any filesystem.
fn output_collisions(items: &[ImageItem], naming: &NamingStrategy) -> HashMap<usize, String> {
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut collisions = HashMap::new();
    for item in items {
        let keys = [
            naming.base_name(item).to_lowercase() + ".txt",
            naming.file_name(item).to_lowercase(),
        ];
        if let Some(first) = keys.iter().find_map(|k| claimed.get(k)) {
            collisions.insert(item.ordinal_index, first.clone());
            continue;
        }
        for key in keys {
            claimed.insert(key, item.file_name());
        }
    }
    collisions
}
