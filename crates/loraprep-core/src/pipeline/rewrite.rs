//! In-place refinement of the caption files of an existing dataset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;
use crate::llm::{Refiner, StyleDirective};

/// Counts from a rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Caption files processed (written back)
    pub processed: usize,
    /// Of those, captions that came back from the provider
    pub refined: usize,
}

/// List the `.txt` files directly inside `dir`, sorted by name.
pub fn caption_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::NotFound(dir.to_path_buf()));
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| PipelineError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Refine every caption file in `dir` and write the result back.
///
/// Files that fail to refine keep their original text. `item_delay` is
/// slept between files. `on_file` is called before each file is sent.
pub async fn rewrite_captions(
    refiner: &Refiner,
    dir: &Path,
    directive: &StyleDirective,
    item_delay: Duration,
    on_file: impl Fn(&Path),
) -> Result<RewriteSummary, PipelineError> {
    let files = caption_files(dir)?;
    tracing::info!("Found {} caption file(s)", files.len());

    let mut summary = RewriteSummary::default();
    for (position, file) in files.iter().enumerate() {
        on_file(file);
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| PipelineError::io(file, e))?;
        let caption = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} is not valid UTF-8; replacing invalid bytes", file.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let outcome = refiner.refine(&caption, directive).await;
        tokio::fs::write(file, &outcome.text)
            .await
            .map_err(|e| PipelineError::io(file, e))?;

        summary.processed += 1;
        if outcome.refined {
            summary.refined += 1;
        }
        if position + 1 < files.len() && !item_delay.is_zero() {
            tokio::time::sleep(item_delay).await;
        }
    }

    Ok(summary)
}
