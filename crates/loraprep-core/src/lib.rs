//! loraprep core - dataset preparation for LoRA training.
//!
//! Turns a directory of images into a captioned, resized and zipped training
//! set. Captions come from hosted models; this crate owns the orchestration
//! around them.
//!
//! # Architecture
//!
//! ```text
//! Scan → Caption (Replicate / OpenAI) → Refine (Mistral, optional) → Persist
//! Resize → Verify dimensions → Rename with trigger word → Zip
//! ```
//!
//! Every run writes into a directory it creates itself and never reuses an
//! existing one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use loraprep_core::{CaptionJob, CaptionPipeline, Captioner, Config, ImageScanner, NoProgress};
//! use loraprep_core::llm::{CaptionOptions, ProviderFactory};
//!
//! #[tokio::main]
//! async fn main() -> loraprep_core::Result<()> {
//!     let config = Config::load()?;
//!     let provider = ProviderFactory::captioner("replicate", &config.llm, None)?;
//!     let captioner = Captioner::new(provider, CaptionOptions::from(&config.caption));
//!     let pipeline = CaptionPipeline::new(ImageScanner::new(config.scan.clone()), captioner);
//!
//!     let job = CaptionJob { /* ... */ };
//!     let report = pipeline.run(&job, &NoProgress).await?;
//!     println!("{} captioned", report.summary.persisted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, PrepError, Result};
pub use layout::DatasetLayout;
pub use llm::{Captioner, Refiner, StyleDirective};
pub use output::OutputDirectory;
pub use pipeline::{
    CaptionJob, CaptionPipeline, ImageScanner, NoProgress, Packager, ProgressEvent, ProgressSink,
    Resizer, RunReport,
};
pub use types::{CaptionResult, ImageItem, ItemStatus, NamingStrategy, PackagingManifest, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
