//! Dataset pipeline components.
//!
//! - **discovery**: Find the images of a dataset directory
//! - **encode**: JPEG normalization before upload
//! - **batch**: Caption → refine → persist, one item at a time
//! - **rewrite**: Refine existing caption files in place
//! - **resize**: Square cover-crop resizing
//! - **package**: Dimension check, trigger-word renaming, zip archive

pub mod batch;
pub mod discovery;
pub mod encode;
pub mod package;
pub mod resize;
pub mod rewrite;

// Re-exports for convenient access
pub use batch::{CaptionJob, CaptionPipeline, NoProgress, ProgressEvent, ProgressSink, RunReport};
pub use discovery::ImageScanner;
pub use package::{archive, rename_for_training, verify_dimensions, Packager};
pub use resize::{ResizeSummary, Resizer};
pub use rewrite::{caption_files, rewrite_captions, RewriteSummary};
