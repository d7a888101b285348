//! Core data types flowing through the caption and packaging pipelines.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    /// Full path to the source file
    pub source_path: PathBuf,

    /// 1-based position in scan order
    pub ordinal_index: usize,
}

impl ImageItem {
    /// File name of the source image, lossily converted.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, as it appears on disk (`".JPG"`).
    /// Empty when the file has no extension.
    pub fn extension(&self) -> String {
        extension_with_dot(&self.source_path)
    }
}

pub(crate) fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Where an item is in the caption pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Captioned,
    Refined,
    Persisted,
    Failed(String),
}

impl ItemStatus {
    /// Whether the item reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Persisted | ItemStatus::Failed(_))
    }
}

/// The caption of one item as it advances through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResult {
    pub item: ImageItem,

    /// Caption text; empty until the item is captioned
    pub caption_text: String,

    pub status: ItemStatus,

    /// Output image path once persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl CaptionResult {
    pub fn new(item: ImageItem) -> Self {
        Self {
            item,
            caption_text: String::new(),
            status: ItemStatus::Pending,
            output_path: None,
        }
    }
}

/// How persisted files are named in an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Keep the source file name
    #[default]
    Original,
    /// `<index><ext>`, e.g. `3.png`
    Sequential,
    /// `a_photo_of_<word>_<index><ext>`
    TriggerWord(String),
}

impl NamingStrategy {
    /// Base name (without extension) for an item under this strategy.
    pub fn base_name(&self, item: &ImageItem) -> String {
        match self {
            NamingStrategy::Original => item
                .source_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            NamingStrategy::Sequential => item.ordinal_index.to_string(),
            NamingStrategy::TriggerWord(word) => training_stem(word, item.ordinal_index),
        }
    }

    /// Full output file name for an item, preserving its original extension.
    pub fn file_name(&self, item: &ImageItem) -> String {
        format!("{}{}", self.base_name(item), item.extension())
    }
}

/// `a_photo_of_<word>_<index>`, the file stem used in training archives.
pub fn training_stem(trigger_word: &str, index: usize) -> String {
    format!("a_photo_of_{trigger_word}_{index}")
}

/// Totals for a finished caption run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Images found by the scanner
    pub total: usize,

    /// Images written with their caption
    pub persisted: usize,

    /// Images skipped after an error
    pub failed: usize,

    /// Captions that came back from the refinement provider
    pub refined: usize,

    /// Directory the run wrote into
    pub output_dir: PathBuf,
}

/// Record of a packaged training set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingManifest {
    pub source_directory: PathBuf,
    pub trigger_word: String,
    pub target_dimension: u32,

    /// File names inside the archive, in scan order
    pub renamed_files: Vec<String>,

    pub archive_path: PathBuf,

    /// Archive size in bytes
    pub archive_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, index: usize) -> ImageItem {
        ImageItem {
            source_path: PathBuf::from("images/set").join(name),
            ordinal_index: index,
        }
    }

    #[test]
    fn test_naming_original_keeps_name() {
        let it = item("cat.PNG", 2);
        assert_eq!(NamingStrategy::Original.file_name(&it), "cat.PNG");
        assert_eq!(NamingStrategy::Original.base_name(&it), "cat");
    }

    #[test]
    fn test_naming_sequential() {
        let it = item("cat.png", 7);
        assert_eq!(NamingStrategy::Sequential.file_name(&it), "7.png");
    }

    #[test]
    fn test_naming_trigger_word() {
        let it = item("cat.jpeg", 1);
        let naming = NamingStrategy::TriggerWord("TOK".to_string());
        assert_eq!(naming.file_name(&it), "a_photo_of_TOK_1.jpeg");
    }

    #[test]
    fn test_extension_missing() {
        let it = item("README", 1);
        assert_eq!(it.extension(), "");
        assert_eq!(NamingStrategy::Sequential.file_name(&it), "1");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(!ItemStatus::Captioned.is_terminal());
        assert!(ItemStatus::Persisted.is_terminal());
        assert!(ItemStatus::Failed("boom".into()).is_terminal());
    }

    #[test]
    fn test_naming_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            naming: NamingStrategy,
        }
        let w: Wrapper = toml::from_str("naming = \"sequential\"").unwrap();
        assert_eq!(w.naming, NamingStrategy::Sequential);
    }
}
