//! Image set discovery: list a dataset directory in a reproducible order.

use std::path::Path;
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::PipelineError;
use crate::types::ImageItem;

/// Discovers the images of a single dataset directory.
pub struct ImageScanner {
    config: ScanConfig,
}

impl ImageScanner {
    /// Create a new scanner with the given configuration.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// List the supported images directly inside `dir`.
    ///
    /// Subdirectories are not descended into. Items are sorted by file name
    /// and numbered from 1 in that order. A directory without matching files
    /// yields an empty vector; the caller decides whether that is fatal.
    pub fn scan(&self, dir: &Path) -> Result<Vec<ImageItem>, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::NotFound(dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {e}", dir);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_supported(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(i, source_path)| ImageItem {
                source_path,
                ordinal_index: i + 1,
            })
            .collect())
    }

    /// Check if a file has a supported extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_is_supported() {
        let scanner = ImageScanner::default();

        assert!(scanner.is_supported(Path::new("test.jpg")));
        assert!(scanner.is_supported(Path::new("test.JPG")));
        assert!(scanner.is_supported(Path::new("test.jpeg")));
        assert!(scanner.is_supported(Path::new("test.png")));
        assert!(scanner.is_supported(Path::new("test.gif")));
        assert!(scanner.is_supported(Path::new("test.WebP")));
        assert!(!scanner.is_supported(Path::new("test.txt")));
        assert!(!scanner.is_supported(Path::new("test.bmp")));
        assert!(!scanner.is_supported(Path::new("jpg")));
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ImageScanner::default().scan(&missing).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_scan_only_non_images_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "scan.bmp");
        touch(dir.path(), "data.json");

        let items = ImageScanner::default().scan(dir.path()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.png", "a.jpg", "b.JPEG", "readme.txt", "d.bmp", "e.webp"] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();
        touch(&dir.path().join("nested.png"), "inner.jpg");

        let items = ImageScanner::default().scan(dir.path()).unwrap();
        let names: Vec<String> = items.iter().map(|i| i.file_name()).collect();
        assert_eq!(names, vec!["a.jpg", "b.JPEG", "c.png", "e.webp"]);

        let indices: Vec<usize> = items.iter().map(|i| i.ordinal_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }
}
