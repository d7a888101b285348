//! Training archive packaging: verify dimensions, rename with a trigger word, zip.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::PackageConfig;
use crate::error::PipelineError;
use crate::types::{training_stem, ImageItem, PackagingManifest};

use super::discovery::ImageScanner;

/// Check that every image in `dir` is exactly `width × height`.
///
/// Only image headers are read. Stops at the first mismatch, reporting the
/// file and its actual size. Returns the verified items in scan order.
pub fn verify_dimensions(
    scanner: &ImageScanner,
    dir: &Path,
    width: u32,
    height: u32,
) -> Result<Vec<ImageItem>, PipelineError> {
    let items = scanner.scan(dir)?;
    if items.is_empty() {
        return Err(PipelineError::EmptyDataset(dir.to_path_buf()));
    }

    for item in &items {
        let (w, h) =
            image::image_dimensions(&item.source_path).map_err(|e| PipelineError::Decode {
                path: item.source_path.clone(),
                message: format!("Cannot read dimensions: {e}"),
            })?;
        if (w, h) != (width, height) {
            return Err(PipelineError::DimensionMismatch {
                path: item.source_path.clone(),
                width: w,
                height: h,
                expected_width: width,
                expected_height: height,
            });
        }
    }

    Ok(items)
}

/// Copy `items` into `staging` as `a_photo_of_<trigger>_<n><ext>`.
///
/// Numbering follows scan order starting at 1; original extensions are kept
/// as-is. Returns the new file names.
pub fn rename_for_training(
    items: &[ImageItem],
    trigger_word: &str,
    staging: &Path,
) -> Result<Vec<String>, PipelineError> {
    let mut renamed = Vec::with_capacity(items.len());
    for item in items {
        let name = format!(
            "{}{}",
            training_stem(trigger_word, item.ordinal_index),
            item.extension()
        );
        let target = staging.join(&name);
        fs::copy(&item.source_path, &target).map_err(|e| PipelineError::io(&item.source_path, e))?;
        renamed.push(name);
    }
    Ok(renamed)
}

/// Zip the files directly inside `dir` into `zip_path` at maximum compression.
///
/// Entries are stored flat, in file-name order. Returns the archive size.
pub fn archive(dir: &Path, zip_path: &Path) -> Result<u64, PipelineError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| PipelineError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();
    archive_entries(&entries, zip_path)
}

/// Zip `entries` flat into `zip_path`. A failed archive is removed.
pub(crate) fn archive_entries(entries: &[PathBuf], zip_path: &Path) -> Result<u64, PipelineError> {
    let file = File::create(zip_path).map_err(|e| PipelineError::Archive {
        path: zip_path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Err(e) = write_entries(file, entries, zip_path) {
        if let Err(rm) = fs::remove_file(zip_path) {
            tracing::warn!("Failed to remove partial archive {:?}: {rm}", zip_path);
        }
        return Err(e);
    }

    fs::metadata(zip_path)
        .map(|m| m.len())
        .map_err(|e| PipelineError::io(zip_path, e))
}

fn write_entries(file: File, entries: &[PathBuf], zip_path: &Path) -> Result<(), PipelineError> {
    let archive_err = |message: String| PipelineError::Archive {
        path: zip_path.to_path_buf(),
        message,
    };

    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
        zip.start_file(name, options)
            .map_err(|e| archive_err(e.to_string()))?;
        zip.write_all(&bytes).map_err(|e| archive_err(e.to_string()))?;
    }

    let mut writer = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    writer.flush().map_err(|e| archive_err(e.to_string()))
}

/// Runs the full packaging step for one dataset.
pub struct Packager {
    scanner: ImageScanner,
    config: PackageConfig,
}

impl Packager {
    pub fn new(scanner: ImageScanner, config: PackageConfig) -> Self {
        Self { scanner, config }
    }

    /// Verify, rename and archive `source_dir` into `zip_path`.
    ///
    /// Nothing is copied unless every image passes verification. Files are
    /// staged in a temporary directory beside the archive, which is removed
    /// whether archiving succeeds or not.
    pub fn package(
        &self,
        source_dir: &Path,
        trigger_word: &str,
        zip_path: &Path,
    ) -> Result<PackagingManifest, PipelineError> {
        let dim = self.config.target_dimension;
        let items = verify_dimensions(&self.scanner, source_dir, dim, dim)?;
        tracing::info!("Verified {} images are all {dim}x{dim}", items.len());

        let count = items.len();
        if count < self.config.min_recommended || count > self.config.max_recommended {
            tracing::warn!(
                "Recommended dataset size is {}-{} images; this one has {count}",
                self.config.min_recommended,
                self.config.max_recommended
            );
        }

        let staging_parent = zip_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staging = tempfile::Builder::new()
            .prefix(".loraprep-staging-")
            .tempdir_in(staging_parent)
            .map_err(|e| PipelineError::io(staging_parent, e))?;

        let outcome = rename_for_training(&items, trigger_word, staging.path())
            .and_then(|renamed| archive(staging.path(), zip_path).map(|size| (renamed, size)));

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            tracing::warn!("Failed to remove staging directory {:?}: {e}", staging_path);
        }

        let (renamed_files, archive_size) = outcome?;
        tracing::info!("Created zip file: {} ({archive_size} bytes)", zip_path.display());

        Ok(PackagingManifest {
            source_directory: source_dir.to_path_buf(),
            trigger_word: trigger_word.to_string(),
            target_dimension: dim,
            renamed_files,
            archive_path: zip_path.to_path_buf(),
            archive_size,
        })
    }
}
