//! Output directory handling: fresh-directory guard and image+caption persistence.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::PipelineError;
use crate::types::{ImageItem, NamingStrategy};

/// A directory created by, and owned by, a single run.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    path: PathBuf,
    created_at: SystemTime,
}

impl OutputDirectory {
    /// Create `path` as a new directory.
    ///
    /// Fails with [`PipelineError::AlreadyExists`] if anything already exists
    /// at `path`; nothing is written in that case. Missing parents are created.
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        if path.exists() {
            return Err(PipelineError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        // create_dir (not create_dir_all) so a concurrent creator still loses
        fs::create_dir(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PipelineError::AlreadyExists(path.to_path_buf()),
            _ => PipelineError::io(path, e),
        })?;

        tracing::info!("Created output directory: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            created_at: SystemTime::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Copy the item's image into the directory, then write its caption next to it.
    ///
    /// The caption goes to `<base>.txt` where `<base>` is the image's output
    /// stem under `naming`. The image copy always happens first. Neither file
    /// may already exist: a clash fails with [`PipelineError::AlreadyExists`]
    /// and leaves earlier files untouched. Returns the path of the copied image.
    pub fn persist(
        &self,
        item: &ImageItem,
        caption: &str,
        naming: &NamingStrategy,
    ) -> Result<PathBuf, PipelineError> {
        let image_path = self.path.join(naming.file_name(item));
        let caption_path = self.path.join(format!("{}.txt", naming.base_name(item)));
        if caption_path.exists() {
            return Err(PipelineError::AlreadyExists(caption_path));
        }

        let mut source =
            fs::File::open(&item.source_path).map_err(|e| PipelineError::io(&item.source_path, e))?;
        let mut image = create_new(&image_path)?;
        if let Err(e) = io::copy(&mut source, &mut image) {
            let _ = fs::remove_file(&image_path);
            return Err(PipelineError::io(&item.source_path, e));
        }

        let written = create_new(&caption_path)
            .and_then(|mut file| {
                file.write_all(caption.as_bytes())
                    .map_err(|e| PipelineError::io(&caption_path, e))
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&image_path);
            return Err(e);
        }

        tracing::debug!("Persisted {} -> {}", item.file_name(), image_path.display());
        Ok(image_path)
    }
}

fn create_new(path: &Path) -> Result<fs::File, PipelineError> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PipelineError::AlreadyExists(path.to_path_buf()),
            _ => PipelineError::io(path, e),
        })
}
