//! Where datasets live on disk.
//!
//! Inputs sit under `<images_dir>/<dataset>`; every later stage writes under
//! `<output_dir>`, named after the dataset plus a stage suffix.

use std::path::PathBuf;

use crate::config::Config;

/// Path conventions for one dataset name.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    images_dir: PathBuf,
    output_dir: PathBuf,
    name: String,
}

impl DatasetLayout {
    pub fn new(images_dir: PathBuf, output_dir: PathBuf, name: &str) -> Self {
        Self {
            images_dir,
            output_dir,
            name: name.to_string(),
        }
    }

    pub fn from_config(config: &Config, name: &str) -> Self {
        Self::new(config.images_dir(), config.output_dir(), name)
    }

    /// Raw input images.
    pub fn input(&self) -> PathBuf {
        self.images_dir.join(&self.name)
    }

    /// Captioned copy of the dataset, e.g. `output/cats_caption`.
    pub fn captioned(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{suffix}", self.name))
    }

    /// Resized copy, e.g. `output/cats-512`.
    pub fn resized(&self, size: u32) -> PathBuf {
        self.output_dir.join(format!("{}-{size}", self.name))
    }

    /// Directory packaged for training: the `-<dim>` resized set.
    ///
    /// A name that already carries the suffix is used as-is.
    pub fn package_source(&self, dimension: u32) -> PathBuf {
        let suffix = format!("-{dimension}");
        if self.name.ends_with(&suffix) {
            self.output_dir.join(&self.name)
        } else {
            self.output_dir.join(format!("{}{suffix}", self.name))
        }
    }

    /// Training archive, e.g. `output/cats.zip`.
    pub fn archive(&self) -> PathBuf {
        self.output_dir.join(format!("{}.zip", self.name))
    }

    /// Dataset directory whose captions are rewritten in place.
    pub fn captions(&self) -> PathBuf {
        self.output_dir.join(&self.name)
    }
}
