//! Configuration management for loraprep.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/loraprep/config.toml` on Linux) with sensible defaults.
//! Every section implements `Default`, so a missing file or a partial file
//! both yield a complete configuration.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for loraprep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset directory layout
    pub general: GeneralConfig,

    /// Image discovery settings
    pub scan: ScanConfig,

    /// Captioning stage settings
    pub caption: CaptionConfig,

    /// Caption refinement settings
    pub refine: RefineConfig,

    /// Resize settings
    pub resize: ResizeConfig,

    /// Training archive settings
    pub package: PackageConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Hosted provider credentials and models
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.loraprep.loraprep/config.toml
    /// - Linux: ~/.config/loraprep/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\loraprep\config\config.toml
    ///
    /// Falls back to ~/.loraprep/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "loraprep", "loraprep")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".loraprep").join("config.toml")
            })
    }

    /// Resolved base directory holding one subdirectory per input dataset.
    pub fn images_dir(&self) -> PathBuf {
        expand(&self.general.images_dir)
    }

    /// Resolved base directory for caption, resize and package outputs.
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.general.output_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}
