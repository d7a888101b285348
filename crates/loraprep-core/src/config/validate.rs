//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats must not be empty".into(),
            ));
        }
        if !matches!(self.caption.provider.as_str(), "replicate" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "caption.provider must be \"replicate\" or \"openai\", got \"{}\"",
                self.caption.provider
            )));
        }
        if self.caption.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "caption.timeout_ms must be > 0".into(),
            ));
        }
        if self.refine.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "refine.max_attempts must be > 0".into(),
            ));
        }
        if self.refine.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "refine.timeout_ms must be > 0".into(),
            ));
        }
        if !self.refine.prefix_template.contains("{subject}") {
            return Err(ConfigError::ValidationError(
                "refine.prefix_template must contain {subject}".into(),
            ));
        }
        if self.resize.size == 0 {
            return Err(ConfigError::ValidationError(
                "resize.size must be > 0".into(),
            ));
        }
        if self.package.target_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "package.target_dimension must be > 0".into(),
            ));
        }
        if self.package.min_recommended > self.package.max_recommended {
            return Err(ConfigError::ValidationError(
                "package.min_recommended must be <= package.max_recommended".into(),
            ));
        }
        Ok(())
    }
}
