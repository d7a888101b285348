//! Sub-configuration structs with their defaults.

use crate::types::NamingStrategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dataset directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base directory with one subdirectory per input dataset
    pub images_dir: PathBuf,

    /// Base directory where captioned, resized and packaged sets are written
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("./images"),
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Image discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Supported input extensions (matched case-insensitively)
    pub supported_formats: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Captioning stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Provider identifier ("replicate" or "openai")
    pub provider: String,

    /// Prompt sent alongside every image
    pub prompt: String,

    /// Maximum tokens to generate (chat providers only)
    pub max_tokens: u32,

    /// Sampling temperature (chat providers only)
    pub temperature: f32,

    /// Per-image timeout in milliseconds
    pub timeout_ms: u64,

    /// How persisted files are named
    pub naming: NamingStrategy,

    /// Suffix appended to the dataset name for the output directory
    pub output_suffix: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: "replicate".to_string(),
            prompt: "A descriptive caption for this image:".to_string(),
            max_tokens: 300,
            temperature: 0.3,
            timeout_ms: 120_000,
            naming: NamingStrategy::Original,
            output_suffix: String::new(),
        }
    }
}

/// Caption refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Total attempts per caption (first call included)
    pub max_attempts: u32,

    /// Backoff unit after a rate-limit response; attempt N waits N times this
    pub rate_limit_backoff_ms: u64,

    /// Fixed delay before retrying any other failure
    pub retry_delay_ms: u64,

    /// Throttle between successive items, applied regardless of outcome
    pub item_delay_ms: u64,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Required caption prefix; `{subject}` is replaced with the subject name
    pub prefix_template: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff_ms: 2000,
            retry_delay_ms: 1000,
            item_delay_ms: 1000,
            timeout_ms: 60_000,
            temperature: 0.3,
            max_tokens: 500,
            prefix_template: "An image of {subject} character".to_string(),
        }
    }
}

/// Resize settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Edge length of the square output images
    pub size: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self { size: 512 }
    }
}

/// Training archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Required width and height of every training image
    pub target_dimension: u32,

    /// Lower bound of the recommended dataset size
    pub min_recommended: usize,

    /// Upper bound of the recommended dataset size
    pub max_recommended: usize,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            target_dimension: 1024,
            min_recommended: 12,
            max_recommended: 18,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Hosted provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Replicate (hosted vision model) configuration
    pub replicate: Option<ReplicateConfig>,

    /// OpenAI (vision chat) configuration
    pub openai: Option<OpenAiConfig>,

    /// Mistral (refinement chat) configuration
    pub mistral: Option<MistralConfig>,
}

/// Replicate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    /// API token (supports ${ENV_VAR} syntax)
    pub api_token: String,

    /// Model version hash to run
    pub version: String,

    /// API base URL
    pub endpoint: String,

    /// Interval between status polls for predictions still running
    pub poll_interval_ms: u64,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: "${REPLICATE_API_TOKEN}".to_string(),
            version: "86674ddd559dbdde6ed40e0bdfc0720c84d82971e288149fcf2c35c538272617"
                .to_string(),
            endpoint: "https://api.replicate.com/v1".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Chat Completions base URL
    pub endpoint: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Mistral configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// API base URL
    pub endpoint: String,
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            api_key: "${MISTRAL_API_KEY}".to_string(),
            model: "mistral-large-latest".to_string(),
            endpoint: "https://api.mistral.ai/v1".to_string(),
        }
    }
}
