//! Provider traits and request/response types.
//!
//! Two kinds of hosted models are used: captioning providers that turn an
//! image plus a prompt into text, and chat providers that rewrite text. The
//! factory builds either from config, resolving API keys from the environment.

use crate::config::LlmConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded JPEG ready to send to a provider.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type, always "image/jpeg" after normalization
    pub media_type: String,
}

impl ImageInput {
    /// Wrap already-normalized JPEG bytes.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: "image/jpeg".to_string(),
        }
    }

    /// Return a data URL, the form both Replicate and OpenAI accept.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to caption one image.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: ImageInput,
    pub prompt: String,
    /// Maximum tokens to generate (ignored by providers without the knob)
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text-only chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The response from a provider call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// A hosted model that captions images.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CaptionProvider>` for dynamic dispatch).
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name for logging (e.g., "replicate", "openai").
    fn name(&self) -> &str;

    /// Generate a caption for the given request.
    async fn caption(&self, request: &CaptionRequest) -> Result<LlmResponse, PipelineError>;

    /// Longest a single call may take; the caller's budget is capped to it.
    fn timeout(&self) -> Duration;
}

/// A hosted chat model used to rewrite captions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run a single chat completion.
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, PipelineError>;

    /// Longest a single call may take; the caller's budget is capped to it.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn missing_key(provider: &str, var: &str) -> PipelineError {
    PipelineError::Llm {
        message: format!("{provider} API key not set. Set {var} in the environment or .env file."),
        status_code: None,
    }
}

/// Factory that creates providers from config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a captioning provider.
    ///
    /// # Arguments
    /// * `provider` - Provider identifier ("replicate" or "openai")
    /// * `config` - The full provider config section
    /// * `model_override` - Model version (Replicate) or name (OpenAI) replacing the config default
    pub fn captioner(
        provider: &str,
        config: &LlmConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn CaptionProvider>, PipelineError> {
        match provider {
            "replicate" => {
                let cfg = config.replicate.clone().unwrap_or_default();
                let token = resolve_env_var(&cfg.api_token)
                    .ok_or_else(|| missing_key("Replicate", "REPLICATE_API_TOKEN"))?;
                let version = model_override
                    .map(String::from)
                    .unwrap_or(cfg.version.clone());
                Ok(Box::new(super::replicate::ReplicateProvider::new(
                    &cfg.endpoint,
                    &token,
                    &version,
                    Duration::from_millis(cfg.poll_interval_ms),
                )))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key)
                    .ok_or_else(|| missing_key("OpenAI", "OPENAI_API_KEY"))?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!("Unknown caption provider: {other}"),
                status_code: None,
            }),
        }
    }

    /// Create the chat provider used for caption refinement (Mistral).
    pub fn refiner(config: &LlmConfig) -> Result<Box<dyn ChatProvider>, PipelineError> {
        let cfg = config.mistral.clone().unwrap_or_default();
        let api_key = resolve_env_var(&cfg.api_key)
            .ok_or_else(|| missing_key("Mistral", "MISTRAL_API_KEY"))?;
        Ok(Box::new(super::mistral::MistralProvider::new(
            &cfg.endpoint,
            &api_key,
            &cfg.model,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OpenAiConfig, ReplicateConfig};

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::jpeg(&[0xFF, 0xD8, 0xFF]);
        assert_eq!(input.media_type, "image/jpeg");
        assert_eq!(input.data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_unknown_provider() {
        let err = ProviderFactory::captioner("dall-e", &LlmConfig::default(), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown caption provider"));
    }

    #[test]
    fn test_factory_with_literal_keys() {
        let config = LlmConfig {
            replicate: Some(ReplicateConfig {
                api_token: "r8_literal".to_string(),
                ..Default::default()
            }),
            openai: Some(OpenAiConfig {
                api_key: "sk-literal".to_string(),
                ..Default::default()
            }),
            mistral: None,
        };
        let replicate = ProviderFactory::captioner("replicate", &config, None).unwrap();
        assert_eq!(replicate.name(), "replicate");
        let openai = ProviderFactory::captioner("openai", &config, Some("gpt-4o-mini")).unwrap();
        assert_eq!(openai.name(), "openai");
    }

    #[test]
    fn test_factory_missing_key() {
        let config = LlmConfig {
            openai: Some(OpenAiConfig {
                api_key: "${DEFINITELY_NOT_SET_XYZ_456}".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = ProviderFactory::captioner("openai", &config, None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
