//! Mistral chat provider (OpenAI-compatible API).
//!
//! Mistral uses the same Chat Completions format as OpenAI,
//! so this delegates to `OpenAiProvider` under its own name.

use super::openai::OpenAiProvider;
use super::provider::{ChatProvider, ChatRequest, LlmResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;

/// Mistral provider wrapping an OpenAI-compatible endpoint.
pub struct MistralProvider {
    inner: OpenAiProvider,
}

impl MistralProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            inner: OpenAiProvider::labeled("mistral", endpoint, api_key, model),
        }
    }
}

#[async_trait]
impl ChatProvider for MistralProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, PipelineError> {
        self.inner.complete(request).await
    }

    fn timeout(&self) -> Duration {
        ChatProvider::timeout(&self.inner)
    }
}
