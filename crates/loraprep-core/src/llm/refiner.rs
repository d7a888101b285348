//! Caption refinement: rewrite a caption so it opens with a subject prefix.
//!
//! Refinement never fails a batch. When the provider keeps failing, the
//! original caption is returned unchanged.

use super::provider::{ChatProvider, ChatRequest};
use super::retry::RetryPolicy;
use crate::config::RefineConfig;
use crate::error::PipelineError;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are an expert writer of image captions. \
    Always begin with the exact prefix requested, then rephrase the rest \
    while keeping its meaning and every detail.";

/// Who the caption should be about, and how the required prefix is built.
#[derive(Debug, Clone)]
pub struct StyleDirective {
    pub subject: String,
    /// Prefix pattern with a `{subject}` placeholder
    pub prefix_template: String,
}

impl StyleDirective {
    pub fn new(subject: impl Into<String>, prefix_template: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            prefix_template: prefix_template.into(),
        }
    }

    /// The prefix the rewritten caption must start with.
    pub fn prefix(&self) -> String {
        self.prefix_template.replace("{subject}", &self.subject)
    }

    fn user_message(&self, caption: &str) -> String {
        let prefix = self.prefix();
        format!(
            "Rewrite this image caption so that it begins EXACTLY with \"{prefix}\".\n\
             Replace any reference to the main subject with \"{subject}\".\n\
             Keep all important details and the descriptive style.\n\n\
             Original caption: {caption}\n\n\
             Reply with the new caption only, without any other text.",
            subject = self.subject,
        )
    }
}

/// Result of one `refine` call.
#[derive(Debug, Clone)]
pub struct RefineOutcome {
    /// Refined caption, or the original one when every attempt failed
    pub text: String,
    /// Whether `text` came from the provider
    pub refined: bool,
    /// Provider calls made
    pub attempts: u32,
    /// Total time slept between attempts
    pub backoff: Duration,
}

impl RefineOutcome {
    /// Whether the text starts with the directive's prefix.
    ///
    /// Informational only: provider output is accepted whether or not it
    /// complies.
    pub fn has_prefix(&self, directive: &StyleDirective) -> bool {
        self.text.starts_with(&directive.prefix())
    }
}

/// Options for refinement requests.
#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&RefineConfig> for RefineOptions {
    fn from(config: &RefineConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Caption refinement client with bounded retry.
pub struct Refiner {
    provider: Box<dyn ChatProvider>,
    policy: RetryPolicy,
    options: RefineOptions,
}

impl Refiner {
    pub fn new(provider: Box<dyn ChatProvider>, policy: RetryPolicy, options: RefineOptions) -> Self {
        Self {
            provider,
            policy,
            options,
        }
    }

    /// Build a refiner whose policy and options come from config.
    pub fn from_config(provider: Box<dyn ChatProvider>, config: &RefineConfig) -> Self {
        Self::new(provider, RetryPolicy::from(config), RefineOptions::from(config))
    }

    /// Rewrite `caption` per `directive`, falling back to `caption` on failure.
    pub async fn refine(&self, caption: &str, directive: &StyleDirective) -> RefineOutcome {
        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: directive.user_message(caption),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let budget = self.options.timeout.min(self.provider.timeout());
        let mut backoff = Duration::ZERO;
        let mut attempts = 0;
        let mut last_error = None;

        for attempt in 0..self.policy.max_attempts {
            attempts += 1;
            let result = match tokio::time::timeout(budget, self.provider.complete(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(PipelineError::Timeout {
                    stage: "refine".to_string(),
                    timeout_ms: budget.as_millis() as u64,
                }),
            };

            match result {
                Ok(response) => {
                    return RefineOutcome {
                        text: response.text,
                        refined: true,
                        attempts,
                        backoff,
                    };
                }
                Err(e) => {
                    if let Some(delay) = self.policy.delay_after(attempt, &e) {
                        if e.is_rate_limited() {
                            tracing::warn!("Rate limited. Waiting {:?} before retry...", delay);
                        } else {
                            tracing::debug!(
                                "Refinement attempt {}/{} failed: {e}",
                                attempt + 1,
                                self.policy.max_attempts
                            );
                        }
                        tokio::time::sleep(delay).await;
                        backoff += delay;
                    }
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            tracing::error!(
                "Refinement via {} gave up after {attempts} attempt(s), keeping original caption: {e}",
                self.provider.name()
            );
        }
        RefineOutcome {
            text: caption.to_string(),
            refined: false,
            attempts,
            backoff,
        }
    }
}
