//! OpenAI-compatible Chat Completions client.
//!
//! Captions by sending the image as a data URL content part; refines with a
//! plain system + user text exchange. Mistral speaks the same wire format.

use super::provider::{
    CaptionProvider, CaptionRequest, ChatProvider, ChatRequest, LlmResponse,
};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat Completions provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    label: &'static str,
    request_timeout: Duration,
}

impl OpenAiProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self::labeled("openai", base_url, api_key, model)
    }

    /// Same client under another provider name (used by Mistral).
    pub(crate) fn labeled(label: &'static str, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            label,
            request_timeout: Duration::from_secs(60),
        }
    }

    async fn send(&self, body: &ChatBody) -> Result<LlmResponse, PipelineError> {
        let start = Instant::now();
        let provider = self.label;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Llm {
                message: format!("{provider} request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("{provider} HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse {provider} response: {e}"),
            status_code: None,
        })?;

        let model = chat_resp.model.clone().unwrap_or_else(|| self.model.clone());
        let text = first_choice_text(chat_resp, provider)?;

        Ok(LlmResponse {
            text,
            model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn first_choice_text(resp: ChatResponse, provider: &str) -> Result<String, PipelineError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| PipelineError::Llm {
            message: format!("{provider} returned no content"),
            status_code: None,
        })
}

#[async_trait]
impl CaptionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.label
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<LlmResponse, PipelineError> {
        let body = ChatBody {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: request.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                ]),
            }],
        };
        self.send(&body).await
    }

    fn timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.label
    }

    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse, PipelineError> {
        let body = ChatBody {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(request.user.clone()),
                },
            ],
        };
        self.send(&body).await
    }

    fn timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ImageInput;

    #[test]
    fn test_endpoint_joins_base_url() {
        let p = OpenAiProvider::new("https://api.openai.com/v1/", "k", "gpt-4o");
        assert_eq!(p.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_vision_body_shape() {
        let body = ChatBody {
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            temperature: 0.3,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: "Describe".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: ImageInput::jpeg(&[1]).data_url(),
                        },
                    },
                ]),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert!(parts[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_text_body_is_plain_string() {
        let msg = ChatMessage {
            role: "system",
            content: MessageContent::Text("be terse".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "be terse");
    }

    #[test]
    fn test_first_choice_text_trims() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"model":"m","choices":[{"message":{"content":"  A cat.\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(resp, "openai").unwrap(), "A cat.");
    }

    #[test]
    fn test_first_choice_text_empty_choices() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let err = first_choice_text(resp, "mistral").unwrap_err();
        assert!(err.to_string().contains("mistral returned no content"));
    }
}
