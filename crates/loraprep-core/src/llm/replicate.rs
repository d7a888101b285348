//! Replicate provider for hosted vision captioning models.
//!
//! Creates a prediction with `Prefer: wait` so short runs complete in the
//! initial request. Predictions still running when the server stops waiting
//! are polled through their `urls.get` link until they settle.

use super::provider::{CaptionProvider, CaptionRequest, LlmResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Replicate predictions API provider.
pub struct ReplicateProvider {
    endpoint: String,
    api_token: String,
    version: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl ReplicateProvider {
    pub fn new(endpoint: &str, api_token: &str, version: &str, poll_interval: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            version: version.to_string(),
            poll_interval,
            client: reqwest::Client::new(),
        }
    }

    async fn read_prediction(&self, resp: reqwest::Response) -> Result<Prediction, PipelineError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("Replicate HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }
        resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse Replicate response: {e}"),
            status_code: None,
        })
    }

    async fn poll(&self, url: &str) -> Result<Prediction, PipelineError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| PipelineError::Llm {
                message: format!("Replicate poll failed: {e}"),
                status_code: None,
            })?;
        self.read_prediction(resp).await
    }
}

// --- Request types ---

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    image: String,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    output: Option<PredictionOutput>,
    error: Option<serde_json::Value>,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// Language models on Replicate stream tokens, so output is often a list of fragments.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    Text(String),
    Fragments(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_running(&self) -> bool {
        matches!(
            self.status,
            PredictionStatus::Starting | PredictionStatus::Processing
        )
    }

    /// Text of a settled prediction, or the reason it produced none.
    fn into_text(self) -> Result<String, PipelineError> {
        match self.status {
            PredictionStatus::Succeeded => {
                let text = match self.output {
                    Some(PredictionOutput::Text(text)) => text,
                    Some(PredictionOutput::Fragments(parts)) => parts.concat(),
                    None => String::new(),
                };
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(PipelineError::Llm {
                        message: format!("Replicate prediction {} returned no output", self.id),
                        status_code: None,
                    });
                }
                Ok(text)
            }
            status => {
                let reason = match self.error {
                    Some(serde_json::Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => "no error detail".to_string(),
                };
                Err(PipelineError::Llm {
                    message: format!(
                        "Replicate prediction {} ended as {status:?}: {reason}",
                        self.id
                    ),
                    status_code: None,
                })
            }
        }
    }
}

#[async_trait]
impl CaptionProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<LlmResponse, PipelineError> {
        let start = Instant::now();

        let body = PredictionRequest {
            version: &self.version,
            input: PredictionInput {
                prompt: &request.prompt,
                image: request.image.data_url(),
            },
        };

        let resp = self
            .client
            .post(format!("{}/predictions", self.endpoint))
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .timeout(Duration::from_secs(90))
            .send()
            .await
            .map_err(|e| PipelineError::Llm {
                message: format!("Replicate request failed: {e}"),
                status_code: None,
            })?;

        let mut prediction = self.read_prediction(resp).await?;

        // The caller's timeout bounds this loop
        while prediction.is_running() {
            let url = prediction
                .urls
                .as_ref()
                .and_then(|u| u.get.clone())
                .ok_or_else(|| PipelineError::Llm {
                    message: format!("Replicate prediction {} has no status URL", prediction.id),
                    status_code: None,
                })?;
            tracing::trace!("Prediction {} still {:?}", prediction.id, prediction.status);
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.poll(&url).await?;
        }

        let text = prediction.into_text()?;
        Ok(LlmResponse {
            text,
            model: self.version.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Covers the synchronous wait plus polling.
    fn timeout(&self) -> Duration {
        Duration::from_secs(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Prediction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_succeeded_string_output() {
        let p = parse(r#"{"id":"p1","status":"succeeded","output":" A red fox. ","error":null}"#);
        assert!(!p.is_running());
        assert_eq!(p.into_text().unwrap(), "A red fox.");
    }

    #[test]
    fn test_succeeded_fragment_output() {
        let p = parse(r#"{"id":"p2","status":"succeeded","output":["A red ","fox","."]}"#);
        assert_eq!(p.into_text().unwrap(), "A red fox.");
    }

    #[test]
    fn test_running_prediction_has_poll_url() {
        let p = parse(
            r#"{"id":"p3","status":"processing","output":null,
                "urls":{"get":"https://api.replicate.com/v1/predictions/p3"}}"#,
        );
        assert!(p.is_running());
        assert_eq!(
            p.urls.unwrap().get.unwrap(),
            "https://api.replicate.com/v1/predictions/p3"
        );
    }

    #[test]
    fn test_failed_prediction_reports_error() {
        let p = parse(r#"{"id":"p4","status":"failed","error":"CUDA out of memory"}"#);
        let err = p.into_text().unwrap_err();
        assert!(err.to_string().contains("CUDA out of memory"));
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_unknown_status_is_not_running() {
        let p = parse(r#"{"id":"p5","status":"aborted"}"#);
        assert!(!p.is_running());
        assert!(p.into_text().is_err());
    }

    #[test]
    fn test_empty_output_is_error() {
        let p = parse(r#"{"id":"p6","status":"succeeded","output":"   "}"#);
        assert!(p.into_text().is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = PredictionRequest {
            version: "abc",
            input: PredictionInput {
                prompt: "A descriptive caption for this image:",
                image: "data:image/jpeg;base64,AA==".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["version"], "abc");
        assert_eq!(json["input"]["image"], "data:image/jpeg;base64,AA==");
    }
}
