//! Captioning client: normalize an image to JPEG and ask a provider for a caption.
//!
//! There is no retry at this layer. Any failure is returned as
//! [`PipelineError::Caption`] and the batch skips the image.

use super::provider::{CaptionProvider, CaptionRequest, ImageInput};
use crate::config::CaptionConfig;
use crate::error::PipelineError;
use crate::pipeline::encode;
use std::path::Path;
use std::time::Duration;

/// Options for caption requests.
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Budget for one provider call, polling included
    pub timeout: Duration,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            temperature: 0.3,
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&CaptionConfig> for CaptionOptions {
    fn from(config: &CaptionConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Captioning client over any [`CaptionProvider`].
pub struct Captioner {
    provider: Box<dyn CaptionProvider>,
    options: CaptionOptions,
}

impl Captioner {
    pub fn new(provider: Box<dyn CaptionProvider>, options: CaptionOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Caption raw image bytes of any supported format.
    ///
    /// `path` only labels errors and logs.
    pub async fn caption(
        &self,
        image_bytes: Vec<u8>,
        path: &Path,
        prompt: &str,
    ) -> Result<String, PipelineError> {
        let caption_err = |message: String| PipelineError::Caption {
            path: path.to_path_buf(),
            message,
        };

        let jpeg = encode::to_jpeg_blocking(image_bytes, path)
            .await
            .map_err(|e| caption_err(e.to_string()))?;

        let request = CaptionRequest {
            image: ImageInput::jpeg(&jpeg),
            prompt: prompt.to_string(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let budget = self.options.timeout.min(self.provider.timeout());
        match tokio::time::timeout(budget, self.provider.caption(&request)).await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    "Captioned {:?} via {} ({} in {}ms)",
                    path,
                    self.provider.name(),
                    response.model,
                    response.latency_ms
                );
                Ok(response.text)
            }
            Ok(Err(e)) => Err(caption_err(e.to_string())),
            Err(_) => Err(caption_err(format!("Timeout after {}ms", budget.as_millis()))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::provider::LlmResponse;
    use crate::pipeline::encode::tests::image_bytes;
    use async_trait::async_trait;
    use image::ImageFormat;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Caption provider whose result depends on the call index.
    pub(crate) struct MockCaption {
        response_fn: Box<dyn Fn(u32) -> Result<String, PipelineError> + Send + Sync>,
        call_count: Arc<AtomicU32>,
        last_request: Arc<Mutex<Option<CaptionRequest>>>,
        delay: Option<Duration>,
        timeout: Duration,
    }

    impl MockCaption {
        pub(crate) fn new(
            response_fn: impl Fn(u32) -> Result<String, PipelineError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                response_fn: Box::new(response_fn),
                call_count: Arc::new(AtomicU32::new(0)),
                last_request: Arc::new(Mutex::new(None)),
                delay: None,
                timeout: Duration::from_secs(60),
            }
        }

        pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        pub(crate) fn success(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn call_count_handle(&self) -> Arc<AtomicU32> {
            self.call_count.clone()
        }
    }

    #[async_trait]
    impl CaptionProvider for MockCaption {
        fn name(&self) -> &str {
            "mock"
        }

        async fn caption(&self, request: &CaptionRequest) -> Result<LlmResponse, PipelineError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.response_fn)(idx).map(|text| LlmResponse {
                text,
                model: "mock-vision".to_string(),
                latency_ms: 1,
            })
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    #[tokio::test]
    async fn test_caption_sends_jpeg_and_prompt() {
        let provider = MockCaption::success("A small grey square.");
        let last_request = provider.last_request.clone();
        let captioner = Captioner::new(Box::new(provider), CaptionOptions::default());

        let png = image_bytes(8, 8, ImageFormat::Png);
        let text = captioner
            .caption(png, Path::new("square.png"), "Describe:")
            .await
            .unwrap();

        assert_eq!(text, "A small grey square.");
        let request = last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.prompt, "Describe:");
        assert_eq!(request.image.media_type, "image/jpeg");
        // base64 of the JPEG SOI marker FF D8 FF
        assert!(request.image.data.starts_with("/9j/"));
    }

    #[tokio::test]
    async fn test_provider_error_becomes_caption_error() {
        let provider = MockCaption::new(|_| {
            Err(PipelineError::Llm {
                message: "quota exceeded".to_string(),
                status_code: Some(402),
            })
        });
        let calls = provider.call_count_handle();
        let captioner = Captioner::new(Box::new(provider), CaptionOptions::default());

        let png = image_bytes(4, 4, ImageFormat::Png);
        let err = captioner
            .caption(png, Path::new("a.png"), "Describe:")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Caption { ref message, .. } if message.contains("quota")));
        assert!(!err.is_fatal());
        // No retry at this layer
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_image_never_reaches_provider() {
        let provider = MockCaption::success("unused");
        let calls = provider.call_count_handle();
        let captioner = Captioner::new(Box::new(provider), CaptionOptions::default());

        let err = captioner
            .caption(b"garbage".to_vec(), Path::new("broken.jpg"), "Describe:")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Caption { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_caption_timeout() {
        let provider = MockCaption::success("too slow").with_delay(Duration::from_secs(5));
        let options = CaptionOptions {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let captioner = Captioner::new(Box::new(provider), options);

        let png = image_bytes(4, 4, ImageFormat::Png);
        let err = captioner
            .caption(png, Path::new("slow.png"), "Describe:")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timeout"), "got: {err}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_caps_caption_budget() {
        let provider = MockCaption::success("too slow")
            .with_delay(Duration::from_secs(30))
            .with_timeout(Duration::from_secs(2));
        let captioner = Captioner::new(Box::new(provider), CaptionOptions::default());

        let start = tokio::time::Instant::now();
        let png = image_bytes(4, 4, ImageFormat::Png);
        let err = captioner
            .caption(png, Path::new("slow.png"), "Describe:")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Timeout after 2000ms"), "got: {err}");
        assert!(start.elapsed() < Duration::from_secs(30));
    }
}
