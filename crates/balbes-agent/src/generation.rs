// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation with model fallback, sanitizing and one garbage retry.
//!
//! Models are tried in order. Retryable failures (rate limits, timeouts,
//! transient server errors) move on to the next model after a linear
//! backoff; any other failure ends the chain.

use std::sync::Arc;
use std::time::Duration;

use balbes_config::model::OpenAiConfig;
use balbes_core::{
    BalbesError, CompletionRequest, ImageRequest, PromptMessage, ProviderAdapter, SpeechRequest,
};
use tracing::{debug, info, warn};

use crate::prompt::{ImageInput, PLAIN_LANGUAGE_NOTE, build_messages};
use crate::sanitize::Sanitizer;

/// Result of a generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Clean text ready to send.
    Text(String),
    /// The model answered with nothing usable after sanitizing.
    Empty,
    /// Both the answer and the retry looked broken.
    Garbage,
    /// Every model failed, or a non-retryable error stopped the chain.
    Failed(String),
}

impl GenerationOutcome {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

pub struct GenerationClient {
    provider: Arc<dyn ProviderAdapter + Send + Sync>,
    sanitizer: Sanitizer,
    models: Vec<String>,
    vision_models: Vec<String>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    backoff_step: Duration,
    tts_model: String,
    tts_voice: String,
    image_model: String,
    image_size: String,
}

impl GenerationClient {
    pub fn new(
        provider: Arc<dyn ProviderAdapter + Send + Sync>,
        config: &OpenAiConfig,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            provider,
            sanitizer,
            models: model_chain(&config.model, &config.fallback_models),
            vision_models: model_chain(&config.vision_model, &config.fallback_models),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            backoff_step: Duration::from_millis(config.retry_backoff_ms),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
        }
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Text reply. An empty `user_text` produces an unprompted remark.
    pub async fn reply(
        &self,
        system_prompt: &str,
        context: &str,
        user_text: &str,
    ) -> GenerationOutcome {
        self.generate(&self.models, system_prompt, context, user_text, None)
            .await
    }

    /// Reply to an image, with its caption as the user turn.
    pub async fn vision_reply(
        &self,
        system_prompt: &str,
        context: &str,
        image: Vec<u8>,
        caption: &str,
    ) -> GenerationOutcome {
        let input = ImageInput {
            mime_type: sniff_image_mime(&image).to_string(),
            data: image,
        };
        self.generate(&self.vision_models, system_prompt, context, caption, Some(input))
            .await
    }

    /// Synthesizes `text` with the configured voice.
    pub async fn speak(&self, text: &str) -> Option<Vec<u8>> {
        let request = SpeechRequest {
            model: self.tts_model.clone(),
            voice: self.tts_voice.clone(),
            input: text.to_string(),
        };
        match tokio::time::timeout(self.timeout, self.provider.speech(request)).await {
            Ok(Ok(audio)) if !audio.is_empty() => Some(audio),
            Ok(Ok(_)) => {
                warn!("speech synthesis returned no audio");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "speech synthesis failed");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "speech synthesis timed out");
                None
            }
        }
    }

    /// Generates an image for `prompt`.
    pub async fn draw(&self, prompt: &str) -> Option<Vec<u8>> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            size: self.image_size.clone(),
        };
        match tokio::time::timeout(self.timeout, self.provider.image(request)).await {
            Ok(Ok(image)) if !image.is_empty() => Some(image),
            Ok(Ok(_)) => {
                warn!("image generation returned no data");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "image generation failed");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "image generation timed out");
                None
            }
        }
    }

    async fn generate(
        &self,
        models: &[String],
        system_prompt: &str,
        context: &str,
        user_text: &str,
        image: Option<ImageInput>,
    ) -> GenerationOutcome {
        let messages = build_messages(system_prompt, context, user_text, image.clone());
        let first = match self.complete(models, messages).await {
            Ok(text) => self.sanitizer.sanitize(&text),
            Err(e) => return GenerationOutcome::Failed(e.to_string()),
        };
        if first.is_empty() {
            return GenerationOutcome::Empty;
        }
        if !self.sanitizer.is_garbage(&first) {
            return GenerationOutcome::Text(first);
        }

        info!("generated text looks garbled, retrying once");
        let amended = format!("{system_prompt}\n\n{PLAIN_LANGUAGE_NOTE}");
        let messages = build_messages(&amended, context, user_text, image);
        let second = match self.complete(models, messages).await {
            Ok(text) => self.sanitizer.sanitize(&text),
            Err(e) => return GenerationOutcome::Failed(e.to_string()),
        };
        if second.is_empty() {
            GenerationOutcome::Empty
        } else if self.sanitizer.is_garbage(&second) {
            GenerationOutcome::Garbage
        } else {
            GenerationOutcome::Text(second)
        }
    }

    /// Runs the fallback chain and returns the raw text of the first success.
    async fn complete(
        &self,
        models: &[String],
        messages: Vec<PromptMessage>,
    ) -> Result<String, BalbesError> {
        let mut last_error = None;

        for (attempt, model) in models.iter().enumerate() {
            if attempt > 0 {
                let factor = u32::try_from(attempt).unwrap_or(u32::MAX);
                tokio::time::sleep(self.backoff_step.saturating_mul(factor)).await;
            }

            let request = CompletionRequest {
                model: model.clone(),
                messages: messages.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let error = match tokio::time::timeout(self.timeout, self.provider.complete(request))
                .await
            {
                Ok(Ok(response)) => {
                    debug!(model = %response.model, attempt, "completion succeeded");
                    return Ok(response.text);
                }
                Ok(Err(e)) => e,
                Err(_) => BalbesError::Timeout {
                    duration: self.timeout,
                },
            };

            if !error.is_retryable() {
                warn!(model = %model, attempt, error = %error, "completion failed, not retrying");
                return Err(error);
            }
            warn!(model = %model, attempt, error = %error, "completion failed, trying next model");
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| BalbesError::Internal("no models configured".into())))
    }
}

/// Primary model followed by the fallbacks, without duplicates.
pub fn model_chain(primary: &str, fallbacks: &[String]) -> Vec<String> {
    let mut chain: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
    for model in std::iter::once(primary).chain(fallbacks.iter().map(String::as_str)) {
        let model = model.trim();
        if !model.is_empty() && !chain.iter().any(|m| m == model) {
            chain.push(model.to_string());
        }
    }
    chain
}

fn sniff_image_mime(data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balbes_config::model::SanitizerConfig;
    use balbes_core::{ContentPart, ProviderErrorKind};
    use balbes_test_utils::MockProvider;

    fn config() -> OpenAiConfig {
        OpenAiConfig {
            model: "primary".into(),
            fallback_models: vec!["second".into(), "primary".into(), "third".into()],
            vision_model: "eyes".into(),
            timeout_secs: 5,
            retry_backoff_ms: 10,
            ..OpenAiConfig::default()
        }
    }

    fn client(provider: Arc<MockProvider>) -> GenerationClient {
        GenerationClient::new(
            provider,
            &config(),
            Sanitizer::new("balbes", &SanitizerConfig::default()),
        )
    }

    #[test]
    fn chain_is_deduplicated_in_order() {
        assert_eq!(
            model_chain("a", &["b".into(), "a".into(), " ".into(), "c".into(), "b".into()]),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_image_mime(&[0x89, b'P', b'N', b'G', 0]), "image/png");
        assert_eq!(sniff_image_mime(&[0xff, 0xd8, 0xff]), "image/jpeg");
    }

    #[tokio::test]
    async fn returns_sanitized_text() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "assistant: «ну привет»".into(),
        ]));
        let outcome = client(provider.clone()).reply("sys", "", "прив").await;
        assert_eq!(outcome, GenerationOutcome::Text("ну привет".into()));
        assert_eq!(provider.requests().await[0].model, "primary");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_falls_back_to_next_model() {
        let provider = Arc::new(MockProvider::new());
        provider.push_error(ProviderErrorKind::Transient).await;
        provider.push_error(ProviderErrorKind::RateLimited).await;
        provider.push_text("третья модель ответила").await;

        let outcome = client(provider.clone()).reply("sys", "ctx", "q").await;
        assert_eq!(outcome.into_text().as_deref(), Some("третья модель ответила"));

        let models: Vec<String> = provider.requests().await.into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["primary", "second", "third"]);
    }

    #[tokio::test]
    async fn non_retryable_failure_stops_chain() {
        let provider = Arc::new(MockProvider::new());
        provider.push_error(ProviderErrorKind::Auth).await;
        provider.push_text("не должно дойти").await;

        let outcome = client(provider.clone()).reply("sys", "", "q").await;
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
        assert_eq!(provider.request_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_retryable() {
        let provider = Arc::new(MockProvider::new());
        provider
            .push_delayed(Duration::from_secs(60), "слишком поздно")
            .await;
        provider.push_text("успел").await;

        let outcome = client(provider.clone()).reply("sys", "", "q").await;
        assert_eq!(outcome, GenerationOutcome::Text("успел".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_chain_is_failed() {
        let provider = Arc::new(MockProvider::new());
        for _ in 0..3 {
            provider.push_error(ProviderErrorKind::Transient).await;
        }
        let outcome = client(provider.clone()).reply("sys", "", "q").await;
        assert!(matches!(outcome, GenerationOutcome::Failed(ref m) if m.contains("transient")));
    }

    #[tokio::test]
    async fn empty_answer_is_empty() {
        let provider = Arc::new(MockProvider::with_responses(vec!["  <|end|> ".into()]));
        let outcome = client(provider).reply("sys", "", "q").await;
        assert_eq!(outcome, GenerationOutcome::Empty);
    }

    #[tokio::test]
    async fn garbage_is_retried_once_with_amended_prompt() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "привetik".into(),
            "привет нормальный".into(),
        ]));
        let outcome = client(provider.clone()).reply("sys", "", "q").await;
        assert_eq!(outcome, GenerationOutcome::Text("привет нормальный".into()));

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 2);
        let ContentPart::Text(system) = &requests[1].messages[0].content[0] else {
            panic!("system prompt should be text");
        };
        assert!(system.ends_with(PLAIN_LANGUAGE_NOTE));
    }

    #[tokio::test]
    async fn garbage_twice_is_garbage() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "привetik".into(),
            "as an AI model".into(),
        ]));
        let outcome = client(provider).reply("sys", "", "q").await;
        assert_eq!(outcome, GenerationOutcome::Garbage);
    }

    #[tokio::test]
    async fn vision_uses_vision_model_and_image_part() {
        let provider = Arc::new(MockProvider::with_responses(vec!["котик".into()]));
        let outcome = client(provider.clone())
            .vision_reply("sys", "", vec![0xff, 0xd8, 0xff, 0xe0], "глянь")
            .await;
        assert_eq!(outcome.into_text().as_deref(), Some("котик"));

        let request = &provider.requests().await[0];
        assert_eq!(request.model, "eyes");
        let last = request.messages.last().unwrap();
        assert!(matches!(
            &last.content[1],
            ContentPart::Image { mime_type, .. } if mime_type == "image/jpeg"
        ));
    }

    #[tokio::test]
    async fn speak_and_draw_degrade_to_none() {
        let provider = Arc::new(MockProvider::new());
        let gen_client = client(provider.clone());
        assert!(gen_client.speak("привет").await.is_some());
        assert!(gen_client.draw("кот").await.is_some());

        provider.set_media_failure(true).await;
        assert!(gen_client.speak("привет").await.is_none());
        assert!(gen_client.draw("кот").await.is_none());
    }
}
