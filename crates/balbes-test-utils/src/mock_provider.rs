// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a queue of scripted
//! replies, enabling fast tests of the fallback chain without network calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use balbes_core::{
    AdapterType, BalbesError, CompletionRequest, CompletionResponse, HealthStatus, ImageRequest,
    PluginAdapter, ProviderAdapter, ProviderErrorKind, SpeechRequest,
};

/// Audio returned by `speech()` unless media failures are switched on.
pub const MOCK_AUDIO: &[u8] = b"OggS-mock-audio";

/// Image returned by `image()` unless media failures are switched on.
pub const MOCK_IMAGE: &[u8] = b"\x89PNG-mock-image";

/// One scripted completion.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(ProviderErrorKind),
    /// Sleeps before answering, to trip the caller's timeout.
    Delayed(Duration, String),
}

/// A mock provider that pops scripted replies from a FIFO queue.
///
/// When the queue is empty, `"mock response"` is returned.
pub struct MockProvider {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    media_failure: Mutex<bool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            media_failure: Mutex::new(false),
        }
    }

    /// Mock provider pre-loaded with text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(responses.into_iter().map(MockReply::Text).collect()),
            ..Self::new()
        }
    }

    pub async fn push_text(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(MockReply::Text(text.into()));
    }

    pub async fn push_error(&self, kind: ProviderErrorKind) {
        self.replies.lock().await.push_back(MockReply::Error(kind));
    }

    pub async fn push_delayed(&self, delay: Duration, text: impl Into<String>) {
        self.replies
            .lock()
            .await
            .push_back(MockReply::Delayed(delay, text.into()));
    }

    /// Make `speech()` and `image()` fail.
    pub async fn set_media_failure(&self, fail: bool) {
        *self.media_failure.lock().await = fail;
    }

    /// Every completion request received, in order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    async fn media_result(&self, bytes: &[u8]) -> Result<Vec<u8>, BalbesError> {
        if *self.media_failure.lock().await {
            Err(BalbesError::provider(
                ProviderErrorKind::InvalidRequest,
                "mock media failure",
            ))
        } else {
            Ok(bytes.to_vec())
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BalbesError> {
        let model = request.model.clone();
        self.requests.lock().await.push(request);

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("mock response".to_string()));

        match reply {
            MockReply::Text(text) => Ok(CompletionResponse { text, model }),
            MockReply::Error(kind) => Err(BalbesError::provider(kind, format!("mock {kind}"))),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(CompletionResponse { text, model })
            }
        }
    }

    async fn speech(&self, _request: SpeechRequest) -> Result<Vec<u8>, BalbesError> {
        self.media_result(MOCK_AUDIO).await
    }

    async fn image(&self, _request: ImageRequest) -> Result<Vec<u8>, BalbesError> {
        self.media_result(MOCK_IMAGE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balbes_core::{PromptMessage, PromptRole};

    fn request(model: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            messages: vec![PromptMessage::text(PromptRole::User, "hi")],
            max_tokens: 100,
            temperature: 1.0,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let response = provider.complete(request("m")).await.unwrap();
        assert_eq!(response.text, "mock response");
        assert_eq!(response.model, "m");
    }

    #[tokio::test]
    async fn scripted_replies_in_order() {
        let provider = MockProvider::with_responses(vec!["first".into()]);
        provider.push_error(ProviderErrorKind::RateLimited).await;

        assert_eq!(provider.complete(request("a")).await.unwrap().text, "first");
        let err = provider.complete(request("b")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.request_count().await, 2);
        assert_eq!(provider.requests().await[1].model, "b");
    }

    #[tokio::test]
    async fn media_failure_toggle() {
        let provider = MockProvider::new();
        let speech = SpeechRequest {
            model: "tts".into(),
            voice: "alloy".into(),
            input: "hi".into(),
        };
        assert_eq!(provider.speech(speech.clone()).await.unwrap(), MOCK_AUDIO);
        provider.set_media_failure(true).await;
        assert!(provider.speech(speech).await.is_err());
    }
}
