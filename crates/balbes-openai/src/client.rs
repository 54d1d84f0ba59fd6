// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat, speech and image endpoints.
//!
//! Every call is a single attempt. Failures are classified into
//! [`ProviderErrorKind`] so the caller can decide whether another model
//! should be tried.

use std::time::Duration;

use balbes_core::{BalbesError, ProviderErrorKind};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ImageGenerationBody,
    ImageGenerationResponse, SpeechBody,
};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound for a single HTTP exchange. Callers apply tighter limits.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client authenticating with the given bearer key.
    pub fn new(api_key: &str) -> Result<Self, BalbesError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                BalbesError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| BalbesError::Provider {
                kind: ProviderErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the API root (proxies, compatible gateways, wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /chat/completions`.
    pub async fn chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, BalbesError> {
        let response = self.post("chat/completions", request).await?;
        read_json(response).await
    }

    /// `POST /audio/speech`, returning the encoded audio.
    pub async fn speech(&self, body: &SpeechBody) -> Result<Vec<u8>, BalbesError> {
        let response = self.post("audio/speech", body).await?;
        read_bytes(response).await
    }

    /// `POST /images/generations`.
    pub async fn generate_image(
        &self,
        body: &ImageGenerationBody,
    ) -> Result<ImageGenerationResponse, BalbesError> {
        let response = self.post("images/generations", body).await?;
        read_json(response).await
    }

    /// Downloads bytes from an absolute URL (image results returned by link).
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, BalbesError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        read_bytes(response).await
    }

    async fn post<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response, BalbesError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        debug!(status = %response.status(), endpoint, "response received");
        check_status(response).await
    }
}

/// Passes successful responses through and converts the rest into classified errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BalbesError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let kind = ProviderErrorKind::from_status(status.as_u16());
    warn!(status = %status, kind = %kind, "provider returned an error status");
    Err(BalbesError::provider(kind, error_message(status, &body)))
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => match api_err.error.type_ {
            Some(type_) => format!("OpenAI API error ({type_}): {}", api_err.error.message),
            None => format!("OpenAI API error: {}", api_err.error.message),
        },
        Err(_) => format!("API returned {status}: {body}"),
    }
}

/// Classifies a failure that happened before a status line was received.
pub fn transport_error(e: reqwest::Error) -> BalbesError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else if e.is_connect() || e.is_request() {
        ProviderErrorKind::Transient
    } else {
        ProviderErrorKind::Other
    };
    BalbesError::Provider {
        kind,
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BalbesError> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| BalbesError::Provider {
        kind: ProviderErrorKind::Other,
        message: format!("failed to parse API response: {e}"),
        source: Some(Box::new(e)),
    })
}

async fn read_bytes(response: reqwest::Response) -> Result<Vec<u8>, BalbesError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiContent, ApiMessage};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: ApiContent::Text("привет".into()),
            }],
            max_tokens: 64,
            temperature: 0.9,
        }
    }

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("sk-test").unwrap().with_base_url(server.uri())
    }

    #[tokio::test]
    async fn chat_sends_bearer_and_parses_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-mini-2024",
                "choices": [{"message": {"role": "assistant", "content": "здарова"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.chat(&chat_request()).await.unwrap();
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini-2024"));
        assert_eq!(response.choices[0].message.content.as_deref(), Some("здарова"));
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "slow down", "type": "rate_limit_exceeded"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat(&chat_request()).await.unwrap_err();
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("rate_limited"), "got: {msg}");
        assert!(msg.contains("slow down"), "got: {msg}");
    }

    #[tokio::test]
    async fn bad_request_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat(&chat_request()).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        match client.chat(&chat_request()).await.unwrap_err() {
            BalbesError::Provider { kind, .. } => assert_eq!(kind, ProviderErrorKind::Transient),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_other() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.chat(&chat_request()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn speech_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x4f, 0x67, 0x67, 0x53]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let audio = client
            .speech(&SpeechBody {
                model: "tts-1".into(),
                voice: "onyx".into(),
                input: "ну привет".into(),
                response_format: "opus".into(),
            })
            .await
            .unwrap();
        assert_eq!(audio, b"OggS");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpenAiClient::new("k").unwrap().with_base_url("http://x/v1/");
        assert_eq!(client.base_url(), "http://x/v1");
    }
}
