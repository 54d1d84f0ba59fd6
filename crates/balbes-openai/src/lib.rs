// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for the Balbes chat agent.
//!
//! Implements [`ProviderAdapter`] over chat completions (text and vision),
//! text-to-speech and image generation.

pub mod client;
pub mod types;

use async_trait::async_trait;
use balbes_config::model::OpenAiConfig;
use balbes_core::{
    AdapterType, BalbesError, CompletionRequest, CompletionResponse, ContentPart, HealthStatus,
    ImageRequest, PluginAdapter, PromptMessage, ProviderAdapter, ProviderErrorKind, SpeechRequest,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ApiContent, ApiMessage, ApiPart, ChatCompletionRequest, ImageGenerationBody, ImageUrl,
    SpeechBody,
};

/// Longest text accepted by the speech endpoint.
pub const MAX_SPEECH_INPUT_CHARS: usize = 2000;

/// Audio container requested from the speech endpoint (OGG/Opus plays as a voice note).
const SPEECH_FORMAT: &str = "opus";

/// OpenAI provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, BalbesError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(&api_key)?.with_base_url(config.base_url.clone());

        info!(
            model = config.model,
            base_url = client.base_url(),
            "OpenAI provider initialized"
        );

        Ok(Self { client })
    }

    /// Creates a provider with an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn to_chat_request(request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        // No test request: it would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BalbesError> {
        let api_request = Self::to_chat_request(&request);
        let response = self.client.chat(&api_request).await?;

        let text = response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            text,
            model: response.model.unwrap_or(request.model),
        })
    }

    async fn speech(&self, request: SpeechRequest) -> Result<Vec<u8>, BalbesError> {
        let input: String = request.input.chars().take(MAX_SPEECH_INPUT_CHARS).collect();
        let body = SpeechBody {
            model: request.model,
            voice: request.voice,
            input,
            response_format: SPEECH_FORMAT.to_string(),
        };
        self.client.speech(&body).await
    }

    async fn image(&self, request: ImageRequest) -> Result<Vec<u8>, BalbesError> {
        let body = ImageGenerationBody {
            model: request.model,
            prompt: request.prompt,
            size: request.size,
            n: 1,
        };
        let response = self.client.generate_image(&body).await?;
        let datum = response.data.into_iter().next().ok_or_else(|| {
            BalbesError::provider(ProviderErrorKind::Other, "image response contained no data")
        })?;

        match (datum.b64_json, datum.url) {
            (Some(b64), _) => STANDARD.decode(b64.trim()).map_err(|e| BalbesError::Provider {
                kind: ProviderErrorKind::Other,
                message: format!("invalid base64 image payload: {e}"),
                source: Some(Box::new(e)),
            }),
            (None, Some(url)) => self.client.fetch(&url).await,
            (None, None) => Err(BalbesError::provider(
                ProviderErrorKind::Other,
                "image response had neither b64_json nor url",
            )),
        }
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, BalbesError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        BalbesError::Config(
            "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
        )
    })
}

fn convert_message(message: &PromptMessage) -> ApiMessage {
    ApiMessage {
        role: message.role.to_string(),
        content: convert_content(&message.content),
    }
}

/// A lone text part becomes a plain string; anything else uses typed parts.
fn convert_content(parts: &[ContentPart]) -> ApiContent {
    if let [ContentPart::Text(text)] = parts {
        return ApiContent::Text(text.clone());
    }

    ApiContent::Parts(
        parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => ApiPart::Text { text: text.clone() },
                ContentPart::Image { data, mime_type } => ApiPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{mime_type};base64,{}", STANDARD.encode(data)),
                    },
                },
            })
            .collect(),
    )
}
