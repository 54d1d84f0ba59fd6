// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for remote model APIs.

use async_trait::async_trait;

use crate::error::BalbesError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse, ImageRequest, SpeechRequest};

/// Adapter for a model provider offering chat, speech and image endpoints.
///
/// Failures carry a [`ProviderErrorKind`](crate::ProviderErrorKind) so the
/// caller can decide whether to fall back to another model.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a chat completion request (text and optionally images).
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, BalbesError>;

    /// Synthesizes speech, returning encoded audio bytes.
    async fn speech(&self, request: SpeechRequest) -> Result<Vec<u8>, BalbesError>;

    /// Generates an image, returning encoded image bytes.
    async fn image(&self, request: ImageRequest) -> Result<Vec<u8>, BalbesError>;
}
