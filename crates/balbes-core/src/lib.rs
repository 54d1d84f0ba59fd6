// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Balbes chat agent.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the agent and its adapters (storage, model provider, chat
//! transport, GIF search).

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::{BalbesError, ProviderErrorKind};
pub use types::{
    AdapterType, ChatEvent, ChatId, CompletionRequest, CompletionResponse, ContentPart, FileRef,
    HealthStatus, HistoryLine, ImageRequest, MediaAttachment, MediaKind, MediaSource, MessageId,
    OutboundMedia, PromptMessage, PromptRole, SelfIdentity, SpeechRequest, UserId,
};

pub use traits::{ChannelAdapter, GifSource, PluginAdapter, ProviderAdapter, StorageAdapter};
