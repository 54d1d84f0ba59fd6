// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Balbes agent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a chat on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Identifier of a user (or bot) on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Identifier of a message, unique within its chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque platform reference to a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef(pub String);

/// The bot's own identity on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfIdentity {
    pub id: UserId,
    /// Username without the leading `@`.
    pub handle: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    GifSource,
}

/// Kind of media attached to an inbound event or sent outbound.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Voice,
    Audio,
    Animation,
    Video,
    VideoNote,
    Sticker,
    Document,
}

impl MediaKind {
    /// Text stored for a message of this kind that has no text of its own.
    pub fn placeholder(self) -> String {
        format!("[{self}]")
    }
}

/// A media attachment on an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub file_ref: FileRef,
}

/// One inbound chat message, immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    /// Message text, caption, or a media placeholder such as `[photo]`.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Author of the message this event replies to, if any.
    pub reply_to_author: Option<UserId>,
    /// Handles mentioned through platform entities, without `@`.
    pub mentions: Vec<String>,
    pub media: Option<MediaAttachment>,
}

impl ChatEvent {
    pub fn new(
        chat_id: ChatId,
        message_id: MessageId,
        author_id: UserId,
        author_name: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            author_id,
            author_name: author_name.into(),
            text: text.into(),
            timestamp,
            reply_to_author: None,
            mentions: Vec::new(),
            media: None,
        }
    }

    /// Mark this event as a reply to a message written by `author`.
    pub fn replying_to(mut self, author: UserId) -> Self {
        self.reply_to_author = Some(author);
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_media(mut self, kind: MediaKind, file_ref: FileRef) -> Self {
        self.media = Some(MediaAttachment { kind, file_ref });
        self
    }

    /// The photo attachment, if this event carries one.
    pub fn photo(&self) -> Option<&FileRef> {
        self.media
            .as_ref()
            .filter(|m| m.kind == MediaKind::Photo)
            .map(|m| &m.file_ref)
    }
}

/// One line of conversation history returned by the memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLine {
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Payload of an outbound media message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Raw bytes uploaded with the given file name.
    Bytes { data: Vec<u8>, file_name: String },
    /// A remote URL the platform fetches itself.
    Url(String),
}

/// An outbound media message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub kind: MediaKind,
    pub source: MediaSource,
    pub reply_to: Option<MessageId>,
    pub caption: Option<String>,
}

// --- Provider types ---

/// Role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// A part of a prompt message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image { data: Vec<u8>, mime_type: String },
}

/// A single prompt message.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: Vec<ContentPart>,
}

impl PromptMessage {
    pub fn text(role: PromptRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text(text.into())],
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A chat completion response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Concatenated text output; empty when the model returned nothing.
    pub text: String,
    /// The model that actually served the request.
    pub model: String,
}

/// A text-to-speech request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub model: String,
    pub voice: String,
    pub input: String,
}

/// An image generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
}
