// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait: the chat platform transport (event dispatcher).

use async_trait::async_trait;

use crate::error::BalbesError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatEvent, ChatId, FileRef, MessageId, OutboundMedia, SelfIdentity};

/// Adapter for the messaging platform the agent lives in.
///
/// Receives inbound chat events and delivers text, reactions and media.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), BalbesError>;

    /// Receives the next inbound event from the channel.
    async fn receive(&self) -> Result<ChatEvent, BalbesError>;

    /// Returns the bot's own id and handle.
    async fn self_identity(&self) -> Result<SelfIdentity, BalbesError>;

    /// Sends a text message, optionally as a reply to `reply_to`.
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, BalbesError>;

    /// Sets an emoji reaction on a message.
    async fn send_reaction(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), BalbesError>;

    /// Sends a media message.
    async fn send_media(&self, chat: ChatId, media: OutboundMedia)
    -> Result<MessageId, BalbesError>;

    /// Downloads the file behind a platform file reference.
    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, BalbesError>;
}
