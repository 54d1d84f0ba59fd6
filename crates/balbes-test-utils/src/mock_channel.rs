// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound events
//! and captures everything the agent sends for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use balbes_core::{
    AdapterType, BalbesError, ChannelAdapter, ChatEvent, ChatId, FileRef, HealthStatus, MessageId,
    OutboundMedia, PluginAdapter, SelfIdentity, UserId,
};

/// A text message captured from `send_text()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub chat: ChatId,
    pub id: MessageId,
    pub text: String,
    pub reply_to: Option<MessageId>,
}

/// A reaction captured from `send_reaction()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReaction {
    pub chat: ChatId,
    pub message_id: MessageId,
    pub emoji: String,
}

/// A media message captured from `send_media()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMedia {
    pub chat: ChatId,
    pub id: MessageId,
    pub media: OutboundMedia,
}

/// A mock messaging channel for testing.
///
/// Inbound events injected via `inject()` are returned by `receive()`;
/// sends are captured. Sent message ids count up from 10 000 so they never
/// collide with ids used for injected events.
pub struct MockChannel {
    identity: SelfIdentity,
    inbound: Arc<Mutex<VecDeque<ChatEvent>>>,
    notify: Arc<Notify>,
    texts: Mutex<Vec<SentText>>,
    reactions: Mutex<Vec<SentReaction>>,
    media: Mutex<Vec<SentMedia>>,
    downloads: Mutex<Vec<FileRef>>,
    download_bytes: Mutex<Vec<u8>>,
    fail_sends: Mutex<bool>,
    next_id: AtomicI64,
}

impl MockChannel {
    /// Mock channel for a bot with id 1000 and handle `balbes_bot`.
    pub fn new() -> Self {
        Self::with_identity(UserId(1000), "balbes_bot")
    }

    pub fn with_identity(id: UserId, handle: &str) -> Self {
        Self {
            identity: SelfIdentity {
                id,
                handle: handle.to_string(),
            },
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            texts: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            media: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            download_bytes: Mutex::new(vec![0xff, 0xd8, 0xff, 0xe0]),
            fail_sends: Mutex::new(false),
            next_id: AtomicI64::new(10_000),
        }
    }

    /// Queue an inbound event. The next `receive()` returns it.
    pub async fn inject(&self, event: ChatEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Make every text and media send fail until switched back.
    pub async fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().await = fail;
    }

    /// Bytes returned by `download()`.
    pub async fn set_download(&self, bytes: Vec<u8>) {
        *self.download_bytes.lock().await = bytes;
    }

    pub async fn sent_texts(&self) -> Vec<SentText> {
        self.texts.lock().await.clone()
    }

    pub async fn sent_reactions(&self) -> Vec<SentReaction> {
        self.reactions.lock().await.clone()
    }

    pub async fn sent_media(&self) -> Vec<SentMedia> {
        self.media.lock().await.clone()
    }

    pub async fn downloads(&self) -> Vec<FileRef> {
        self.downloads.lock().await.clone()
    }

    /// Texts plus media messages.
    pub async fn reply_count(&self) -> usize {
        self.texts.lock().await.len() + self.media.lock().await.len()
    }

    async fn next_message_id(&self) -> Result<MessageId, BalbesError> {
        if *self.fail_sends.lock().await {
            return Err(BalbesError::channel("mock send failure"));
        }
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), BalbesError> {
        Ok(())
    }

    async fn receive(&self) -> Result<ChatEvent, BalbesError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn self_identity(&self) -> Result<SelfIdentity, BalbesError> {
        Ok(self.identity.clone())
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, BalbesError> {
        let id = self.next_message_id().await?;
        self.texts.lock().await.push(SentText {
            chat,
            id,
            text: text.to_string(),
            reply_to,
        });
        Ok(id)
    }

    async fn send_reaction(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), BalbesError> {
        self.reactions.lock().await.push(SentReaction {
            chat,
            message_id: message,
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn send_media(
        &self,
        chat: ChatId,
        media: OutboundMedia,
    ) -> Result<MessageId, BalbesError> {
        let id = self.next_message_id().await?;
        self.media.lock().await.push(SentMedia { chat, id, media });
        Ok(id)
    }

    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, BalbesError> {
        self.downloads.lock().await.push(file.clone());
        Ok(self.download_bytes.lock().await.clone())
    }
}
