// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handles shared by the agent loop and the spontaneous scheduler.

use std::sync::Arc;

use balbes_core::{
    ChannelAdapter, ChatEvent, ChatId, Clock, MessageId, SelfIdentity, StorageAdapter,
};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::context::ConversationWindow;
use crate::generation::GenerationClient;
use crate::prompt::PromptBuilder;
use crate::state::SharedState;

/// Everything needed to talk in the target chat.
#[derive(Clone)]
pub struct ChatContext {
    pub channel: Arc<dyn ChannelAdapter + Send + Sync>,
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub generation: Arc<GenerationClient>,
    pub prompts: Arc<PromptBuilder>,
    pub window: ConversationWindow,
    pub clock: Arc<dyn Clock>,
    pub state: SharedState,
    pub identity: SelfIdentity,
    /// The group chat the bot lives in.
    pub chat: ChatId,
    /// Author name used when storing the bot's own messages.
    pub bot_name: String,
}

impl ChatContext {
    /// Rendered conversation window. Storage failures yield an empty window.
    pub async fn conversation(&self, chat: ChatId, now: DateTime<Utc>) -> String {
        match self.window.build(self.storage.as_ref(), chat, now).await {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "failed to load conversation window");
                String::new()
            }
        }
    }

    /// Stores a message the bot sent so it shows up in later windows.
    pub async fn remember_own(
        &self,
        chat: ChatId,
        message_id: MessageId,
        text: &str,
        at: DateTime<Utc>,
    ) {
        let event = ChatEvent::new(
            chat,
            message_id,
            self.identity.id,
            self.bot_name.clone(),
            text,
            at,
        );
        if let Err(e) = self.storage.append_event(&event).await {
            warn!(
                chat_id = %chat,
                message_id = %message_id,
                error = %e,
                "failed to store own message"
            );
        }
    }
}
