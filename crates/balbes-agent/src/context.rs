// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation window assembly from the memory store.

use balbes_config::model::MemoryConfig;
use balbes_core::{BalbesError, ChatId, HistoryLine, StorageAdapter};
use chrono::{DateTime, Duration, Utc};

/// Builds the rolling conversation window for prompts.
///
/// The window is rebuilt on every call and never cached.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    span: Duration,
    max_messages: usize,
    max_chars: usize,
    default_author: String,
}

impl ConversationWindow {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            span: crate::state::seconds(u64::from(config.window_hours) * 3600),
            max_messages: config.max_messages,
            max_chars: config.max_chars,
            default_author: config.default_author_name.clone(),
        }
    }

    /// Newest lines of `chat` inside the window, oldest-first.
    pub async fn lines(
        &self,
        storage: &dyn StorageAdapter,
        chat: ChatId,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoryLine>, BalbesError> {
        let since = now
            .checked_sub_signed(self.span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        storage
            .recent(chat, since, self.max_messages, self.max_chars)
            .await
    }

    /// Renders lines as `author: text`, one per line.
    pub fn render(&self, lines: &[HistoryLine]) -> String {
        lines
            .iter()
            .filter_map(|line| {
                let text = flatten(&line.text);
                if text.is_empty() {
                    return None;
                }
                let author = line.author.trim();
                let author = if author.is_empty() {
                    self.default_author.as_str()
                } else {
                    author
                };
                Some(format!("{author}: {text}"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Loads and renders the window in one step.
    pub async fn build(
        &self,
        storage: &dyn StorageAdapter,
        chat: ChatId,
        now: DateTime<Utc>,
    ) -> Result<String, BalbesError> {
        let lines = self.lines(storage, chat, now).await?;
        Ok(self.render(&lines))
    }
}

fn flatten(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
