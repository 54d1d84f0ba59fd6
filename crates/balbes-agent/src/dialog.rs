// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived per-user dialog sessions.
//!
//! After the bot replies to someone, that user's follow-ups are answered
//! unconditionally until the session expires. Sessions live in memory only.

use std::collections::HashMap;

use balbes_config::model::DialogConfig;
use balbes_core::{ChatId, UserId};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogSession {
    pub expires_at: DateTime<Utc>,
    pub turns: u32,
}

/// Table of dialog sessions keyed by `(chat, user)`.
#[derive(Debug)]
pub struct DialogTracker {
    extension: Duration,
    max_turns: u32,
    sessions: HashMap<(ChatId, UserId), DialogSession>,
}

impl DialogTracker {
    pub fn new(config: &DialogConfig) -> Self {
        Self {
            extension: crate::state::seconds(config.extension_secs),
            max_turns: config.max_turns,
            sessions: HashMap::new(),
        }
    }

    /// Opens or extends the session after a reply to `user`.
    pub fn touch(&mut self, chat: ChatId, user: UserId, now: DateTime<Utc>) {
        let expires_at = now + self.extension;
        let max_turns = self.max_turns;
        self.sessions
            .entry((chat, user))
            .and_modify(|s| {
                s.expires_at = expires_at;
                s.turns = s.turns.saturating_add(1).min(max_turns);
            })
            .or_insert(DialogSession {
                expires_at,
                turns: 1.min(max_turns),
            });
    }

    /// Whether the session is live at `now`. An expired entry is evicted.
    pub fn is_active(&mut self, chat: ChatId, user: UserId, now: DateTime<Utc>) -> bool {
        match self.sessions.get(&(chat, user)) {
            Some(session) if now <= session.expires_at => true,
            Some(_) => {
                self.sessions.remove(&(chat, user));
                false
            }
            None => false,
        }
    }

    pub fn turns(&self, chat: ChatId, user: UserId) -> u32 {
        self.sessions.get(&(chat, user)).map_or(0, |s| s.turns)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
