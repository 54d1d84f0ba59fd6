// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutable conversation state shared by the event loop and the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use balbes_config::model::DialogConfig;
use balbes_core::ChatId;
use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;

use crate::dialog::DialogTracker;

/// Longest span accepted from configuration, about a century.
const MAX_SPAN_SECS: u64 = 100 * 365 * 24 * 3600;

/// Configured seconds as a `chrono` span, clamped so date arithmetic cannot overflow.
pub fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_SPAN_SECS) as i64)
}

/// State handle shared between tasks. Never hold the lock across network I/O.
pub type SharedState = Arc<Mutex<ConversationState>>;

/// Per-chat time of the last dispatched reply.
#[derive(Debug, Default)]
pub struct ReplyThrottle {
    last_reply: HashMap<ChatId, DateTime<Utc>>,
}

impl ReplyThrottle {
    pub fn last_reply_at(&self, chat: ChatId) -> Option<DateTime<Utc>> {
        self.last_reply.get(&chat).copied()
    }

    /// Whether a reply in `chat` happened less than `cooldown` before `now`.
    pub fn in_cooldown(&self, chat: ChatId, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.last_reply_at(chat)
            .is_some_and(|last| now - last < cooldown)
    }

    pub fn record(&mut self, chat: ChatId, at: DateTime<Utc>) {
        self.last_reply.insert(chat, at);
    }
}

#[derive(Debug)]
pub struct ConversationState {
    pub throttle: ReplyThrottle,
    pub dialogs: DialogTracker,
    activity: HashMap<ChatId, DateTime<Utc>>,
    pub last_spontaneous_at: Option<DateTime<Utc>>,
    pub rng: StdRng,
}

impl ConversationState {
    pub fn new(dialog: &DialogConfig, rng: StdRng) -> Self {
        Self {
            throttle: ReplyThrottle::default(),
            dialogs: DialogTracker::new(dialog),
            activity: HashMap::new(),
            last_spontaneous_at: None,
            rng,
        }
    }

    /// State seeded from OS entropy.
    pub fn from_entropy(dialog: &DialogConfig) -> Self {
        Self::new(dialog, StdRng::from_entropy())
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Records that something was said in `chat` at `at`. Never moves backwards.
    pub fn record_activity(&mut self, chat: ChatId, at: DateTime<Utc>) {
        let slot = self.activity.entry(chat).or_insert(at);
        if at > *slot {
            *slot = at;
        }
    }

    pub fn last_activity(&self, chat: ChatId) -> Option<DateTime<Utc>> {
        self.activity.get(&chat).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn cooldown_window() {
        let mut throttle = ReplyThrottle::default();
        let cooldown = Duration::seconds(8);
        assert!(!throttle.in_cooldown(ChatId(1), ts(0), cooldown));

        throttle.record(ChatId(1), ts(0));
        assert!(throttle.in_cooldown(ChatId(1), ts(7), cooldown));
        assert!(!throttle.in_cooldown(ChatId(1), ts(8), cooldown));
        assert!(!throttle.in_cooldown(ChatId(2), ts(1), cooldown));
    }

    #[test]
    fn activity_is_monotonic() {
        let mut state = ConversationState::new(&DialogConfig::default(), StdRng::seed_from_u64(1));
        state.record_activity(ChatId(1), ts(10));
        state.record_activity(ChatId(1), ts(5));
        assert_eq!(state.last_activity(ChatId(1)), Some(ts(10)));
        assert_eq!(state.last_activity(ChatId(2)), None);
    }
}
