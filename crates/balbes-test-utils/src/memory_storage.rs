// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `StorageAdapter` for unit tests that do not need SQLite.
//!
//! Window queries share the character budget logic of the SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use balbes_core::{
    AdapterType, BalbesError, ChatEvent, ChatId, HealthStatus, HistoryLine, PluginAdapter,
    StorageAdapter, UserId,
};
use balbes_storage::queries::history::fit_to_budget;

#[derive(Default)]
pub struct MemoryStorage {
    events: Mutex<Vec<ChatEvent>>,
    closed: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored events in insertion order.
    pub async fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().await.clone()
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }

    /// Make `append_event` fail until switched back.
    pub async fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().await = fail;
    }

    async fn newest_first(
        &self,
        chat: ChatId,
        user: Option<UserId>,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Vec<HistoryLine> {
        let mut matching: Vec<ChatEvent> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.chat_id == chat && e.timestamp >= since)
            .filter(|e| user.is_none_or(|u| e.author_id == u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.message_id.cmp(&a.message_id))
        });
        matching
            .into_iter()
            .take(limit)
            .map(|e| HistoryLine {
                author: e.author_name,
                text: e.text,
                sent_at: e.timestamp,
            })
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), BalbesError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BalbesError> {
        *self.closed.lock().await = true;
        Ok(())
    }

    async fn append_event(&self, event: &ChatEvent) -> Result<bool, BalbesError> {
        if *self.fail_writes.lock().await {
            return Err(BalbesError::Storage {
                source: "mock write failure".into(),
            });
        }
        let mut events = self.events.lock().await;
        if events
            .iter()
            .any(|e| e.chat_id == event.chat_id && e.message_id == event.message_id)
        {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    async fn import_history(&self, events: Vec<ChatEvent>) -> Result<usize, BalbesError> {
        let mut written = 0;
        for event in &events {
            if self.append_event(event).await? {
                written += 1;
            }
        }
        Ok(written)
    }

    async fn recent(
        &self,
        chat: ChatId,
        since: DateTime<Utc>,
        limit: usize,
        max_chars: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError> {
        let lines = self.newest_first(chat, None, since, limit).await;
        Ok(fit_to_budget(lines, max_chars))
    }

    async fn recent_by_user(
        &self,
        chat: ChatId,
        user: UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError> {
        let mut lines = self.newest_first(chat, Some(user), since, limit).await;
        lines.reverse();
        Ok(lines)
    }

    async fn last_activity(&self, chat: ChatId) -> Result<Option<DateTime<Utc>>, BalbesError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.chat_id == chat)
            .map(|e| e.timestamp)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balbes_core::MessageId;
    use chrono::Duration;

    #[tokio::test]
    async fn append_is_idempotent() {
        let storage = MemoryStorage::new();
        let event = ChatEvent::new(ChatId(1), MessageId(1), UserId(2), "a", "x", Utc::now());
        assert!(storage.append_event(&event).await.unwrap());
        assert!(!storage.append_event(&event).await.unwrap());
        assert_eq!(storage.events().await.len(), 1);
    }

    #[tokio::test]
    async fn recent_is_oldest_first_within_window() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        for (id, mins) in [(1, 90), (2, 20), (3, 10)] {
            let event = ChatEvent::new(
                ChatId(1),
                MessageId(id),
                UserId(2),
                "a",
                format!("m{id}"),
                now - Duration::minutes(mins),
            );
            storage.append_event(&event).await.unwrap();
        }

        let lines = storage
            .recent(ChatId(1), now - Duration::hours(1), 10, 1000)
            .await
            .unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3"]);
        assert_eq!(
            storage.last_activity(ChatId(1)).await.unwrap(),
            Some(now - Duration::minutes(10))
        );
    }
}
