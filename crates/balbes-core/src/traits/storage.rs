// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the chat memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::BalbesError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatEvent, ChatId, HistoryLine, UserId};

/// Append-only log of chat messages, queryable by recency and author.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (schema, connection).
    async fn initialize(&self) -> Result<(), BalbesError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), BalbesError>;

    /// Appends an event. Idempotent on `(chat, message_id)`; returns whether
    /// a new row was written.
    async fn append_event(&self, event: &ChatEvent) -> Result<bool, BalbesError>;

    /// Appends many events in one transaction, returning the number written.
    async fn import_history(&self, events: Vec<ChatEvent>) -> Result<usize, BalbesError>;

    /// Most recent lines for a chat since `since`, oldest-first, at most
    /// `limit` lines whose combined length stays within `max_chars`.
    async fn recent(
        &self,
        chat: ChatId,
        since: DateTime<Utc>,
        limit: usize,
        max_chars: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError>;

    /// Most recent lines written by one user, oldest-first.
    async fn recent_by_user(
        &self,
        chat: ChatId,
        user: UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError>;

    /// Timestamp of the newest stored message in a chat.
    async fn last_activity(&self, chat: ChatId) -> Result<Option<DateTime<Utc>>, BalbesError>;
}
