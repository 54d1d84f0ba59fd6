// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use balbes_config::model::StorageConfig;
use balbes_core::{
    AdapterType, BalbesError, ChatEvent, ChatId, HealthStatus, HistoryLine, PluginAdapter,
    StorageAdapter, UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed chat memory.
///
/// The database is opened lazily by [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, BalbesError> {
        self.db.get().ok_or_else(|| BalbesError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), BalbesError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BalbesError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), BalbesError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn append_event(&self, event: &ChatEvent) -> Result<bool, BalbesError> {
        queries::history::append_event(self.db()?, event).await
    }

    async fn import_history(&self, events: Vec<ChatEvent>) -> Result<usize, BalbesError> {
        queries::history::import_events(self.db()?, events).await
    }

    async fn recent(
        &self,
        chat: ChatId,
        since: DateTime<Utc>,
        limit: usize,
        max_chars: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError> {
        queries::history::recent(self.db()?, chat, since, limit, max_chars).await
    }

    async fn recent_by_user(
        &self,
        chat: ChatId,
        user: UserId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<HistoryLine>, BalbesError> {
        queries::history::recent_by_user(self.db()?, chat, user, since, limit).await
    }

    async fn last_activity(&self, chat: ChatId) -> Result<Option<DateTime<Utc>>, BalbesError> {
        queries::history::last_activity(self.db()?, chat).await
    }
}
