// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use balbes_core::BalbesError;
use tracing::debug;

use crate::migrations;

/// Handle to the chat history database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply the schema.
    ///
    /// The schema is applied on a blocking thread with a short-lived
    /// connection before the long-lived async connection is opened.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, BalbesError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| BalbesError::Storage {
                source: Box::new(e),
            })?;
        }

        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), BalbesError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(storage_err)?;
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.pragma_update(None, "journal_mode", journal)
                .map_err(storage_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| BalbesError::Internal(format!("schema setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| BalbesError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The async connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), BalbesError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

fn storage_err(e: rusqlite::Error) -> BalbesError {
    BalbesError::Storage {
        source: Box::new(e),
    }
}

/// Convert a tokio-rusqlite error into `BalbesError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BalbesError {
    BalbesError::Storage {
        source: Box::new(e),
    }
}
