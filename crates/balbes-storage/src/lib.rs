// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite chat memory store for the Balbes chat agent.
//!
//! Provides WAL-mode SQLite storage with an embedded schema, a single-writer
//! concurrency model via `tokio-rusqlite`, and the history queries the agent
//! builds its conversation window from.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
