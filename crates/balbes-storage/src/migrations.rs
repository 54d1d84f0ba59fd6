// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied
//! when the database is opened.

use balbes_core::BalbesError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply all pending schema files to the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BalbesError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| BalbesError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
