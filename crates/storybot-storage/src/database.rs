// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, and the
//! single background connection used for all queries.

use std::path::Path;

use storybot_core::StorybotError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into [`StorybotError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StorybotError {
    StorybotError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> StorybotError {
    StorybotError::Storage {
        source: Box::new(e),
    }
}

/// An open, migrated SQLite database.
///
/// Every statement runs on tokio-rusqlite's background thread, so writes are
/// serialized without extra locking.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, StorybotError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;
        let db = Self::prepare(conn, wal_mode).await?;
        info!(path, wal_mode, "user database opened");
        Ok(db)
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, StorybotError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(storage_err)?;
        Self::prepare(conn, false).await
    }

    async fn prepare(
        conn: tokio_rusqlite::Connection,
        wal_mode: bool,
    ) -> Result<Self, StorybotError> {
        // Migration failures are carried out of the closure as the inner result.
        conn.call(move |conn| -> Result<Result<(), StorybotError>, rusqlite::Error> {
            apply_pragmas(conn, wal_mode)?;
            Ok(run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), StorybotError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        // journal_mode returns a row, so it cannot go through execute_batch.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    conn.execute_batch("PRAGMA busy_timeout = 5000; PRAGMA synchronous = NORMAL;")?;
    Ok(())
}
