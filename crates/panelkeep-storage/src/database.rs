// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use panelkeep_core::{PanelkeepError, MAX_SLOTS};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Abort message raised by the slot capacity triggers (see `V2__slot_capacity_triggers.sql`).
pub(crate) const SLOT_CAPACITY_ABORT: &str = "slot capacity exceeded";

/// Handle to the Panelkeep SQLite database.
///
/// Wraps the single `tokio_rusqlite::Connection` through which every query runs.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run pending migrations.
    pub async fn open(path: &str) -> Result<Self, PanelkeepError> {
        Self::open_with_options(path, true).await
    }

    /// Open (or create) the database at `path`, choosing the journal mode.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, PanelkeepError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PanelkeepError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| PanelkeepError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.apply_pragmas(wal_mode).await?;
        db.migrate().await?;
        debug!(path = %path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with all migrations applied.
    pub async fn open_in_memory() -> Result<Self, PanelkeepError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| PanelkeepError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.apply_pragmas(false).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn close(&self) -> Result<(), PanelkeepError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn apply_pragmas(&self, wal_mode: bool) -> Result<(), PanelkeepError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    // journal_mode returns a row, so it cannot go through execute_batch.
                    let _mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn migrate(&self) -> Result<(), PanelkeepError> {
        self.conn
            .call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)
    }
}

/// Convert tokio-rusqlite errors into `PanelkeepError::Storage`.
pub(crate) fn map_tr_err<E: std::fmt::Display>(e: tokio_rusqlite::Error<E>) -> PanelkeepError {
    PanelkeepError::Storage {
        source: e.to_string().into(),
    }
}

/// Like [`map_tr_err`], but recognizes the slot capacity trigger abort.
pub(crate) fn map_write_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> PanelkeepError {
    let message = e.to_string();
    if message.contains(SLOT_CAPACITY_ABORT) {
        return PanelkeepError::CapacityExceeded {
            current: MAX_SLOTS,
            limit: MAX_SLOTS,
        };
    }
    PanelkeepError::Storage {
        source: message.into(),
    }
}
