// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use beacon_core::BeaconError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite writer connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, BeaconError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, BeaconError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(BeaconError::storage)?;

        conn.call(move |conn| -> Result<(), BeaconError> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))
            .map_err(BeaconError::storage)?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(map_call_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection. All queries go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), BeaconError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(BeaconError::storage)
    }
}

/// Convert a tokio-rusqlite error into `BeaconError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BeaconError {
    BeaconError::storage(e)
}

/// Unwrap a `BeaconError` raised inside a `call()` closure.
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<BeaconError>) -> BeaconError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => BeaconError::Internal(format!("database connection: {other}")),
    }
}
