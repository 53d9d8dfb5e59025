// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch step journal.

use beacon_core::BeaconError;
use rusqlite::params;

use super::{json_column, to_json};
use crate::database::{Database, map_tr_err};

/// Recorded output of `step` in run `run_id`, if the step completed.
pub async fn get_step(
    db: &Database,
    run_id: &str,
    step: &str,
) -> Result<Option<serde_json::Value>, BeaconError> {
    let run_id = run_id.to_string();
    let step = step.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<serde_json::Value>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT output FROM dispatch_steps WHERE run_id = ?1 AND step_name = ?2",
                params![run_id, step],
                |row| json_column(0, row.get(0)?),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record (or replace) the output of a step.
pub async fn put_step(
    db: &Database,
    run_id: &str,
    step: &str,
    output: &serde_json::Value,
) -> Result<(), BeaconError> {
    let run_id = run_id.to_string();
    let step = step.to_string();
    let output = output.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO dispatch_steps (run_id, step_name, output) VALUES (?1, ?2, ?3)
                 ON CONFLICT(run_id, step_name) DO UPDATE SET
                    output = excluded.output,
                    completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![run_id, step, to_json(&output)?],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
