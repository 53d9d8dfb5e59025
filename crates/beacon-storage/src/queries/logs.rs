// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery log queries.

use beacon_core::{BeaconError, CampaignLog, DeliveryStatus};
use rusqlite::{Row, params};

use super::parse_column;
use crate::database::{Database, map_tr_err};

const LOG_COLUMNS: &str =
    "id, campaign_id, contact_id, provider_message_id, status, error_reason, updated_at";

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<CampaignLog> {
    Ok(CampaignLog {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        contact_id: row.get(2)?,
        provider_message_id: row.get(3)?,
        status: parse_column(4, row.get(4)?)?,
        error_reason: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Insert a log row unless the (campaign, contact) pair already has one.
pub async fn insert_log(db: &Database, log: &CampaignLog) -> Result<bool, BeaconError> {
    let log = log.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO campaign_logs
                    (id, campaign_id, contact_id, provider_message_id, status, error_reason, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(campaign_id, contact_id) DO NOTHING",
                params![
                    log.id,
                    log.campaign_id,
                    log.contact_id,
                    log.provider_message_id,
                    log.status.to_string(),
                    log.error_reason,
                    log.updated_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn logged_contact_ids(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<String>, BeaconError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT contact_id FROM campaign_logs WHERE campaign_id = ?1")?;
            let rows = stmt.query_map(params![campaign_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the status of the row carrying `provider_message_id`.
///
/// `error_reason` replaces the stored reason only when present.
pub async fn update_log_status(
    db: &Database,
    provider_message_id: &str,
    status: DeliveryStatus,
    error_reason: Option<&str>,
) -> Result<bool, BeaconError> {
    let provider_message_id = provider_message_id.to_string();
    let error_reason = error_reason.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE campaign_logs
                 SET status = ?2,
                     error_reason = COALESCE(?3, error_reason),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE provider_message_id = ?1",
                params![provider_message_id, status.to_string(), error_reason],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_logs(db: &Database, campaign_id: &str) -> Result<Vec<CampaignLog>, BeaconError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<CampaignLog>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOG_COLUMNS} FROM campaign_logs
                 WHERE campaign_id = ?1
                 ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map(params![campaign_id], row_to_log)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Statuses of the campaign's rows, or of every row when `campaign_id` is `None`.
pub async fn log_statuses(
    db: &Database,
    campaign_id: Option<&str>,
) -> Result<Vec<DeliveryStatus>, BeaconError> {
    let campaign_id = campaign_id.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Vec<DeliveryStatus>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT status FROM campaign_logs WHERE ?1 IS NULL OR campaign_id = ?1",
            )?;
            let rows = stmt.query_map(params![campaign_id], |row| parse_column(0, row.get(0)?))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_successful_logs(db: &Database, campaign_id: &str) -> Result<i64, BeaconError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM campaign_logs
                 WHERE campaign_id = ?1 AND status IN ('sent', 'delivered', 'read')",
                params![campaign_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
