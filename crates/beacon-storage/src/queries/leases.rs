// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch ownership leases. Timestamps are RFC 3339 and compared as instants.

use beacon_core::{BeaconError, Campaign};
use rusqlite::params;

use super::campaigns::{CAMPAIGN_COLUMNS, row_to_campaign};
use crate::database::{Database, map_tr_err};

/// Take the lease for `owner` if it is free, expired at `now`, or already
/// held by `owner`. Returns false while another owner holds a live lease.
pub async fn acquire_lease(
    db: &Database,
    campaign_id: &str,
    owner: &str,
    now: &str,
    expires_at: &str,
) -> Result<bool, BeaconError> {
    let (campaign_id, owner, now, expires_at) = (
        campaign_id.to_string(),
        owner.to_string(),
        now.to_string(),
        expires_at.to_string(),
    );
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO dispatch_leases (campaign_id, owner, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(campaign_id) DO UPDATE SET
                    owner = excluded.owner,
                    expires_at = excluded.expires_at
                 WHERE dispatch_leases.owner = excluded.owner
                    OR julianday(dispatch_leases.expires_at) <= julianday(?4)",
                params![campaign_id, owner, expires_at, now],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Extend a lease still held by `owner`. False once the lease was lost.
pub async fn renew_lease(
    db: &Database,
    campaign_id: &str,
    owner: &str,
    expires_at: &str,
) -> Result<bool, BeaconError> {
    let (campaign_id, owner, expires_at) =
        (campaign_id.to_string(), owner.to_string(), expires_at.to_string());
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE dispatch_leases SET expires_at = ?3
                 WHERE campaign_id = ?1 AND owner = ?2",
                params![campaign_id, owner, expires_at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Drop the lease if `owner` still holds it.
pub async fn release_lease(db: &Database, campaign_id: &str, owner: &str) -> Result<(), BeaconError> {
    let (campaign_id, owner) = (campaign_id.to_string(), owner.to_string());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM dispatch_leases WHERE campaign_id = ?1 AND owner = ?2",
                params![campaign_id, owner],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// SENDING campaigns with no live lease at `now`, oldest first.
pub async fn orphaned_sending_campaigns(
    db: &Database,
    now: &str,
) -> Result<Vec<Campaign>, BeaconError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Campaign>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns c
                 WHERE c.status = 'SENDING'
                   AND NOT EXISTS (
                       SELECT 1 FROM dispatch_leases l
                       WHERE l.campaign_id = c.id
                         AND julianday(l.expires_at) > julianday(?1))
                 ORDER BY c.created_at ASC, c.id ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_campaign)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
