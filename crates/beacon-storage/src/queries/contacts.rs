// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact queries: upsert by phone, audience selection, opt-out.

use beacon_core::{BeaconError, Contact};
use rusqlite::{Row, params};

use super::{json_column, to_json};
use crate::database::{Database, map_tr_err};

const CONTACT_COLUMNS: &str = "id, phone, name, tags, is_unsubscribed, created_at";

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        tags: json_column(3, row.get(3)?)?,
        is_unsubscribed: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a contact, or refresh name and tags of the contact owning the phone.
///
/// The existing id and opt-out flag are preserved on conflict.
pub async fn upsert_contact(db: &Database, contact: &Contact) -> Result<(), BeaconError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO contacts (id, phone, name, tags, is_unsubscribed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(phone) DO UPDATE SET
                    name = excluded.name,
                    tags = excluded.tags",
                params![
                    contact.id,
                    contact.phone,
                    contact.name,
                    to_json(&contact.tags)?,
                    contact.is_unsubscribed,
                    contact.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Contact>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_contact) {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contact_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<Contact>, BeaconError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Contact>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE phone = ?1"
            ))?;
            match stmt.query_row(params![phone], row_to_contact) {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Subscribed contacts with at least one tag in `tags`; every subscribed
/// contact when `tags` is empty. Ordered by creation time, then id.
pub async fn list_eligible_contacts(
    db: &Database,
    tags: &[String],
) -> Result<Vec<Contact>, BeaconError> {
    let tags = tags.to_vec();
    db.connection()
        .call(move |conn| -> Result<Vec<Contact>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts c
                 WHERE c.is_unsubscribed = 0
                   AND (json_array_length(?1) = 0 OR EXISTS (
                        SELECT 1 FROM json_each(c.tags) t
                        WHERE t.value IN (SELECT value FROM json_each(?1))))
                 ORDER BY c.created_at ASC, c.id ASC"
            ))?;
            let rows = stmt.query_map(params![to_json(&tags)?], row_to_contact)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_eligible_contacts(db: &Database, tags: &[String]) -> Result<i64, BeaconError> {
    let tags = tags.to_vec();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM contacts c
                 WHERE c.is_unsubscribed = 0
                   AND (json_array_length(?1) = 0 OR EXISTS (
                        SELECT 1 FROM json_each(c.tags) t
                        WHERE t.value IN (SELECT value FROM json_each(?1))))",
                params![to_json(&tags)?],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Flag the contact as unsubscribed. Returns true only if the flag flipped.
pub async fn mark_unsubscribed(db: &Database, phone: &str) -> Result<bool, BeaconError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE contacts SET is_unsubscribed = 1
                 WHERE phone = ?1 AND is_unsubscribed = 0",
                params![phone],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct tags across all contacts, sorted.
pub async fn list_tags(db: &Database) -> Result<Vec<String>, BeaconError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT t.value FROM contacts c, json_each(c.tags) t
                 ORDER BY t.value ASC",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
