// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign queries. Every status write is a compare-and-set.

use beacon_core::{BeaconError, Campaign, CampaignFilter, CampaignStatus};
use rusqlite::{Row, params};

use super::{json_column, parse_column, to_json};
use crate::database::{Database, map_tr_err};

pub(crate) const CAMPAIGN_COLUMNS: &str = "id, name, template_id, status, audience_tags, total_audience, \
                                success_count, scheduled_at, created_at";

pub(crate) fn row_to_campaign(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        template_id: row.get(2)?,
        status: parse_column(3, row.get(3)?)?,
        audience_tags: json_column(4, row.get(4)?)?,
        total_audience: row.get(5)?,
        success_count: row.get(6)?,
        scheduled_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn status_list(statuses: &[CampaignStatus]) -> rusqlite::Result<String> {
    let names: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    to_json(&names)
}

pub async fn insert_campaign(db: &Database, campaign: &Campaign) -> Result<(), BeaconError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO campaigns (id, name, template_id, status, audience_tags,
                    total_audience, success_count, scheduled_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    campaign.id,
                    campaign.name,
                    campaign.template_id,
                    campaign.status.to_string(),
                    to_json(&campaign.audience_tags)?,
                    campaign.total_audience,
                    campaign.success_count,
                    campaign.scheduled_at,
                    campaign.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Campaign>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_campaign) {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Campaigns matching the filter, newest first.
pub async fn list_campaigns(
    db: &Database,
    filter: &CampaignFilter,
) -> Result<Vec<Campaign>, BeaconError> {
    let statuses = filter.statuses.clone();
    let search = filter
        .search
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    db.connection()
        .call(move |conn| -> Result<Vec<Campaign>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE (json_array_length(?1) = 0
                        OR status IN (SELECT value FROM json_each(?1)))
                   AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0)
                 ORDER BY created_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![status_list(&statuses)?, search], row_to_campaign)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a DRAFT campaign. Returns true if a row was removed.
pub async fn delete_draft_campaign(db: &Database, id: &str) -> Result<bool, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute(
                "DELETE FROM campaigns WHERE id = ?1 AND status = 'DRAFT'",
                params![id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Move the campaign to `to` if it currently sits in one of `to`'s predecessors.
pub async fn transition_campaign(
    db: &Database,
    id: &str,
    to: CampaignStatus,
) -> Result<bool, BeaconError> {
    let id = id.to_string();
    let from = CampaignStatus::predecessors(to);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE campaigns SET status = ?2
                 WHERE id = ?1 AND status IN (SELECT value FROM json_each(?3))",
                params![id, to.to_string(), status_list(from)?],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_total_audience(db: &Database, id: &str, total: i64) -> Result<(), BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE campaigns SET total_audience = ?2
                 WHERE id = ?1 AND status = 'SENDING'",
                params![id, total],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Raise `success_count` of a SENDING campaign. Never lowers it.
pub async fn record_progress(
    db: &Database,
    id: &str,
    success_count: i64,
) -> Result<(), BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE campaigns SET success_count = MAX(success_count, ?2)
                 WHERE id = ?1 AND status = 'SENDING'",
                params![id, success_count],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Move a SENDING campaign to a terminal status and store its final counts.
pub async fn finalize_campaign(
    db: &Database,
    id: &str,
    status: CampaignStatus,
    success_count: i64,
    total_audience: i64,
) -> Result<bool, BeaconError> {
    CampaignStatus::Sending.transition_to(status)?;
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE campaigns
                 SET status = ?2, success_count = ?3, total_audience = ?4
                 WHERE id = ?1 AND status = 'SENDING'",
                params![id, status.to_string(), success_count, total_audience],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// SCHEDULED campaigns due at `now`, earliest first.
pub async fn due_scheduled_campaigns(
    db: &Database,
    now: &str,
) -> Result<Vec<Campaign>, BeaconError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Campaign>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE status = 'SCHEDULED'
                   AND scheduled_at IS NOT NULL
                   AND julianday(scheduled_at) <= julianday(?1)
                 ORDER BY julianday(scheduled_at) ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_campaign)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{campaign, setup_db};

    #[tokio::test]
    async fn insert_and_get_campaign() {
        let (db, _dir) = setup_db().await;
        let mut c = campaign("k1", CampaignStatus::Draft);
        c.audience_tags = vec!["vip".to_string()];
        insert_campaign(&db, &c).await.unwrap();

        assert_eq!(get_campaign(&db, "k1").await.unwrap(), Some(c));
        assert!(get_campaign(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &campaign("k1", CampaignStatus::Draft)).await.unwrap();

        assert!(transition_campaign(&db, "k1", CampaignStatus::Sending).await.unwrap());
        // A second claim loses.
        assert!(!transition_campaign(&db, "k1", CampaignStatus::Sending).await.unwrap());
        // SENDING cannot go back to SCHEDULED.
        assert!(!transition_campaign(&db, "k1", CampaignStatus::Scheduled).await.unwrap());
        assert!(transition_campaign(&db, "k1", CampaignStatus::Completed).await.unwrap());
        assert!(!transition_campaign(&db, "missing", CampaignStatus::Sending).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn progress_is_monotonic() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &campaign("k1", CampaignStatus::Sending)).await.unwrap();

        record_progress(&db, "k1", 5).await.unwrap();
        record_progress(&db, "k1", 3).await.unwrap();
        assert_eq!(get_campaign(&db, "k1").await.unwrap().unwrap().success_count, 5);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finalize_requires_sending_and_terminal_target() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &campaign("k1", CampaignStatus::Sending)).await.unwrap();
        insert_campaign(&db, &campaign("k2", CampaignStatus::Draft)).await.unwrap();

        let err = finalize_campaign(&db, "k1", CampaignStatus::Draft, 0, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::InvalidTransition { .. }));

        assert!(
            finalize_campaign(&db, "k1", CampaignStatus::Completed, 4, 5)
                .await
                .unwrap()
        );
        assert!(
            !finalize_campaign(&db, "k2", CampaignStatus::Completed, 0, 0)
                .await
                .unwrap()
        );

        let done = get_campaign(&db, "k1").await.unwrap().unwrap();
        assert_eq!(done.status, CampaignStatus::Completed);
        assert_eq!((done.success_count, done.total_audience), (4, 5));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn only_drafts_are_deleted() {
        let (db, _dir) = setup_db().await;
        insert_campaign(&db, &campaign("k1", CampaignStatus::Draft)).await.unwrap();
        insert_campaign(&db, &campaign("k2", CampaignStatus::Completed)).await.unwrap();

        assert!(delete_draft_campaign(&db, "k1").await.unwrap());
        assert!(!delete_draft_campaign(&db, "k2").await.unwrap());
        assert!(get_campaign(&db, "k2").await.unwrap().is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_status_and_name() {
        let (db, _dir) = setup_db().await;
        let mut a = campaign("k1", CampaignStatus::Draft);
        a.name = "Diwali Promo".to_string();
        let mut b = campaign("k2", CampaignStatus::Completed);
        b.name = "Weekly digest".to_string();
        insert_campaign(&db, &a).await.unwrap();
        insert_campaign(&db, &b).await.unwrap();

        let all = list_campaigns(&db, &CampaignFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let completed = list_campaigns(
            &db,
            &CampaignFilter {
                statuses: vec![CampaignStatus::Completed],
                search: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "k2");

        let promo = list_campaigns(
            &db,
            &CampaignFilter {
                statuses: vec![],
                search: Some("PROMO".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(promo.len(), 1);
        assert_eq!(promo[0].id, "k1");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_scheduled_campaigns_compares_instants() {
        let (db, _dir) = setup_db().await;
        let mut due = campaign("k1", CampaignStatus::Scheduled);
        due.scheduled_at = Some("2026-03-01T10:00:00Z".to_string());
        let mut later = campaign("k2", CampaignStatus::Scheduled);
        later.scheduled_at = Some("2026-03-01T12:00:00.000Z".to_string());
        let mut draft = campaign("k3", CampaignStatus::Draft);
        draft.scheduled_at = Some("2026-03-01T09:00:00Z".to_string());
        for c in [&due, &later, &draft] {
            insert_campaign(&db, c).await.unwrap();
        }

        let found = due_scheduled_campaigns(&db, "2026-03-01T10:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "k1");
        db.close().await.unwrap();
    }
}
