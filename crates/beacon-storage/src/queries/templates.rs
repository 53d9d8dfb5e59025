// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template mirror queries.

use beacon_core::{BeaconError, Template, TemplateStatus};
use rusqlite::{Row, params};

use super::{json_column, parse_column, to_json};
use crate::database::{Database, map_tr_err};

const TEMPLATE_COLUMNS: &str = "id, name, category, language, components, status, last_synced_at";

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<Template> {
    let category: Option<String> = row.get(2)?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        category: category.map(|c| parse_column(2, c)).transpose()?,
        language: row.get(3)?,
        components: json_column(4, row.get(4)?)?,
        status: parse_column(5, row.get(5)?)?,
        last_synced_at: row.get(6)?,
    })
}

/// Insert or refresh a template keyed by its provider id.
pub async fn upsert_template(db: &Database, template: &Template) -> Result<(), BeaconError> {
    let template = template.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO templates (id, name, category, language, components, status, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    category = excluded.category,
                    language = excluded.language,
                    components = excluded.components,
                    status = excluded.status,
                    last_synced_at = excluded.last_synced_at",
                params![
                    template.id,
                    template.name,
                    template.category.map(|c| c.to_string()),
                    template.language,
                    to_json(&template.components)?,
                    template.status.to_string(),
                    template.last_synced_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template(db: &Database, id: &str) -> Result<Option<Template>, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Template>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_template) {
                Ok(template) => Ok(Some(template)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Templates ordered by name, optionally restricted to one review status.
pub async fn list_templates(
    db: &Database,
    status: Option<TemplateStatus>,
) -> Result<Vec<Template>, BeaconError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Template>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY name ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;
    use beacon_core::TemplateCategory;

    fn template(id: &str, name: &str, status: TemplateStatus) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            category: Some(TemplateCategory::Marketing),
            language: "en_US".to_string(),
            components: serde_json::json!([{"type": "BODY", "text": "Hi {{1}}"}]),
            status,
            last_synced_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_refreshes_existing_template() {
        let (db, _dir) = setup_db().await;
        upsert_template(&db, &template("t1", "promo", TemplateStatus::Pending))
            .await
            .unwrap();
        upsert_template(&db, &template("t1", "promo", TemplateStatus::Approved))
            .await
            .unwrap();

        let stored = get_template(&db, "t1").await.unwrap().unwrap();
        assert_eq!(stored.status, TemplateStatus::Approved);
        assert_eq!(stored.category, Some(TemplateCategory::Marketing));
        assert_eq!(stored.components[0]["type"], "BODY");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (db, _dir) = setup_db().await;
        upsert_template(&db, &template("t1", "zeta", TemplateStatus::Approved))
            .await
            .unwrap();
        upsert_template(&db, &template("t2", "alpha", TemplateStatus::Approved))
            .await
            .unwrap();
        upsert_template(&db, &template("t3", "beta", TemplateStatus::Rejected))
            .await
            .unwrap();

        let approved = list_templates(&db, Some(TemplateStatus::Approved)).await.unwrap();
        let names: Vec<_> = approved.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(list_templates(&db, None).await.unwrap().len(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_category_round_trips_as_none() {
        let (db, _dir) = setup_db().await;
        let mut t = template("t1", "plain", TemplateStatus::Pending);
        t.category = None;
        upsert_template(&db, &t).await.unwrap();
        assert_eq!(get_template(&db, "t1").await.unwrap().unwrap().category, None);
        db.close().await.unwrap();
    }
}
