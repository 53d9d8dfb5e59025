// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the CampaignStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use beacon_config::model::StorageConfig;
use beacon_core::{
    AdapterType, BeaconError, Campaign, CampaignFilter, CampaignLog, CampaignStatus,
    CampaignStore, Contact, DeliveryStatus, HealthStatus, PluginAdapter, Template,
    TemplateStatus,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed campaign store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize a store in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, BeaconError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), BeaconError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BeaconError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, BeaconError> {
        self.db.get().ok_or_else(|| BeaconError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    // --- Contacts ---

    async fn upsert_contact(&self, contact: &Contact) -> Result<(), BeaconError> {
        queries::contacts::upsert_contact(self.db()?, contact).await
    }

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, BeaconError> {
        queries::contacts::get_contact(self.db()?, id).await
    }

    async fn get_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, BeaconError> {
        queries::contacts::get_contact_by_phone(self.db()?, phone).await
    }

    async fn list_eligible_contacts(&self, tags: &[String]) -> Result<Vec<Contact>, BeaconError> {
        queries::contacts::list_eligible_contacts(self.db()?, tags).await
    }

    async fn count_eligible_contacts(&self, tags: &[String]) -> Result<i64, BeaconError> {
        queries::contacts::count_eligible_contacts(self.db()?, tags).await
    }

    async fn mark_unsubscribed(&self, phone: &str) -> Result<bool, BeaconError> {
        queries::contacts::mark_unsubscribed(self.db()?, phone).await
    }

    async fn list_tags(&self) -> Result<Vec<String>, BeaconError> {
        queries::contacts::list_tags(self.db()?).await
    }

    // --- Templates ---

    async fn upsert_template(&self, template: &Template) -> Result<(), BeaconError> {
        queries::templates::upsert_template(self.db()?, template).await
    }

    async fn get_template(&self, id: &str) -> Result<Option<Template>, BeaconError> {
        queries::templates::get_template(self.db()?, id).await
    }

    async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> Result<Vec<Template>, BeaconError> {
        queries::templates::list_templates(self.db()?, status).await
    }

    // --- Campaigns ---

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), BeaconError> {
        queries::campaigns::insert_campaign(self.db()?, campaign).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, BeaconError> {
        queries::campaigns::get_campaign(self.db()?, id).await
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, BeaconError> {
        queries::campaigns::list_campaigns(self.db()?, filter).await
    }

    async fn delete_draft_campaign(&self, id: &str) -> Result<bool, BeaconError> {
        queries::campaigns::delete_draft_campaign(self.db()?, id).await
    }

    async fn transition_campaign(&self, id: &str, to: CampaignStatus) -> Result<bool, BeaconError> {
        queries::campaigns::transition_campaign(self.db()?, id, to).await
    }

    async fn set_total_audience(&self, id: &str, total: i64) -> Result<(), BeaconError> {
        queries::campaigns::set_total_audience(self.db()?, id, total).await
    }

    async fn record_progress(&self, id: &str, success_count: i64) -> Result<(), BeaconError> {
        queries::campaigns::record_progress(self.db()?, id, success_count).await
    }

    async fn finalize_campaign(
        &self,
        id: &str,
        status: CampaignStatus,
        success_count: i64,
        total_audience: i64,
    ) -> Result<bool, BeaconError> {
        queries::campaigns::finalize_campaign(self.db()?, id, status, success_count, total_audience)
            .await
    }

    async fn due_scheduled_campaigns(&self, now: &str) -> Result<Vec<Campaign>, BeaconError> {
        queries::campaigns::due_scheduled_campaigns(self.db()?, now).await
    }

    // --- Dispatch leases ---

    async fn acquire_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
        now: &str,
        expires_at: &str,
    ) -> Result<bool, BeaconError> {
        queries::leases::acquire_lease(self.db()?, campaign_id, owner, now, expires_at).await
    }

    async fn renew_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
        expires_at: &str,
    ) -> Result<bool, BeaconError> {
        queries::leases::renew_lease(self.db()?, campaign_id, owner, expires_at).await
    }

    async fn release_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
    ) -> Result<(), BeaconError> {
        queries::leases::release_lease(self.db()?, campaign_id, owner).await
    }

    async fn orphaned_sending_campaigns(&self, now: &str) -> Result<Vec<Campaign>, BeaconError> {
        queries::leases::orphaned_sending_campaigns(self.db()?, now).await
    }

    // --- Delivery logs ---

    async fn insert_log(&self, log: &CampaignLog) -> Result<bool, BeaconError> {
        queries::logs::insert_log(self.db()?, log).await
    }

    async fn logged_contact_ids(&self, campaign_id: &str) -> Result<Vec<String>, BeaconError> {
        queries::logs::logged_contact_ids(self.db()?, campaign_id).await
    }

    async fn update_log_status(
        &self,
        provider_message_id: &str,
        status: DeliveryStatus,
        error_reason: Option<&str>,
    ) -> Result<bool, BeaconError> {
        queries::logs::update_log_status(self.db()?, provider_message_id, status, error_reason)
            .await
    }

    async fn list_logs(&self, campaign_id: &str) -> Result<Vec<CampaignLog>, BeaconError> {
        queries::logs::list_logs(self.db()?, campaign_id).await
    }

    async fn log_statuses(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<DeliveryStatus>, BeaconError> {
        queries::logs::log_statuses(self.db()?, campaign_id).await
    }

    async fn count_successful_logs(&self, campaign_id: &str) -> Result<i64, BeaconError> {
        queries::logs::count_successful_logs(self.db()?, campaign_id).await
    }

    // --- Step journal ---

    async fn get_step(
        &self,
        run_id: &str,
        step: &str,
    ) -> Result<Option<serde_json::Value>, BeaconError> {
        queries::steps::get_step(self.db()?, run_id, step).await
    }

    async fn put_step(
        &self,
        run_id: &str,
        step: &str,
        output: &serde_json::Value,
    ) -> Result<(), BeaconError> {
        queries::steps::put_step(self.db()?, run_id, step, output).await
    }
}
