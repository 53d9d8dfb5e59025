// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness over a temporary SQLite store and a mock gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use beacon_config::BeaconConfig;
use beacon_config::model::{DispatchConfig, StorageConfig};
use beacon_core::{
    BeaconError, Campaign, CampaignStatus, CampaignStore, Contact, MessagingGateway, Template,
    TemplateCategory, TemplateStatus,
};
use beacon_storage::SqliteStore;

use crate::mock_gateway::MockGateway;

/// Builder for a [`TestHarness`].
pub struct TestHarnessBuilder {
    chunk_size: usize,
    chunk_pause_ms: u64,
    send_timeout_secs: u64,
    max_in_flight: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            chunk_size: DispatchConfig::default().chunk_size,
            chunk_pause_ms: 0,
            send_timeout_secs: 5,
            max_in_flight: DispatchConfig::default().max_in_flight,
        }
    }

    /// Contacts per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Pause between chunks. The harness default is zero.
    pub fn with_chunk_pause_ms(mut self, ms: u64) -> Self {
        self.chunk_pause_ms = ms;
        self
    }

    /// Per-message send timeout.
    pub fn with_send_timeout_secs(mut self, secs: u64) -> Self {
        self.send_timeout_secs = secs;
        self
    }

    /// Concurrent sends within a chunk.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Build the harness, creating the temp database.
    pub async fn build(self) -> Result<TestHarness, BeaconError> {
        let temp_dir = tempfile::TempDir::new().map_err(BeaconError::storage)?;
        let db_path = temp_dir.path().join("beacon-test.db");

        let storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(storage.clone()).await?);

        let config = BeaconConfig {
            storage,
            dispatch: DispatchConfig {
                chunk_size: self.chunk_size,
                chunk_pause_ms: self.chunk_pause_ms,
                send_timeout_secs: self.send_timeout_secs,
                max_in_flight: self.max_in_flight,
                ..DispatchConfig::default()
            },
            ..BeaconConfig::default()
        };

        Ok(TestHarness {
            store,
            gateway: Arc::new(MockGateway::new()),
            config,
            seq: AtomicI64::new(0),
            _temp_dir: temp_dir,
        })
    }
}

/// A test environment with a mock gateway and a temp store.
pub struct TestHarness {
    /// SQLite store (temp DB, removed on drop).
    pub store: Arc<SqliteStore>,
    /// The scripted gateway.
    pub gateway: Arc<MockGateway>,
    /// Configuration with zero chunk pause.
    pub config: BeaconConfig,
    seq: AtomicI64,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Build a harness with default settings.
    pub async fn new() -> Result<Self, BeaconError> {
        Self::builder().build().await
    }

    /// The store as the trait object the services consume.
    pub fn store(&self) -> Arc<dyn CampaignStore> {
        self.store.clone()
    }

    /// The gateway as the trait object the services consume.
    pub fn gateway(&self) -> Arc<dyn MessagingGateway> {
        self.gateway.clone()
    }

    /// Strictly increasing timestamps so seeded rows sort in seeding order.
    fn next_timestamp(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let base = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .map(|t| t.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());
        (base + chrono::Duration::milliseconds(n))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    /// Seed a subscribed contact. `phone` must already be canonical.
    pub async fn seed_contact(
        &self,
        phone: &str,
        name: Option<&str>,
        tags: &[&str],
    ) -> Result<Contact, BeaconError> {
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            name: name.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_unsubscribed: false,
            created_at: self.next_timestamp(),
        };
        self.store.upsert_contact(&contact).await?;
        Ok(contact)
    }

    /// Seed a contact that has already opted out.
    pub async fn seed_unsubscribed_contact(&self, phone: &str) -> Result<Contact, BeaconError> {
        let mut contact = self.seed_contact(phone, None, &[]).await?;
        self.store.mark_unsubscribed(phone).await?;
        contact.is_unsubscribed = true;
        Ok(contact)
    }

    /// Seed a template with a single-variable body.
    pub async fn seed_template(
        &self,
        id: &str,
        status: TemplateStatus,
    ) -> Result<Template, BeaconError> {
        let template = Template {
            id: id.to_string(),
            name: format!("{id}_name"),
            category: Some(TemplateCategory::Marketing),
            language: "en_US".to_string(),
            components: serde_json::json!([
                {"type": "BODY", "text": "Hello {{1}}, our sale starts today."}
            ]),
            status,
            last_synced_at: self.next_timestamp(),
        };
        self.store.upsert_template(&template).await?;
        Ok(template)
    }

    /// Seed a campaign in `status` targeting `tags`.
    pub async fn seed_campaign(
        &self,
        template_id: &str,
        status: CampaignStatus,
        tags: &[&str],
    ) -> Result<Campaign, BeaconError> {
        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Test campaign".to_string(),
            template_id: template_id.to_string(),
            status,
            audience_tags: tags.iter().map(|t| t.to_string()).collect(),
            total_audience: 0,
            success_count: 0,
            scheduled_at: None,
            created_at: self.next_timestamp(),
        };
        self.store.insert_campaign(&campaign).await?;
        Ok(campaign)
    }
}
