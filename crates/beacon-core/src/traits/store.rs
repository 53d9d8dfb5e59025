// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional record store for contacts, templates, campaigns, delivery
//! logs, and the dispatch step journal.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Campaign, CampaignFilter, CampaignLog, CampaignStatus, Contact, DeliveryStatus, Template,
    TemplateStatus,
};

/// Persistence backend consumed by the dispatcher, the reconciler, and the API.
///
/// Campaign status writes are compare-and-set against the state machine so
/// that two writers can never both move a campaign out of the same state.
#[async_trait]
pub trait CampaignStore: PluginAdapter {
    // --- Contacts ---

    /// Inserts a contact, or updates name and tags of the contact with the same phone.
    async fn upsert_contact(&self, contact: &Contact) -> Result<(), BeaconError>;

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, BeaconError>;

    async fn get_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, BeaconError>;

    /// Subscribed contacts whose tags intersect `tags` (all subscribed contacts
    /// when `tags` is empty), in a stable order.
    async fn list_eligible_contacts(&self, tags: &[String]) -> Result<Vec<Contact>, BeaconError>;

    async fn count_eligible_contacts(&self, tags: &[String]) -> Result<i64, BeaconError>;

    /// Sets `is_unsubscribed` for the contact with `phone`.
    ///
    /// Returns true only when the flag changed from false to true.
    async fn mark_unsubscribed(&self, phone: &str) -> Result<bool, BeaconError>;

    /// Distinct tags across all contacts, sorted.
    async fn list_tags(&self) -> Result<Vec<String>, BeaconError>;

    // --- Templates ---

    async fn upsert_template(&self, template: &Template) -> Result<(), BeaconError>;

    async fn get_template(&self, id: &str) -> Result<Option<Template>, BeaconError>;

    async fn list_templates(
        &self,
        status: Option<TemplateStatus>,
    ) -> Result<Vec<Template>, BeaconError>;

    // --- Campaigns ---

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), BeaconError>;

    async fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, BeaconError>;

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, BeaconError>;

    /// Deletes the campaign if it is a DRAFT. Returns true if a row was removed.
    async fn delete_draft_campaign(&self, id: &str) -> Result<bool, BeaconError>;

    /// Moves the campaign to `to` if its current status is a valid predecessor.
    ///
    /// Returns false when the campaign is missing or in another state.
    async fn transition_campaign(&self, id: &str, to: CampaignStatus) -> Result<bool, BeaconError>;

    /// Records the authoritative audience size of a SENDING campaign.
    async fn set_total_audience(&self, id: &str, total: i64) -> Result<(), BeaconError>;

    /// Raises `success_count` of a SENDING campaign; never lowers it.
    async fn record_progress(&self, id: &str, success_count: i64) -> Result<(), BeaconError>;

    /// Moves a SENDING campaign to a terminal status with its final counts.
    async fn finalize_campaign(
        &self,
        id: &str,
        status: CampaignStatus,
        success_count: i64,
        total_audience: i64,
    ) -> Result<bool, BeaconError>;

    /// SCHEDULED campaigns whose `scheduled_at` is at or before `now` (RFC 3339).
    async fn due_scheduled_campaigns(&self, now: &str) -> Result<Vec<Campaign>, BeaconError>;

    // --- Dispatch leases ---

    /// Takes the dispatch lease of a campaign for `owner` until `expires_at`.
    ///
    /// Succeeds when no lease exists, the existing one expired at `now`, or
    /// `owner` already holds it. Returns false while another owner holds a
    /// live lease.
    async fn acquire_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
        now: &str,
        expires_at: &str,
    ) -> Result<bool, BeaconError>;

    /// Extends a lease still held by `owner`. Returns false once it was lost.
    async fn renew_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
        expires_at: &str,
    ) -> Result<bool, BeaconError>;

    async fn release_dispatch_lease(
        &self,
        campaign_id: &str,
        owner: &str,
    ) -> Result<(), BeaconError>;

    /// SENDING campaigns that no dispatcher holds a live lease on at `now`.
    async fn orphaned_sending_campaigns(&self, now: &str) -> Result<Vec<Campaign>, BeaconError>;

    // --- Delivery logs ---

    /// Inserts a log row. Returns false if the (campaign, contact) pair already has one.
    async fn insert_log(&self, log: &CampaignLog) -> Result<bool, BeaconError>;

    /// Contact ids that already hold a log row for the campaign.
    async fn logged_contact_ids(&self, campaign_id: &str) -> Result<Vec<String>, BeaconError>;

    /// Overwrites status (and error reason, when given) of the row carrying
    /// `provider_message_id`. Returns false when no row matches.
    async fn update_log_status(
        &self,
        provider_message_id: &str,
        status: DeliveryStatus,
        error_reason: Option<&str>,
    ) -> Result<bool, BeaconError>;

    async fn list_logs(&self, campaign_id: &str) -> Result<Vec<CampaignLog>, BeaconError>;

    /// Statuses of every log row for one campaign, or for all campaigns.
    async fn log_statuses(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<DeliveryStatus>, BeaconError>;

    /// Count of `sent`-or-better rows for the campaign.
    async fn count_successful_logs(&self, campaign_id: &str) -> Result<i64, BeaconError>;

    // --- Step journal ---

    async fn get_step(
        &self,
        run_id: &str,
        step: &str,
    ) -> Result<Option<serde_json::Value>, BeaconError>;

    async fn put_step(
        &self,
        run_id: &str,
        step: &str,
        output: &serde_json::Value,
    ) -> Result<(), BeaconError>;
}
