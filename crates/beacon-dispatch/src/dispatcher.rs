// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked, paced, resumable campaign dispatch.
//!
//! A dispatch first takes the campaign's ownership lease (see
//! [`crate::lease`]), then runs a fixed sequence of journaled steps:
//!
//! 1. `load-campaign`: snapshot the campaign and freeze its template.
//! 2. `claim-campaign`: compare-and-set DRAFT/SCHEDULED to SENDING.
//! 3. `resolve-audience`: the authoritative recipient list and its size.
//! 4. `process-chunk-{i}` then `pause-after-chunk-{i}` for every chunk.
//! 5. `finish-campaign`: COMPLETED with the final counts.
//!
//! Rerunning a dispatch replays finished steps from the journal, so an
//! interrupted campaign resumes at the first unfinished chunk. Only the
//! lease holder may do so.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use beacon_config::model::DispatchConfig;
use beacon_core::{
    BeaconError, Campaign, CampaignLog, CampaignStatus, CampaignStore, DeliveryStatus,
    MessagingGateway, SendOutcome, StepOrchestrator, run_typed_step,
};

use crate::audience::{self, Recipient};
use crate::lease::DispatchLease;
use crate::render::{FrozenTemplate, render_message};
use crate::timestamp_now;

/// Dispatch tuning taken from `[dispatch]`.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub chunk_size: usize,
    pub chunk_pause: Duration,
    pub send_timeout: Duration,
    pub default_display_name: String,
    /// Concurrent sends within a chunk.
    pub max_in_flight: usize,
    pub lease_ttl: Duration,
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            default_display_name: config.default_display_name.clone(),
            max_in_flight: config.max_in_flight.max(1),
            lease_ttl: Duration::from_secs(config.lease_ttl_secs.max(1)),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CampaignSnapshot {
    campaign: Campaign,
    template: Option<FrozenTemplate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FinalCounts {
    success_count: i64,
    total_audience: i64,
}

/// Per-chunk tally, journaled as the chunk step's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// Accepted by the gateway and logged as `sent`.
    pub sent: usize,
    /// Rejected or timed out, logged as `failed`.
    pub failed: usize,
    /// Sent or attempted, but the log row could not be written.
    pub unrecorded: usize,
    /// Already held a log row from an earlier attempt.
    pub skipped: usize,
}

impl ChunkReport {
    fn absorb(&mut self, other: ChunkReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.unrecorded += other.unrecorded;
        self.skipped += other.skipped;
    }
}

/// Result of one dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub campaign_id: String,
    pub status: CampaignStatus,
    /// Resolved audience size.
    pub total: i64,
    /// Log rows at `sent` or better when the campaign finished.
    pub success_count: i64,
    pub chunks: usize,
    pub sent: usize,
    pub failed: usize,
    pub unrecorded: usize,
    pub skipped: usize,
}

enum ContactResult {
    Sent,
    Failed,
    Unrecorded,
    AlreadyLogged,
}

/// Executes campaign dispatches against a store, a gateway, and a journal.
pub struct Dispatcher {
    store: Arc<dyn CampaignStore>,
    gateway: Arc<dyn MessagingGateway>,
    orchestrator: Arc<dyn StepOrchestrator>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        gateway: Arc<dyn MessagingGateway>,
        orchestrator: Arc<dyn StepOrchestrator>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            orchestrator,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs or resumes the dispatch of `campaign_id`.
    ///
    /// Fails with `NotFound` when the campaign or its template is missing,
    /// and with `Validation` when the template is not APPROVED. Both mark the
    /// campaign FAILED. Fails with `InvalidTransition` when the campaign
    /// cannot be claimed or another dispatcher holds its lease.
    pub async fn dispatch(&self, campaign_id: &str) -> Result<DispatchReport, BeaconError> {
        let current = self
            .store
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| not_found("campaign", campaign_id))?;
        if current.status.is_terminal() {
            return Err(BeaconError::InvalidTransition {
                from: current.status,
                to: CampaignStatus::Sending,
            });
        }

        let lease =
            DispatchLease::acquire(self.store.clone(), campaign_id, self.settings.lease_ttl).await?;
        let result = self.run(campaign_id, &lease).await;
        lease.release().await;
        result
    }

    async fn run(
        &self,
        campaign_id: &str,
        lease: &DispatchLease,
    ) -> Result<DispatchReport, BeaconError> {
        let orchestrator = self.orchestrator.as_ref();
        let store = self.store.as_ref();

        let snapshot: CampaignSnapshot =
            run_typed_step(orchestrator, campaign_id, "load-campaign", async {
                let campaign = store
                    .get_campaign(campaign_id)
                    .await?
                    .ok_or_else(|| not_found("campaign", campaign_id))?;
                let template = store
                    .get_template(&campaign.template_id)
                    .await?
                    .map(FrozenTemplate::from);
                Ok(CampaignSnapshot { campaign, template })
            })
            .await?;

        let _claimed: bool = run_typed_step(orchestrator, campaign_id, "claim-campaign", async {
            if store
                .transition_campaign(campaign_id, CampaignStatus::Sending)
                .await?
            {
                return Ok(true);
            }
            match store.get_campaign(campaign_id).await? {
                Some(c) => Err(BeaconError::InvalidTransition {
                    from: c.status,
                    to: CampaignStatus::Sending,
                }),
                None => Err(not_found("campaign", campaign_id)),
            }
        })
        .await?;
        info!(campaign_id, "campaign claimed for sending");

        let template_id = snapshot.campaign.template_id;
        let template = match snapshot.template {
            Some(template) if template.is_dispatchable() => template,
            Some(template) => {
                warn!(
                    campaign_id,
                    template_id = %template_id,
                    status = %template.status,
                    "template not approved, failing campaign"
                );
                self.fail_campaign(campaign_id).await?;
                return Err(BeaconError::Validation(format!(
                    "template {template_id} is {}, only APPROVED templates can be sent",
                    template.status
                )));
            }
            None => {
                warn!(campaign_id, template_id = %template_id, "template missing, failing campaign");
                self.fail_campaign(campaign_id).await?;
                return Err(not_found("template", &template_id));
            }
        };

        let tags = &snapshot.campaign.audience_tags;
        let recipients: Vec<Recipient> =
            run_typed_step(orchestrator, campaign_id, "resolve-audience", async {
                let recipients = audience::resolve(store, tags).await?;
                store
                    .set_total_audience(campaign_id, recipients.len() as i64)
                    .await?;
                Ok(recipients)
            })
            .await?;
        info!(
            campaign_id,
            audience = recipients.len(),
            chunk_size = self.settings.chunk_size,
            "audience resolved"
        );

        let mut totals = ChunkReport::default();
        let mut chunks = 0;
        for (index, chunk) in recipients.chunks(self.settings.chunk_size).enumerate() {
            lease.confirm().await?;
            let step = format!("process-chunk-{index}");
            let report: ChunkReport = run_typed_step(
                orchestrator,
                campaign_id,
                &step,
                self.process_chunk(campaign_id, &template, chunk),
            )
            .await?;
            debug!(
                campaign_id,
                chunk = index,
                sent = report.sent,
                failed = report.failed,
                unrecorded = report.unrecorded,
                skipped = report.skipped,
                "chunk finished"
            );
            totals.absorb(report);
            chunks += 1;

            let pause = format!("pause-after-chunk-{index}");
            orchestrator
                .sleep(campaign_id, &pause, self.settings.chunk_pause)
                .await?;
        }

        let total_audience = recipients.len() as i64;
        let counts: FinalCounts =
            run_typed_step(orchestrator, campaign_id, "finish-campaign", async {
                let success_count = store
                    .count_successful_logs(campaign_id)
                    .await?
                    .min(total_audience);
                if !store
                    .finalize_campaign(
                        campaign_id,
                        CampaignStatus::Completed,
                        success_count,
                        total_audience,
                    )
                    .await?
                {
                    warn!(campaign_id, "campaign left SENDING before it could be completed");
                }
                Ok(FinalCounts {
                    success_count,
                    total_audience,
                })
            })
            .await?;

        info!(
            campaign_id,
            total = counts.total_audience,
            success = counts.success_count,
            failed = totals.failed,
            unrecorded = totals.unrecorded,
            "campaign completed"
        );

        Ok(DispatchReport {
            campaign_id: campaign_id.to_string(),
            status: CampaignStatus::Completed,
            total: counts.total_audience,
            success_count: counts.success_count,
            chunks,
            sent: totals.sent,
            failed: totals.failed,
            unrecorded: totals.unrecorded,
            skipped: totals.skipped,
        })
    }

    async fn fail_campaign(&self, campaign_id: &str) -> Result<(), BeaconError> {
        let store = self.store.as_ref();
        let _failed: bool =
            run_typed_step(self.orchestrator.as_ref(), campaign_id, "fail-campaign", async {
                store
                    .finalize_campaign(campaign_id, CampaignStatus::Failed, 0, 0)
                    .await
            })
            .await?;
        Ok(())
    }

    /// Sends one chunk with at most `max_in_flight` concurrent sends. Contacts already logged for the
    /// campaign are skipped, so a re-executed chunk never sends twice.
    async fn process_chunk(
        &self,
        campaign_id: &str,
        template: &FrozenTemplate,
        chunk: &[Recipient],
    ) -> Result<ChunkReport, BeaconError> {
        let logged: HashSet<String> = self
            .store
            .logged_contact_ids(campaign_id)
            .await?
            .into_iter()
            .collect();

        let mut report = ChunkReport::default();
        let pending: Vec<&Recipient> = chunk
            .iter()
            .filter(|r| !logged.contains(&r.contact_id))
            .collect();
        report.skipped = chunk.len() - pending.len();

        let semaphore = Semaphore::new(self.settings.max_in_flight);
        let results = join_all(pending.into_iter().map(|recipient| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return ContactResult::Unrecorded;
                };
                self.send_one(campaign_id, template, recipient).await
            }
        }))
        .await;

        for result in results {
            match result {
                ContactResult::Sent => report.sent += 1,
                ContactResult::Failed => report.failed += 1,
                ContactResult::Unrecorded => report.unrecorded += 1,
                ContactResult::AlreadyLogged => report.skipped += 1,
            }
        }

        match self.store.count_successful_logs(campaign_id).await {
            Ok(success) => {
                if let Err(e) = self.store.record_progress(campaign_id, success).await {
                    warn!(campaign_id, error = %e, "failed to record progress");
                }
            }
            Err(e) => warn!(campaign_id, error = %e, "failed to count successful logs"),
        }

        Ok(report)
    }

    async fn send_one(
        &self,
        campaign_id: &str,
        template: &FrozenTemplate,
        recipient: &Recipient,
    ) -> ContactResult {
        let message = render_message(template, recipient, &self.settings.default_display_name);
        let outcome =
            match tokio::time::timeout(self.settings.send_timeout, self.gateway.send_template(&message))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => SendOutcome::TransportError {
                    message: format!("timed out after {:?}", self.settings.send_timeout),
                },
            };

        let accepted = outcome.is_accepted();
        let log = CampaignLog {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: campaign_id.to_string(),
            contact_id: recipient.contact_id.clone(),
            provider_message_id: outcome.provider_message_id().map(str::to_string),
            status: if accepted {
                DeliveryStatus::Sent
            } else {
                DeliveryStatus::Failed
            },
            error_reason: outcome.error_reason(),
            updated_at: timestamp_now(),
        };

        if !accepted {
            debug!(
                campaign_id,
                contact_id = %recipient.contact_id,
                reason = log.error_reason.as_deref().unwrap_or(""),
                "message not accepted"
            );
        }

        match self.store.insert_log(&log).await {
            Ok(true) if accepted => ContactResult::Sent,
            Ok(true) => ContactResult::Failed,
            Ok(false) => ContactResult::AlreadyLogged,
            Err(e) => {
                warn!(
                    campaign_id,
                    contact_id = %recipient.contact_id,
                    provider_message_id = log.provider_message_id.as_deref().unwrap_or(""),
                    error = %e,
                    "failed to record delivery log"
                );
                ContactResult::Unrecorded
            }
        }
    }
}

fn not_found(entity: &'static str, id: &str) -> BeaconError {
    BeaconError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::TemplateStatus;
    use beacon_test_utils::TestHarness;

    use super::*;
    use crate::orchestrator::JournalOrchestrator;

    fn dispatcher(harness: &TestHarness) -> Dispatcher {
        Dispatcher::new(
            harness.store(),
            harness.gateway(),
            Arc::new(JournalOrchestrator::new(harness.store())),
            DispatchSettings::from(&harness.config.dispatch),
        )
    }

    #[test]
    fn settings_follow_config() {
        let settings = DispatchSettings::from(&DispatchConfig {
            chunk_size: 0,
            ..DispatchConfig::default()
        });
        assert_eq!(settings.chunk_size, 1);
        assert_eq!(settings.chunk_pause, Duration::from_secs(2));
        assert_eq!(settings.send_timeout, Duration::from_secs(20));
        assert_eq!(settings.default_display_name, "Customer");
        assert_eq!(settings.max_in_flight, 10);
        assert_eq!(settings.lease_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn missing_campaign_is_not_found() {
        let harness = TestHarness::new().await.unwrap();
        let err = dispatcher(&harness).dispatch("nope").await.unwrap_err();
        assert!(err.is_campaign_fatal());
    }

    #[tokio::test]
    async fn missing_template_fails_the_campaign() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_contact("+919876543210", None, &[]).await.unwrap();
        let campaign = harness
            .seed_campaign("tpl-gone", CampaignStatus::Draft, &[])
            .await
            .unwrap();

        let err = dispatcher(&harness).dispatch(&campaign.id).await.unwrap_err();
        assert!(matches!(err, BeaconError::NotFound { entity: "template", .. }));

        let stored = harness.store.get_campaign(&campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Failed);
        assert!(harness.store.list_logs(&campaign.id).await.unwrap().is_empty());
        assert_eq!(harness.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn terminal_campaign_is_rejected() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let campaign = harness
            .seed_campaign("tpl-1", CampaignStatus::Completed, &[])
            .await
            .unwrap();

        let err = dispatcher(&harness).dispatch(&campaign.id).await.unwrap_err();
        assert!(matches!(
            err,
            BeaconError::InvalidTransition {
                from: CampaignStatus::Completed,
                to: CampaignStatus::Sending
            }
        ));
    }

    #[tokio::test]
    async fn sending_campaign_without_a_journaled_claim_is_rejected() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let campaign = harness
            .seed_campaign("tpl-1", CampaignStatus::Sending, &[])
            .await
            .unwrap();

        let err = dispatcher(&harness).dispatch(&campaign.id).await.unwrap_err();
        assert!(matches!(
            err,
            BeaconError::InvalidTransition {
                from: CampaignStatus::Sending,
                ..
            }
        ));
        assert_eq!(harness.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn audience_filter_is_honoured() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        harness
            .seed_contact("+919876543210", Some("Asha"), &["vip"])
            .await
            .unwrap();
        harness
            .seed_contact("+919876543211", Some("Ravi"), &["mumbai"])
            .await
            .unwrap();
        let campaign = harness
            .seed_campaign("tpl-1", CampaignStatus::Draft, &["vip"])
            .await
            .unwrap();

        let report = dispatcher(&harness).dispatch(&campaign.id).await.unwrap();
        assert_eq!(report.total, 1);
        let sent = harness.gateway.sent_templates().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "919876543210");
        assert_eq!(sent[0].body_parameters, vec!["Asha".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_send_times_out_as_failed_log() {
        let harness = TestHarness::builder()
            .with_send_timeout_secs(1)
            .build()
            .await
            .unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let contact = harness.seed_contact("+919876543210", None, &[]).await.unwrap();
        let campaign = harness
            .seed_campaign("tpl-1", CampaignStatus::Draft, &[])
            .await
            .unwrap();
        harness.gateway.set_delay(Some(Duration::from_secs(60))).await;

        let report = dispatcher(&harness).dispatch(&campaign.id).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.success_count, 0);

        let logs = harness.store.list_logs(&campaign.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].contact_id, contact.id);
        assert_eq!(logs[0].status, DeliveryStatus::Failed);
        assert!(logs[0].error_reason.as_deref().unwrap().contains("timed out"));
    }
}
