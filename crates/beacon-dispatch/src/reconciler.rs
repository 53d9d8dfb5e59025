// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery status reconciliation and opt-out handling.
//!
//! Provider callbacks may arrive more than once and in any order. Status
//! updates are blind overwrites keyed by provider message id and the
//! unsubscribe flag only ever moves to true, so replaying a callback is safe.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use beacon_core::phone::normalize_phone_with_country;
use beacon_core::{
    BeaconError, CampaignStore, DeliveryStatus, MessagingGateway, TextMessage, WebhookEvent,
};

/// Bodies that opt a subscriber out, compared after trimming and lowercasing.
pub const STOP_KEYWORDS: [&str; 4] = ["stop", "unsubscribe", "remove", "opt out"];

/// Returns true if `body` is exactly one of [`STOP_KEYWORDS`].
pub fn is_stop_keyword(body: &str) -> bool {
    let normalized = body.trim().to_lowercase();
    STOP_KEYWORDS.contains(&normalized.as_str())
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    StatusApplied,
    /// No log row carries the provider message id.
    StatusUnmatched,
    Unsubscribed,
    AlreadyUnsubscribed,
    UnknownContact,
    Ignored,
}

/// Tally of one webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub statuses_applied: usize,
    pub statuses_unmatched: usize,
    pub unsubscribed: usize,
    pub ignored: usize,
    pub errors: usize,
}

/// Applies webhook events to the store.
pub struct Reconciler {
    store: Arc<dyn CampaignStore>,
    gateway: Arc<dyn MessagingGateway>,
    unsubscribe_reply: String,
    country_code: String,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        gateway: Arc<dyn MessagingGateway>,
        unsubscribe_reply: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            unsubscribe_reply: unsubscribe_reply.into(),
            country_code: country_code.into(),
        }
    }

    /// Applies every event. Failures are logged and counted, never returned,
    /// so the webhook can always acknowledge.
    pub async fn apply_all(&self, events: &[WebhookEvent]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for event in events {
            match self.apply(event).await {
                Ok(EventOutcome::StatusApplied) => report.statuses_applied += 1,
                Ok(EventOutcome::StatusUnmatched) => report.statuses_unmatched += 1,
                Ok(EventOutcome::Unsubscribed) => report.unsubscribed += 1,
                Ok(_) => report.ignored += 1,
                Err(e) => {
                    warn!(error = %e, "failed to apply webhook event");
                    report.errors += 1;
                }
            }
        }
        report
    }

    /// Applies a single event.
    pub async fn apply(&self, event: &WebhookEvent) -> Result<EventOutcome, BeaconError> {
        match event {
            WebhookEvent::StatusUpdate {
                provider_message_id,
                status,
                error_reason,
            } => {
                self.apply_status(provider_message_id, *status, error_reason.as_deref())
                    .await
            }
            WebhookEvent::IncomingMessage { from, body } => match body.as_deref() {
                Some(body) if is_stop_keyword(body) => self.unsubscribe(from).await,
                _ => Ok(EventOutcome::Ignored),
            },
            WebhookEvent::Ignored { reason } => {
                debug!(reason = %reason, "ignoring webhook item");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    async fn apply_status(
        &self,
        provider_message_id: &str,
        status: DeliveryStatus,
        error_reason: Option<&str>,
    ) -> Result<EventOutcome, BeaconError> {
        let matched = self
            .store
            .update_log_status(provider_message_id, status, error_reason)
            .await?;
        if matched {
            debug!(provider_message_id, status = %status, "delivery status applied");
            Ok(EventOutcome::StatusApplied)
        } else {
            debug!(provider_message_id, "status for unknown message ignored");
            Ok(EventOutcome::StatusUnmatched)
        }
    }

    async fn unsubscribe(&self, from: &str) -> Result<EventOutcome, BeaconError> {
        let Some(phone) = normalize_phone_with_country(from, &self.country_code) else {
            debug!(from, "opt-out from unparseable sender ignored");
            return Ok(EventOutcome::Ignored);
        };

        if !self.store.mark_unsubscribed(&phone).await? {
            return Ok(match self.store.get_contact_by_phone(&phone).await? {
                Some(_) => EventOutcome::AlreadyUnsubscribed,
                None => EventOutcome::UnknownContact,
            });
        }
        info!(phone = %phone, "contact unsubscribed");

        let reply = TextMessage {
            to: from.to_string(),
            body: self.unsubscribe_reply.clone(),
        };
        let outcome = self.gateway.send_text(&reply).await;
        if let Some(reason) = outcome.error_reason() {
            warn!(phone = %phone, reason = %reason, "unsubscribe confirmation not delivered");
        }
        Ok(EventOutcome::Unsubscribed)
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{CampaignLog, CampaignStatus, TemplateStatus};
    use beacon_test_utils::TestHarness;
    use tracing_test::traced_test;

    use super::*;

    fn reconciler(harness: &TestHarness) -> Reconciler {
        Reconciler::new(harness.store(), harness.gateway(), "bye", "91")
    }

    #[test]
    fn stop_keywords_ignore_case_and_padding() {
        assert!(is_stop_keyword("STOP"));
        assert!(is_stop_keyword("  Opt Out "));
        assert!(is_stop_keyword("unsubscribe"));
        assert!(!is_stop_keyword("please stop"));
        assert!(!is_stop_keyword("optout"));
        assert!(!is_stop_keyword(""));
    }

    async fn seed_log(harness: &TestHarness, wamid: &str) -> (String, String) {
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let contact = harness.seed_contact("+919876543210", None, &[]).await.unwrap();
        let campaign = harness
            .seed_campaign("tpl-1", CampaignStatus::Sending, &[])
            .await
            .unwrap();
        let log = CampaignLog {
            id: "log-1".into(),
            campaign_id: campaign.id.clone(),
            contact_id: contact.id.clone(),
            provider_message_id: Some(wamid.into()),
            status: DeliveryStatus::Sent,
            error_reason: None,
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        assert!(harness.store.insert_log(&log).await.unwrap());
        (campaign.id, contact.id)
    }

    #[tokio::test]
    async fn status_update_overwrites_the_matching_row() {
        let harness = TestHarness::new().await.unwrap();
        let (campaign_id, _) = seed_log(&harness, "wamid.A").await;
        let rec = reconciler(&harness);

        let event = WebhookEvent::StatusUpdate {
            provider_message_id: "wamid.A".into(),
            status: DeliveryStatus::Delivered,
            error_reason: None,
        };
        assert_eq!(rec.apply(&event).await.unwrap(), EventOutcome::StatusApplied);

        let logs = harness.store.list_logs(&campaign_id).await.unwrap();
        assert_eq!(logs[0].status, DeliveryStatus::Delivered);
        assert_ne!(logs[0].updated_at, "2026-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn failed_status_records_reason() {
        let harness = TestHarness::new().await.unwrap();
        let (campaign_id, _) = seed_log(&harness, "wamid.A").await;

        let event = WebhookEvent::StatusUpdate {
            provider_message_id: "wamid.A".into(),
            status: DeliveryStatus::Failed,
            error_reason: Some("Message undeliverable".into()),
        };
        reconciler(&harness).apply(&event).await.unwrap();

        let logs = harness.store.list_logs(&campaign_id).await.unwrap();
        assert_eq!(logs[0].status, DeliveryStatus::Failed);
        assert_eq!(logs[0].error_reason.as_deref(), Some("Message undeliverable"));
    }

    #[tokio::test]
    async fn unsubscribe_reply_goes_to_the_sender() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_contact("+919876543210", None, &[]).await.unwrap();

        let event = WebhookEvent::IncomingMessage {
            from: "919876543210".into(),
            body: Some("Stop".into()),
        };
        let outcome = reconciler(&harness).apply(&event).await.unwrap();
        assert_eq!(outcome, EventOutcome::Unsubscribed);

        let texts = harness.gateway.sent_texts().await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].to, "919876543210");
        assert_eq!(texts[0].body, "bye");
    }

    #[tokio::test]
    async fn stop_from_unknown_sender_is_a_no_op() {
        let harness = TestHarness::new().await.unwrap();
        let event = WebhookEvent::IncomingMessage {
            from: "919000000000".into(),
            body: Some("stop".into()),
        };
        let outcome = reconciler(&harness).apply(&event).await.unwrap();
        assert_eq!(outcome, EventOutcome::UnknownContact);
        assert!(harness.gateway.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn ordinary_text_is_ignored() {
        let harness = TestHarness::new().await.unwrap();
        let contact = harness.seed_contact("+919876543210", None, &[]).await.unwrap();
        let event = WebhookEvent::IncomingMessage {
            from: "919876543210".into(),
            body: Some("when is the sale?".into()),
        };
        let outcome = reconciler(&harness).apply(&event).await.unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);

        let stored = harness.store.get_contact(&contact.id).await.unwrap().unwrap();
        assert!(!stored.is_unsubscribed);
    }

    #[tokio::test]
    async fn apply_all_tallies_outcomes() {
        let harness = TestHarness::new().await.unwrap();
        seed_log(&harness, "wamid.A").await;

        let events = vec![
            WebhookEvent::StatusUpdate {
                provider_message_id: "wamid.A".into(),
                status: DeliveryStatus::Read,
                error_reason: None,
            },
            WebhookEvent::StatusUpdate {
                provider_message_id: "wamid.ghost".into(),
                status: DeliveryStatus::Read,
                error_reason: None,
            },
            WebhookEvent::IncomingMessage {
                from: "919876543210".into(),
                body: Some("UNSUBSCRIBE".into()),
            },
            WebhookEvent::Ignored {
                reason: "object page".into(),
            },
        ];
        let report = reconciler(&harness).apply_all(&events).await;
        assert_eq!(
            report,
            ReconcileReport {
                statuses_applied: 1,
                statuses_unmatched: 1,
                unsubscribed: 1,
                ignored: 1,
                errors: 0,
            }
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn ignored_items_are_logged_and_counted() {
        let harness = TestHarness::new().await.unwrap();
        let events = vec![WebhookEvent::Ignored {
            reason: "unsupported object `page`".into(),
        }];

        let report = reconciler(&harness).apply_all(&events).await;
        assert_eq!(report.ignored, 1);
        assert_eq!(report.errors, 0);
        assert!(logs_contain("ignoring webhook item"));
    }
}
