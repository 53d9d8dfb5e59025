// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign and contact operations behind the HTTP API and the CLI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use beacon_core::phone::normalize_phone_with_country;
use beacon_core::{
    BeaconError, Campaign, CampaignFilter, CampaignLog, CampaignStatus, CampaignStore, Contact,
};

use crate::audience::{self, normalize_tags};
use crate::trigger::TriggerHandle;
use crate::{format_timestamp, timestamp_now};

/// Input for [`CampaignService::create_campaign`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub template_id: String,
    #[serde(default)]
    pub audience_tags: Vec<String>,
    /// RFC 3339 instant. Absent means send immediately.
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

/// Input for contact upserts and imports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    /// Raw phone as entered; normalized before storage.
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of a batch import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Rows whose phone did not normalize.
    pub skipped: usize,
}

/// Campaign creation, sending, deletion, and contact upkeep.
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    trigger: TriggerHandle,
    country_code: String,
}

impl CampaignService {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        trigger: TriggerHandle,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            store,
            trigger,
            country_code: country_code.into(),
        }
    }

    /// Stores a new campaign. Campaigns without `scheduled_at` are created
    /// as DRAFT and triggered at once; the rest wait as SCHEDULED.
    pub async fn create_campaign(&self, input: NewCampaign) -> Result<Campaign, BeaconError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(BeaconError::Validation("campaign name must not be empty".into()));
        }

        let template = self
            .store
            .get_template(&input.template_id)
            .await?
            .ok_or_else(|| BeaconError::NotFound {
                entity: "template",
                id: input.template_id.clone(),
            })?;
        if !template.is_dispatchable() {
            return Err(BeaconError::Validation(format!(
                "template `{}` is {}, only APPROVED templates can be sent",
                template.name, template.status
            )));
        }

        let scheduled_at = input
            .scheduled_at
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_schedule)
            .transpose()?;

        let audience_tags = normalize_tags(&input.audience_tags);
        let advisory = audience::advisory_count(self.store.as_ref(), &audience_tags).await?;

        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            template_id: template.id,
            status: if scheduled_at.is_some() {
                CampaignStatus::Scheduled
            } else {
                CampaignStatus::Draft
            },
            audience_tags,
            total_audience: advisory,
            success_count: 0,
            scheduled_at,
            created_at: timestamp_now(),
        };
        self.store.insert_campaign(&campaign).await?;
        info!(
            campaign_id = %campaign.id,
            status = %campaign.status,
            audience = advisory,
            "campaign created"
        );

        if campaign.status == CampaignStatus::Draft {
            self.trigger.trigger(&campaign.id).await?;
        }
        Ok(campaign)
    }

    /// Triggers a DRAFT or SCHEDULED campaign now.
    pub async fn send_now(&self, id: &str) -> Result<Campaign, BeaconError> {
        let campaign = self.get_campaign(id).await?;
        if !campaign.status.is_dispatchable() {
            return Err(BeaconError::InvalidTransition {
                from: campaign.status,
                to: CampaignStatus::Sending,
            });
        }
        self.trigger.trigger(id).await?;
        Ok(campaign)
    }

    /// Deletes a DRAFT campaign. Returns false when the campaign exists in
    /// another state.
    pub async fn delete_campaign(&self, id: &str) -> Result<bool, BeaconError> {
        let campaign = self.get_campaign(id).await?;
        if !campaign.status.is_deletable() {
            return Ok(false);
        }
        let deleted = self.store.delete_draft_campaign(id).await?;
        if deleted {
            info!(campaign_id = %id, "campaign deleted");
        }
        Ok(deleted)
    }

    pub async fn get_campaign(&self, id: &str) -> Result<Campaign, BeaconError> {
        self.store
            .get_campaign(id)
            .await?
            .ok_or_else(|| BeaconError::NotFound {
                entity: "campaign",
                id: id.to_string(),
            })
    }

    pub async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, BeaconError> {
        self.store.list_campaigns(filter).await
    }

    pub async fn campaign_logs(&self, id: &str) -> Result<Vec<CampaignLog>, BeaconError> {
        self.get_campaign(id).await?;
        self.store.list_logs(id).await
    }

    /// Re-triggers campaigns left SENDING by an interrupted process.
    pub async fn resume_interrupted(&self) -> Result<usize, BeaconError> {
        let filter = CampaignFilter {
            statuses: vec![CampaignStatus::Sending],
            search: None,
        };
        let sending = self.store.list_campaigns(&filter).await?;
        for campaign in &sending {
            info!(campaign_id = %campaign.id, "resuming interrupted dispatch");
            self.trigger.trigger(&campaign.id).await?;
        }
        Ok(sending.len())
    }

    /// Normalizes and stores one contact, returning the stored record.
    pub async fn upsert_contact(&self, input: NewContact) -> Result<Contact, BeaconError> {
        let contact = self.prepare_contact(&input).ok_or_else(|| {
            BeaconError::Validation(format!("invalid phone number: {}", input.phone))
        })?;
        self.store.upsert_contact(&contact).await?;
        self.store
            .get_contact_by_phone(&contact.phone)
            .await?
            .ok_or_else(|| BeaconError::NotFound {
                entity: "contact",
                id: contact.phone,
            })
    }

    /// Upserts a batch; rows with unusable phones are skipped and counted.
    pub async fn import_contacts(&self, rows: Vec<NewContact>) -> Result<ImportReport, BeaconError> {
        let mut report = ImportReport::default();
        for row in &rows {
            match self.prepare_contact(row) {
                Some(contact) => {
                    self.store.upsert_contact(&contact).await?;
                    report.imported += 1;
                }
                None => {
                    warn!(phone = %row.phone, "skipping contact with invalid phone");
                    report.skipped += 1;
                }
            }
        }
        info!(
            imported = report.imported,
            skipped = report.skipped,
            "contacts imported"
        );
        Ok(report)
    }

    pub async fn audience_count(&self, tags: &[String]) -> Result<i64, BeaconError> {
        audience::advisory_count(self.store.as_ref(), &normalize_tags(tags)).await
    }

    pub async fn list_tags(&self) -> Result<Vec<String>, BeaconError> {
        self.store.list_tags().await
    }

    fn prepare_contact(&self, input: &NewContact) -> Option<Contact> {
        let phone = normalize_phone_with_country(&input.phone, &self.country_code)?;
        Some(Contact {
            id: uuid::Uuid::new_v4().to_string(),
            phone,
            name: input
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            tags: normalize_tags(&input.tags),
            is_unsubscribed: false,
            created_at: timestamp_now(),
        })
    }
}

fn parse_schedule(raw: &str) -> Result<String, BeaconError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| format_timestamp(t.with_timezone(&chrono::Utc)))
        .map_err(|e| BeaconError::Validation(format!("scheduled_at `{raw}` is not RFC 3339: {e}")))
}

#[cfg(test)]
mod tests {
    use beacon_core::TemplateStatus;
    use beacon_test_utils::TestHarness;
    use tokio::sync::mpsc;

    use super::*;
    use crate::trigger::TriggerEvent;

    async fn service(harness: &TestHarness) -> (CampaignService, mpsc::Receiver<TriggerEvent>) {
        let (handle, rx) = TriggerHandle::channel(16);
        (CampaignService::new(harness.store(), handle, "91"), rx)
    }

    fn new_campaign(template_id: &str) -> NewCampaign {
        NewCampaign {
            name: "Diwali".into(),
            template_id: template_id.into(),
            ..NewCampaign::default()
        }
    }

    #[test]
    fn schedule_is_normalized_to_utc() {
        assert_eq!(
            parse_schedule("2026-11-01T10:30:00+05:30").unwrap(),
            "2026-11-01T05:00:00.000Z"
        );
        assert!(matches!(
            parse_schedule("tomorrow"),
            Err(BeaconError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn immediate_campaign_is_draft_and_triggered() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        harness.seed_contact("+919876543210", None, &["vip"]).await.unwrap();
        harness.seed_contact("+919876543211", None, &[]).await.unwrap();
        let (svc, mut rx) = service(&harness).await;

        let mut input = new_campaign("tpl-1");
        input.audience_tags = vec![" vip ".into()];
        let campaign = svc.create_campaign(input).await.unwrap();

        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.total_audience, 1);
        assert_eq!(campaign.audience_tags, vec!["vip".to_string()]);
        assert_eq!(rx.recv().await.unwrap().campaign_id, campaign.id);
    }

    #[tokio::test]
    async fn scheduled_campaign_waits() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let (svc, mut rx) = service(&harness).await;

        let mut input = new_campaign("tpl-1");
        input.scheduled_at = Some("2030-01-01T00:00:00Z".into());
        let campaign = svc.create_campaign(input).await.unwrap();

        assert_eq!(campaign.status, CampaignStatus::Scheduled);
        assert_eq!(campaign.scheduled_at.as_deref(), Some("2030-01-01T00:00:00.000Z"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unapproved_or_missing_template_is_rejected() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-p", TemplateStatus::Pending).await.unwrap();
        let (svc, _rx) = service(&harness).await;

        let pending = svc.create_campaign(new_campaign("tpl-p")).await.unwrap_err();
        assert!(matches!(pending, BeaconError::Validation(_)));

        let missing = svc.create_campaign(new_campaign("tpl-x")).await.unwrap_err();
        assert!(matches!(missing, BeaconError::NotFound { entity: "template", .. }));

        let mut blank = new_campaign("tpl-p");
        blank.name = "   ".into();
        assert!(matches!(
            svc.create_campaign(blank).await.unwrap_err(),
            BeaconError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn only_drafts_are_deleted() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let draft = harness
            .seed_campaign("tpl-1", CampaignStatus::Draft, &[])
            .await
            .unwrap();
        let done = harness
            .seed_campaign("tpl-1", CampaignStatus::Completed, &[])
            .await
            .unwrap();
        let (svc, _rx) = service(&harness).await;

        assert!(svc.delete_campaign(&draft.id).await.unwrap());
        assert!(!svc.delete_campaign(&done.id).await.unwrap());
        assert!(matches!(
            svc.delete_campaign(&draft.id).await.unwrap_err(),
            BeaconError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn send_now_rejects_finished_campaigns() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let done = harness
            .seed_campaign("tpl-1", CampaignStatus::Completed, &[])
            .await
            .unwrap();
        let scheduled = harness
            .seed_campaign("tpl-1", CampaignStatus::Scheduled, &[])
            .await
            .unwrap();
        let (svc, mut rx) = service(&harness).await;

        assert!(matches!(
            svc.send_now(&done.id).await.unwrap_err(),
            BeaconError::InvalidTransition { .. }
        ));
        svc.send_now(&scheduled.id).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().campaign_id, scheduled.id);
    }

    #[tokio::test]
    async fn sending_campaigns_are_resumed() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        let sending = harness
            .seed_campaign("tpl-1", CampaignStatus::Sending, &[])
            .await
            .unwrap();
        harness
            .seed_campaign("tpl-1", CampaignStatus::Draft, &[])
            .await
            .unwrap();
        let (svc, mut rx) = service(&harness).await;

        assert_eq!(svc.resume_interrupted().await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().campaign_id, sending.id);
    }

    #[tokio::test]
    async fn contacts_are_normalized_and_merged_by_phone() {
        let harness = TestHarness::new().await.unwrap();
        let (svc, _rx) = service(&harness).await;

        let first = svc
            .upsert_contact(NewContact {
                phone: "098765 43210".into(),
                name: Some("Asha".into()),
                tags: vec!["vip".into()],
            })
            .await
            .unwrap();
        assert_eq!(first.phone, "+919876543210");

        let second = svc
            .upsert_contact(NewContact {
                phone: "+91 98765-43210".into(),
                name: Some("Asha K".into()),
                tags: vec!["delhi".into()],
            })
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Asha K"));
        assert_eq!(second.tags, vec!["delhi".to_string()]);

        let err = svc
            .upsert_contact(NewContact {
                phone: "12345".into(),
                ..NewContact::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Validation(_)));
    }

    #[tokio::test]
    async fn import_skips_invalid_phones() {
        let harness = TestHarness::new().await.unwrap();
        let (svc, _rx) = service(&harness).await;

        let rows = vec![
            NewContact {
                phone: "9876543210".into(),
                tags: vec!["vip".into()],
                ..NewContact::default()
            },
            NewContact {
                phone: "abc".into(),
                ..NewContact::default()
            },
            NewContact {
                phone: "9876543211".into(),
                ..NewContact::default()
            },
        ];
        let report = svc.import_contacts(rows).await.unwrap();
        assert_eq!(report, ImportReport { imported: 2, skipped: 1 });
        assert_eq!(svc.audience_count(&[]).await.unwrap(), 2);
        assert_eq!(svc.audience_count(&["vip".into()]).await.unwrap(), 1);
        assert_eq!(svc.list_tags().await.unwrap(), vec!["vip".to_string()]);
    }
}
