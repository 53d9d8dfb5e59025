// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template mirror refresh from the provider account.

use tracing::info;

use beacon_core::{BeaconError, CampaignStore, MessagingGateway, TemplateStatus};

/// Counts from one template sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub approved: usize,
}

/// Fetches every provider template and upserts it by provider id.
///
/// Templates deleted on the provider side are left in place; campaigns
/// may still reference them.
pub async fn sync_templates(
    gateway: &dyn MessagingGateway,
    store: &dyn CampaignStore,
) -> Result<SyncReport, BeaconError> {
    let templates = gateway.list_templates().await?;
    let mut report = SyncReport::default();
    for template in &templates {
        store.upsert_template(template).await?;
        report.synced += 1;
        if template.status == TemplateStatus::Approved {
            report.approved += 1;
        }
    }
    info!(synced = report.synced, approved = report.approved, "templates synced");
    Ok(report)
}
