// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side delivery metrics over the campaign log.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use beacon_core::{BeaconError, Campaign, CampaignFilter, CampaignStatus, CampaignStore, DeliveryStatus};

/// Delivery and read rates for one campaign or for all campaigns.
///
/// Rates are whole percentages rounded half away from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    /// Every log row, whatever its status.
    pub total_sent: u64,
    /// `delivered` or `read`.
    pub delivered: u64,
    pub read: u64,
    pub failed: u64,
    /// `delivered / total_sent`, 0 when nothing was sent.
    pub delivery_rate: u32,
    /// `read / delivered`, 0 when nothing was delivered.
    pub read_rate: u32,
}

impl DeliveryMetrics {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = DeliveryStatus>,
    {
        let mut m = DeliveryMetrics::default();
        for status in statuses {
            m.total_sent += 1;
            if status.is_delivered() {
                m.delivered += 1;
            }
            match status {
                DeliveryStatus::Read => m.read += 1,
                DeliveryStatus::Failed => m.failed += 1,
                _ => {}
            }
        }
        m.delivery_rate = percentage(m.delivered, m.total_sent);
        m.read_rate = percentage(m.read, m.delivered);
        m
    }
}

fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

pub async fn campaign_metrics(
    store: &dyn CampaignStore,
    campaign_id: &str,
) -> Result<DeliveryMetrics, BeaconError> {
    let statuses = store.log_statuses(Some(campaign_id)).await?;
    Ok(DeliveryMetrics::from_statuses(statuses))
}

pub async fn global_metrics(store: &dyn CampaignStore) -> Result<DeliveryMetrics, BeaconError> {
    let statuses = store.log_statuses(None).await?;
    Ok(DeliveryMetrics::from_statuses(statuses))
}

/// Aggregate outcome of the completed campaigns that used one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePerformance {
    pub template_id: String,
    pub name: String,
    pub campaigns: u32,
    pub total_audience: i64,
    pub success_count: i64,
    /// Percentage, unrounded.
    pub success_rate: f64,
}

/// Name used when a ranked template no longer exists.
pub const UNKNOWN_TEMPLATE_NAME: &str = "Unknown";

/// Ranks templates by success rate over COMPLETED campaigns.
///
/// Ties keep the larger audience first, then the template id.
pub fn rank_templates(campaigns: &[Campaign], limit: usize) -> Vec<TemplatePerformance> {
    let mut by_template: HashMap<&str, TemplatePerformance> = HashMap::new();
    for campaign in campaigns
        .iter()
        .filter(|c| c.status == CampaignStatus::Completed && !c.template_id.is_empty())
    {
        let entry = by_template
            .entry(campaign.template_id.as_str())
            .or_insert_with(|| TemplatePerformance {
                template_id: campaign.template_id.clone(),
                name: UNKNOWN_TEMPLATE_NAME.to_string(),
                campaigns: 0,
                total_audience: 0,
                success_count: 0,
                success_rate: 0.0,
            });
        entry.campaigns += 1;
        entry.total_audience += campaign.total_audience;
        entry.success_count += campaign.success_count;
    }

    let mut ranked: Vec<TemplatePerformance> = by_template
        .into_values()
        .map(|mut p| {
            p.success_rate = if p.total_audience > 0 {
                p.success_count as f64 / p.total_audience as f64 * 100.0
            } else {
                0.0
            };
            p
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then(b.total_audience.cmp(&a.total_audience))
            .then(a.template_id.cmp(&b.template_id))
    });
    ranked.truncate(limit);
    ranked
}

/// Top templates with their current names filled in.
pub async fn top_templates(
    store: &dyn CampaignStore,
    limit: usize,
) -> Result<Vec<TemplatePerformance>, BeaconError> {
    let filter = CampaignFilter {
        statuses: vec![CampaignStatus::Completed],
        search: None,
    };
    let campaigns = store.list_campaigns(&filter).await?;
    let mut ranked = rank_templates(&campaigns, limit);
    for entry in &mut ranked {
        if let Some(template) = store.get_template(&entry.template_id).await? {
            entry.name = template.name;
        }
    }
    Ok(ranked)
}
