// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: foreground dispatch, template sync, phone check.

use std::sync::Arc;

use beacon_config::BeaconConfig;
use beacon_core::phone::normalize_phone_with_country;
use beacon_core::{BeaconError, CampaignStore, MessagingGateway};
use beacon_dispatch::templates::sync_templates;
use beacon_dispatch::{DispatchSettings, Dispatcher, JournalOrchestrator};
use beacon_storage::SqliteStore;
use beacon_whatsapp::WhatsAppGateway;

/// Runs or resumes one campaign in the foreground and prints its report.
pub async fn run_dispatch(config: &BeaconConfig, campaign_id: &str) -> Result<(), BeaconError> {
    let store: Arc<dyn CampaignStore> = Arc::new(SqliteStore::open(config.storage.clone()).await?);
    let gateway: Arc<dyn MessagingGateway> = Arc::new(WhatsAppGateway::new(&config.whatsapp)?);
    let dispatcher = Dispatcher::new(
        store.clone(),
        gateway,
        Arc::new(JournalOrchestrator::new(store)),
        DispatchSettings::from(&config.dispatch),
    );

    let report = dispatcher.dispatch(campaign_id).await?;
    print_json(&report)
}

/// Refreshes the template mirror from the business account.
pub async fn run_templates_sync(config: &BeaconConfig) -> Result<(), BeaconError> {
    let store = SqliteStore::open(config.storage.clone()).await?;
    let gateway = WhatsAppGateway::new(&config.whatsapp)?;
    let report = sync_templates(&gateway, &store).await?;
    println!(
        "synced {} templates ({} approved)",
        report.synced, report.approved
    );
    Ok(())
}

/// Canonical form of `raw`, or `None` when it is not a usable phone.
pub fn normalize(config: &BeaconConfig, raw: &str) -> Option<String> {
    normalize_phone_with_country(raw, &config.dispatch.default_country_code)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), BeaconError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| BeaconError::Internal(format!("failed to render report: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uses_configured_country_code() {
        let mut config = BeaconConfig::default();
        assert_eq!(
            normalize(&config, "98765 43210").as_deref(),
            Some("+919876543210")
        );

        config.dispatch.default_country_code = "44".into();
        assert_eq!(
            normalize(&config, "07911123456").as_deref(),
            Some("+447911123456")
        );
        assert_eq!(normalize(&config, "123"), None);
    }
}
