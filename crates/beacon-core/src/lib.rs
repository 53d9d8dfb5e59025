// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Beacon broadcast engine.
//!
//! This crate provides the error type, the campaign domain model, the phone
//! normalizer, and the adapter traits (messaging gateway, record store, step
//! orchestrator) that the dispatcher and reconciler are written against.

pub mod error;
pub mod phone;
pub mod state;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BeaconError;
pub use phone::normalize_phone;
pub use types::{
    AdapterType, Campaign, CampaignFilter, CampaignLog, CampaignStatus, Contact, DeliveryStatus,
    HealthStatus, SendOutcome, Template, TemplateCategory, TemplateMessage, TemplateStatus,
    TextMessage, WebhookEvent,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    CampaignStore, MessagingGateway, PluginAdapter, StepOrchestrator, run_typed_step,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_error_has_all_variants() {
        let _config = BeaconError::Config("test".into());
        let _storage = BeaconError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _gateway = BeaconError::Gateway {
            message: "test".into(),
            source: None,
        };
        let _not_found = BeaconError::NotFound {
            entity: "campaign",
            id: "c-1".into(),
        };
        let _transition = BeaconError::InvalidTransition {
            from: CampaignStatus::Completed,
            to: CampaignStatus::Sending,
        };
        let _validation = BeaconError::Validation("test".into());
        let _timeout = BeaconError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = BeaconError::Internal("test".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_gateway<T: MessagingGateway>() {}
        fn _assert_store<T: CampaignStore>() {}
        fn _assert_orchestrator<T: StepOrchestrator>() {}
    }
}
