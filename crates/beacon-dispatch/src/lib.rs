// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign execution for the Beacon broadcast engine.
//!
//! The [`Dispatcher`] sends one campaign in paced, checkpointed chunks
//! through a [`JournalOrchestrator`]. The [`Reconciler`] applies provider
//! callbacks to the delivery log. [`TriggerWorker`] and [`Scheduler`] decide
//! when dispatches start, and [`CampaignService`] is the creation flow the
//! HTTP API and CLI call into.

pub mod audience;
pub mod dispatcher;
pub mod lease;
pub mod metrics;
pub mod orchestrator;
pub mod reconciler;
pub mod render;
pub mod service;
pub mod templates;
pub mod trigger;

pub use audience::Recipient;
pub use dispatcher::{DispatchReport, DispatchSettings, Dispatcher};
pub use metrics::{DeliveryMetrics, TemplatePerformance};
pub use orchestrator::JournalOrchestrator;
pub use reconciler::{ReconcileReport, Reconciler};
pub use service::{CampaignService, ImportReport, NewCampaign, NewContact};
pub use trigger::{Scheduler, TriggerEvent, TriggerHandle, TriggerWorker};

/// Current time in the millisecond RFC 3339 form the store writes.
pub(crate) fn timestamp_now() -> String {
    format_timestamp(chrono::Utc::now())
}

pub(crate) fn format_timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
