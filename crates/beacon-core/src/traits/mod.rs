// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! The gateway and the store extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod gateway;
pub mod orchestrator;
pub mod store;

pub use adapter::PluginAdapter;
pub use gateway::MessagingGateway;
pub use orchestrator::{StepOrchestrator, run_typed_step};
pub use store::CampaignStore;
