// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway trait (the outbound side of the WhatsApp provider).

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{SendOutcome, Template, TemplateMessage, TextMessage};

/// Outbound messaging provider.
///
/// Constructed once at startup and shared with the dispatcher and the
/// reconciler. Send operations never fail: every attempt resolves to a
/// [`SendOutcome`] so callers can record it.
#[async_trait]
pub trait MessagingGateway: PluginAdapter {
    /// Submits a template message.
    async fn send_template(&self, msg: &TemplateMessage) -> SendOutcome;

    /// Submits a free-form text message.
    async fn send_text(&self, msg: &TextMessage) -> SendOutcome;

    /// Lists the templates registered with the provider account.
    async fn list_templates(&self) -> Result<Vec<Template>, BeaconError>;
}
