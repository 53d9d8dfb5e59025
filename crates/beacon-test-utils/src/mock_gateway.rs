// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `MessagingGateway` with scripted per-recipient
//! outcomes and captured template/text sends for assertion in tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::{
    AdapterType, BeaconError, HealthStatus, MessagingGateway, PluginAdapter, SendOutcome,
    Template, TemplateMessage, TextMessage,
};

/// A mock WhatsApp gateway for testing.
///
/// Every recipient is accepted with a fresh `wamid.mock-N` id unless an
/// outcome was scripted for it via [`MockGateway::script_outcome`].
pub struct MockGateway {
    scripted: Arc<Mutex<HashMap<String, SendOutcome>>>,
    sent_templates: Arc<Mutex<Vec<TemplateMessage>>>,
    sent_texts: Arc<Mutex<Vec<TextMessage>>>,
    templates: Arc<Mutex<Vec<Template>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    health: Arc<Mutex<HealthStatus>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockGateway {
    /// Create a gateway that accepts everything.
    pub fn new() -> Self {
        Self {
            scripted: Arc::new(Mutex::new(HashMap::new())),
            sent_templates: Arc::new(Mutex::new(Vec::new())),
            sent_texts: Arc::new(Mutex::new(Vec::new())),
            templates: Arc::new(Mutex::new(Vec::new())),
            delay: Arc::new(Mutex::new(None)),
            health: Arc::new(Mutex::new(HealthStatus::Healthy)),
            next_id: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Return `outcome` for every send addressed to `to` (digits only).
    pub async fn script_outcome(&self, to: &str, outcome: SendOutcome) {
        self.scripted.lock().await.insert(to.to_string(), outcome);
    }

    /// Reject sends to `to` with an HTTP error.
    pub async fn reject(&self, to: &str, status: u16, body: &str) {
        self.script_outcome(
            to,
            SendOutcome::GatewayError {
                status,
                body: body.to_string(),
            },
        )
        .await;
    }

    /// Hold every send for `delay` before answering.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Status reported by `health_check()`.
    pub async fn set_health(&self, status: HealthStatus) {
        *self.health.lock().await = status;
    }

    /// Templates returned by `list_templates()`.
    pub async fn set_templates(&self, templates: Vec<Template>) {
        *self.templates.lock().await = templates;
    }

    /// All template messages submitted, in submission order.
    pub async fn sent_templates(&self) -> Vec<TemplateMessage> {
        self.sent_templates.lock().await.clone()
    }

    /// All text messages submitted, in submission order.
    pub async fn sent_texts(&self) -> Vec<TextMessage> {
        self.sent_texts.lock().await.clone()
    }

    /// Number of template messages submitted.
    pub async fn sent_count(&self) -> usize {
        self.sent_templates.lock().await.len()
    }

    /// Highest number of sends that were awaiting an answer at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, to: &str) -> SendOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let pending = InFlight(&self.in_flight);

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        drop(pending);

        if let Some(outcome) = self.scripted.lock().await.get(to) {
            return outcome.clone();
        }
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        SendOutcome::Accepted {
            provider_message_id: format!("wamid.mock-{n}"),
        }
    }
}

/// Decrements the in-flight count even when a caller's timeout drops the send.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(self.health.lock().await.clone())
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_template(&self, msg: &TemplateMessage) -> SendOutcome {
        // Captured before the delay so timed-out sends are still visible.
        self.sent_templates.lock().await.push(msg.clone());
        self.answer(&msg.to).await
    }

    async fn send_text(&self, msg: &TextMessage) -> SendOutcome {
        self.sent_texts.lock().await.push(msg.clone());
        self.answer(&msg.to).await
    }

    async fn list_templates(&self) -> Result<Vec<Template>, BeaconError> {
        Ok(self.templates.lock().await.clone())
    }
}
