// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Beacon broadcast engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Beacon configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    /// Process-level settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Campaign dispatch pacing.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Scheduled campaign trigger.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// HTTP gateway (webhooks + API).
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "beacon.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API. `None` disables outbound sends.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sending phone number id (`/{phone_number_id}/messages`).
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Business account id used for template sync.
    #[serde(default)]
    pub business_account_id: Option<String>,

    /// Graph API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Graph API version path segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Value of `messaging_product` in outbound payloads.
    #[serde(default = "default_messaging_product")]
    pub messaging_product: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Shared secret echoed back during the webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` verification. `None` skips the check.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Confirmation text sent after an opt-out.
    #[serde(default = "default_unsubscribe_reply")]
    pub unsubscribe_reply: String,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .field("business_account_id", &self.business_account_id)
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("messaging_product", &self.messaging_product)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("unsubscribe_reply", &self.unsubscribe_reply)
            .finish()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            business_account_id: None,
            api_base_url: default_api_base_url(),
            api_version: default_api_version(),
            messaging_product: default_messaging_product(),
            request_timeout_secs: default_request_timeout_secs(),
            verify_token: None,
            app_secret: None,
            unsubscribe_reply: default_unsubscribe_reply(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_messaging_product() -> String {
    "whatsapp".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_unsubscribe_reply() -> String {
    "You have been unsubscribed and will no longer receive these updates.".to_string()
}

/// Campaign dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Contacts per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between chunks, in milliseconds.
    #[serde(default = "default_chunk_pause_ms")]
    pub chunk_pause_ms: u64,

    /// Upper bound on a single send; expiry records a failed message.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Body variable used when a contact has no name.
    #[serde(default = "default_display_name")]
    pub default_display_name: String,

    /// Country prefix for national phone numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Capacity of the campaign trigger queue.
    #[serde(default = "default_trigger_queue_capacity")]
    pub trigger_queue_capacity: usize,

    /// Concurrent sends within one chunk.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Lifetime of a dispatcher's ownership lease on a SENDING campaign.
    /// Renewed while the dispatch runs; a crashed dispatcher's campaign can
    /// be taken over once it expires.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_pause_ms: default_chunk_pause_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            default_display_name: default_display_name(),
            default_country_code: default_country_code(),
            trigger_queue_capacity: default_trigger_queue_capacity(),
            max_in_flight: default_max_in_flight(),
            lease_ttl_secs: default_lease_ttl_secs(),
        }
    }
}

fn default_chunk_size() -> usize {
    50
}

fn default_chunk_pause_ms() -> u64 {
    2000
}

fn default_send_timeout_secs() -> u64 {
    20
}

fn default_display_name() -> String {
    "Customer".to_string()
}

fn default_country_code() -> String {
    "91".to_string()
}

fn default_trigger_queue_capacity() -> usize {
    100
}

fn default_max_in_flight() -> usize {
    10
}

fn default_lease_ttl_secs() -> u64 {
    60
}

/// Scheduled campaign trigger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Poll for due SCHEDULED campaigns.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    30
}

/// HTTP gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the `/v1` API. `None` rejects every API request.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Path of the provider webhook (GET verification, POST delivery).
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .field("webhook_path", &self.webhook_path)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            webhook_path: default_webhook_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "/webhooks/whatsapp".to_string()
}
