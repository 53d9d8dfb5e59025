// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a valid bind host, non-zero pacing values and digit-only country codes.

use crate::diagnostic::ConfigError;
use crate::model::BeaconConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BeaconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.server.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "server.log_level `{}` must be one of: {}",
            config.server.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let wa = &config.whatsapp;
    if !(wa.api_base_url.starts_with("http://") || wa.api_base_url.starts_with("https://")) {
        fail(format!(
            "whatsapp.api_base_url `{}` must start with http:// or https://",
            wa.api_base_url
        ));
    }
    if wa.api_version.trim().is_empty() {
        fail("whatsapp.api_version must not be empty".to_string());
    }
    if wa.request_timeout_secs == 0 {
        fail("whatsapp.request_timeout_secs must be at least 1".to_string());
    }

    let dispatch = &config.dispatch;
    if dispatch.chunk_size == 0 {
        fail("dispatch.chunk_size must be at least 1".to_string());
    }
    if dispatch.send_timeout_secs == 0 {
        fail("dispatch.send_timeout_secs must be at least 1".to_string());
    }
    if dispatch.trigger_queue_capacity == 0 {
        fail("dispatch.trigger_queue_capacity must be at least 1".to_string());
    }
    if dispatch.max_in_flight == 0 {
        fail("dispatch.max_in_flight must be at least 1".to_string());
    }
    if dispatch.lease_ttl_secs < dispatch.send_timeout_secs.saturating_mul(2) {
        fail(format!(
            "dispatch.lease_ttl_secs ({}) must be at least twice dispatch.send_timeout_secs ({})",
            dispatch.lease_ttl_secs, dispatch.send_timeout_secs
        ));
    }
    if dispatch.default_country_code.is_empty()
        || !dispatch
            .default_country_code
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        fail(format!(
            "dispatch.default_country_code `{}` must contain digits only",
            dispatch.default_country_code
        ));
    }

    if config.scheduler.enabled && config.scheduler.poll_interval_secs == 0 {
        fail("scheduler.poll_interval_secs must be at least 1 when the scheduler is enabled".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }
    if config.gateway.port == 0 {
        fail("gateway.port must not be 0".to_string());
    }
    if !config.gateway.webhook_path.starts_with('/') {
        fail(format!(
            "gateway.webhook_path `{}` must start with `/`",
            config.gateway.webhook_path
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
