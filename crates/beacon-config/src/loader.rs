// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order: `./beacon.toml` > `~/.config/beacon/beacon.toml` > `/etc/beacon/beacon.toml`,
//! with `BEACON_` environment variables overriding every file.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BeaconConfig;

/// Config sections addressable through `BEACON_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "server",
    "storage",
    "whatsapp",
    "dispatch",
    "scheduler",
    "gateway",
];

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/beacon/beacon.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "beacon.toml";

/// Per-user config file under the XDG config directory, if one can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beacon").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/beacon/beacon.toml`
/// 3. `~/.config/beacon/beacon.toml`
/// 4. `./beacon.toml`
/// 5. `BEACON_*` environment variables
pub fn load_config() -> Result<BeaconConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML document only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `BEACON_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `BEACON_WHATSAPP_ACCESS_TOKEN` maps to `whatsapp.access_token`.
fn env_provider() -> Env {
    Env::prefixed("BEACON_").map(|key| env_key_to_path(&key.as_str().to_ascii_lowercase()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn env_key_to_path(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(
            env_key_to_path("whatsapp_access_token"),
            "whatsapp.access_token"
        );
        assert_eq!(env_key_to_path("dispatch_chunk_size"), "dispatch.chunk_size");
        assert_eq!(env_key_to_path("gateway_port"), "gateway.port");
        assert_eq!(
            env_key_to_path("scheduler_poll_interval_secs"),
            "scheduler.poll_interval_secs"
        );
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(env_key_to_path("unrelated_value"), "unrelated_value");
        assert_eq!(env_key_to_path("gatewayport"), "gatewayport");
    }

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str("[dispatch]\nchunk_size = 7\n").unwrap();
        assert_eq!(config.dispatch.chunk_size, 7);
        assert_eq!(config.dispatch.chunk_pause_ms, 2000);
    }
}
