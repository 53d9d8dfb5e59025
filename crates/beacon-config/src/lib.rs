// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beacon configuration.
//!
//! `beacon.toml` is read from the local, user and system locations, then
//! `BEACON_*` environment variables are layered on top. Unknown keys are
//! rejected, and every failure comes back as a [`ConfigError`] that renders
//! with source spans.
//!
//! ```no_run
//! let config = beacon_config::load_and_validate().expect("config errors");
//! println!("chunk size: {}", config.dispatch.chunk_size);
//! ```

use std::path::{Path, PathBuf};

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, TomlSource, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BeaconConfig, DispatchConfig, GatewayConfig, SchedulerConfig, ServerConfig, StorageConfig,
    WhatsAppConfig,
};

/// Loads from the default locations and validates.
pub fn load_and_validate() -> Result<BeaconConfig, Vec<ConfigError>> {
    finish(loader::load_config(), default_sources)
}

/// Loads from `path` (plus env overrides) and validates.
pub fn load_and_validate_path(path: &Path) -> Result<BeaconConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_sources([path.to_path_buf()])
    })
}

/// Loads from an inline TOML document and validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<BeaconConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![TomlSource::new("<inline>", toml_content)]
    })
}

/// Sources are only read when extraction failed, for span lookup.
fn finish(
    loaded: Result<BeaconConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<TomlSource>,
) -> Result<BeaconConfig, Vec<ConfigError>> {
    let config =
        loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn default_sources() -> Vec<TomlSource> {
    let local = std::env::current_dir()
        .map(|dir| dir.join(loader::LOCAL_CONFIG_FILE))
        .unwrap_or_else(|_| PathBuf::from(loader::LOCAL_CONFIG_FILE));
    let candidates = std::iter::once(local)
        .chain(loader::user_config_path())
        .chain(std::iter::once(PathBuf::from(loader::SYSTEM_CONFIG_PATH)));
    read_sources(candidates)
}

fn read_sources(paths: impl IntoIterator<Item = PathBuf>) -> Vec<TomlSource> {
    paths
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some(TomlSource::new(path.display().to_string(), content))
        })
        .collect()
}
