// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beacon - WhatsApp broadcast campaign engine.
//!
//! This is the binary entry point.

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Beacon - WhatsApp broadcast campaign engine.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway, trigger worker, and scheduler.
    Serve,
    /// Run or resume one campaign dispatch in the foreground.
    Dispatch {
        /// Campaign id.
        campaign_id: String,
    },
    /// Manage the local template mirror.
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },
    /// Print the canonical form of a phone number.
    Normalize {
        /// Phone number as entered.
        raw: String,
    },
}

#[derive(Subcommand, Debug)]
enum TemplatesAction {
    /// Fetch every template from the business account and store it.
    Sync,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => beacon_config::load_and_validate_path(path),
        None => beacon_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            beacon_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Dispatch { campaign_id }) => {
            commands::run_dispatch(&config, &campaign_id).await
        }
        Some(Commands::Templates {
            action: TemplatesAction::Sync,
        }) => commands::run_templates_sync(&config).await,
        Some(Commands::Normalize { raw }) => {
            return match commands::normalize(&config, &raw) {
                Some(phone) => {
                    println!("{phone}");
                    ExitCode::SUCCESS
                }
                None => {
                    eprintln!("beacon: not a valid phone number: {raw}");
                    ExitCode::FAILURE
                }
            };
        }
        None => {
            println!("beacon: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("beacon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["beacon", "dispatch", "c-1"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Dispatch { ref campaign_id }) if campaign_id == "c-1"));

        let cli = Cli::try_parse_from(["beacon", "templates", "sync"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Templates {
                action: TemplatesAction::Sync
            })
        ));

        let cli =
            Cli::try_parse_from(["beacon", "--config", "/tmp/b.toml", "normalize", "0987"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/b.toml")));
    }

    #[test]
    fn dispatch_requires_campaign_id() {
        assert!(Cli::try_parse_from(["beacon", "dispatch"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = beacon_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.server.log_level, "info");
    }
}
