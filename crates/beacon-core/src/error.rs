// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Beacon broadcast engine.

use thiserror::Error;

use crate::types::CampaignStatus;

/// The primary error type used across all Beacon adapter traits and core operations.
///
/// Per-message send failures are not errors: they travel as
/// [`SendOutcome`](crate::types::SendOutcome) values instead.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors outside of a single message send
    /// (client construction, template listing, server bind).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A campaign status change that the state machine does not allow.
    #[error("invalid campaign transition: {from} -> {to}")]
    InvalidTransition {
        from: CampaignStatus,
        to: CampaignStatus,
    },

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BeaconError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true when the error aborts a whole campaign dispatch
    /// (the campaign or its template record is missing).
    pub fn is_campaign_fatal(&self) -> bool {
        matches!(
            self,
            BeaconError::NotFound {
                entity: "campaign" | "template",
                ..
            }
        )
    }
}
