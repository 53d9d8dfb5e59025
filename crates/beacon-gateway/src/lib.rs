// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Beacon broadcast engine.
//!
//! Serves the provider webhook (handshake and delivery callbacks), a health
//! endpoint, and the bearer-authenticated `/v1` campaign API.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{router, start_server, GatewayState, HealthState, WebhookSecrets};
