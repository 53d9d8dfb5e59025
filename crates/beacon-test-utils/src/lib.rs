// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Beacon integration tests.
//!
//! Provides a scripted messaging gateway and a harness over a temporary
//! SQLite store for fast, deterministic tests without the Cloud API.
//!
//! # Components
//!
//! - [`MockGateway`] - Messaging gateway with per-recipient outcomes and captured sends
//! - [`TestHarness`] - Temp store plus mock gateway plus seeding helpers

pub mod harness;
pub mod mock_gateway;

pub use harness::TestHarness;
pub use mock_gateway::MockGateway;
