// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use beacon_config::model::GatewayConfig;
use beacon_core::{BeaconError, CampaignStore, MessagingGateway};
use beacon_dispatch::{CampaignService, Reconciler};

use crate::auth::{auth_middleware, AuthConfig};
use crate::{handlers, webhook};

/// Health state for the unauthenticated health endpoint.
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

/// Secrets used by the provider webhook routes.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    /// Expected `hub.verify_token`. `None` fails every handshake.
    pub verify_token: Option<String>,
    /// HMAC key for `X-Hub-Signature-256`. `None` skips verification.
    pub app_secret: Option<String>,
}

impl std::fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecrets")
            .field(
                "verify_token",
                &self.verify_token.as_ref().map(|_| "[redacted]"),
            )
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn CampaignStore>,
    /// Probed by `/health`.
    pub gateway: Arc<dyn MessagingGateway>,
    pub service: Arc<CampaignService>,
    pub reconciler: Arc<Reconciler>,
    pub webhook: WebhookSecrets,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Builds the full route table.
///
/// Public: `GET /health`, `GET`/`POST {webhook_path}`.
/// Everything under `/v1` requires the bearer token.
pub fn router(state: GatewayState, webhook_path: &str) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route(webhook_path, get(webhook::verify).post(webhook::receive))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/contacts", post(handlers::post_contact))
        .route("/v1/contacts/import", post(handlers::post_contact_import))
        .route("/v1/contacts/tags", get(handlers::get_tags))
        .route("/v1/audience", get(handlers::get_audience))
        .route(
            "/v1/campaigns",
            post(handlers::post_campaign).get(handlers::get_campaigns),
        )
        .route(
            "/v1/campaigns/{id}",
            get(handlers::get_campaign).delete(handlers::delete_campaign),
        )
        .route("/v1/campaigns/{id}/send", post(handlers::post_campaign_send))
        .route("/v1/campaigns/{id}/logs", get(handlers::get_campaign_logs))
        .route(
            "/v1/campaigns/{id}/metrics",
            get(handlers::get_campaign_metrics),
        )
        .route("/v1/metrics", get(handlers::get_metrics))
        .route("/v1/metrics/templates", get(handlers::get_top_templates))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), BeaconError> {
    let app = router(state, &config.webhook_path);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BeaconError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| BeaconError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
