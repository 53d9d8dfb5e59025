// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook routes: subscription handshake and event delivery.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use beacon_whatsapp::webhook::{
    events_from_json, verify_signature, verify_subscription, SIGNATURE_HEADER,
};

use crate::error::ErrorResponse;
use crate::server::GatewayState;

/// Query parameters of the verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET {webhook_path}
///
/// Echoes `hub.challenge` as plain text when the token matches, else 403.
pub async fn verify(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let challenge = verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        state.webhook.verify_token.as_deref(),
    );
    match challenge {
        Some(challenge) => (StatusCode::OK, challenge.to_string()).into_response(),
        None => {
            warn!("webhook verification failed");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST {webhook_path}
///
/// Acknowledges with 200 once the payload parses, whatever happens to the
/// individual events; the provider retries anything else.
pub async fn receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.webhook.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature mismatch");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("invalid signature")),
            )
                .into_response();
        }
    }

    // Only a body that is not JSON at all is refused; odd shapes are ignored.
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("malformed payload: {e}"))),
            )
                .into_response();
        }
    };

    let events = events_from_json(payload);
    let report = state.reconciler.apply_all(&events).await;
    debug!(
        events = events.len(),
        applied = report.statuses_applied,
        unmatched = report.statuses_unmatched,
        unsubscribed = report.unsubscribed,
        errors = report.errors,
        "webhook processed"
    );

    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}
