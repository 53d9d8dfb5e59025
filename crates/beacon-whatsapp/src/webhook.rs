// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook handling: subscription handshake, payload signature, and
//! translation of delivery envelopes into [`WebhookEvent`]s.

use beacon_core::{DeliveryStatus, WebhookEvent};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::types::{IncomingItem, StatusItem, WebhookEnvelope};

type HmacSha256 = Hmac<Sha256>;

/// `object` value of WhatsApp Business Account deliveries.
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Answer a `GET` verification handshake.
///
/// Returns the challenge to echo when `mode` is `subscribe` and `token`
/// equals the configured secret. No configured secret never verifies.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: Option<&str>,
) -> Option<&'a str> {
    let expected = expected_token?;
    if mode == Some("subscribe") && token == Some(expected) {
        Some(challenge.unwrap_or_default())
    } else {
        None
    }
}

/// Check an `X-Hub-Signature-256` header (`sha256=<hex>`) against the raw body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> bool {
    let Some(signature_hex) = header.trim().strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the header value a provider would send for `body`.
pub fn sign_payload(app_secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Flatten an envelope into events, in delivery order.
///
/// Envelopes for other object types yield a single `Ignored` event.
pub fn parse_events(envelope: &WebhookEnvelope) -> Vec<WebhookEvent> {
    if envelope.object != BUSINESS_ACCOUNT_OBJECT {
        return vec![WebhookEvent::Ignored {
            reason: format!("unsupported object `{}`", envelope.object),
        }];
    }

    let mut events = Vec::new();
    for change in envelope.entry.iter().flat_map(|e| e.changes.iter()) {
        let value = &change.value;
        events.extend(
            value
                .statuses
                .iter()
                .map(|raw| decode_item(raw, "status", status_event)),
        );
        events.extend(
            value
                .messages
                .iter()
                .map(|raw| decode_item(raw, "message", message_event)),
        );
    }
    events
}

/// Events of a delivery body that is already known to be JSON.
///
/// A body that is not a recognizable envelope yields one `Ignored` event.
pub fn events_from_json(body: serde_json::Value) -> Vec<WebhookEvent> {
    match serde_json::from_value::<WebhookEnvelope>(body) {
        Ok(envelope) => parse_events(&envelope),
        Err(e) => vec![WebhookEvent::Ignored {
            reason: format!("unrecognized envelope: {e}"),
        }],
    }
}

fn decode_item<T: DeserializeOwned>(
    raw: &serde_json::Value,
    kind: &str,
    convert: fn(T) -> WebhookEvent,
) -> WebhookEvent {
    match T::deserialize(raw) {
        Ok(item) => convert(item),
        Err(e) => WebhookEvent::Ignored {
            reason: format!("undecodable {kind} item: {e}"),
        },
    }
}

fn message_event(item: IncomingItem) -> WebhookEvent {
    WebhookEvent::IncomingMessage {
        from: item.from,
        body: item.text.map(|t| t.body),
    }
}

fn status_event(item: StatusItem) -> WebhookEvent {
    let status = match item.status.parse::<DeliveryStatus>() {
        Ok(DeliveryStatus::Queued) | Err(_) => {
            return WebhookEvent::Ignored {
                reason: format!("unknown status `{}` for {}", item.status, item.id),
            };
        }
        Ok(status) => status,
    };

    let error_reason = if status == DeliveryStatus::Failed {
        item.errors.first().and_then(|e| {
            e.title
                .clone()
                .or_else(|| e.message.clone())
                .or_else(|| e.code.map(|c| format!("error code {c}")))
        })
    } else {
        None
    };

    WebhookEvent::StatusUpdate {
        provider_message_id: item.id,
        status,
        error_reason,
    }
}
