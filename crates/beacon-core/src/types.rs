// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the dispatcher, the reconciler, and the adapters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Gateway,
    Storage,
}

// --- Templates ---

/// Provider-side template category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateCategory {
    Marketing,
    Utility,
    Authentication,
}

/// Provider review status of a template. Only `Approved` templates are dispatchable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    Pending,
    Approved,
    Rejected,
}

/// A provider-approved, parameterized message structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Provider template identifier.
    pub id: String,
    pub name: String,
    pub category: Option<TemplateCategory>,
    /// Language code, e.g. `en_US`.
    pub language: String,
    /// Header/body/button definition as returned by the provider.
    pub components: serde_json::Value,
    pub status: TemplateStatus,
    pub last_synced_at: String,
}

impl Template {
    /// Returns true if the template may be used for a campaign.
    pub fn is_dispatchable(&self) -> bool {
        self.status == TemplateStatus::Approved
    }
}

// --- Contacts ---

/// A subscriber reachable through the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    /// Canonical E.164 phone, unique across contacts.
    pub phone: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub is_unsubscribed: bool,
    pub created_at: String,
}

impl Contact {
    /// Returns true if the contact's tags intersect `filter`.
    ///
    /// An empty filter matches every contact.
    pub fn matches_tags(&self, filter: &[String]) -> bool {
        filter.is_empty() || self.tags.iter().any(|t| filter.contains(t))
    }
}

// --- Campaigns ---

/// Campaign lifecycle status. Transition rules live in [`crate::state`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Completed,
    Failed,
}

/// One broadcast execution against a resolved audience using one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub status: CampaignStatus,
    /// Tag filter applied when resolving the audience. Empty means everyone.
    pub audience_tags: Vec<String>,
    pub total_audience: i64,
    pub success_count: i64,
    pub scheduled_at: Option<String>,
    pub created_at: String,
}

/// Filter for campaign listings.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    /// Restrict to these statuses. Empty means all.
    pub statuses: Vec<CampaignStatus>,
    /// Case-insensitive substring match on the campaign name.
    pub search: Option<String>,
}

// --- Delivery log ---

/// Per-message delivery state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// `sent` or better: the gateway accepted the message.
    pub fn is_successful(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Sent | DeliveryStatus::Delivered | DeliveryStatus::Read
        )
    }

    /// Reached the handset: `delivered` or `read`.
    pub fn is_delivered(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Read)
    }
}

/// The per-contact record of one message's lifecycle within one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignLog {
    pub id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub error_reason: Option<String>,
    pub updated_at: String,
}

// --- Gateway messages ---

/// A rendered template message ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMessage {
    /// Recipient phone as digits only (no leading `+`).
    pub to: String,
    pub template_name: String,
    pub language_code: String,
    /// Body parameters, in order.
    pub body_parameters: Vec<String>,
}

/// A free-form text message (used for opt-out confirmations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// Recipient phone as digits only (no leading `+`).
    pub to: String,
    pub body: String,
}

/// Outcome of one submission to the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The gateway accepted the message and assigned an identifier.
    Accepted { provider_message_id: String },
    /// The gateway answered with a non-success status.
    GatewayError { status: u16, body: String },
    /// The request never produced a gateway answer (connect failure, timeout).
    TransportError { message: String },
}

impl SendOutcome {
    /// Returns true if the gateway accepted the message.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendOutcome::Accepted { .. })
    }

    /// Provider message id for accepted messages.
    pub fn provider_message_id(&self) -> Option<&str> {
        match self {
            SendOutcome::Accepted {
                provider_message_id,
            } => Some(provider_message_id),
            _ => None,
        }
    }

    /// Human-readable reason recorded on a failed log row.
    pub fn error_reason(&self) -> Option<String> {
        match self {
            SendOutcome::Accepted { .. } => None,
            SendOutcome::GatewayError { status, body } => Some(format!("HTTP {status}: {body}")),
            SendOutcome::TransportError { message } => Some(format!("transport: {message}")),
        }
    }
}

// --- Webhook events ---

/// A single provider callback, decoded from a webhook envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Delivery progress for a previously sent message.
    StatusUpdate {
        provider_message_id: String,
        status: DeliveryStatus,
        error_reason: Option<String>,
    },
    /// A message sent by a subscriber.
    IncomingMessage {
        /// Sender phone as digits, as reported by the provider.
        from: String,
        /// Text body, if the message carried text.
        body: Option<String>,
    },
    /// A shape this system does not act on.
    Ignored { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn campaign_status_round_trips_through_strings() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Sending,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(s, s.to_uppercase());
            assert_eq!(CampaignStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn delivery_status_uses_lowercase_names() {
        assert_eq!(DeliveryStatus::Delivered.to_string(), "delivered");
        assert_eq!(
            DeliveryStatus::from_str("read").unwrap(),
            DeliveryStatus::Read
        );
        assert!(DeliveryStatus::from_str("deleted").is_err());
        let json = serde_json::to_string(&DeliveryStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }

    #[test]
    fn successful_statuses() {
        assert!(!DeliveryStatus::Queued.is_successful());
        assert!(DeliveryStatus::Sent.is_successful());
        assert!(DeliveryStatus::Delivered.is_successful());
        assert!(DeliveryStatus::Read.is_successful());
        assert!(!DeliveryStatus::Failed.is_successful());
        assert!(!DeliveryStatus::Sent.is_delivered());
        assert!(DeliveryStatus::Read.is_delivered());
    }

    #[test]
    fn send_outcome_error_reasons() {
        let ok = SendOutcome::Accepted {
            provider_message_id: "wamid.1".into(),
        };
        assert!(ok.is_accepted());
        assert_eq!(ok.provider_message_id(), Some("wamid.1"));
        assert!(ok.error_reason().is_none());

        let rejected = SendOutcome::GatewayError {
            status: 400,
            body: "{\"error\":{}}".into(),
        };
        assert_eq!(
            rejected.error_reason().as_deref(),
            Some("HTTP 400: {\"error\":{}}")
        );

        let transport = SendOutcome::TransportError {
            message: "timed out".into(),
        };
        assert!(transport.error_reason().unwrap().contains("timed out"));
    }

    #[test]
    fn tag_matching() {
        let contact = Contact {
            id: "c1".into(),
            phone: "+919999999999".into(),
            name: None,
            tags: vec!["vip".into(), "delhi".into()],
            is_unsubscribed: false,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        assert!(contact.matches_tags(&[]));
        assert!(contact.matches_tags(&["vip".to_string()]));
        assert!(!contact.matches_tags(&["mumbai".to_string()]));
    }

    #[test]
    fn template_category_serializes_uppercase() {
        let json = serde_json::to_string(&TemplateCategory::Marketing).unwrap();
        assert_eq!(json, "\"MARKETING\"");
        assert_eq!(
            TemplateStatus::from_str("APPROVED").unwrap(),
            TemplateStatus::Approved
        );
    }
}
