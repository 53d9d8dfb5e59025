// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WhatsApp Cloud API (Graph API) and its webhooks.

use serde::{Deserialize, Serialize};

// --- Outbound messages ---

/// Body of `POST /{version}/{phone_number_id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    pub messaging_product: String,
    /// Digits-only recipient.
    pub to: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

/// Message body variants, tagged by the `type` field.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Template { template: TemplatePayload },
    Text { text: TextPayload },
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplatePayload {
    pub name: String,
    pub language: LanguagePayload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguagePayload {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Vec<ParameterPayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPayload {
    pub body: String,
}

/// Successful send response: `{ "messages": [{ "id": "wamid..." }] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

/// Graph API error envelope: `{ "error": { "message", "code", ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

// --- Template listing ---

/// Page of `GET /{version}/{waba_id}/message_templates`.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateList {
    #[serde(default)]
    pub data: Vec<ApiTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub components: serde_json::Value,
}

// --- Webhooks ---

/// Top-level webhook delivery envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

/// Items stay raw JSON here and are decoded one by one into
/// [`StatusItem`] and [`IncomingItem`], so one odd item cannot reject the
/// rest of the delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusItem {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub errors: Vec<StatusError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingItem {
    pub from: String,
    #[serde(default)]
    pub text: Option<IncomingText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingText {
    pub body: String,
}
