// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API adapter for the Beacon broadcast engine.
//!
//! This crate implements [`MessagingGateway`] over the Graph API: template
//! and text sends, template listing, and the webhook types and checks used by
//! the HTTP gateway.

pub mod client;
pub mod types;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use beacon_config::model::WhatsAppConfig;
use beacon_core::{
    AdapterType, BeaconError, HealthStatus, MessagingGateway, PluginAdapter, SendOutcome,
    Template, TemplateMessage, TemplateStatus, TextMessage,
};
use tracing::{debug, info};

use crate::client::CloudApiClient;
use crate::types::{
    ApiTemplate, ComponentPayload, LanguagePayload, MessageContent, MessagePayload,
    ParameterPayload, TemplatePayload, TextPayload,
};

/// WhatsApp Business messaging gateway implementing [`MessagingGateway`].
pub struct WhatsAppGateway {
    client: CloudApiClient,
    phone_number_id: String,
    business_account_id: Option<String>,
    messaging_product: String,
}

impl WhatsAppGateway {
    /// Builds the gateway from configuration.
    ///
    /// `access_token` and `phone_number_id` are required.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, BeaconError> {
        let access_token = config.access_token.as_deref().ok_or_else(|| {
            BeaconError::Config("whatsapp.access_token is required to send messages".to_string())
        })?;
        let phone_number_id = config.phone_number_id.clone().ok_or_else(|| {
            BeaconError::Config("whatsapp.phone_number_id is required to send messages".to_string())
        })?;

        let client = CloudApiClient::new(
            access_token,
            &config.api_base_url,
            &config.api_version,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(
            api_version = %config.api_version,
            phone_number_id = %phone_number_id,
            "WhatsApp gateway initialized"
        );

        Ok(Self {
            client,
            phone_number_id,
            business_account_id: config.business_account_id.clone(),
            messaging_product: config.messaging_product.clone(),
        })
    }

    fn template_payload(&self, message: &TemplateMessage) -> MessagePayload {
        let components = if message.body_parameters.is_empty() {
            Vec::new()
        } else {
            vec![ComponentPayload {
                kind: "body".to_string(),
                parameters: message
                    .body_parameters
                    .iter()
                    .map(|text| ParameterPayload {
                        kind: "text".to_string(),
                        text: text.clone(),
                    })
                    .collect(),
            }]
        };

        MessagePayload {
            messaging_product: self.messaging_product.clone(),
            to: message.to.clone(),
            content: MessageContent::Template {
                template: TemplatePayload {
                    name: message.template_name.clone(),
                    language: LanguagePayload {
                        code: message.language_code.clone(),
                    },
                    components,
                },
            },
        }
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppGateway {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        if self.business_account_id.is_none() {
            return Ok(HealthStatus::Degraded(
                "whatsapp.business_account_id not set; template sync unavailable".to_string(),
            ));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppGateway {
    async fn send_template(&self, message: &TemplateMessage) -> SendOutcome {
        let payload = self.template_payload(message);
        debug!(template = %message.template_name, "sending template message");
        self.client.post_message(&self.phone_number_id, &payload).await
    }

    async fn send_text(&self, message: &TextMessage) -> SendOutcome {
        let payload = MessagePayload {
            messaging_product: self.messaging_product.clone(),
            to: message.to.clone(),
            content: MessageContent::Text {
                text: TextPayload {
                    body: message.body.clone(),
                },
            },
        };
        self.client.post_message(&self.phone_number_id, &payload).await
    }

    async fn list_templates(&self) -> Result<Vec<Template>, BeaconError> {
        let waba_id = self.business_account_id.as_deref().ok_or_else(|| {
            BeaconError::Config("whatsapp.business_account_id is required for template sync".to_string())
        })?;
        let synced_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let templates = self.client.fetch_templates(waba_id).await?;
        Ok(templates
            .into_iter()
            .map(|t| convert_template(t, &synced_at))
            .collect())
    }
}

/// Map a provider template onto the domain type.
///
/// Review states other than APPROVED and REJECTED (IN_APPEAL, PAUSED,
/// DISABLED, ...) are treated as PENDING, i.e. not dispatchable.
fn convert_template(template: ApiTemplate, synced_at: &str) -> Template {
    Template {
        id: template.id,
        name: template.name,
        category: template.category.and_then(|c| c.parse().ok()),
        language: template.language,
        components: template.components,
        status: template.status.parse().unwrap_or(TemplateStatus::Pending),
        last_synced_at: synced_at.to_string(),
    }
}
