// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API.
//!
//! Provides [`CloudApiClient`], which handles bearer authentication, URL
//! construction, and mapping of HTTP results onto [`SendOutcome`]s.

use std::time::Duration;

use beacon_core::{BeaconError, SendOutcome};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ApiTemplate, MessagePayload, SendResponse, TemplateList};

/// Page size requested when listing templates.
const TEMPLATE_PAGE_LIMIT: u32 = 100;

/// HTTP client for Graph API communication.
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl CloudApiClient {
    /// Creates a client sending `Authorization: Bearer <access_token>` on every request.
    pub fn new(
        access_token: &str,
        base_url: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, BeaconError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| BeaconError::Config(format!("invalid access token header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, path)
    }

    /// Posts one message from `phone_number_id`.
    ///
    /// Never fails: every result, including transport errors, is a [`SendOutcome`].
    pub async fn post_message(&self, phone_number_id: &str, payload: &MessagePayload) -> SendOutcome {
        let url = self.endpoint(&format!("{phone_number_id}/messages"));
        let response = match self.client.post(&url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "message request failed");
                return SendOutcome::TransportError {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return SendOutcome::TransportError {
                    message: format!("failed to read response body: {e}"),
                };
            }
        };
        debug!(status = %status, "message response received");

        if !status.is_success() {
            return SendOutcome::GatewayError {
                status: status.as_u16(),
                body: error_summary(&body),
            };
        }

        match serde_json::from_str::<SendResponse>(&body) {
            Ok(parsed) => match parsed.messages.into_iter().next() {
                Some(message) => SendOutcome::Accepted {
                    provider_message_id: message.id,
                },
                None => SendOutcome::GatewayError {
                    status: status.as_u16(),
                    body: "response carried no message id".to_string(),
                },
            },
            Err(e) => SendOutcome::GatewayError {
                status: status.as_u16(),
                body: format!("unparseable response ({e}): {body}"),
            },
        }
    }

    /// Lists the business account's templates (first page of up to 100).
    pub async fn fetch_templates(&self, business_account_id: &str) -> Result<Vec<ApiTemplate>, BeaconError> {
        let url = self.endpoint(&format!(
            "{business_account_id}/message_templates?limit={TEMPLATE_PAGE_LIMIT}"
        ));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BeaconError::Gateway {
                message: format!("template listing request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BeaconError::Gateway {
                message: format!("template listing returned {status}: {}", error_summary(&body)),
                source: None,
            });
        }

        let list: TemplateList = response.json().await.map_err(|e| BeaconError::Gateway {
            message: format!("failed to parse template listing: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(list.data)
    }
}

/// Prefer the Graph API error message over the raw body.
fn error_summary(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) if !err.error.message.is_empty() => match err.error.code {
            Some(code) => format!("{} (code {code})", err.error.message),
            None => err.error.message,
        },
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageContent, TextPayload};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> CloudApiClient {
        CloudApiClient::new("test-token", base_url, "v21.0", Duration::from_secs(5)).unwrap()
    }

    fn text_payload() -> MessagePayload {
        MessagePayload {
            messaging_product: "whatsapp".to_string(),
            to: "919876543210".to_string(),
            content: MessageContent::Text {
                text: TextPayload {
                    body: "hello".to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn accepted_message_returns_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/1098765/messages"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "contacts": [{ "input": "919876543210", "wa_id": "919876543210" }],
                "messages": [{ "id": "wamid.HBgM" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = test_client(&server.uri())
            .post_message("1098765", &text_payload())
            .await;
        assert_eq!(
            outcome,
            SendOutcome::Accepted {
                provider_message_id: "wamid.HBgM".to_string()
            }
        );
    }

    #[tokio::test]
    async fn rejected_message_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/1098765/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid parameter", "type": "OAuthException", "code": 100 }
            })))
            .mount(&server)
            .await;

        let outcome = test_client(&server.uri())
            .post_message("1098765", &text_payload())
            .await;
        assert_eq!(
            outcome,
            SendOutcome::GatewayError {
                status: 400,
                body: "Invalid parameter (code 100)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn success_without_id_is_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let outcome = test_client(&server.uri())
            .post_message("1098765", &text_payload())
            .await;
        assert!(matches!(outcome, SendOutcome::GatewayError { status: 200, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Port 9 on localhost refuses connections.
        let outcome = test_client("http://127.0.0.1:9")
            .post_message("1098765", &text_payload())
            .await;
        assert!(matches!(outcome, SendOutcome::TransportError { .. }));
    }

    #[tokio::test]
    async fn fetch_templates_requests_first_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v21.0/55501/message_templates"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "tpl-1",
                    "name": "diwali_offer",
                    "status": "APPROVED",
                    "category": "MARKETING",
                    "language": "en_US",
                    "components": [{ "type": "BODY", "text": "Hi {{1}}" }]
                }],
                "paging": { "cursors": { "before": "a", "after": "b" } }
            })))
            .mount(&server)
            .await;

        let templates = test_client(&server.uri())
            .fetch_templates("55501")
            .await
            .unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "diwali_offer");
        assert_eq!(templates[0].status, "APPROVED");
    }

    #[tokio::test]
    async fn fetch_templates_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid OAuth access token" }
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .fetch_templates("55501")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid OAuth access token"));
    }
}
