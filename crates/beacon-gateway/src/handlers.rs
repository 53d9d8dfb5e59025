// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the campaign API.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use beacon_core::{
    BeaconError, Campaign, CampaignFilter, CampaignLog, CampaignStatus, Contact, HealthStatus,
    PluginAdapter,
};
use beacon_dispatch::metrics::{self, DeliveryMetrics, TemplatePerformance};
use beacon_dispatch::{ImportReport, NewCampaign, NewContact};

use crate::error::{ApiResult, ErrorResponse};
use crate::server::GatewayState;

/// Default size of the top-templates ranking.
pub const DEFAULT_TOP_TEMPLATES: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` or `unhealthy`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub kind: String,
    pub version: String,
    /// `healthy`, `degraded` or `unhealthy`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health
///
/// 503 when the store or the messaging gateway is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let components = vec![
        check_adapter(state.store.as_ref()).await,
        check_adapter(state.gateway.as_ref()).await,
    ];
    let status = if components.iter().any(|c| c.status == "unhealthy") {
        "unhealthy"
    } else if components.iter().any(|c| c.status == "degraded") {
        "degraded"
    } else {
        "ok"
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        components,
    };
    (code, Json(body))
}

async fn check_adapter<A: PluginAdapter + ?Sized>(adapter: &A) -> ComponentHealth {
    let (status, detail) = match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => ("healthy", None),
        Ok(HealthStatus::Degraded(reason)) => ("degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => ("unhealthy", Some(reason)),
        Err(e) => {
            // Details stay in the log; this route is public.
            warn!(adapter = adapter.name(), error = %e, "health check failed");
            ("unhealthy", Some("health check failed".to_string()))
        }
    };
    ComponentHealth {
        name: adapter.name().to_string(),
        kind: adapter.adapter_type().to_string().to_ascii_lowercase(),
        version: adapter.version().to_string(),
        status: status.to_string(),
        detail,
    }
}

// --- Contacts ---

/// POST /v1/contacts
pub async fn post_contact(
    State(state): State<GatewayState>,
    Json(input): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = state.service.upsert_contact(input).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub contacts: Vec<NewContact>,
}

/// POST /v1/contacts/import
pub async fn post_contact_import(
    State(state): State<GatewayState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportReport>> {
    let report = state.service.import_contacts(request.contacts).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// GET /v1/contacts/tags
pub async fn get_tags(State(state): State<GatewayState>) -> ApiResult<Json<TagsResponse>> {
    let tags = state.service.list_tags().await?;
    Ok(Json(TagsResponse { tags }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AudienceQuery {
    /// Comma-separated tag list. Empty or absent means every contact.
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AudienceResponse {
    pub tags: Vec<String>,
    pub count: i64,
}

/// GET /v1/audience?tags=a,b
///
/// The count is advisory; dispatch resolves the audience again.
pub async fn get_audience(
    State(state): State<GatewayState>,
    Query(query): Query<AudienceQuery>,
) -> ApiResult<Json<AudienceResponse>> {
    let tags = split_list(query.tags.as_deref());
    let count = state.service.audience_count(&tags).await?;
    Ok(Json(AudienceResponse { tags, count }))
}

// --- Campaigns ---

/// POST /v1/campaigns
pub async fn post_campaign(
    State(state): State<GatewayState>,
    Json(input): Json<NewCampaign>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.service.create_campaign(input).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignListQuery {
    /// Comma-separated statuses, case-insensitive.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<Campaign>,
}

/// GET /v1/campaigns?status=..&search=..
pub async fn get_campaigns(
    State(state): State<GatewayState>,
    Query(query): Query<CampaignListQuery>,
) -> ApiResult<Json<CampaignListResponse>> {
    let statuses = split_list(query.status.as_deref())
        .iter()
        .map(|s| {
            CampaignStatus::from_str(&s.to_ascii_uppercase())
                .map_err(|_| BeaconError::Validation(format!("unknown campaign status: {s}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let filter = CampaignFilter {
        statuses,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let campaigns = state.service.list_campaigns(&filter).await?;
    Ok(Json(CampaignListResponse { campaigns }))
}

/// GET /v1/campaigns/{id}
pub async fn get_campaign(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Campaign>> {
    Ok(Json(state.service.get_campaign(&id).await?))
}

/// DELETE /v1/campaigns/{id}
///
/// Only DRAFT campaigns can be deleted; anything else is a 409.
pub async fn delete_campaign(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    if state.service.delete_campaign(&id).await? {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok((
        StatusCode::CONFLICT,
        Json(ErrorResponse::new("only draft campaigns can be deleted")),
    )
        .into_response())
}

/// POST /v1/campaigns/{id}/send
pub async fn post_campaign_send(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let campaign = state.service.send_now(&id).await?;
    Ok((StatusCode::ACCEPTED, Json(campaign)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogListResponse {
    pub logs: Vec<CampaignLog>,
}

/// GET /v1/campaigns/{id}/logs
pub async fn get_campaign_logs(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LogListResponse>> {
    let logs = state.service.campaign_logs(&id).await?;
    Ok(Json(LogListResponse { logs }))
}

/// GET /v1/campaigns/{id}/metrics
pub async fn get_campaign_metrics(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeliveryMetrics>> {
    state.service.get_campaign(&id).await?;
    let m = metrics::campaign_metrics(state.store.as_ref(), &id).await?;
    Ok(Json(m))
}

/// GET /v1/metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> ApiResult<Json<DeliveryMetrics>> {
    Ok(Json(metrics::global_metrics(state.store.as_ref()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopTemplatesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopTemplatesResponse {
    pub templates: Vec<TemplatePerformance>,
}

/// GET /v1/metrics/templates?limit=5
pub async fn get_top_templates(
    State(state): State<GatewayState>,
    Query(query): Query<TopTemplatesQuery>,
) -> ApiResult<Json<TopTemplatesResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_TEMPLATES);
    let templates = metrics::top_templates(state.store.as_ref(), limit).await?;
    Ok(Json(TopTemplatesResponse { templates }))
}

/// Splits a comma-separated query value, dropping blanks.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(Some("vip, ,retail,")), vec!["vip", "retail"]);
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "degraded".into(),
            version: "0.1.0".into(),
            uptime_secs: 3,
            components: vec![
                ComponentHealth {
                    name: "sqlite".into(),
                    kind: "storage".into(),
                    version: "0.1.0".into(),
                    status: "healthy".into(),
                    detail: None,
                },
                ComponentHealth {
                    name: "whatsapp".into(),
                    kind: "gateway".into(),
                    version: "0.1.0".into(),
                    status: "degraded".into(),
                    detail: Some("no business account".into()),
                },
            ],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["uptime_secs"], 3);
        assert!(json["components"][0].get("detail").is_none());
        assert_eq!(json["components"][1]["detail"], "no business account");
    }
}
