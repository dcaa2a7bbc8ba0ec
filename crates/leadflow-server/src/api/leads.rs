use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct LeadsQuery {
    pub company_id: i64,
    pub enrichment_status: Option<String>,
    pub campaign_status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct LeadItem {
    lead_id: Uuid,
    url: String,
    email: Option<String>,
    name: Option<String>,
    platform: Option<String>,
    category: Option<String>,
    full_name: Option<String>,
    total_audience: Option<i64>,
    fit_score: Option<i32>,
    fit_reason: Option<String>,
    enrichment_status: String,
    campaign_status: String,
    suggested_campaign_reason: Option<String>,
    skip_reason: Option<String>,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_leads(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<ApiResponse<Vec<LeadItem>>>, ApiError> {
    let rows = leadflow_db::list_leads(
        &state.pool,
        query.company_id,
        query.enrichment_status.as_deref(),
        query.campaign_status.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| LeadItem {
            lead_id: row.public_id,
            url: row.url,
            email: row.email,
            name: row.name,
            platform: row.platform,
            category: row.category,
            full_name: row.full_name,
            total_audience: row.total_audience,
            fit_score: row.fit_score,
            fit_reason: row.fit_reason,
            enrichment_status: row.enrichment_status,
            campaign_status: row.campaign_status,
            suggested_campaign_reason: row.suggested_campaign_reason,
            skip_reason: row.skip_reason,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct Accepted {
    accepted: bool,
}

/// On-demand (re-)enrichment of a single lead; also the operator's recovery
/// path for `enrichment_status = failed`.
pub(super) async fn trigger_enrich(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(lead_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Accepted>>), ApiError> {
    leadflow_db::get_lead(&state.pool, lead_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tokio::spawn(async move {
        match leadflow_pipeline::enrich_lead(&state.pool, &state.clients, lead_id).await {
            Ok(outcome) => {
                tracing::info!(lead_id, outcome = ?outcome, "on-demand enrichment finished");
            }
            Err(e) => tracing::error!(lead_id, error = %e, "on-demand enrichment failed"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: Accepted { accepted: true },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct ConfirmBody {
    /// Overrides the stored suggestion when present.
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ConfirmResult {
    attached: bool,
}

/// The binding "confirm routing" action. Idempotent: confirming an
/// already-routed lead reports `attached: false` and performs no outbound
/// call.
pub(super) async fn confirm_routing(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(lead_id): Path<i64>,
    body: Option<Json<ConfirmBody>>,
) -> Result<Json<ApiResponse<ConfirmResult>>, ApiError> {
    let campaign_id = body.and_then(|Json(b)| b.campaign_id);

    let attached =
        leadflow_pipeline::confirm_routing(&state.pool, &state.clients, lead_id, campaign_id)
            .await
            .map_err(|e| match e {
                leadflow_pipeline::PipelineError::Db(db) => map_db_error(req_id.0.clone(), &db),
                leadflow_pipeline::PipelineError::LeadNotRoutable { .. } => {
                    ApiError::new(req_id.0.clone(), "conflict", e.to_string())
                }
                other => {
                    tracing::error!(lead_id, error = %other, "confirm routing failed");
                    ApiError::new(req_id.0.clone(), "internal_error", "confirm routing failed")
                }
            })?;

    Ok(Json(ApiResponse {
        data: ConfirmResult { attached },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct SkipBody {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusResult {
    campaign_status: &'static str,
}

pub(super) async fn skip_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(lead_id): Path<i64>,
    Json(body): Json<SkipBody>,
) -> Result<Json<ApiResponse<StatusResult>>, ApiError> {
    leadflow_db::mark_lead_skipped(&state.pool, lead_id, &body.reason)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: StatusResult {
            campaign_status: "skipped",
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn unskip_lead(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(lead_id): Path<i64>,
) -> Result<Json<ApiResponse<StatusResult>>, ApiError> {
    leadflow_db::unskip_lead(&state.pool, lead_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: StatusResult {
            campaign_status: "pending",
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
