use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CampaignsQuery {
    pub company_id: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignItem {
    campaign_id: Uuid,
    name: String,
    status: String,
    persona: Option<String>,
    leads_count: i32,
    emails_sent: i32,
    opens: i32,
    replies: i32,
    open_rate: f64,
    reply_rate: f64,
    is_accepting_leads: bool,
    max_leads: i32,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CampaignsQuery>,
) -> Result<Json<ApiResponse<Vec<CampaignItem>>>, ApiError> {
    let rows = leadflow_db::list_campaigns(&state.pool, query.company_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CampaignItem {
            campaign_id: row.public_id,
            name: row.name.clone(),
            status: row.status.clone(),
            persona: row.persona.clone(),
            leads_count: row.leads_count,
            emails_sent: row.emails_sent,
            opens: row.opens,
            replies: row.replies,
            open_rate: row.open_rate(),
            reply_rate: row.reply_rate(),
            is_accepting_leads: row.is_accepting_leads,
            max_leads: row.max_leads,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct PauseResult {
    status: &'static str,
}

/// Pauses a campaign on the outbound platform and mirrors the status
/// locally.
pub(super) async fn pause_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<i64>,
) -> Result<Json<ApiResponse<PauseResult>>, ApiError> {
    let campaign = leadflow_db::get_campaign(&state.pool, campaign_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    state
        .clients
        .outbound
        .pause(&campaign.external_id)
        .await
        .map_err(|e| {
            tracing::error!(campaign_id, error = %e, "platform pause failed");
            ApiError::new(req_id.0.clone(), "internal_error", "failed to pause campaign")
        })?;

    leadflow_db::set_campaign_status(&state.pool, campaign_id, "paused")
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: PauseResult { status: "paused" },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignEmailItem {
    step: i32,
    subject: String,
    body: String,
    delay_days: i32,
}

pub(super) async fn list_campaign_emails(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(campaign_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<CampaignEmailItem>>>, ApiError> {
    let rows = leadflow_db::list_campaign_emails(&state.pool, campaign_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CampaignEmailItem {
            step: row.step,
            subject: row.subject,
            body: row.body,
            delay_days: row.delay_days,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
