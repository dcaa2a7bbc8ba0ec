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
pub(super) struct QueriesQuery {
    pub company_id: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueryItem {
    query_id: Uuid,
    query: String,
    criteria: Vec<String>,
    rationale: String,
    status: String,
    exploration: bool,
    last_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_queries(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<QueriesQuery>,
) -> Result<Json<ApiResponse<Vec<QueryItem>>>, ApiError> {
    let rows = leadflow_db::list_queries(&state.pool, query.company_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| QueryItem {
            query_id: row.public_id,
            query: row.query,
            criteria: row.criteria,
            rationale: row.rationale,
            status: row.status,
            exploration: row.instruction_id.is_none(),
            last_run_at: row.last_run_at,
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

/// On-demand query generation for one company. The work runs in the
/// background; generated queries appear in the listing as they land.
pub(super) async fn trigger_generation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(company_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Accepted>>), ApiError> {
    let company = leadflow_db::get_company(&state.pool, company_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tokio::spawn(async move {
        match leadflow_pipeline::generate_queries_for_company(
            &state.pool,
            &state.clients,
            &company,
        )
        .await
        {
            Ok(outcome) => tracing::info!(
                company_id,
                generated = outcome.queries_generated,
                failures = outcome.failures,
                "on-demand query generation finished"
            ),
            Err(e) => tracing::error!(company_id, error = %e, "on-demand query generation failed"),
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

/// On-demand discovery run for one query. The run record tracks progress;
/// newly created leads are enriched as part of the same background task.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(query_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Accepted>>), ApiError> {
    // Reject unknown ids synchronously; the run itself is async.
    leadflow_db::get_query(&state.pool, query_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tokio::spawn(async move {
        match leadflow_pipeline::run_query(&state.pool, &state.clients, &state.config, query_id)
            .await
        {
            Ok(outcome) => {
                tracing::info!(
                    query_id,
                    items = outcome.items_found,
                    created = outcome.created_lead_ids.len(),
                    "on-demand discovery run finished"
                );
                leadflow_pipeline::enrich_leads(
                    &state.pool,
                    &state.clients,
                    &state.config,
                    &outcome.created_lead_ids,
                )
                .await;
            }
            Err(e) => tracing::error!(query_id, error = %e, "on-demand discovery run failed"),
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
