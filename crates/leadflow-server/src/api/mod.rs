mod accounts;
mod campaigns;
mod leads;
mod queries;
mod runs;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub clients: Arc<leadflow_pipeline::Clients>,
    pub config: Arc<leadflow_core::AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &leadflow_db::DbError) -> ApiError {
    match error {
        leadflow_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "record not found")
        }
        leadflow_db::DbError::InvalidTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/queries", get(queries::list_queries))
        .route(
            "/api/v1/companies/{company_id}/generate-queries",
            post(queries::trigger_generation),
        )
        .route("/api/v1/queries/{query_id}/run", post(queries::trigger_run))
        .route("/api/v1/leads", get(leads::list_leads))
        .route("/api/v1/leads/{lead_id}/enrich", post(leads::trigger_enrich))
        .route(
            "/api/v1/leads/{lead_id}/confirm-routing",
            post(leads::confirm_routing),
        )
        .route("/api/v1/leads/{lead_id}/skip", post(leads::skip_lead))
        .route("/api/v1/leads/{lead_id}/unskip", post(leads::unskip_lead))
        .route("/api/v1/campaigns", get(campaigns::list_campaigns))
        .route(
            "/api/v1/campaigns/{campaign_id}/pause",
            post(campaigns::pause_campaign),
        )
        .route(
            "/api/v1/campaigns/{campaign_id}/emails",
            get(campaigns::list_campaign_emails),
        )
        .route("/api/v1/runs", get(runs::list_discovery_runs))
        .route("/api/v1/accounts", get(accounts::list_accounts))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

/// Assembles the full application router.
pub fn build_app(state: AppState, auth: AuthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(protected_router(auth))
        .layer(axum::middleware::from_fn(request_id))
        .layer(build_cors())
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<HealthData>> {
    let database = match leadflow_db::ping(&state.pool).await {
        Ok(()) => "ok",
        Err(_) => "unreachable",
    };

    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            database,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
