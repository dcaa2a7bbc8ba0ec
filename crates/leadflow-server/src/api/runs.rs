use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct DiscoveryRunItem {
    run_id: Uuid,
    webset_id: String,
    status: String,
    items_found: i32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_discovery_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<DiscoveryRunItem>>>, ApiError> {
    let rows = leadflow_db::list_discovery_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| DiscoveryRunItem {
            run_id: row.public_id,
            webset_id: row.webset_id,
            status: row.status,
            items_found: row.items_found,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::DiscoveryRunItem;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn discovery_run_item_is_serializable() {
        let item = DiscoveryRunItem {
            run_id: Uuid::new_v4(),
            webset_id: "ws_123".to_string(),
            status: "completed".to_string(),
            items_found: 25,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error_message: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&item).expect("serialize discovery run");
        assert!(json.contains("\"webset_id\":\"ws_123\""));
        assert!(json.contains("\"items_found\":25"));
    }
}
