use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct AccountItem {
    email: String,
    status: i32,
    daily_limit: Option<i32>,
}

/// Passthrough listing of the outbound platform's sending identities, used
/// during company setup.
pub(super) async fn list_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<AccountItem>>>, ApiError> {
    let accounts = state.clients.outbound.list_accounts().await.map_err(|e| {
        tracing::error!(error = %e, "sending-accounts fetch failed");
        ApiError::new(
            req_id.0.clone(),
            "internal_error",
            "failed to list sending accounts",
        )
    })?;

    let data = accounts
        .into_iter()
        .map(|account| AccountItem {
            email: account.email,
            status: account.status,
            daily_limit: account.daily_limit,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
