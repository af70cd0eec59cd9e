use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use crate::models::RefreshRequest;
use crate::AppState;

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth.logout(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok_with_message((), "logout successful")))
}
