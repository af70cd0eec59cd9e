use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use crate::models::{RefreshRequest, TokenPair};
use crate::AppState;

/// POST /auth/refresh
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let pair = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(pair)))
}
