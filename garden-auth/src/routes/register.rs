use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use super::validated;
use crate::models::{RegisterRequest, TokenPair};
use crate::AppState;

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let pair = state.auth.register(validated(req)?).await?;
    Ok(Json(ApiResponse::ok_with_message(pair, "registration successful")))
}
