use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use super::validated;
use crate::models::{LoginRequest, TokenPair};
use crate::AppState;

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let req = validated(req)?;
    let pair = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(ApiResponse::ok(pair)))
}
