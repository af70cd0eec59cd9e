use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use super::validated;
use crate::models::ResetPasswordRequest;
use crate::AppState;

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let req = validated(req)?;
    state
        .auth
        .reset_password(&req.token, &req.password, &req.password_confirmation)
        .await?;
    Ok(Json(ApiResponse::ok_with_message((), "password has been reset")))
}
