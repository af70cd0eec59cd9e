use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;

use super::validated;
use crate::models::ForgotPasswordRequest;
use crate::AppState;

/// POST /auth/forgot-password
///
/// Answers the same whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let req = validated(req)?;
    state.auth.forgot_password(&req.email).await?;
    Ok(Json(ApiResponse::ok_with_message(
        (),
        "if your email is registered, you will receive password reset instructions",
    )))
}
