use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use garden_shared::errors::AppResult;
use garden_shared::types::auth::AuthUser;
use garden_shared::types::ApiResponse;

use crate::models::{SettingsUpdate, UserSettings};
use crate::AppState;

// --- GET /settings ---

pub async fn get_settings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserSettings>>> {
    Ok(Json(ApiResponse::ok(state.settings.get(user.id).await?)))
}

// --- PUT /settings ---

pub async fn update_settings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<ApiResponse<UserSettings>>> {
    let settings = state.settings.update(user.id, update).await?;
    Ok(Json(ApiResponse::ok_with_message(settings, "settings updated")))
}

// --- POST /settings/reset ---

pub async fn reset_settings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserSettings>>> {
    let settings = state.settings.reset(user.id).await?;
    Ok(Json(ApiResponse::ok_with_message(settings, "settings reset to defaults")))
}
