pub mod forgot_password;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;
pub mod reset_password;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use garden_shared::errors::{AppError, ErrorCode};

use crate::AppState;

pub(crate) fn validated<T: Validate>(req: T) -> Result<T, AppError> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    Ok(req)
}

/// Account routes sit under `/auth` so gateway paths map one to one.
pub fn router(state: Arc<AppState>) -> Router {
    let accounts = Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/refresh", post(refresh::refresh_token))
        .route("/logout", post(logout::logout))
        .route("/forgot-password", post(forgot_password::forgot_password))
        .route("/reset-password", post(reset_password::reset_password))
        .route("/me", get(me::me));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", accounts)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
