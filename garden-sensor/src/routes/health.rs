use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};

use garden_shared::clients::db;
use garden_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let database = match db::conn(&state.db) {
        Ok(_) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::failed("database", HealthStatus::Unhealthy, e.to_string()),
    };

    HealthResponse::healthy("garden-sensor", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database])
        .into_response()
}
