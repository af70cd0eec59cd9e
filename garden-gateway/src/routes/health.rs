use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};

use garden_shared::clients::db;
use garden_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Health check covering the rate-limit store and every upstream service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(4);

    checks.push(match db::conn(&state.db) {
        Ok(_) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::failed("database", HealthStatus::Unhealthy, e.to_string()),
    });

    let services = [
        ("auth", &state.config.auth_url),
        ("sensor", &state.config.sensor_url),
        ("notification", &state.config.notification_url),
    ];

    for (name, url) in services {
        let health_url = format!("{url}/health");
        let check = match state
            .http_client
            .get(&health_url)
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => HealthCheck::healthy(name),
            Ok(resp) => HealthCheck::failed(name, HealthStatus::Degraded, format!("status {}", resp.status())),
            Err(e) => HealthCheck::failed(name, HealthStatus::Unhealthy, e.to_string()),
        };
        checks.push(check);
    }

    HealthResponse::healthy("garden-gateway", env!("CARGO_PKG_VERSION"))
        .with_checks(checks)
        .into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
