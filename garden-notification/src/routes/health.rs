use axum::Json;
use garden_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("garden-notification", env!("CARGO_PKG_VERSION")))
}
