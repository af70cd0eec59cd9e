pub mod config;
pub mod rate_limit;
pub mod routes;
pub mod schema;

pub struct AppState {
    pub config: config::AppConfig,
    pub http_client: reqwest::Client,
    pub limiter: rate_limit::RateLimiter,
    pub db: garden_shared::clients::db::DbPool,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
