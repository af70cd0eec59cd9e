use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer, ExposeHeaders};
use tower_http::trace::TraceLayer;

use garden_gateway::config::AppConfig;
use garden_gateway::rate_limit::{PgRateLimitStore, RateLimiter};
use garden_gateway::routes::{health, proxy};
use garden_gateway::AppState;
use garden_shared::clients::db;
use garden_shared::clock::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    garden_shared::middleware::init_tracing("garden-gateway");

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    let settings = config.rate_limit();
    let limiter = RateLimiter::new(
        Arc::new(PgRateLimitStore::new(pool.clone())),
        Arc::new(SystemClock),
        settings,
    );
    tracing::info!(
        enabled = settings.enabled,
        max_requests = settings.max_requests,
        window_secs = settings.window.num_seconds(),
        "rate limiter configured"
    );

    let metrics_handle = garden_shared::middleware::init_metrics()?;

    // Upstream HTTP client
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let origins: Vec<HeaderValue> = config
        .origins()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let state = Arc::new(AppState {
        config,
        http_client,
        limiter,
        db: pool,
        metrics_handle,
    });

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .fallback(proxy::proxy_handler)
        .layer(axum::middleware::from_fn(garden_shared::middleware::metrics_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(AllowMethods::list([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]))
                .allow_headers(AllowHeaders::list([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                ]))
                .expose_headers(ExposeHeaders::list([
                    header::RETRY_AFTER,
                    header::HeaderName::from_static("x-ratelimit-limit"),
                    header::HeaderName::from_static("x-ratelimit-remaining"),
                    header::HeaderName::from_static("x-ratelimit-reset"),
                ]))
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "garden-gateway starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
