use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use garden_shared::clients::db::{self, DbPool};
use garden_shared::clients::rabbitmq::RabbitMQClient;
use garden_shared::clients::redis::connect_cache;
use garden_shared::clock::{Clock, SystemClock};
use services::settings_service::{PgSettingsRepository, SettingsService};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub settings: SettingsService,
    pub clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    garden_shared::middleware::init_tracing("garden-sensor");

    let config = AppConfig::load()?;
    let port = config.port;

    // Read by the AuthUser extractor
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = db::create_pool(&config.database_url, config.db_pool_size)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = connect_cache(&config.redis_url, clock.clone()).await?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let settings = SettingsService::new(
        Arc::new(PgSettingsRepository::new(db.clone())),
        cache,
        clock.clone(),
    );

    let state = Arc::new(AppState { db, config, rabbitmq, settings, clock });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/sensors", get(routes::sensors::list_sensors).post(routes::sensors::create_sensor))
        .route(
            "/sensors/:id",
            get(routes::sensors::get_sensor)
                .put(routes::sensors::update_sensor)
                .delete(routes::sensors::delete_sensor),
        )
        .route(
            "/sensors/:id/readings",
            get(routes::readings::list_sensor_readings).post(routes::readings::record_reading),
        )
        .route("/readings", get(routes::readings::list_recent_readings))
        .route("/readings/export", get(routes::readings::export_readings))
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .route("/plants", get(routes::plants::list_plants).post(routes::plants::create_plant))
        .route(
            "/plants/:id",
            get(routes::plants::get_plant)
                .put(routes::plants::update_plant)
                .delete(routes::plants::delete_plant),
        )
        .route("/settings", get(routes::settings::get_settings).put(routes::settings::update_settings))
        .route("/settings/reset", post(routes::settings::reset_settings))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "garden-sensor starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
