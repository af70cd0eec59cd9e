use std::sync::Arc;

use garden_notification::config::AppConfig;
use garden_notification::events;
use garden_notification::repository::PgRepository;
use garden_notification::routes;
use garden_notification::service::NotificationDeps;
use garden_notification::AppState;
use garden_shared::clients::{db, rabbitmq::RabbitMQClient, redis::connect_cache};
use garden_shared::clock::{Clock, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    garden_shared::middleware::init_tracing("garden-notification");

    let config = AppConfig::load()?;
    let port = config.port;

    // Read by the AuthUser extractor
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    let repo = Arc::new(PgRepository::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = connect_cache(&config.redis_url, clock.clone()).await?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let deps = NotificationDeps {
        notifications: repo.clone(),
        settings: repo.clone(),
        sensors: repo,
        cache,
        clock,
    };
    let state = Arc::new(AppState { deps, config });

    let reading_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_reading_events(reading_state, rabbitmq).await {
            tracing::error!(error = %e, "reading event subscriber failed");
        }
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "garden-notification starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
