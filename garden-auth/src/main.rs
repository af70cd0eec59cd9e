use std::sync::Arc;

use garden_auth::config::AppConfig;
use garden_auth::repository::PgAccountRepository;
use garden_auth::routes;
use garden_auth::services::auth_service::AuthService;
use garden_auth::AppState;
use garden_shared::clients::db;
use garden_shared::clients::email::EmailClient;
use garden_shared::clock::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    garden_shared::middleware::init_tracing("garden-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    // Read by the AuthUser extractor on /me
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    let mailer = EmailClient::new(
        &config.email_api_url,
        &config.email_api_key,
        &config.email_from,
        &config.email_from_name,
    );

    let auth = AuthService::new(
        Arc::new(PgAccountRepository::new(pool)),
        Arc::new(mailer),
        Arc::new(SystemClock),
        config.auth_settings(),
    );
    let state = Arc::new(AppState { auth, config });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "garden-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
