use std::sync::Arc;

use garden_notification::digest::{AlertCheckJob, AlertCheckReport};
use garden_notification::repository::PgRepository;
use garden_notification::service::NotificationDeps;
use garden_shared::clients::db::DbPool;
use garden_shared::clients::email::EmailClient;
use garden_shared::clients::redis::connect_cache;
use garden_shared::clock::{Clock, SystemClock};

use crate::config::AppConfig;

/// Evaluate alert rules for every subscriber and mail the digests.
pub async fn run(config: &AppConfig, pool: DbPool) -> anyhow::Result<AlertCheckReport> {
    let repo = Arc::new(PgRepository::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = connect_cache(&config.redis_url, clock.clone()).await?;

    let deps = NotificationDeps {
        notifications: repo.clone(),
        settings: repo.clone(),
        sensors: repo,
        cache,
        clock,
    };
    let mailer = Arc::new(EmailClient::new(
        &config.email_api_url,
        &config.email_api_key,
        &config.email_from,
        &config.email_from_name,
    ));

    let report = AlertCheckJob::new(deps, mailer, &config.app_url).run().await?;

    tracing::info!(
        users_checked = report.users_checked,
        alerts_created = report.alerts_created,
        emails_sent = report.emails_sent,
        emails_failed = report.emails_failed,
        "alert check completed"
    );
    Ok(report)
}
