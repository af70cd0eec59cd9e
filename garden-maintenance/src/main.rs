mod config;
mod jobs;
mod schema;

use config::AppConfig;
use garden_shared::clients::db;
use jobs::Job;

#[tokio::main]
async fn main() {
    garden_shared::middleware::init_tracing("garden-maintenance");

    let job = match Job::from_args(std::env::args().skip(1)) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(error = %e, "invalid invocation");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(job).await {
        tracing::error!(job = %job, error = ?e, "maintenance job failed");
        std::process::exit(1);
    }
}

async fn run(job: Job) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    tracing::info!(job = %job, "maintenance job starting");

    match job {
        Job::CheckAlerts => {
            jobs::check_alerts::run(&config, pool).await?;
        }
        Job::Cleanup => {
            let mut conn = db::conn(&pool)?;
            jobs::cleanup::run(&mut conn, jobs::cleanup::Cutoffs::at(chrono::Utc::now()))?;
        }
        Job::Optimize => {
            let mut conn = db::conn(&pool)?;
            jobs::optimize::run(&mut conn)?;
        }
    }
    Ok(())
}
