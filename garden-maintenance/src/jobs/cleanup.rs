//! Retention purge for readings, notifications, rate-limit records and expired
//! account tokens.

use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::schema::{notifications, password_resets, rate_limits, readings, refresh_tokens};

pub const READING_RETENTION_DAYS: i64 = 30;
pub const NOTIFICATION_RETENTION_DAYS: i64 = 90;
pub const RATE_LIMIT_RETENTION_HOURS: i64 = 24;

/// Rows strictly older than these instants are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoffs {
    pub readings: DateTime<Utc>,
    pub notifications: DateTime<Utc>,
    pub rate_limits: DateTime<Utc>,
    /// Refresh tokens and reset links are dropped once past `expires_at`.
    pub tokens: DateTime<Utc>,
}

impl Cutoffs {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            readings: now - Duration::days(READING_RETENTION_DAYS),
            notifications: now - Duration::days(NOTIFICATION_RETENTION_DAYS),
            rate_limits: now - Duration::hours(RATE_LIMIT_RETENTION_HOURS),
            tokens: now,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub readings: usize,
    pub notifications: usize,
    pub rate_limits: usize,
    pub tokens: usize,
}

/// Delete expired rows; every delete commits or none do.
pub fn run(conn: &mut PgConnection, cutoffs: Cutoffs) -> anyhow::Result<CleanupReport> {
    let report = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        let readings = diesel::delete(readings::table.filter(readings::recorded_at.lt(cutoffs.readings)))
            .execute(conn)?;
        let notifications = diesel::delete(
            notifications::table.filter(notifications::created_at.lt(cutoffs.notifications)),
        )
        .execute(conn)?;
        let rate_limits = diesel::delete(
            rate_limits::table.filter(rate_limits::requested_at.lt(cutoffs.rate_limits)),
        )
        .execute(conn)?;
        let tokens = diesel::delete(
            refresh_tokens::table.filter(refresh_tokens::expires_at.lt(cutoffs.tokens)),
        )
        .execute(conn)?
            + diesel::delete(
                password_resets::table.filter(password_resets::expires_at.lt(cutoffs.tokens)),
            )
            .execute(conn)?;

        Ok(CleanupReport { readings, notifications, rate_limits, tokens })
    })?;

    tracing::info!(
        readings = report.readings,
        notifications = report.notifications,
        rate_limits = report.rate_limits,
        tokens = report.tokens,
        "cleanup completed"
    );
    Ok(report)
}
