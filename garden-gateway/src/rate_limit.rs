//! Trailing-window request limiter backed by the `rate_limits` table.
//!
//! Every allowed request appends one row for `(user_id, endpoint)`; a request
//! is allowed while fewer than `max_requests` rows fall inside
//! `(now - window, now]`. The window trails the clock, so a client can spend a
//! full quota at the end of one window and again right after it. Counting and
//! recording are two statements, so concurrent requests may briefly overshoot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use garden_shared::clients::db::{self, DbPool};
use garden_shared::clock::Clock;
use garden_shared::errors::{AppError, AppResult};

use crate::schema::rate_limits;

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Rows for `(user_id, endpoint)` with `since < requested_at <= until`.
    async fn count_between(
        &self,
        user_id: Uuid,
        endpoint: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64>;

    async fn record(&self, user_id: Uuid, endpoint: &str, at: DateTime<Utc>) -> AppResult<()>;

    async fn last_request(&self, user_id: Uuid, endpoint: &str) -> AppResult<Option<DateTime<Utc>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>, settings: RateLimitSettings) -> Self {
        Self { store, clock, settings }
    }

    pub fn settings(&self) -> RateLimitSettings {
        self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record the request and return `true` if it fits the window, else `false` without recording.
    pub async fn check(&self, user_id: Uuid, endpoint: &str) -> AppResult<bool> {
        if !self.settings.enabled {
            return Ok(true);
        }
        require_endpoint(endpoint)?;

        let now = self.clock.now();
        let current = self.current_count(user_id, endpoint, now).await?;
        if current >= i64::from(self.settings.max_requests) {
            tracing::debug!(user_id = %user_id, endpoint = %endpoint, current, "rate limit reached");
            return Ok(false);
        }

        self.store.record(user_id, endpoint, now).await?;
        Ok(true)
    }

    pub async fn remaining_requests(&self, user_id: Uuid, endpoint: &str) -> AppResult<u32> {
        if !self.settings.enabled {
            return Ok(self.settings.max_requests);
        }
        require_endpoint(endpoint)?;

        let current = self.current_count(user_id, endpoint, self.clock.now()).await?;
        let remaining = (i64::from(self.settings.max_requests) - current).max(0);
        Ok(remaining as u32)
    }

    /// Latest recorded request plus the window, or now when nothing was recorded.
    pub async fn reset_time(&self, user_id: Uuid, endpoint: &str) -> AppResult<DateTime<Utc>> {
        if !self.settings.enabled {
            return Ok(self.clock.now());
        }
        require_endpoint(endpoint)?;

        Ok(match self.store.last_request(user_id, endpoint).await? {
            Some(last) => last + self.settings.window,
            None => self.clock.now(),
        })
    }

    async fn current_count(&self, user_id: Uuid, endpoint: &str, now: DateTime<Utc>) -> AppResult<i64> {
        self.store
            .count_between(user_id, endpoint, now - self.settings.window, now)
            .await
    }
}

fn require_endpoint(endpoint: &str) -> AppResult<()> {
    if endpoint.is_empty() {
        return Err(AppError::bad_request("rate limit endpoint must not be empty"));
    }
    Ok(())
}

#[derive(Insertable)]
#[diesel(table_name = rate_limits)]
struct NewRateLimitRecord<'a> {
    user_id: Uuid,
    endpoint: &'a str,
    requested_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgRateLimitStore {
    pool: DbPool,
}

impl PgRateLimitStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for PgRateLimitStore {
    async fn count_between(
        &self,
        user_id: Uuid,
        endpoint: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64> {
        let mut conn = db::conn(&self.pool)?;

        let count = rate_limits::table
            .filter(rate_limits::user_id.eq(user_id))
            .filter(rate_limits::endpoint.eq(endpoint))
            .filter(rate_limits::requested_at.gt(since))
            .filter(rate_limits::requested_at.le(until))
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    async fn record(&self, user_id: Uuid, endpoint: &str, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;

        diesel::insert_into(rate_limits::table)
            .values(&NewRateLimitRecord { user_id, endpoint, requested_at: at })
            .execute(&mut conn)?;

        Ok(())
    }

    async fn last_request(&self, user_id: Uuid, endpoint: &str) -> AppResult<Option<DateTime<Utc>>> {
        let mut conn = db::conn(&self.pool)?;

        let last = rate_limits::table
            .filter(rate_limits::user_id.eq(user_id))
            .filter(rate_limits::endpoint.eq(endpoint))
            .select(diesel::dsl::max(rate_limits::requested_at))
            .first::<Option<DateTime<Utc>>>(&mut conn)?;

        Ok(last)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use garden_shared::clock::ManualClock;
    use std::sync::Mutex;

    /// Append-only record list mirroring the table.
    #[derive(Default)]
    pub(crate) struct MemoryRateLimitStore {
        records: Mutex<Vec<(Uuid, String, DateTime<Utc>)>>,
    }

    impl MemoryRateLimitStore {
        pub(crate) fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RateLimitStore for MemoryRateLimitStore {
        async fn count_between(
            &self,
            user_id: Uuid,
            endpoint: &str,
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> AppResult<i64> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(u, e, at)| *u == user_id && e == endpoint && *at > since && *at <= until)
                .count() as i64)
        }

        async fn record(&self, user_id: Uuid, endpoint: &str, at: DateTime<Utc>) -> AppResult<()> {
            self.records.lock().unwrap().push((user_id, endpoint.to_string(), at));
            Ok(())
        }

        async fn last_request(&self, user_id: Uuid, endpoint: &str) -> AppResult<Option<DateTime<Utc>>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(u, e, _)| *u == user_id && e == endpoint)
                .map(|(_, _, at)| *at)
                .max())
        }
    }

    pub(crate) fn limiter(
        enabled: bool,
        max_requests: u32,
        window_secs: i64,
    ) -> (RateLimiter, Arc<ManualClock>, Arc<MemoryRateLimitStore>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
        let store = Arc::new(MemoryRateLimitStore::default());
        let limiter = RateLimiter::new(
            store.clone(),
            clock.clone(),
            RateLimitSettings { enabled, max_requests, window: Duration::seconds(window_secs) },
        );
        (limiter, clock, store)
    }

    #[tokio::test]
    async fn allows_exactly_the_limit_then_rejects() {
        let (limiter, clock, store) = limiter(true, 5, 60);
        let user = Uuid::now_v7();

        for _ in 0..5 {
            assert!(limiter.check(user, "/api/sensors").await.unwrap());
            clock.advance(Duration::seconds(1));
        }
        assert!(!limiter.check(user, "/api/sensors").await.unwrap());
        assert_eq!(store.len(), 5, "rejected requests are not recorded");

        // Other endpoints and users have their own budget.
        assert!(limiter.check(user, "/api/plants").await.unwrap());
        assert!(limiter.check(Uuid::now_v7(), "/api/sensors").await.unwrap());
    }

    #[tokio::test]
    async fn window_slides_with_the_clock() {
        let (limiter, clock, _store) = limiter(true, 5, 60);
        let user = Uuid::now_v7();

        for _ in 0..5 {
            assert!(limiter.check(user, "/api/sensors").await.unwrap());
        }
        assert!(!limiter.check(user, "/api/sensors").await.unwrap());

        clock.advance(Duration::seconds(59));
        assert!(!limiter.check(user, "/api/sensors").await.unwrap());

        // Records stamped exactly `window` ago are outside `(now - window, now]`.
        clock.advance(Duration::seconds(1));
        assert!(limiter.check(user, "/api/sensors").await.unwrap());
    }

    #[tokio::test]
    async fn remaining_counts_down_and_floors_at_zero() {
        let (limiter, _clock, _store) = limiter(true, 5, 60);
        let user = Uuid::now_v7();

        assert_eq!(limiter.remaining_requests(user, "/api/sensors").await.unwrap(), 5);
        for n in 1..=3 {
            limiter.check(user, "/api/sensors").await.unwrap();
            assert_eq!(limiter.remaining_requests(user, "/api/sensors").await.unwrap(), 5 - n);
        }
        for _ in 0..4 {
            limiter.check(user, "/api/sensors").await.unwrap();
        }
        assert_eq!(limiter.remaining_requests(user, "/api/sensors").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reset_time_is_last_request_plus_window() {
        let (limiter, clock, _store) = limiter(true, 5, 60);
        let user = Uuid::now_v7();

        assert_eq!(limiter.reset_time(user, "/api/sensors").await.unwrap(), clock.now());

        limiter.check(user, "/api/sensors").await.unwrap();
        clock.advance(Duration::seconds(10));
        limiter.check(user, "/api/sensors").await.unwrap();
        let last = clock.now();
        clock.advance(Duration::seconds(5));

        assert_eq!(
            limiter.reset_time(user, "/api/sensors").await.unwrap(),
            last + Duration::seconds(60)
        );
    }

    #[tokio::test]
    async fn disabled_limiter_allows_everything_without_recording() {
        let (limiter, clock, store) = limiter(false, 1, 60);
        let user = Uuid::now_v7();

        for _ in 0..10 {
            assert!(limiter.check(user, "/api/sensors").await.unwrap());
        }
        assert_eq!(store.len(), 0);
        assert_eq!(limiter.remaining_requests(user, "/api/sensors").await.unwrap(), 1);
        assert_eq!(limiter.reset_time(user, "/api/sensors").await.unwrap(), clock.now());
    }

    #[tokio::test]
    async fn empty_endpoint_is_rejected() {
        let (limiter, _clock, store) = limiter(true, 5, 60);
        assert!(limiter.check(Uuid::now_v7(), "").await.is_err());
        assert_eq!(store.len(), 0);
    }
}
