//! Store access for notifications, alert settings and sensor snapshots.
//!
//! The traits are the seams the services are built on; [`PgRepository`] is the
//! diesel implementation used by the binaries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use uuid::Uuid;

use garden_shared::clients::db::{self, DbPool};
use garden_shared::errors::AppResult;

use crate::models::{AlertSubscriber, NewNotification, Notification, SensorSnapshot, UserAlertSettings};
use crate::schema::{notifications, plants, sensors, user_settings, users};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a row and return its id, or `None` when nothing was written.
    async fn insert(&self, new: NewNotification) -> AppResult<Option<Uuid>>;

    /// Set `read_at` if unset. Returns whether `(id, user_id)` exists.
    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<usize>;

    /// Returns whether a row owned by `user_id` was removed.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;

    async fn count_unread(&self, user_id: Uuid) -> AppResult<i64>;

    async fn count_all(&self, user_id: Uuid) -> AppResult<i64>;

    /// Newest first.
    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<Vec<Notification>>;

    /// Whether an alert of `kind` referencing `sensor_id` was created after `since`.
    async fn alert_fired_since(
        &self,
        user_id: Uuid,
        kind: &str,
        sensor_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// The stored settings document as-is. It carries more keys than the alert toggles.
    async fn load_settings(&self, user_id: Uuid) -> AppResult<Option<serde_json::Value>>;

    /// Users with at least one alert or email toggle enabled.
    async fn alert_subscribers(&self) -> AppResult<Vec<AlertSubscriber>>;
}

#[async_trait]
pub trait SensorSnapshotRepository: Send + Sync {
    /// Every sensor of `user_id` that is attached to a plant.
    async fn snapshots_for_user(&self, user_id: Uuid) -> AppResult<Vec<SensorSnapshot>>;
}

#[derive(Clone)]
pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgRepository {
    async fn insert(&self, new: NewNotification) -> AppResult<Option<Uuid>> {
        let mut conn = db::conn(&self.pool)?;

        let inserted = diesel::insert_into(notifications::table)
            .values(&new)
            .execute(&mut conn)?;

        Ok((inserted > 0).then_some(new.id))
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = db::conn(&self.pool)?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::read_at.is_null()),
        )
        .set(notifications::read_at.eq(at))
        .execute(&mut conn)?;

        if updated > 0 {
            return Ok(true);
        }

        // Already read is still a success; only a missing or foreign row is not.
        let owned: i64 = notifications::table
            .filter(notifications::id.eq(id))
            .filter(notifications::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)?;

        Ok(owned > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<usize> {
        let mut conn = db::conn(&self.pool)?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::read_at.is_null()),
        )
        .set(notifications::read_at.eq(at))
        .execute(&mut conn)?;

        Ok(updated)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut conn = db::conn(&self.pool)?;

        let deleted = diesel::delete(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<i64> {
        let mut conn = db::conn(&self.pool)?;

        let count = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::read_at.is_null())
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    async fn count_all(&self, user_id: Uuid) -> AppResult<i64> {
        let mut conn = db::conn(&self.pool)?;

        let count = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<Vec<Notification>> {
        let mut conn = db::conn(&self.pool)?;

        let items = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .order(notifications::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(Notification::as_select())
            .load(&mut conn)?;

        Ok(items)
    }

    async fn alert_fired_since(
        &self,
        user_id: Uuid,
        kind: &str,
        sensor_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut conn = db::conn(&self.pool)?;

        let fired: i64 = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::notification_type.eq(kind))
            .filter(notifications::created_at.gt(since))
            .filter(
                diesel::dsl::sql::<Bool>("data ->> 'sensor_id' = ")
                    .bind::<Text, _>(sensor_id.to_string()),
            )
            .count()
            .get_result(&mut conn)?;

        Ok(fired > 0)
    }
}

#[async_trait]
impl SettingsRepository for PgRepository {
    async fn load_settings(&self, user_id: Uuid) -> AppResult<Option<serde_json::Value>> {
        let mut conn = db::conn(&self.pool)?;

        let raw = user_settings::table
            .filter(user_settings::user_id.eq(user_id))
            .select(user_settings::settings)
            .first::<serde_json::Value>(&mut conn)
            .optional()?;

        Ok(raw)
    }

    async fn alert_subscribers(&self) -> AppResult<Vec<AlertSubscriber>> {
        let mut conn = db::conn(&self.pool)?;

        let rows: Vec<(Uuid, String, serde_json::Value)> = users::table
            .inner_join(user_settings::table)
            .select((users::id, users::email, user_settings::settings))
            .load(&mut conn)?;

        let mut subscribers = Vec::with_capacity(rows.len());
        for (user_id, email, raw) in rows {
            match serde_json::from_value::<UserAlertSettings>(raw) {
                Ok(settings) if settings.any_enabled() => {
                    subscribers.push(AlertSubscriber { user_id, email, settings });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "skipping unreadable user settings");
                }
            }
        }

        Ok(subscribers)
    }
}

#[async_trait]
impl SensorSnapshotRepository for PgRepository {
    async fn snapshots_for_user(&self, user_id: Uuid) -> AppResult<Vec<SensorSnapshot>> {
        let mut conn = db::conn(&self.pool)?;

        let snapshots = sensors::table
            .inner_join(plants::table)
            .filter(sensors::user_id.eq(user_id))
            .select((
                sensors::id,
                sensors::name,
                plants::id,
                plants::name,
                sensors::battery_level,
                sensors::last_reading,
                plants::min_moisture,
                plants::max_moisture,
            ))
            .load::<SensorSnapshot>(&mut conn)?;

        Ok(snapshots)
    }
}
