//! Per-user settings with a read-through cache.
//!
//! The cache entry `settings:{user_id}` holds the stored document as-is, the
//! same entry the notification service reads its alert toggles from. Every
//! write drops it once the store write has succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;
use validator::Validate;

use garden_shared::cache::{read_through_optional, Cache};
use garden_shared::clients::db::{self, DbPool};
use garden_shared::clock::Clock;
use garden_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{SettingsUpdate, UserSettings};
use crate::schema::user_settings;

pub const SETTINGS_TTL_SECS: u64 = 300;

pub fn cache_key(user_id: Uuid) -> String {
    format!("settings:{user_id}")
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self, user_id: Uuid) -> AppResult<Option<serde_json::Value>>;

    async fn upsert(&self, user_id: Uuid, document: serde_json::Value, at: DateTime<Utc>) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: DbPool,
}

impl PgSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn load(&self, user_id: Uuid) -> AppResult<Option<serde_json::Value>> {
        let mut conn = db::conn(&self.pool)?;

        let document = user_settings::table
            .find(user_id)
            .select(user_settings::settings)
            .first::<serde_json::Value>(&mut conn)
            .optional()?;

        Ok(document)
    }

    async fn upsert(&self, user_id: Uuid, document: serde_json::Value, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;

        diesel::insert_into(user_settings::table)
            .values((
                user_settings::user_id.eq(user_id),
                user_settings::settings.eq(&document),
                user_settings::updated_at.eq(at),
            ))
            .on_conflict(user_settings::user_id)
            .do_update()
            .set((
                user_settings::settings.eq(&document),
                user_settings::updated_at.eq(at),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: Arc<dyn Cache>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, cache, clock }
    }

    /// The user's settings, or the defaults when nothing was saved yet.
    pub async fn get(&self, user_id: Uuid) -> AppResult<UserSettings> {
        let repo = self.repo.clone();
        let stored = read_through_optional(self.cache.as_ref(), &cache_key(user_id), SETTINGS_TTL_SECS, || async move {
            repo.load(user_id).await
        })
        .await?;

        match stored {
            Some(document) => Ok(serde_json::from_value(document)?),
            None => Ok(UserSettings::default()),
        }
    }

    /// Apply `update` over the current settings and persist the result.
    pub async fn update(&self, user_id: Uuid, update: SettingsUpdate) -> AppResult<UserSettings> {
        let next = self.get(user_id).await?.merged(update);
        next.validate()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

        self.save(user_id, &next).await?;
        tracing::info!(user_id = %user_id, "settings updated");
        Ok(next)
    }

    pub async fn reset(&self, user_id: Uuid) -> AppResult<UserSettings> {
        let defaults = UserSettings::default();
        self.save(user_id, &defaults).await?;
        tracing::info!(user_id = %user_id, "settings reset to defaults");
        Ok(defaults)
    }

    async fn save(&self, user_id: Uuid, settings: &UserSettings) -> AppResult<()> {
        self.repo
            .upsert(user_id, serde_json::to_value(settings)?, self.clock.now())
            .await?;

        // A stale entry expires with its TTL.
        if let Err(e) = self.cache.delete_prefix(&cache_key(user_id)).await {
            tracing::warn!(user_id = %user_id, error = %e, "failed to invalidate settings cache");
        }
        Ok(())
    }
}
