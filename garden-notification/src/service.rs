use std::sync::Arc;

use uuid::Uuid;

use garden_shared::cache::{self, Cache};
use garden_shared::clock::Clock;
use garden_shared::errors::{AppError, AppResult};

use crate::models::{NewNotification, Notification};
use crate::repository::{NotificationRepository, SensorSnapshotRepository, SettingsRepository};

/// TTL for every cached notification read and for cached settings.
pub const CACHE_TTL_SECS: u64 = 300;

/// Explicitly constructed dependencies shared by the notification store and the alert evaluator.
#[derive(Clone)]
pub struct NotificationDeps {
    pub notifications: Arc<dyn NotificationRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub sensors: Arc<dyn SensorSnapshotRepository>,
    pub cache: Arc<dyn Cache>,
    pub clock: Arc<dyn Clock>,
}

/// Key prefix covering every cached notification read of a user.
pub fn cache_prefix(user_id: Uuid) -> String {
    format!("notifications:{user_id}")
}

/// Notification CRUD and cached reads, scoped to one user.
pub struct NotificationStore {
    deps: NotificationDeps,
    user_id: Uuid,
}

impl NotificationStore {
    pub fn new(deps: NotificationDeps, user_id: Uuid) -> Self {
        Self { deps, user_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Insert an unread notification and return its id.
    pub async fn create(
        &self,
        notification_type: &str,
        message: &str,
        data: serde_json::Value,
    ) -> AppResult<Uuid> {
        let new = NewNotification {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            notification_type: notification_type.to_string(),
            message: message.to_string(),
            data,
            created_at: self.deps.clock.now(),
        };

        let id = self
            .deps
            .notifications
            .insert(new)
            .await?
            .ok_or_else(|| AppError::write_failed("failed to create notification"))?;

        self.invalidate().await;

        tracing::info!(
            notification_id = %id,
            user_id = %self.user_id,
            notification_type = %notification_type,
            "notification created"
        );

        Ok(id)
    }

    /// Mark one notification read. Repeating the call keeps the original `read_at`.
    pub async fn mark_as_read(&self, id: Uuid) -> AppResult<()> {
        let now = self.deps.clock.now();
        if !self.deps.notifications.mark_read(self.user_id, id, now).await? {
            return Err(AppError::notification_not_found());
        }

        self.invalidate().await;
        tracing::debug!(notification_id = %id, user_id = %self.user_id, "notification marked as read");
        Ok(())
    }

    pub async fn mark_all_as_read(&self) -> AppResult<usize> {
        let now = self.deps.clock.now();
        let updated = self.deps.notifications.mark_all_read(self.user_id, now).await?;

        self.invalidate().await;
        tracing::debug!(user_id = %self.user_id, updated, "all notifications marked as read");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.deps.notifications.delete(self.user_id, id).await? {
            return Err(AppError::notification_not_found());
        }

        self.invalidate().await;
        tracing::debug!(notification_id = %id, user_id = %self.user_id, "notification deleted");
        Ok(())
    }

    pub async fn unread_count(&self) -> AppResult<i64> {
        let key = format!("{}:unread_count", cache_prefix(self.user_id));
        let repo = &self.deps.notifications;
        cache::read_through(self.deps.cache.as_ref(), &key, CACHE_TTL_SECS, || {
            repo.count_unread(self.user_id)
        })
        .await
    }

    pub async fn total_count(&self) -> AppResult<i64> {
        let key = format!("{}:total", cache_prefix(self.user_id));
        let repo = &self.deps.notifications;
        cache::read_through(self.deps.cache.as_ref(), &key, CACHE_TTL_SECS, || {
            repo.count_all(self.user_id)
        })
        .await
    }

    /// Newest first, `limit` rows starting at `offset`.
    pub async fn notifications(&self, limit: i64, offset: i64) -> AppResult<Vec<Notification>> {
        let key = format!("{}:{limit}:{offset}", cache_prefix(self.user_id));
        let repo = &self.deps.notifications;
        cache::read_through(self.deps.cache.as_ref(), &key, CACHE_TTL_SECS, || {
            repo.list(self.user_id, limit, offset)
        })
        .await
    }

    /// Drop every cached read of this user. A failure leaves stale entries until TTL expiry.
    async fn invalidate(&self) {
        let prefix = cache_prefix(self.user_id);
        if let Err(e) = self.deps.cache.delete_prefix(&prefix).await {
            tracing::warn!(user_id = %self.user_id, error = %e, "failed to invalidate notification cache");
        }
    }
}
