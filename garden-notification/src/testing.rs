//! In-memory stand-ins for the store, cache, clock and mailer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use garden_shared::cache::MemoryCache;
use garden_shared::clients::email::{MailError, Mailer};
use garden_shared::clock::ManualClock;
use garden_shared::errors::{AppError, AppResult, ErrorCode};

use crate::alerts::AlertEvaluator;
use crate::models::{AlertSubscriber, NewNotification, Notification, SensorSnapshot, UserAlertSettings};
use crate::repository::{NotificationRepository, SensorSnapshotRepository, SettingsRepository};
use crate::service::{NotificationDeps, NotificationStore};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct FakeNotifications {
    rows: Mutex<Vec<Notification>>,
    fail_inserts: AtomicBool,
    unread_queries: AtomicUsize,
}

impl FakeNotifications {
    /// Rows in insertion order.
    pub fn all(&self) -> Vec<Notification> {
        lock(&self.rows).clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Notification> {
        lock(&self.rows).iter().find(|n| n.id == id).cloned()
    }

    /// Make every insert affect zero rows.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn unread_queries(&self) -> usize {
        self.unread_queries.load(Ordering::SeqCst)
    }

    /// Write a row without going through the store, like another process would.
    pub fn insert_raw(&self, user_id: Uuid, kind: &str, data: serde_json::Value, at: DateTime<Utc>) -> Uuid {
        let id = Uuid::now_v7();
        lock(&self.rows).push(Notification {
            id,
            user_id,
            notification_type: kind.to_string(),
            message: kind.to_string(),
            data,
            created_at: at,
            read_at: None,
        });
        id
    }
}

#[async_trait]
impl NotificationRepository for FakeNotifications {
    async fn insert(&self, new: NewNotification) -> AppResult<Option<Uuid>> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let id = new.id;
        lock(&self.rows).push(Notification {
            id,
            user_id: new.user_id,
            notification_type: new.notification_type,
            message: new.message,
            data: new.data,
            created_at: new.created_at,
            read_at: None,
        });
        Ok(Some(id))
    }

    async fn mark_read(&self, user_id: Uuid, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut rows = lock(&self.rows);
        match rows.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => {
                n.read_at.get_or_insert(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<usize> {
        let mut rows = lock(&self.rows);
        let mut updated = 0;
        for n in rows.iter_mut().filter(|n| n.user_id == user_id && n.read_at.is_none()) {
            n.read_at = Some(at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut rows = lock(&self.rows);
        let before = rows.len();
        rows.retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(rows.len() < before)
    }

    async fn count_unread(&self, user_id: Uuid) -> AppResult<i64> {
        self.unread_queries.fetch_add(1, Ordering::SeqCst);
        let rows = lock(&self.rows);
        Ok(rows.iter().filter(|n| n.user_id == user_id && n.read_at.is_none()).count() as i64)
    }

    async fn count_all(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(lock(&self.rows).iter().filter(|n| n.user_id == user_id).count() as i64)
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> AppResult<Vec<Notification>> {
        let mut items: Vec<Notification> =
            lock(&self.rows).iter().filter(|n| n.user_id == user_id).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn alert_fired_since(
        &self,
        user_id: Uuid,
        kind: &str,
        sensor_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(lock(&self.rows).iter().any(|n| {
            n.user_id == user_id
                && n.notification_type == kind
                && n.created_at > since
                && n.sensor_id() == Some(sensor_id)
        }))
    }
}

#[derive(Default)]
pub struct FakeSettings {
    documents: Mutex<Vec<(Uuid, serde_json::Value)>>,
    emails: Mutex<HashMap<Uuid, String>>,
    loads: AtomicUsize,
}

impl FakeSettings {
    /// Store a settings document, replacing any earlier one for the user.
    pub fn put(&self, user_id: Uuid, settings: serde_json::Value) {
        let mut docs = lock(&self.documents);
        match docs.iter_mut().find(|(id, _)| *id == user_id) {
            Some((_, doc)) => *doc = settings,
            None => docs.push((user_id, settings)),
        }
    }

    pub fn set_email(&self, user_id: Uuid, email: &str) {
        lock(&self.emails).insert(user_id, email.to_string());
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsRepository for FakeSettings {
    async fn load_settings(&self, user_id: Uuid) -> AppResult<Option<serde_json::Value>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.documents)
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, doc)| doc.clone()))
    }

    async fn alert_subscribers(&self) -> AppResult<Vec<AlertSubscriber>> {
        let docs = lock(&self.documents).clone();
        let emails = lock(&self.emails);
        let mut subscribers = Vec::new();
        for (user_id, doc) in docs {
            let settings: UserAlertSettings = serde_json::from_value(doc)?;
            if settings.any_enabled() {
                let email = emails
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| format!("{user_id}@garden.test"));
                subscribers.push(AlertSubscriber { user_id, email, settings });
            }
        }
        Ok(subscribers)
    }
}

#[derive(Default)]
pub struct FakeSensors {
    sensors: Mutex<Vec<(Uuid, SensorSnapshot)>>,
    failing: Mutex<HashSet<Uuid>>,
}

impl FakeSensors {
    /// Add a sensor attached to a fresh plant and return the sensor id.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        user_id: Uuid,
        name: &str,
        plant_name: &str,
        battery_level: i32,
        last_reading: Option<f64>,
        min_moisture: f64,
        max_moisture: f64,
    ) -> Uuid {
        let sensor_id = Uuid::now_v7();
        lock(&self.sensors).push((
            user_id,
            SensorSnapshot {
                sensor_id,
                name: name.to_string(),
                plant_id: Uuid::now_v7(),
                plant_name: plant_name.to_string(),
                battery_level,
                last_reading,
                min_moisture,
                max_moisture,
            },
        ));
        sensor_id
    }

    /// Make snapshot loads for `user_id` fail as if the store went away.
    pub fn fail_for(&self, user_id: Uuid) {
        lock(&self.failing).insert(user_id);
    }
}

#[async_trait]
impl SensorSnapshotRepository for FakeSensors {
    async fn snapshots_for_user(&self, user_id: Uuid) -> AppResult<Vec<SensorSnapshot>> {
        if lock(&self.failing).contains(&user_id) {
            return Err(AppError::new(ErrorCode::StoreUnavailable, "store unavailable"));
        }
        Ok(lock(&self.sensors)
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

/// Records every message; optionally rejects them all.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected { status: 550, body: "relay refused".into() });
        }
        lock(&self.sent).push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Fakes wired together around one manual clock.
pub struct Harness {
    pub user: Uuid,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCache>,
    pub repo: Arc<FakeNotifications>,
    pub settings: Arc<FakeSettings>,
    pub sensors: Arc<FakeSensors>,
}

impl Harness {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        Self {
            user: Uuid::now_v7(),
            cache: Arc::new(MemoryCache::new(clock.clone())),
            clock,
            repo: Arc::new(FakeNotifications::default()),
            settings: Arc::new(FakeSettings::default()),
            sensors: Arc::new(FakeSensors::default()),
        }
    }

    pub fn deps(&self) -> NotificationDeps {
        NotificationDeps {
            notifications: self.repo.clone(),
            settings: self.settings.clone(),
            sensors: self.sensors.clone(),
            cache: self.cache.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn store(&self, user_id: Uuid) -> NotificationStore {
        NotificationStore::new(self.deps(), user_id)
    }

    pub fn evaluator(&self) -> AlertEvaluator {
        AlertEvaluator::new(self.deps())
    }
}
