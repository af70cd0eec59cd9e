//! Threshold checks over a user's sensors.
//!
//! Each rule runs on its own: one sensor can raise a low-battery, a moisture
//! and a temperature alert in the same pass. A rule skips a sensor when an
//! alert of the same kind for that sensor already exists within the kind's
//! dedup window, measured from the injected clock.

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use garden_shared::cache;
use garden_shared::errors::AppResult;

use crate::models::{AlertKind, SensorSnapshot, UserAlertSettings};
use crate::service::{NotificationDeps, NotificationStore, CACHE_TTL_SECS};

pub const LOW_BATTERY_THRESHOLD: i32 = 20;
pub const TEMPERATURE_MIN: f64 = 10.0;
pub const TEMPERATURE_MAX: f64 = 35.0;

pub fn settings_cache_key(user_id: Uuid) -> String {
    format!("settings:{user_id}")
}

/// Alerts created by one [`AlertEvaluator::check_alerts`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub low_battery: usize,
    pub moisture: usize,
    pub temperature: usize,
}

impl AlertSummary {
    pub fn total(&self) -> usize {
        self.low_battery + self.moisture + self.temperature
    }

    fn bump(&mut self, kind: AlertKind) {
        match kind {
            AlertKind::LowBattery => self.low_battery += 1,
            AlertKind::Moisture => self.moisture += 1,
            AlertKind::Temperature => self.temperature += 1,
        }
    }
}

/// An alert a rule wants to raise, before dedup.
struct Candidate {
    kind: AlertKind,
    sensor_id: Uuid,
    message: String,
    data: serde_json::Value,
}

#[derive(Clone)]
pub struct AlertEvaluator {
    deps: NotificationDeps,
}

impl AlertEvaluator {
    pub fn new(deps: NotificationDeps) -> Self {
        Self { deps }
    }

    /// Alert toggles for `user_id`, read through `settings:{user_id}`.
    pub async fn settings(&self, user_id: Uuid) -> AppResult<Option<UserAlertSettings>> {
        let repo = &self.deps.settings;
        let raw = cache::read_through_optional(
            self.deps.cache.as_ref(),
            &settings_cache_key(user_id),
            CACHE_TTL_SECS,
            || repo.load_settings(user_id),
        )
        .await?;

        Ok(raw.map(serde_json::from_value::<UserAlertSettings>).transpose()?)
    }

    pub async fn check_alerts(&self, user_id: Uuid) -> AppResult<AlertSummary> {
        let Some(settings) = self.settings(user_id).await? else {
            tracing::debug!(user_id = %user_id, "no alert settings, skipping alert check");
            return Ok(AlertSummary::default());
        };

        let enabled: Vec<AlertKind> = AlertKind::ALL
            .into_iter()
            .filter(|kind| settings.is_enabled(*kind))
            .collect();
        if enabled.is_empty() {
            return Ok(AlertSummary::default());
        }

        let sensors = self.deps.sensors.snapshots_for_user(user_id).await?;
        let store = NotificationStore::new(self.deps.clone(), user_id);
        let now = self.deps.clock.now();
        let mut summary = AlertSummary::default();

        for kind in enabled {
            for candidate in sensors.iter().filter_map(|s| evaluate(kind, s)) {
                let since = now - kind.dedup_window();
                let fired = self
                    .deps
                    .notifications
                    .alert_fired_since(user_id, kind.as_str(), candidate.sensor_id, since)
                    .await?;
                if fired {
                    tracing::debug!(
                        user_id = %user_id,
                        sensor_id = %candidate.sensor_id,
                        kind = %kind,
                        "alert suppressed within dedup window"
                    );
                    continue;
                }

                store
                    .create(candidate.kind.as_str(), &candidate.message, candidate.data)
                    .await?;
                summary.bump(kind);
            }
        }

        if summary.total() > 0 {
            tracing::info!(
                user_id = %user_id,
                low_battery = summary.low_battery,
                moisture = summary.moisture,
                temperature = summary.temperature,
                "alerts created"
            );
        }

        Ok(summary)
    }
}

fn evaluate(kind: AlertKind, sensor: &SensorSnapshot) -> Option<Candidate> {
    match kind {
        AlertKind::LowBattery => {
            (sensor.battery_level < LOW_BATTERY_THRESHOLD).then(|| Candidate {
                kind,
                sensor_id: sensor.sensor_id,
                message: format!(
                    "Low battery alert for sensor {} on plant {}",
                    sensor.name, sensor.plant_name
                ),
                data: json!({
                    "sensor_id": sensor.sensor_id,
                    "battery_level": sensor.battery_level,
                }),
            })
        }
        AlertKind::Moisture => {
            let reading = sensor.last_reading?;
            let status = out_of_range(reading, sensor.min_moisture, sensor.max_moisture)?;
            Some(Candidate {
                kind,
                sensor_id: sensor.sensor_id,
                message: format!(
                    "Moisture {status} alert for sensor {} on plant {}",
                    sensor.name, sensor.plant_name
                ),
                data: json!({
                    "sensor_id": sensor.sensor_id,
                    "reading": reading,
                    "min": sensor.min_moisture,
                    "max": sensor.max_moisture,
                }),
            })
        }
        AlertKind::Temperature => {
            let reading = sensor.last_reading?;
            let status = out_of_range(reading, TEMPERATURE_MIN, TEMPERATURE_MAX)?;
            Some(Candidate {
                kind,
                sensor_id: sensor.sensor_id,
                message: format!(
                    "Temperature {status} alert for sensor {} on plant {}",
                    sensor.name, sensor.plant_name
                ),
                data: json!({
                    "sensor_id": sensor.sensor_id,
                    "reading": reading,
                }),
            })
        }
    }
}

/// `low` or `high` when `value` falls outside `[min, max]`.
fn out_of_range(value: f64, min: f64, max: f64) -> Option<&'static str> {
    if value < min {
        Some("low")
    } else if value > max {
        Some("high")
    } else {
        None
    }
}
