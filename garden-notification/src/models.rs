use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::notifications;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub message: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// `sensor_id` from the payload, for alert notifications.
    pub fn sensor_id(&self) -> Option<Uuid> {
        self.data
            .get("sensor_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub message: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Alert rules evaluated by the alert check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowBattery,
    Moisture,
    Temperature,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [AlertKind::LowBattery, AlertKind::Moisture, AlertKind::Temperature];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowBattery => "low_battery",
            AlertKind::Moisture => "moisture",
            AlertKind::Temperature => "temperature",
        }
    }

    /// Minimum time before the same alert may fire again for the same sensor.
    pub fn dedup_window(&self) -> Duration {
        match self {
            AlertKind::LowBattery => Duration::hours(24),
            AlertKind::Moisture | AlertKind::Temperature => Duration::hours(1),
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert toggles stored in `user_settings.settings`. Other keys in the JSON are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAlertSettings {
    pub email_notifications: bool,
    pub low_battery_alert: bool,
    pub moisture_alert: bool,
    pub temperature_alert: bool,
}

impl UserAlertSettings {
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::LowBattery => self.low_battery_alert,
            AlertKind::Moisture => self.moisture_alert,
            AlertKind::Temperature => self.temperature_alert,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.email_notifications || AlertKind::ALL.iter().any(|k| self.is_enabled(*k))
    }
}

/// A user picked up by the alert-check job.
#[derive(Debug, Clone)]
pub struct AlertSubscriber {
    pub user_id: Uuid,
    pub email: String,
    pub settings: UserAlertSettings,
}

/// Latest sensor state joined with its plant's moisture thresholds.
#[derive(Debug, Clone, PartialEq, Queryable, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub sensor_id: Uuid,
    pub name: String,
    pub plant_id: Uuid,
    pub plant_name: String,
    pub battery_level: i32,
    pub last_reading: Option<f64>,
    pub min_moisture: f64,
    pub max_moisture: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_ignore_unrelated_keys() {
        let settings: UserAlertSettings = serde_json::from_value(serde_json::json!({
            "moisture_alert": true,
            "theme": "dark",
            "update_interval": 300
        }))
        .unwrap();

        assert!(settings.moisture_alert);
        assert!(!settings.low_battery_alert);
        assert!(settings.any_enabled());
        assert!(!UserAlertSettings::default().any_enabled());
    }

    #[test]
    fn email_only_counts_as_enabled() {
        let settings = UserAlertSettings { email_notifications: true, ..Default::default() };
        assert!(settings.any_enabled());
        assert!(AlertKind::ALL.iter().all(|k| !settings.is_enabled(*k)));
    }

    #[test]
    fn dedup_windows() {
        assert_eq!(AlertKind::LowBattery.dedup_window(), Duration::hours(24));
        assert_eq!(AlertKind::Moisture.dedup_window(), Duration::hours(1));
        assert_eq!(AlertKind::Temperature.as_str(), "temperature");
    }

    #[test]
    fn notification_serializes_type_field() {
        let sensor_id = Uuid::now_v7();
        let n = Notification {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            notification_type: "low_battery".into(),
            message: "Low battery".into(),
            data: serde_json::json!({ "sensor_id": sensor_id, "battery_level": 12 }),
            created_at: Utc::now(),
            read_at: None,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "low_battery");
        assert_eq!(n.sensor_id(), Some(sensor_id));
        assert!(!n.is_read());
    }
}
