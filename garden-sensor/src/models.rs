use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{plants, readings, sensors};

pub const DEFAULT_BATTERY_LEVEL: i32 = 100;
pub const DEFAULT_SENSOR_STATUS: &str = "active";

// --- Sensor ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = sensors)]
pub struct Sensor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plant_id: Option<Uuid>,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub location: Option<String>,
    pub battery_level: i32,
    pub last_reading: Option<f64>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSensorRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "type must be 1-50 characters"))]
    pub sensor_type: String,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub plant_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sensors)]
pub struct NewSensor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plant_id: Option<Uuid>,
    pub name: String,
    pub sensor_type: String,
    pub location: Option<String>,
    pub battery_level: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewSensor {
    /// A freshly registered sensor starts fully charged and active.
    pub fn from_request(user_id: Uuid, req: CreateSensorRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            plant_id: req.plant_id,
            name: req.name,
            sensor_type: req.sensor_type,
            location: req.location,
            battery_level: DEFAULT_BATTERY_LEVEL,
            status: DEFAULT_SENSOR_STATUS.to_string(),
            notes: req.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = sensors)]
pub struct UpdateSensor {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub sensor_type: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub plant_id: Option<Uuid>,
    #[validate(length(min = 1, max = 20))]
    pub status: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

// --- Plant ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = plants)]
pub struct Plant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub location: Option<String>,
    pub min_moisture: f64,
    pub max_moisture: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlantRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "type must be 1-50 characters"))]
    pub plant_type: String,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_moisture: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_moisture: f64,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = plants)]
pub struct NewPlant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub plant_type: String,
    pub location: Option<String>,
    pub min_moisture: f64,
    pub max_moisture: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPlant {
    pub fn from_request(user_id: Uuid, req: CreatePlantRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            name: req.name,
            plant_type: req.plant_type,
            location: req.location,
            min_moisture: req.min_moisture,
            max_moisture: req.max_moisture,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = plants)]
pub struct UpdatePlant {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub plant_type: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_moisture: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_moisture: Option<f64>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

impl UpdatePlant {
    /// Thresholds the plant ends up with once this update is applied.
    pub fn thresholds_over(&self, plant: &Plant) -> (f64, f64) {
        (
            self.min_moisture.unwrap_or(plant.min_moisture),
            self.max_moisture.unwrap_or(plant.max_moisture),
        )
    }
}

// --- Reading ---

#[derive(Debug, Clone, Queryable, Identifiable, Insertable, Serialize)]
#[diesel(table_name = readings)]
pub struct Reading {
    pub id: Uuid,
    pub sensor_id: Uuid,
    pub value: f64,
    pub battery_level: Option<i32>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordReadingRequest {
    pub value: f64,
    #[validate(range(min = 0, max = 100, message = "battery_level must be 0-100"))]
    pub battery_level: Option<i32>,
}

// --- Settings ---

/// The per-user settings document stored in `user_settings.settings`.
///
/// Missing keys take their default, so documents written by older versions
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserSettings {
    pub email_notifications: bool,
    pub low_battery_alert: bool,
    pub moisture_alert: bool,
    pub temperature_alert: bool,
    /// Dashboard refresh interval in seconds.
    #[validate(range(min = 60, max = 3600, message = "update_interval must be 60-3600 seconds"))]
    pub update_interval: u32,
    #[validate(length(max = 20))]
    pub theme: String,
    #[validate(length(max = 10))]
    pub language: String,
    #[validate(length(max = 50))]
    pub timezone: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            low_battery_alert: true,
            moisture_alert: true,
            temperature_alert: true,
            update_interval: 300,
            theme: "light".into(),
            language: "en".into(),
            timezone: "UTC".into(),
        }
    }
}

/// `PUT /settings` body; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub email_notifications: Option<bool>,
    pub low_battery_alert: Option<bool>,
    pub moisture_alert: Option<bool>,
    pub temperature_alert: Option<bool>,
    pub update_interval: Option<u32>,
    pub theme: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
}

impl UserSettings {
    pub fn merged(mut self, update: SettingsUpdate) -> Self {
        if let Some(v) = update.email_notifications { self.email_notifications = v; }
        if let Some(v) = update.low_battery_alert { self.low_battery_alert = v; }
        if let Some(v) = update.moisture_alert { self.moisture_alert = v; }
        if let Some(v) = update.temperature_alert { self.temperature_alert = v; }
        if let Some(v) = update.update_interval { self.update_interval = v; }
        if let Some(v) = update.theme { self.theme = v; }
        if let Some(v) = update.language { self.language = v; }
        if let Some(v) = update.timezone { self.timezone = v; }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(min: f64, max: f64) -> Plant {
        let now = Utc::now();
        Plant {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            name: "Basil".into(),
            plant_type: "herb".into(),
            location: None,
            min_moisture: min,
            max_moisture: max,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_sensor_starts_charged_and_active() {
        let req: CreateSensorRequest = serde_json::from_value(serde_json::json!({
            "name": "Bed 1",
            "type": "moisture",
        }))
        .unwrap();
        let user_id = Uuid::now_v7();
        let sensor = NewSensor::from_request(user_id, req, Utc::now());

        assert_eq!(sensor.user_id, user_id);
        assert_eq!(sensor.battery_level, 100);
        assert_eq!(sensor.status, "active");
        assert_eq!(sensor.plant_id, None);
    }

    #[test]
    fn sensor_request_lengths_are_checked() {
        let req: CreateSensorRequest = serde_json::from_value(serde_json::json!({
            "name": "",
            "type": "moisture",
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreateSensorRequest = serde_json::from_value(serde_json::json!({
            "name": "x".repeat(101),
            "type": "moisture",
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn moisture_thresholds_must_be_percentages() {
        let req: CreatePlantRequest = serde_json::from_value(serde_json::json!({
            "name": "Fern",
            "type": "fern",
            "min_moisture": -5.0,
            "max_moisture": 60.0,
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn partial_update_keeps_stored_thresholds() {
        let update = UpdatePlant { max_moisture: Some(70.0), ..Default::default() };
        assert_eq!(update.thresholds_over(&plant(30.0, 60.0)), (30.0, 70.0));
        assert_eq!(UpdatePlant::default().thresholds_over(&plant(30.0, 60.0)), (30.0, 60.0));
    }

    #[test]
    fn battery_level_on_readings_is_bounded() {
        let ok = RecordReadingRequest { value: 41.0, battery_level: Some(80) };
        assert!(ok.validate().is_ok());
        let bad = RecordReadingRequest { value: 41.0, battery_level: Some(120) };
        assert!(bad.validate().is_err());
        let absent = RecordReadingRequest { value: 41.0, battery_level: None };
        assert!(absent.validate().is_ok());
    }

    #[test]
    fn sensor_serializes_type_field() {
        let now = Utc::now();
        let sensor = Sensor {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            plant_id: None,
            name: "Bed 1".into(),
            sensor_type: "moisture".into(),
            location: Some("greenhouse".into()),
            battery_level: 90,
            last_reading: Some(42.0),
            status: "active".into(),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&sensor).unwrap();
        assert_eq!(json["type"], "moisture");
        assert!(json.get("sensor_type").is_none());
    }

    #[test]
    fn settings_defaults_enable_every_alert() {
        let defaults = UserSettings::default();
        assert!(defaults.email_notifications && defaults.low_battery_alert);
        assert!(defaults.moisture_alert && defaults.temperature_alert);
        assert_eq!(defaults.update_interval, 300);
        assert_eq!(defaults.theme, "light");
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn sparse_settings_document_fills_defaults() {
        let doc: UserSettings = serde_json::from_value(serde_json::json!({
            "moisture_alert": false,
            "theme": "dark",
        }))
        .unwrap();
        assert!(!doc.moisture_alert);
        assert!(doc.low_battery_alert);
        assert_eq!(doc.theme, "dark");
        assert_eq!(doc.timezone, "UTC");
    }

    #[test]
    fn merge_only_touches_given_fields() {
        let update = SettingsUpdate {
            temperature_alert: Some(false),
            update_interval: Some(600),
            ..Default::default()
        };
        let merged = UserSettings::default().merged(update);
        assert!(!merged.temperature_alert);
        assert_eq!(merged.update_interval, 600);
        assert!(merged.moisture_alert);
        assert_eq!(merged.language, "en");
    }

    #[test]
    fn update_interval_and_lengths_are_bounded() {
        for interval in [59, 3601] {
            let settings = UserSettings { update_interval: interval, ..Default::default() };
            assert!(settings.validate().is_err(), "{interval} must be rejected");
        }
        for interval in [60, 3600] {
            let settings = UserSettings { update_interval: interval, ..Default::default() };
            assert!(settings.validate().is_ok(), "{interval} must be accepted");
        }
        let settings = UserSettings { language: "en-GB-oxendict".into(), ..Default::default() };
        assert!(settings.validate().is_err());
    }
}
