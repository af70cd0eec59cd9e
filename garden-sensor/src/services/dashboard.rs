//! Per-user dashboard: sensor and plant counts, the latest readings of each
//! sensor and a list of things that need attention.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Plant, Sensor};

pub const RECENT_READINGS_PER_SENSOR: i64 = 5;
pub const LOW_BATTERY_THRESHOLD: i32 = 20;

/// Display unit for a reading of `sensor_type`.
pub fn unit_for(sensor_type: &str) -> &'static str {
    if sensor_type.eq_ignore_ascii_case("temperature") {
        "°C"
    } else {
        "%"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SensorStats {
    pub total: usize,
    pub active: usize,
    pub maintenance: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlantStats {
    pub total: usize,
    pub healthy: usize,
    pub needs_attention: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingPoint {
    pub value: f64,
    pub unit: &'static str,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadings {
    pub sensor_id: Uuid,
    pub sensor_name: String,
    pub sensor_type: String,
    pub readings: Vec<ReadingPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemAlert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub sensor_stats: SensorStats,
    pub plant_stats: PlantStats,
    pub recent_readings: Vec<SensorReadings>,
    pub alerts: Vec<SystemAlert>,
}

/// One of the newest readings of a sensor, as loaded for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentReading {
    pub sensor_id: Uuid,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Moisture {
    Dry,
    Wet,
}

/// Where the plant's moisture sensors sit against its thresholds. `None` when
/// no moisture sensor has reported yet or every reading is in range.
fn moisture_state(plant: &Plant, sensors: &[Sensor]) -> Option<Moisture> {
    let mut state = None;
    for reading in sensors
        .iter()
        .filter(|s| s.plant_id == Some(plant.id) && s.sensor_type.eq_ignore_ascii_case("moisture"))
        .filter_map(|s| s.last_reading)
    {
        if reading < plant.min_moisture {
            return Some(Moisture::Dry);
        }
        if reading > plant.max_moisture {
            state = Some(Moisture::Wet);
        }
    }
    state
}

fn system_alerts(sensors: &[Sensor], plants: &[Plant]) -> Vec<SystemAlert> {
    let mut alerts = Vec::new();

    for sensor in sensors {
        if sensor.battery_level < LOW_BATTERY_THRESHOLD {
            alerts.push(SystemAlert {
                level: AlertLevel::Warning,
                message: format!("Low battery on sensor '{}' ({}%)", sensor.name, sensor.battery_level),
            });
        }
        if sensor.status == "error" {
            alerts.push(SystemAlert {
                level: AlertLevel::Error,
                message: format!("Sensor '{}' is reporting an error", sensor.name),
            });
        }
    }

    for plant in plants {
        match moisture_state(plant, sensors) {
            Some(Moisture::Dry) => alerts.push(SystemAlert {
                level: AlertLevel::Info,
                message: format!("Plant '{}' needs watering", plant.name),
            }),
            Some(Moisture::Wet) => alerts.push(SystemAlert {
                level: AlertLevel::Info,
                message: format!("Plant '{}' is overwatered", plant.name),
            }),
            None => {}
        }
    }

    alerts
}

/// Build the summary. `recent` holds at most a few of the newest readings per
/// sensor, newest first; readings of unknown sensors are ignored.
pub fn summarize(sensors: &[Sensor], plants: &[Plant], recent: Vec<RecentReading>) -> DashboardSummary {
    let count_status = |status: &str| sensors.iter().filter(|s| s.status == status).count();
    let sensor_stats = SensorStats {
        total: sensors.len(),
        active: count_status("active"),
        maintenance: count_status("maintenance"),
        error: count_status("error"),
    };

    let needs_attention = plants
        .iter()
        .filter(|p| moisture_state(p, sensors).is_some())
        .count();
    let plant_stats = PlantStats {
        total: plants.len(),
        healthy: plants.len() - needs_attention,
        needs_attention,
    };

    let mut by_sensor: HashMap<Uuid, Vec<RecentReading>> = HashMap::new();
    for reading in recent {
        by_sensor.entry(reading.sensor_id).or_default().push(reading);
    }

    let recent_readings = sensors
        .iter()
        .filter_map(|sensor| {
            let readings = by_sensor.remove(&sensor.id)?;
            let unit = unit_for(&sensor.sensor_type);
            Some(SensorReadings {
                sensor_id: sensor.id,
                sensor_name: sensor.name.clone(),
                sensor_type: sensor.sensor_type.clone(),
                readings: readings
                    .into_iter()
                    .map(|r| ReadingPoint { value: r.value, unit, time: r.recorded_at })
                    .collect(),
            })
        })
        .collect();

    DashboardSummary {
        sensor_stats,
        plant_stats,
        recent_readings,
        alerts: system_alerts(sensors, plants),
    }
}
