use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use garden_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Plant, Sensor};
use crate::schema::{plants, sensors};

/// A sensor owned by `user_id`. Missing and foreign sensors are indistinguishable.
pub fn owned_sensor(conn: &mut PgConnection, user_id: Uuid, sensor_id: Uuid) -> AppResult<Sensor> {
    sensors::table
        .filter(sensors::id.eq(sensor_id))
        .filter(sensors::user_id.eq(user_id))
        .first::<Sensor>(conn)
        .optional()?
        .ok_or_else(AppError::sensor_not_found)
}

pub fn owned_plant(conn: &mut PgConnection, user_id: Uuid, plant_id: Uuid) -> AppResult<Plant> {
    plants::table
        .filter(plants::id.eq(plant_id))
        .filter(plants::user_id.eq(user_id))
        .first::<Plant>(conn)
        .optional()?
        .ok_or_else(AppError::plant_not_found)
}

/// A sensor may only be attached to one of its owner's plants.
pub fn ensure_plant_owned(conn: &mut PgConnection, user_id: Uuid, plant_id: Option<Uuid>) -> AppResult<()> {
    if let Some(plant_id) = plant_id {
        owned_plant(conn, user_id, plant_id)?;
    }
    Ok(())
}

pub fn check_thresholds(min_moisture: f64, max_moisture: f64) -> AppResult<()> {
    if min_moisture > max_moisture {
        return Err(AppError::new(
            ErrorCode::InvalidThresholds,
            "min_moisture must not exceed max_moisture",
        ));
    }
    Ok(())
}
