use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use garden_shared::clients::db;
use garden_shared::errors::{AppError, AppResult};
use garden_shared::types::auth::AuthUser;
use garden_shared::types::ApiResponse;

use super::validated;
use crate::models::{CreateSensorRequest, NewSensor, Sensor, UpdateSensor};
use crate::schema::sensors;
use crate::services::ownership::{ensure_plant_owned, owned_sensor};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SensorFilter {
    pub plant_id: Option<Uuid>,
}

// --- GET /sensors ---

pub async fn list_sensors(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SensorFilter>,
) -> AppResult<Json<ApiResponse<Vec<Sensor>>>> {
    let mut conn = db::conn(&state.db)?;

    let mut query = sensors::table
        .filter(sensors::user_id.eq(user.id))
        .into_boxed();
    if let Some(plant_id) = filter.plant_id {
        query = query.filter(sensors::plant_id.eq(plant_id));
    }

    let items = query
        .order((sensors::name.asc(), sensors::created_at.asc()))
        .load::<Sensor>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

// --- GET /sensors/:id ---

pub async fn get_sensor(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Sensor>>> {
    let mut conn = db::conn(&state.db)?;
    let sensor = owned_sensor(&mut conn, user.id, sensor_id)?;
    Ok(Json(ApiResponse::ok(sensor)))
}

// --- POST /sensors ---

pub async fn create_sensor(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSensorRequest>,
) -> AppResult<Json<ApiResponse<Sensor>>> {
    let req = validated(req)?;
    let mut conn = db::conn(&state.db)?;

    ensure_plant_owned(&mut conn, user.id, req.plant_id)?;

    let sensor = diesel::insert_into(sensors::table)
        .values(&NewSensor::from_request(user.id, req, state.clock.now()))
        .get_result::<Sensor>(&mut conn)?;

    tracing::info!(user_id = %user.id, sensor_id = %sensor.id, "sensor created");
    Ok(Json(ApiResponse::ok(sensor)))
}

// --- PUT /sensors/:id ---

pub async fn update_sensor(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<Uuid>,
    Json(payload): Json<UpdateSensor>,
) -> AppResult<Json<ApiResponse<Sensor>>> {
    let payload = validated(payload)?;
    let mut conn = db::conn(&state.db)?;

    ensure_plant_owned(&mut conn, user.id, payload.plant_id)?;

    let updated = diesel::update(
        sensors::table
            .filter(sensors::id.eq(sensor_id))
            .filter(sensors::user_id.eq(user.id)),
    )
    .set((&payload, sensors::updated_at.eq(state.clock.now())))
    .get_result::<Sensor>(&mut conn)
    .optional()?
    .ok_or_else(AppError::sensor_not_found)?;

    tracing::info!(user_id = %user.id, sensor_id = %sensor_id, "sensor updated");
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /sensors/:id ---

pub async fn delete_sensor(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = db::conn(&state.db)?;

    let deleted = diesel::delete(
        sensors::table
            .filter(sensors::id.eq(sensor_id))
            .filter(sensors::user_id.eq(user.id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::sensor_not_found());
    }

    tracing::info!(user_id = %user.id, sensor_id = %sensor_id, "sensor deleted");
    Ok(Json(ApiResponse::ok_with_message((), "sensor deleted")))
}
