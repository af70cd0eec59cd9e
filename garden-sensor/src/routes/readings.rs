use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use garden_shared::clients::db;
use garden_shared::errors::{AppError, AppResult};
use garden_shared::types::auth::AuthUser;
use garden_shared::types::ApiResponse;

use super::validated;
use crate::events::publisher;
use crate::models::{Reading, RecordReadingRequest};
use crate::schema::{readings, sensors};
use crate::services::export::{self, ExportQuery, ExportRow};
use crate::services::ownership::owned_sensor;
use crate::AppState;

pub const DEFAULT_READINGS_LIMIT: i64 = 100;
pub const MAX_READINGS_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub limit: Option<i64>,
}

impl ReadingsQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_READINGS_LIMIT)
            .clamp(1, MAX_READINGS_LIMIT)
    }
}

// --- POST /sensors/:id/readings ---

/// Store a reading, refresh the sensor's latest value and announce it.
pub async fn record_reading(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<Uuid>,
    Json(req): Json<RecordReadingRequest>,
) -> AppResult<Json<ApiResponse<Reading>>> {
    let req = validated(req)?;
    let mut conn = db::conn(&state.db)?;
    let sensor = owned_sensor(&mut conn, user.id, sensor_id)?;
    let now = state.clock.now();

    let reading = conn.transaction::<_, AppError, _>(|conn| {
        let reading = Reading {
            id: Uuid::now_v7(),
            sensor_id: sensor.id,
            value: req.value,
            battery_level: req.battery_level,
            recorded_at: now,
        };
        diesel::insert_into(readings::table)
            .values(&reading)
            .execute(conn)?;

        diesel::update(sensors::table.find(sensor.id))
            .set((
                sensors::last_reading.eq(Some(req.value)),
                sensors::battery_level.eq(req.battery_level.unwrap_or(sensor.battery_level)),
                sensors::updated_at.eq(now),
            ))
            .execute(conn)?;

        Ok(reading)
    })?;

    tracing::debug!(user_id = %user.id, sensor_id = %sensor.id, value = reading.value, "reading recorded");
    publisher::publish_reading_recorded(&state.rabbitmq, &reading, user.id).await;

    Ok(Json(ApiResponse::ok(reading)))
}

// --- GET /sensors/:id/readings ---

pub async fn list_sensor_readings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<Uuid>,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<ApiResponse<Vec<Reading>>>> {
    let mut conn = db::conn(&state.db)?;
    let sensor = owned_sensor(&mut conn, user.id, sensor_id)?;

    let items = readings::table
        .filter(readings::sensor_id.eq(sensor.id))
        .order(readings::recorded_at.desc())
        .limit(query.limit())
        .load::<Reading>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

// --- GET /readings ---

/// Most recent readings across all of the caller's sensors.
pub async fn list_recent_readings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<ApiResponse<Vec<Reading>>>> {
    let mut conn = db::conn(&state.db)?;

    let items = readings::table
        .inner_join(sensors::table)
        .filter(sensors::user_id.eq(user.id))
        .order(readings::recorded_at.desc())
        .limit(query.limit())
        .select(readings::all_columns)
        .load::<Reading>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

// --- GET /readings/export ---

/// The caller's readings in a date range as a CSV download, newest first.
pub async fn export_readings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let today = state.clock.now().date_naive();
    let window = params.window(today)?;
    let mut conn = db::conn(&state.db)?;

    let mut query = readings::table
        .inner_join(sensors::table)
        .select((
            sensors::name,
            sensors::sensor_type,
            sensors::location,
            readings::value,
            readings::recorded_at,
        ))
        .filter(sensors::user_id.eq(user.id))
        .filter(readings::recorded_at.ge(window.from))
        .filter(readings::recorded_at.lt(window.until))
        .into_boxed();
    if let Some(sensor_type) = params.type_filter() {
        query = query.filter(sensors::sensor_type.eq(sensor_type));
    }

    let rows: Vec<ExportRow> = query
        .order(readings::recorded_at.desc())
        .load::<(String, String, Option<String>, f64, DateTime<Utc>)>(&mut conn)?
        .into_iter()
        .map(|(sensor_name, sensor_type, location, value, recorded_at)| ExportRow {
            sensor_name,
            sensor_type,
            location,
            value,
            recorded_at,
        })
        .collect();

    tracing::info!(user_id = %user.id, rows = rows.len(), "readings exported");

    let disposition = format!("attachment; filename=\"{}\"", export::file_name(today));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export::build_csv(&rows),
    ))
}
