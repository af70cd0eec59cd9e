use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types;
use std::sync::Arc;
use uuid::Uuid;

use garden_shared::clients::db;
use garden_shared::errors::AppResult;
use garden_shared::types::auth::AuthUser;
use garden_shared::types::ApiResponse;

use crate::models::{Plant, Sensor};
use crate::schema::{plants, sensors};
use crate::services::dashboard::{self, DashboardSummary, RecentReading, RECENT_READINGS_PER_SENSOR};
use crate::AppState;

/// Newest readings per sensor of one user, newest first within each sensor.
const RECENT_READINGS_SQL: &str = "\
SELECT sensor_id, value, recorded_at FROM (
    SELECT r.sensor_id, r.value, r.recorded_at,
           ROW_NUMBER() OVER (PARTITION BY r.sensor_id ORDER BY r.recorded_at DESC) AS rn
    FROM readings r
    JOIN sensors s ON s.id = r.sensor_id
    WHERE s.user_id = $1
) ranked
WHERE rn <= $2
ORDER BY sensor_id, recorded_at DESC";

#[derive(Debug, QueryableByName)]
struct RecentRow {
    #[diesel(sql_type = sql_types::Uuid)]
    sensor_id: Uuid,
    #[diesel(sql_type = sql_types::Float8)]
    value: f64,
    #[diesel(sql_type = sql_types::Timestamptz)]
    recorded_at: DateTime<Utc>,
}

impl From<RecentRow> for RecentReading {
    fn from(row: RecentRow) -> Self {
        Self {
            sensor_id: row.sensor_id,
            value: row.value,
            recorded_at: row.recorded_at,
        }
    }
}

// --- GET /dashboard ---

pub async fn get_dashboard(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let mut conn = db::conn(&state.db)?;

    let user_sensors = sensors::table
        .filter(sensors::user_id.eq(user.id))
        .order(sensors::name.asc())
        .load::<Sensor>(&mut conn)?;
    let user_plants = plants::table
        .filter(plants::user_id.eq(user.id))
        .order(plants::name.asc())
        .load::<Plant>(&mut conn)?;

    let recent = diesel::sql_query(RECENT_READINGS_SQL)
        .bind::<sql_types::Uuid, _>(user.id)
        .bind::<sql_types::BigInt, _>(RECENT_READINGS_PER_SENSOR)
        .load::<RecentRow>(&mut conn)?;

    let summary = dashboard::summarize(
        &user_sensors,
        &user_plants,
        recent.into_iter().map(RecentReading::from).collect(),
    );
    tracing::debug!(
        user_id = %user.id,
        sensors = summary.sensor_stats.total,
        alerts = summary.alerts.len(),
        "dashboard built"
    );

    Ok(Json(ApiResponse::ok(summary)))
}
