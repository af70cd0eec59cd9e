use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use garden_shared::clients::db;
use garden_shared::errors::{AppError, AppResult};
use garden_shared::types::auth::AuthUser;
use garden_shared::types::ApiResponse;

use super::validated;
use crate::models::{CreatePlantRequest, NewPlant, Plant, UpdatePlant};
use crate::schema::plants;
use crate::services::ownership::{check_thresholds, owned_plant};
use crate::AppState;

// --- GET /plants ---

pub async fn list_plants(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Plant>>>> {
    let mut conn = db::conn(&state.db)?;

    let items = plants::table
        .filter(plants::user_id.eq(user.id))
        .order(plants::name.asc())
        .load::<Plant>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

// --- GET /plants/:id ---

pub async fn get_plant(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Plant>>> {
    let mut conn = db::conn(&state.db)?;
    Ok(Json(ApiResponse::ok(owned_plant(&mut conn, user.id, plant_id)?)))
}

// --- POST /plants ---

pub async fn create_plant(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlantRequest>,
) -> AppResult<Json<ApiResponse<Plant>>> {
    let req = validated(req)?;
    check_thresholds(req.min_moisture, req.max_moisture)?;

    let mut conn = db::conn(&state.db)?;
    let plant = diesel::insert_into(plants::table)
        .values(&NewPlant::from_request(user.id, req, state.clock.now()))
        .get_result::<Plant>(&mut conn)?;

    tracing::info!(user_id = %user.id, plant_id = %plant.id, "plant created");
    Ok(Json(ApiResponse::ok(plant)))
}

// --- PUT /plants/:id ---

pub async fn update_plant(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<Uuid>,
    Json(payload): Json<UpdatePlant>,
) -> AppResult<Json<ApiResponse<Plant>>> {
    let payload = validated(payload)?;
    let mut conn = db::conn(&state.db)?;

    let current = owned_plant(&mut conn, user.id, plant_id)?;
    let (min_moisture, max_moisture) = payload.thresholds_over(&current);
    check_thresholds(min_moisture, max_moisture)?;

    let updated = diesel::update(plants::table.find(current.id))
        .set((&payload, plants::updated_at.eq(state.clock.now())))
        .get_result::<Plant>(&mut conn)?;

    tracing::info!(user_id = %user.id, plant_id = %plant_id, "plant updated");
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /plants/:id ---

/// Sensors attached to the plant are detached, not deleted.
pub async fn delete_plant(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(plant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = db::conn(&state.db)?;

    let deleted = diesel::delete(
        plants::table
            .filter(plants::id.eq(plant_id))
            .filter(plants::user_id.eq(user.id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::plant_not_found());
    }

    tracing::info!(user_id = %user.id, plant_id = %plant_id, "plant deleted");
    Ok(Json(ApiResponse::ok_with_message((), "plant deleted")))
}
