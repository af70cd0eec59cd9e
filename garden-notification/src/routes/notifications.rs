use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;
use garden_shared::types::auth::AuthUser;
use garden_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Notification;
use crate::service::NotificationStore;
use crate::AppState;

fn store_for(state: &AppState, user: &AuthUser) -> NotificationStore {
    NotificationStore::new(state.deps.clone(), user.id)
}

/// GET /notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let store = store_for(&state, &auth_user);
    let items = store
        .notifications(params.limit() as i64, params.offset() as i64)
        .await?;
    let total = store.total_count().await?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = store_for(&state, &auth_user).unread_count().await?;
    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// POST /notifications/mark-all-read
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let updated = store_for(&state, &auth_user).mark_all_as_read().await?;
    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}

/// POST /notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    store_for(&state, &auth_user).mark_as_read(id).await?;
    Ok(Json(ApiResponse::ok_with_message((), "notification marked as read")))
}

/// DELETE /notifications/:id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    store_for(&state, &auth_user).delete(id).await?;
    Ok(Json(ApiResponse::ok_with_message((), "notification deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::Harness;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use garden_shared::clock::Clock;
    use garden_shared::types::auth::Claims;

    fn state(h: &Harness) -> Arc<AppState> {
        let config: AppConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        Arc::new(AppState { deps: h.deps(), config })
    }

    fn user(id: Uuid) -> AuthUser {
        AuthUser::from(Claims::new(id, 3600))
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let h = Harness::new();
        for i in 0..3 {
            h.repo.insert_raw(h.user, &format!("kind{i}"), serde_json::json!({}), h.clock.now());
            h.clock.advance(chrono::Duration::seconds(1));
        }

        let params = PaginationParams { page: 1, per_page: 2 };
        let Json(resp) = list_notifications(State(state(&h)), user(h.user), Query(params))
            .await
            .unwrap();
        let page = resp.data;
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].notification_type, "kind2");
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let h = Harness::new();
        h.repo.insert_raw(h.user, "moisture", serde_json::json!({}), h.clock.now());

        let params = PaginationParams { page: u64::MAX, per_page: 10 };
        let Json(resp) = list_notifications(State(state(&h)), user(h.user), Query(params))
            .await
            .unwrap();
        assert!(resp.data.items.is_empty());
        assert_eq!(resp.data.total, 1);
    }

    #[tokio::test]
    async fn foreign_notification_is_404() {
        let h = Harness::new();
        let id = h.repo.insert_raw(h.user, "moisture", serde_json::json!({}), h.clock.now());

        let err = mark_read(State(state(&h)), user(Uuid::now_v7()), Path(id))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let Json(resp) = unread_count(State(state(&h)), user(h.user)).await.unwrap();
        assert_eq!(resp.data.count, 1);
    }
}
