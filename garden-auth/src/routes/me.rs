use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use garden_shared::errors::AppResult;
use garden_shared::types::api::ApiResponse;
use garden_shared::types::auth::AuthUser;

use crate::models::UserProfile;
use crate::AppState;

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.auth.profile(user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::RegisterRequest;
    use crate::routes::register::register;
    use crate::testing::Harness;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use garden_shared::middleware::decode_claims;

    fn state(h: &Harness) -> Arc<AppState> {
        let config: AppConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        Arc::new(AppState { auth: h.service(), config })
    }

    fn register_req(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: "rosa@example.com".into(),
            password: "greenhouse1".into(),
            password_confirmation: "greenhouse1".into(),
        }
    }

    #[tokio::test]
    async fn registered_user_reads_their_profile() {
        let h = Harness::new();
        let state = state(&h);

        let Json(resp) = register(State(state.clone()), Json(register_req("rosa"))).await.unwrap();
        let claims = decode_claims(&resp.data.access_token, "test-secret").unwrap();

        let Json(profile) = me(State(state), AuthUser::from(claims)).await.unwrap();
        assert_eq!(profile.data.username, "rosa");
        assert_eq!(profile.data.email, "rosa@example.com");
    }

    #[tokio::test]
    async fn invalid_body_is_400_before_touching_the_store() {
        let h = Harness::new();
        let err = register(State(state(&h)), Json(register_req("r")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.accounts.user_count(), 0);
    }
}
