use axum::http::HeaderMap;

use garden_shared::errors::{AppError, AppResult, ErrorCode};
use garden_shared::middleware::{decode_claims, extract_bearer_token};
use garden_shared::types::auth::AuthUser;

/// Validate the bearer token on a proxied request.
///
/// Missing or malformed headers map to E0004, expired tokens to E1001 and any
/// other decoding failure to E1002.
pub fn authenticate(headers: &HeaderMap, jwt_secret: &str) -> AppResult<AuthUser> {
    let token = extract_bearer_token(headers)?;
    let claims = decode_claims(token, jwt_secret)?;

    if claims.is_expired() {
        return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
    }

    Ok(AuthUser::from(claims))
}
