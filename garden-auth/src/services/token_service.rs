use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use garden_shared::errors::{AppError, AppResult};
use garden_shared::types::auth::Claims;

use crate::models::{NewRefreshToken, TokenPair};

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl: Duration,
}

/// HS256 access token, verifiable by every garden service sharing the secret.
pub fn create_access_token(user_id: Uuid, secret: &str, ttl_secs: i64) -> AppResult<String> {
    let claims = Claims::new(user_id, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

/// 32 random bytes, hex encoded. Used for refresh tokens and reset links.
pub fn random_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Only this digest is stored; the plain token lives with the client.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A fresh pair for `user_id` plus the row that remembers its refresh half.
pub fn issue(
    user_id: Uuid,
    settings: &TokenSettings,
    now: DateTime<Utc>,
) -> AppResult<(TokenPair, NewRefreshToken)> {
    let access_token = create_access_token(user_id, &settings.secret, settings.access_ttl_secs)?;
    let refresh_token = random_token();

    let row = NewRefreshToken {
        id: Uuid::now_v7(),
        user_id,
        token_hash: hash_token(&refresh_token),
        expires_at: now + settings.refresh_ttl,
        created_at: now,
    };
    let pair = TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: settings.access_ttl_secs,
    };
    Ok((pair, row))
}
