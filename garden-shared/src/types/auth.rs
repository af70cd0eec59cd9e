use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token claims. Tokens are minted by the account service; the garden
/// services only verify them, so unknown claims are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, ttl_secs: i64) -> Self {
        let iat = Utc::now().timestamp();
        Self { sub: user_id, iat, exp: iat + ttl_secs }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The authenticated caller; every sensor, plant and notification query is scoped to `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub }
    }
}
