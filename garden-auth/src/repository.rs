//! Account storage behind a trait so the service can run against fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use garden_shared::clients::db::{self, DbPool};
use garden_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewPasswordReset, NewRefreshToken, NewUser, PasswordReset, RefreshToken, User};
use crate::schema::{password_resets, refresh_tokens, users};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// `email` is expected normalized.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn username_taken(&self, username: &str) -> AppResult<bool>;

    async fn insert_user(&self, new: NewUser) -> AppResult<User>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    async fn insert_refresh_token(&self, new: NewRefreshToken) -> AppResult<()>;

    /// Unrevoked and not yet expired at `now`.
    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshToken>>;

    /// Returns whether a token that was still unrevoked got revoked.
    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> AppResult<bool>;

    async fn insert_password_reset(&self, new: NewPasswordReset) -> AppResult<()>;

    async fn find_live_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordReset>>;

    /// Store the new hash, drop every reset link of the user and revoke all of
    /// their refresh tokens, in one transaction.
    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        password_hash: String,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: DbPool,
}

impl PgAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Unique violations on `users` become the matching conflict error.
fn user_conflict(err: DieselError) -> AppError {
    if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
        return match info.constraint_name() {
            Some(name) if name.contains("username") => {
                AppError::new(ErrorCode::UsernameTaken, "username already taken")
            }
            _ => AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"),
        };
    }
    AppError::Database(err)
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = db::conn(&self.pool)?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = db::conn(&self.pool)?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        let mut conn = db::conn(&self.pool)?;
        let count: i64 = users::table
            .filter(users::username.eq(username))
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }

    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let mut conn = db::conn(&self.pool)?;
        diesel::insert_into(users::table)
            .values(&new)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(user_conflict)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;
        diesel::update(users::table.find(id))
            .set(users::last_login_at.eq(at))
            .execute(&mut conn)?;
        Ok(())
    }

    async fn insert_refresh_token(&self, new: NewRefreshToken) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;
        diesel::insert_into(refresh_tokens::table)
            .values(&new)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshToken>> {
        let mut conn = db::conn(&self.pool)?;
        Ok(refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(token_hash))
            .filter(refresh_tokens::revoked_at.is_null())
            .filter(refresh_tokens::expires_at.gt(now))
            .select(RefreshToken::as_select())
            .first(&mut conn)
            .optional()?)
    }

    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = db::conn(&self.pool)?;
        let updated = diesel::update(
            refresh_tokens::table
                .filter(refresh_tokens::token_hash.eq(token_hash))
                .filter(refresh_tokens::revoked_at.is_null()),
        )
        .set(refresh_tokens::revoked_at.eq(at))
        .execute(&mut conn)?;
        Ok(updated > 0)
    }

    async fn insert_password_reset(&self, new: NewPasswordReset) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;
        diesel::insert_into(password_resets::table)
            .values(&new)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn find_live_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordReset>> {
        let mut conn = db::conn(&self.pool)?;
        Ok(password_resets::table
            .filter(password_resets::token_hash.eq(token_hash))
            .filter(password_resets::expires_at.gt(now))
            .select(PasswordReset::as_select())
            .first(&mut conn)
            .optional()?)
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        password_hash: String,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut conn = db::conn(&self.pool)?;
        conn.transaction::<_, DieselError, _>(|conn| {
            diesel::update(users::table.find(user_id))
                .set((users::password_hash.eq(&password_hash), users::updated_at.eq(at)))
                .execute(conn)?;

            diesel::delete(password_resets::table.filter(password_resets::user_id.eq(user_id)))
                .execute(conn)?;

            diesel::update(
                refresh_tokens::table
                    .filter(refresh_tokens::user_id.eq(user_id))
                    .filter(refresh_tokens::revoked_at.is_null()),
            )
            .set(refresh_tokens::revoked_at.eq(at))
            .execute(conn)?;

            Ok(())
        })?;
        Ok(())
    }
}
