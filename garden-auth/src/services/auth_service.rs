//! Account lifecycle: registration, login, refresh-token rotation, logout and
//! password reset by mailed link.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use uuid::Uuid;

use garden_shared::clients::email::Mailer;
use garden_shared::clock::Clock;
use garden_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{normalize_email, NewPasswordReset, NewUser, RegisterRequest, TokenPair, UserProfile};
use crate::repository::AccountRepository;
use crate::services::token_service::{self, TokenSettings};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn validate_password(password: &str, confirmation: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(
            ErrorCode::PasswordTooWeak,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if password != confirmation {
        return Err(AppError::new(ErrorCode::ValidationError, "password confirmation does not match"));
    }
    Ok(())
}

fn invalid_credentials() -> AppError {
    AppError::new(ErrorCode::InvalidCredentials, "invalid email or password")
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub tokens: TokenSettings,
    /// How long a mailed reset link stays usable.
    pub reset_ttl: Duration,
    pub app_url: String,
}

pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self { accounts, mailer, clock, settings }
    }

    /// Create the account and sign it in.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<TokenPair> {
        validate_password(&req.password, &req.password_confirmation)?;

        let email = normalize_email(&req.email);
        let username = req.username.trim().to_string();

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }
        if self.accounts.username_taken(&username).await? {
            return Err(AppError::new(ErrorCode::UsernameTaken, "username already taken"));
        }

        let now = self.clock.now();
        let user = self
            .accounts
            .insert_user(NewUser {
                id: Uuid::now_v7(),
                username,
                email,
                password_hash: hash_password(&req.password)?,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, "user registered");
        self.sign_in(user.id).await
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .accounts
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(invalid_credentials());
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.sign_in(user.id).await
    }

    /// Trade a live refresh token for a new pair. The old token is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let hash = token_service::hash_token(refresh_token);
        let now = self.clock.now();

        let stored = self
            .accounts
            .find_live_refresh_token(&hash, now)
            .await?
            .ok_or_else(|| AppError::unauthorized("invalid or expired refresh token"))?;

        // Losing the race to a concurrent refresh counts as reuse.
        if !self.accounts.revoke_refresh_token(&hash, now).await? {
            return Err(AppError::unauthorized("invalid or expired refresh token"));
        }

        self.issue(stored.user_id).await
    }

    /// Revoke the refresh token. Unknown or already revoked tokens are not an error.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let hash = token_service::hash_token(refresh_token);
        let revoked = self.accounts.revoke_refresh_token(&hash, self.clock.now()).await?;
        tracing::debug!(revoked, "logout");
        Ok(())
    }

    /// Mail a reset link when the address belongs to an account. Succeeds
    /// either way so callers cannot learn which addresses are registered.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.accounts.find_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let now = self.clock.now();
        let token = token_service::random_token();
        self.accounts
            .insert_password_reset(NewPasswordReset {
                id: Uuid::now_v7(),
                user_id: user.id,
                token_hash: token_service::hash_token(&token),
                expires_at: now + self.settings.reset_ttl,
                created_at: now,
            })
            .await?;

        let (subject, body) = reset_email(&self.settings.app_url, &token, self.settings.reset_ttl);
        if let Err(e) = self.mailer.send_text(&user.email, &subject, &body).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to send password reset email");
        } else {
            tracing::info!(user_id = %user.id, "password reset email sent");
        }
        Ok(())
    }

    /// Set a new password from a reset link; signs the user out everywhere.
    pub async fn reset_password(&self, token: &str, password: &str, confirmation: &str) -> AppResult<()> {
        validate_password(password, confirmation)?;

        let now = self.clock.now();
        let reset = self
            .accounts
            .find_live_password_reset(&token_service::hash_token(token), now)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::ResetTokenInvalid, "invalid or expired password reset token")
            })?;

        self.accounts
            .complete_password_reset(reset.user_id, hash_password(password)?, now)
            .await?;

        tracing::info!(user_id = %reset.user_id, "password reset");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.accounts
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    async fn sign_in(&self, user_id: Uuid) -> AppResult<TokenPair> {
        self.accounts.record_login(user_id, self.clock.now()).await?;
        self.issue(user_id).await
    }

    async fn issue(&self, user_id: Uuid) -> AppResult<TokenPair> {
        let (pair, row) = token_service::issue(user_id, &self.settings.tokens, self.clock.now())?;
        self.accounts.insert_refresh_token(row).await?;
        Ok(pair)
    }
}

fn reset_email(app_url: &str, token: &str, ttl: Duration) -> (String, String) {
    let link = format!("{}/reset-password?token={token}", app_url.trim_end_matches('/'));
    let body = format!(
        "Someone asked to reset the password of your Garden Sensors account.\n\n\
         Open this link to choose a new one:\n{link}\n\n\
         The link expires in {} minutes. If you did not ask for this, ignore this email.\n",
        ttl.num_minutes()
    );
    ("Reset your Garden Sensors password".to_string(), body)
}
