//! In-memory account store and mailer for service tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use garden_shared::clients::email::{MailError, Mailer};
use garden_shared::clock::ManualClock;
use garden_shared::errors::AppResult;

use crate::models::{NewPasswordReset, NewRefreshToken, NewUser, PasswordReset, RefreshToken, User};
use crate::repository::AccountRepository;
use crate::services::auth_service::{AuthService, AuthSettings};
use crate::services::token_service::TokenSettings;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct FakeAccounts {
    users: Mutex<Vec<User>>,
    refresh_tokens: Mutex<Vec<RefreshToken>>,
    resets: Mutex<Vec<PasswordReset>>,
}

impl FakeAccounts {
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        lock(&self.users).iter().find(|u| u.email == email).cloned()
    }

    pub fn user_count(&self) -> usize {
        lock(&self.users).len()
    }

    pub fn live_refresh_tokens(&self, user_id: Uuid) -> usize {
        lock(&self.refresh_tokens)
            .iter()
            .filter(|t| t.user_id == user_id && t.revoked_at.is_none())
            .count()
    }

    pub fn reset_count(&self) -> usize {
        lock(&self.resets).len()
    }
}

#[async_trait]
impl AccountRepository for FakeAccounts {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.user_by_email(email))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(lock(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn username_taken(&self, username: &str) -> AppResult<bool> {
        Ok(lock(&self.users).iter().any(|u| u.username == username))
    }

    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let user = User {
            id: new.id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            last_login_at: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        };
        lock(&self.users).push(user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(user) = lock(&self.users).iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn insert_refresh_token(&self, new: NewRefreshToken) -> AppResult<()> {
        lock(&self.refresh_tokens).push(RefreshToken {
            id: new.id,
            user_id: new.user_id,
            token_hash: new.token_hash,
            expires_at: new.expires_at,
            revoked_at: None,
            created_at: new.created_at,
        });
        Ok(())
    }

    async fn find_live_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshToken>> {
        Ok(lock(&self.refresh_tokens)
            .iter()
            .find(|t| t.token_hash == token_hash && t.revoked_at.is_none() && t.expires_at > now)
            .cloned())
    }

    async fn revoke_refresh_token(&self, token_hash: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut tokens = lock(&self.refresh_tokens);
        match tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && t.revoked_at.is_none())
        {
            Some(token) => {
                token.revoked_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_password_reset(&self, new: NewPasswordReset) -> AppResult<()> {
        lock(&self.resets).push(PasswordReset {
            id: new.id,
            user_id: new.user_id,
            token_hash: new.token_hash,
            expires_at: new.expires_at,
            created_at: new.created_at,
        });
        Ok(())
    }

    async fn find_live_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<PasswordReset>> {
        Ok(lock(&self.resets)
            .iter()
            .find(|r| r.token_hash == token_hash && r.expires_at > now)
            .cloned())
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        password_hash: String,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(user) = lock(&self.users).iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash;
            user.updated_at = at;
        }
        lock(&self.resets).retain(|r| r.user_id != user_id);
        for token in lock(&self.refresh_tokens)
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.revoked_at.is_none())
        {
            token.revoked_at = Some(at);
        }
        Ok(())
    }
}

/// Records every message; optionally rejects them all.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Rejected { status: 422, body: "invalid recipient".into() });
        }
        lock(&self.sent).push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub accounts: Arc<FakeAccounts>,
    pub mailer: Arc<RecordingMailer>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(RecordingMailer::default())
    }

    pub fn with_failing_mailer() -> Self {
        Self::build(RecordingMailer { fail: true, ..Default::default() })
    }

    fn build(mailer: RecordingMailer) -> Self {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        Self {
            clock: Arc::new(ManualClock::new(start)),
            accounts: Arc::new(FakeAccounts::default()),
            mailer: Arc::new(mailer),
        }
    }

    pub fn settings() -> AuthSettings {
        AuthSettings {
            tokens: TokenSettings {
                secret: "test-secret".into(),
                access_ttl_secs: 3600,
                refresh_ttl: Duration::days(30),
            },
            reset_ttl: Duration::hours(1),
            app_url: "http://garden.test/".into(),
        }
    }

    pub fn service(&self) -> AuthService {
        AuthService::new(
            self.accounts.clone(),
            self.mailer.clone(),
            self.clock.clone(),
            Self::settings(),
        )
    }
}
