//! Accounts for the garden backend: registration, login, token refresh and
//! password reset. Access tokens issued here are what the gateway and the
//! other services verify.

pub mod config;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod services;

#[cfg(test)]
mod testing;

use config::AppConfig;
use services::auth_service::AuthService;

pub struct AppState {
    pub auth: AuthService,
    pub config: AppConfig,
}
