//! Notifications and sensor alerting for the garden backend.
//!
//! [`service::NotificationStore`] owns notification CRUD with cached reads,
//! [`alerts::AlertEvaluator`] turns sensor snapshots into deduplicated alerts
//! and [`digest::AlertCheckJob`] drives both for the scheduled alert check.

pub mod alerts;
pub mod config;
pub mod digest;
pub mod events;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod service;

#[cfg(test)]
mod testing;

use config::AppConfig;
use service::NotificationDeps;

pub struct AppState {
    pub deps: NotificationDeps,
    pub config: AppConfig,
}
