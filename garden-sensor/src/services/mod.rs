pub mod dashboard;
pub mod export;
pub mod ownership;
pub mod settings_service;
