pub mod auth;
pub mod health;
pub mod proxy;
pub mod rate_limit;
