pub mod cache;
pub mod clients;
pub mod clock;
pub mod errors;
pub mod middleware;
pub mod types;

pub use types::*;
pub use errors::{AppError, ErrorCode, AppResult};
pub use cache::Cache;
pub use clock::{Clock, SystemClock};
