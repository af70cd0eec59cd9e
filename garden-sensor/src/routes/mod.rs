pub mod dashboard;
pub mod health;
pub mod plants;
pub mod readings;
pub mod sensors;
pub mod settings;

use garden_shared::errors::{AppError, ErrorCode};
use validator::Validate;

/// Run the `validator` rules on a request body.
pub(crate) fn validated<T: Validate>(req: T) -> Result<T, AppError> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    Ok(req)
}
