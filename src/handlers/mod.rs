pub mod drinks;
pub mod health;

pub use health::health;

use crate::error::ApiError;

/// Fallback for paths no route matches
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Fallback for known paths hit with a method they do not serve
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
