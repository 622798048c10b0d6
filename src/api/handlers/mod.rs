//! Route handlers, one module per resource

pub mod events;
pub mod health;
pub mod orders;
pub mod products;
pub mod reservations;
pub mod services;
pub mod users;
pub mod vendors;

use crate::api::error_response::ApiError;

/// Result type returned by every handler
pub type ApiResult<T> = Result<T, ApiError>;
