//! HTTP API for the marketplace
//!
//! JSON over axum. Handlers translate between request bodies and the
//! [`Marketplace`](crate::application::Marketplace) service; every failure
//! is rendered as an [`ErrorResponse`](error_response::ErrorResponse).

pub mod dto;
pub mod error_response;
pub mod handlers;
pub mod headers;
pub mod identity;
pub mod middleware;
pub mod middleware_stack;
pub mod router;

pub use error_response::{ApiError, ErrorResponse, ErrorResponseExt};
pub use router::router;
