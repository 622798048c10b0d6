//! HTTP header constants and well-known paths
//!
//! This module centralizes the header names and path constants used by the
//! API layer so middleware and handlers agree on them.

use axum::http::header;

/// Header name for request ID used for tracing and correlation
pub const X_REQUEST_ID: &str = "x-request-id";

/// Authorization header prefix for bearer tokens
pub const BEARER_PREFIX: &str = "Bearer ";

/// Placeholder used in logs when a request carries no usable ID
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Standard header re-exports for convenience
pub use header::{AUTHORIZATION, CONTENT_TYPE};

/// Well-known paths
pub mod paths {
    /// Health check endpoint path
    pub const HEALTH: &str = "/health";

    /// Prefix for every marketplace route
    pub const API: &str = "/api";
}
