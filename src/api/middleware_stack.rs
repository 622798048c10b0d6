//! Middleware stack builder for clean composition

use crate::api::identity::identity_middleware;
use crate::api::middleware::*;
use crate::application::Marketplace;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Builder for composing the API middleware stack
pub struct ApiMiddlewareStack {
    market: Marketplace,
    body_limit_bytes: usize,
}

impl ApiMiddlewareStack {
    pub fn new(market: Marketplace, body_limit_bytes: usize) -> Self {
        Self {
            market,
            body_limit_bytes,
        }
    }

    /// Apply the complete middleware stack to a router
    ///
    /// The middleware are applied in the following order (outer to inner):
    /// 1. Request ID generation/propagation
    /// 2. Logging (with request ID)
    /// 3. Error handling
    /// 4. Body size limit
    /// 5. Identity
    pub fn apply_to_router<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            // Innermost first
            .layer(from_fn_with_state(self.market, identity_middleware))
            .layer(RequestBodyLimitLayer::new(self.body_limit_bytes))
            .layer(from_fn(error_handling_middleware))
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
    }
}
