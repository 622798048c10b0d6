use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::application::Marketplace;
use crate::infrastructure::log_messages::database as messages;

/// Liveness plus storage reachability
pub async fn health(State(market): State<Marketplace>) -> (StatusCode, Json<Value>) {
    match market.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(error) => {
            warn!(error = %error, "{}", messages::HEALTH_CHECK_FAILED);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
