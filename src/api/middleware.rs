//! Request-scoped middleware for the HTTP API

use crate::api::error_response::{extract_request_id, standard_error_response, ErrorResponse};
use crate::api::headers::{UNKNOWN_REQUEST_ID, X_REQUEST_ID};
use crate::infrastructure::log_messages::request_processing as messages;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

fn fresh_request_id() -> HeaderValue {
    HeaderValue::from_str(&Uuid::now_v7().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static(UNKNOWN_REQUEST_ID))
}

/// Request ID middleware - ensures every request has a unique ID for tracing
///
/// A caller-supplied ID is kept when it is a valid UUID; anything else is
/// replaced with a fresh UUID v7.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .and_then(|uuid| HeaderValue::from_str(&uuid.to_string()).ok())
        .unwrap_or_else(fresh_request_id);

    request
        .headers_mut()
        .insert(X_REQUEST_ID, request_id.clone());

    let mut response = next.run(request).await;
    response.headers_mut().insert(X_REQUEST_ID, request_id);
    response
}

/// Logging middleware - logs request/response details with timing
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id =
        extract_request_id(request.headers()).unwrap_or_else(|| UNKNOWN_REQUEST_ID.to_string());

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "{}",
        messages::REQUEST_RECEIVED
    );

    let response = next.run(request).await;

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "{}",
        messages::RESPONSE_RETURNED
    );

    response
}

/// Error handling middleware - every failed response leaves as a JSON envelope
/// carrying the request ID
pub async fn error_handling_middleware(request: Request, next: Next) -> Response {
    let request_id = extract_request_id(request.headers());

    let response = next.run(request).await.into_response();
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    if status.is_server_error() {
        error!(
            request_id = request_id.as_deref().unwrap_or(UNKNOWN_REQUEST_ID),
            status = status.as_u16(),
            "{}",
            messages::REQUEST_FAILED
        );
    }

    match response.extensions().get::<ErrorResponse>().cloned() {
        Some(body) => {
            let body = match request_id {
                Some(id) => body.with_request_id(id),
                None => body,
            };
            body.into_response_with_status(status)
        }
        // Failures produced outside our handlers (unknown route, wrong method)
        None => standard_error_response(status, request_id.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error_response::ApiError;
    use crate::Error;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    async fn missing() -> Result<StatusCode, ApiError> {
        Err(Error::not_found("widget").into())
    }

    fn app() -> Router {
        Router::new()
            .route("/ok", get(ok))
            .route("/missing", get(missing))
            .layer(from_fn(error_handling_middleware))
            .layer(from_fn(logging_middleware))
            .layer(from_fn(request_id_middleware))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_generation() {
        let response = app()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let request_id = response.headers().get(X_REQUEST_ID).unwrap();
        let uuid = Uuid::parse_str(request_id.to_str().unwrap()).unwrap();
        assert_eq!(uuid.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_request_id_passthrough() {
        let existing = Uuid::now_v7().to_string();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .header(X_REQUEST_ID, &existing)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), &existing);
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .header(X_REQUEST_ID, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.headers().get(X_REQUEST_ID).unwrap(), "not-a-uuid");
    }

    #[tokio::test]
    async fn test_handler_errors_carry_request_id() {
        let existing = Uuid::now_v7().to_string();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/missing")
                    .header(X_REQUEST_ID, &existing)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["request_id"], existing.as_str());
    }

    #[tokio::test]
    async fn test_unknown_route_gets_json_envelope() {
        let response = app()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body["request_id"].is_string());
    }
}
