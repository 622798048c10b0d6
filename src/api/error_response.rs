//! Unified error response handling for the HTTP API
//!
//! Every failure leaves the service as a JSON envelope
//! `{code, message, request_id, details?}`. Handlers return [`ApiError`];
//! the error handling middleware fills in the request ID afterwards.

use crate::api::headers::X_REQUEST_ID;
use crate::domain::DomainError;
use crate::Error;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Unique error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Request ID for correlation
    pub request_id: Option<String>,
    /// Structured context for the client, such as the offending field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
            details: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convert to HTTP response with proper headers
    ///
    /// The envelope is also stored as a response extension so outer
    /// middleware can rebuild it once the request ID is known.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        let request_id = self.request_id.clone();
        let mut response = (status, Json(self.clone())).into_response();
        response.extensions_mut().insert(self);

        if let Some(id) = request_id {
            if let Ok(header_value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(X_REQUEST_ID, header_value);
            }
        }

        response
    }
}

/// Extension trait for consistent error formatting
pub trait ErrorResponseExt {
    /// Convert to standardized error response
    fn to_error_response(&self) -> ErrorResponse;

    /// Get the appropriate HTTP status code
    fn status_code(&self) -> StatusCode;
}

impl ErrorResponseExt for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        use DomainError::*;

        let message = self.to_string();
        match self {
            InsufficientStock {
                product_id,
                requested,
                available,
            } => ErrorResponse::new("INSUFFICIENT_STOCK", message).with_details(json!({
                "product_id": product_id,
                "requested": requested,
                "available": available,
            })),
            ProductUnavailable(product_id) => ErrorResponse::new("PRODUCT_UNAVAILABLE", message)
                .with_details(json!({ "product_id": product_id })),
            InvalidTransition { entity, from, to } => {
                ErrorResponse::new("INVALID_TRANSITION", message).with_details(json!({
                    "entity": entity,
                    "from": from,
                    "to": to,
                }))
            }
            CapacityExceeded {
                requested,
                available,
            } => ErrorResponse::new("CAPACITY_EXCEEDED", message).with_details(json!({
                "requested": requested,
                "available": available,
            })),
            CapacityBelowReserved { .. } => ErrorResponse::new("CAPACITY_BELOW_RESERVED", message),
            SlotUnavailable => ErrorResponse::new("SLOT_UNAVAILABLE", message),
            StartsInPast => ErrorResponse::new("STARTS_IN_PAST", message),
            InvalidSchedule => ErrorResponse::new("INVALID_SCHEDULE", message),
            EmptyOrder => ErrorResponse::new("EMPTY_ORDER", message),
            QuantityTooLarge {
                product_id,
                requested,
                limit,
            } => ErrorResponse::new("QUANTITY_TOO_LARGE", message).with_details(json!({
                "product_id": product_id,
                "requested": requested,
                "limit": limit,
            })),
            MixedVendors => ErrorResponse::new("MIXED_VENDORS", message),
            AmountOverflow => ErrorResponse::new("AMOUNT_OVERFLOW", message),
        }
    }

    fn status_code(&self) -> StatusCode {
        use DomainError::*;

        match self {
            InsufficientStock { .. }
            | ProductUnavailable(_)
            | InvalidTransition { .. }
            | CapacityExceeded { .. }
            | CapacityBelowReserved { .. }
            | SlotUnavailable => StatusCode::CONFLICT,
            StartsInPast
            | InvalidSchedule
            | EmptyOrder
            | QuantityTooLarge { .. }
            | MixedVendors
            | AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl ErrorResponseExt for Error {
    fn to_error_response(&self) -> ErrorResponse {
        use Error::*;

        match self {
            Domain(e) => e.to_error_response(),
            InvalidInput { field } => ErrorResponse::new("INVALID_INPUT", self.to_string())
                .with_details(json!({ "field": field.as_ref() })),
            NotFound { .. } => ErrorResponse::new("NOT_FOUND", self.to_string()),
            Conflict { message } => ErrorResponse::new("CONFLICT", message.as_ref().to_string()),
            Unauthorized => ErrorResponse::new("UNAUTHORIZED", "Authentication required"),
            Forbidden => ErrorResponse::new("FORBIDDEN", "Access denied"),
            Config(_) | Database(_) | Migration(_) | Io(_) | Application { .. } | Internal => {
                ErrorResponse::new("INTERNAL_ERROR", "Internal server error")
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        use Error::*;

        match self {
            Domain(e) => e.status_code(),
            InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            NotFound { .. } => StatusCode::NOT_FOUND,
            Conflict { .. } => StatusCode::CONFLICT,
            Unauthorized => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            Config(_) | Database(_) | Migration(_) | Io(_) | Application { .. } | Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error type returned by handlers and extractors
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }

    fn malformed(status: StatusCode, code: &str, message: String) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        if error.status_code().is_server_error() {
            tracing::error!(error = %error, "Unhandled server error");
        }
        Self {
            status: error.status_code(),
            body: error.to_error_response(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::malformed(rejection.status(), "INVALID_BODY", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::malformed(rejection.status(), "INVALID_QUERY", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::malformed(rejection.status(), "INVALID_PATH", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.body.into_response_with_status(self.status)
    }
}

/// Create an error response for common HTTP errors
pub fn standard_error_response(status: StatusCode, request_id: Option<&str>) -> Response {
    let (code, message) = match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "Invalid request"),
        StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Authentication required"),
        StatusCode::FORBIDDEN => ("FORBIDDEN", "Access denied"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "Resource not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("METHOD_NOT_ALLOWED", "Method not allowed"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request too large"),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Expected a JSON body"),
        StatusCode::INTERNAL_SERVER_ERROR => ("INTERNAL_ERROR", "Internal server error"),
        StatusCode::SERVICE_UNAVAILABLE => {
            ("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
        }
        _ => ("ERROR", "An error occurred"),
    };

    let mut error = ErrorResponse::new(code, message);
    if let Some(id) = request_id {
        error = error.with_request_id(id);
    }

    error.into_response_with_status(status)
}

/// Helper to extract request ID from headers
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductId;
    use rstest::rstest;

    #[rstest]
    #[case(Error::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED")]
    #[case(Error::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN")]
    #[case(Error::not_found("order 1"), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(Error::conflict("taken"), StatusCode::CONFLICT, "CONFLICT")]
    #[case(Error::invalid_input("price"), StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INPUT")]
    #[case(Error::Internal, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")]
    #[case(DomainError::EmptyOrder.into(), StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_ORDER")]
    #[case(DomainError::SlotUnavailable.into(), StatusCode::CONFLICT, "SLOT_UNAVAILABLE")]
    fn test_error_mapping(
        #[case] error: Error,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.to_error_response().code, code);
    }

    #[test]
    fn test_insufficient_stock_is_a_conflict_with_details() {
        let product_id = ProductId::generate();
        let error: Error = DomainError::InsufficientStock {
            product_id,
            requested: 5,
            available: 2,
        }
        .into();

        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        let body = error.to_error_response();
        assert_eq!(body.code, "INSUFFICIENT_STOCK");
        let details = body.details.unwrap();
        assert_eq!(details["requested"], 5);
        assert_eq!(details["available"], 2);
    }

    #[test]
    fn test_invalid_transition_is_a_conflict() {
        let error: Error = DomainError::invalid_transition("order", "shipped", "cancelled").into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.to_error_response().code, "INVALID_TRANSITION");
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let error = Error::application("connection string postgres://secret");
        let body = error.to_error_response();
        assert!(!body.message.contains("secret"));
        assert!(body.details.is_none());
    }

    #[test]
    fn test_response_carries_request_id_header() {
        let response = ErrorResponse::new("NOT_FOUND", "missing")
            .with_request_id("abc")
            .into_response_with_status(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "abc");
        assert!(response.extensions().get::<ErrorResponse>().is_some());
    }
}
