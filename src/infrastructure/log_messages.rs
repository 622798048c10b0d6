//! Log message constants
//!
//! This module centralizes the log messages used by the service so that
//! dashboards and alerts can match on stable text. Variable parts are
//! recorded as structured tracing fields, never interpolated.

/// Application startup and lifecycle messages
pub mod application {
    pub const STARTING: &str = "Starting farm market application";
    pub const STARTED_SUCCESSFULLY: &str = "Application started successfully";
    pub const CONNECTING_TO_DATABASE: &str = "Connecting to database";
    pub const USING_MEMORY_STORE: &str = "Using in-memory storage; data is lost on restart";
    pub const STARTING_SERVER: &str = "Starting farm market server";
    pub const SHUTTING_DOWN: &str = "Shutdown signal received, draining connections";
}

/// Database-related log messages
pub mod database {
    pub const HEALTH_CHECK_FAILED: &str = "Database health check failed";
    pub const CONNECTION_ESTABLISHED: &str = "Database connection established";
    pub const MIGRATION_STARTED: &str = "Running database migrations";
    pub const MIGRATION_COMPLETED: &str = "Database migrations completed successfully";
}

/// HTTP request handling messages
pub mod request_processing {
    pub const REQUEST_RECEIVED: &str = "Request received";
    pub const RESPONSE_RETURNED: &str = "Response returned to client";
    pub const REQUEST_FAILED: &str = "Request failed with server error";
    pub const UNKNOWN_TOKEN: &str = "Rejected request with unknown API token";
}

/// Marketplace business events
pub mod marketplace {
    pub const USER_REGISTERED: &str = "User registered";
    pub const LISTING_CREATED: &str = "Listing created";
    pub const LISTING_UPDATED: &str = "Listing updated";
    pub const LISTING_DELETED: &str = "Listing deleted";
    pub const ORDER_PLACED: &str = "Order placed";
    pub const ORDER_REJECTED: &str = "Order rejected";
    pub const ORDER_CANCELLED: &str = "Order cancelled and stock restored";
    pub const ORDER_ADVANCED: &str = "Order status changed";
    pub const PAYMENT_COMPLETED: &str = "Payment completed";
    pub const RESERVATION_CONFIRMED: &str = "Reservation confirmed";
    pub const RESERVATION_CANCELLED: &str = "Reservation cancelled";
}

/// Configuration messages
pub mod configuration {
    pub const CONFIG_LOADED: &str = "Configuration loaded successfully";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_messages_are_not_empty() {
        assert!(application::STARTING.len() > 10);
        assert!(application::STARTED_SUCCESSFULLY.len() > 10);
        assert!(application::STARTING_SERVER.len() > 10);

        assert!(database::HEALTH_CHECK_FAILED.len() > 10);
        assert!(database::CONNECTION_ESTABLISHED.len() > 10);

        assert!(marketplace::ORDER_PLACED.len() > 10);
        assert!(marketplace::ORDER_CANCELLED.len() > 10);
        assert!(marketplace::RESERVATION_CONFIRMED.len() > 10);
    }

    #[test]
    fn test_messages_are_not_format_strings() {
        for message in [
            application::CONNECTING_TO_DATABASE,
            application::STARTING_SERVER,
            request_processing::REQUEST_RECEIVED,
            request_processing::RESPONSE_RETURNED,
            marketplace::ORDER_PLACED,
            marketplace::ORDER_ADVANCED,
        ] {
            assert!(!message.contains("{}"), "{message}");
        }
    }
}
