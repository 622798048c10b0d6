use crate::domain::types::{ErrorMessage, FieldName, ResourceId};
use crate::domain::DomainError;
use thiserror::Error;

const INVALID_ERROR_MESSAGE: &str = "Invalid error message";
const UNKNOWN_FIELD: &str = "unknown";
const UNKNOWN_RESOURCE: &str = "unknown";

/// Farm market application error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Application error: {message}")]
    Application { message: ErrorMessage },

    #[error("Invalid input: {field}")]
    InvalidInput { field: FieldName },

    #[error("Not found: {resource}")]
    NotFound { resource: ResourceId },

    #[error("Conflict: {message}")]
    Conflict { message: ErrorMessage },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error")]
    Internal,
}

impl Error {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: error_message(message),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: error_message(message),
        }
    }

    pub fn invalid_input(field: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: FieldName::try_new(field.into()).unwrap_or_else(|_| {
                FieldName::try_new(UNKNOWN_FIELD.to_string())
                    .unwrap_or_else(|_| unreachable!("fallback field name is valid"))
            }),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: ResourceId::try_new(resource.into()).unwrap_or_else(|_| {
                ResourceId::try_new(UNKNOWN_RESOURCE.to_string())
                    .unwrap_or_else(|_| unreachable!("fallback resource id is valid"))
            }),
        }
    }
}

fn error_message(message: impl Into<String>) -> ErrorMessage {
    ErrorMessage::try_new(message.into()).unwrap_or_else(|_| {
        ErrorMessage::try_new(INVALID_ERROR_MESSAGE.to_string())
            .unwrap_or_else(|_| unreachable!("fallback error message is valid"))
    })
}

pub type Result<T> = std::result::Result<T, Error>;
