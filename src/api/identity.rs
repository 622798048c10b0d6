//! Bearer token identity
//!
//! The identity middleware resolves an `Authorization: Bearer <token>`
//! header to a [`User`] and stores it in the request extensions. Requests
//! without the header continue anonymously; handlers decide whether they
//! need a user through the [`AuthenticatedUser`] and [`MaybeUser`]
//! extractors.

use crate::api::error_response::ApiError;
use crate::api::headers::{AUTHORIZATION, BEARER_PREFIX};
use crate::application::Marketplace;
use crate::domain::{ApiToken, User};
use crate::infrastructure::log_messages::request_processing as messages;
use crate::Error;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Identity middleware - attaches the caller to the request
pub async fn identity_middleware(
    State(market): State<Marketplace>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    let Some(token) = token.map(ApiToken::from_bearer) else {
        return ApiError::from(Error::Unauthorized).into_response();
    };

    match market.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(Error::Unauthorized) => {
            warn!(path = %request.uri().path(), "{}", messages::UNKNOWN_TOKEN);
            ApiError::from(Error::Unauthorized).into_response()
        }
        Err(error) => ApiError::from(error).into_response(),
    }
}

/// Extractor for routes that require a signed-in user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|current| Self(current.0.clone()))
            .ok_or_else(|| Error::Unauthorized.into())
    }
}

/// Extractor for public routes whose answer depends on who is asking
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|current| current.0.clone()),
        ))
    }
}
