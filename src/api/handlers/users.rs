use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::ApiResult;
use crate::api::dto::{RegisterUser, RegisteredUser};
use crate::api::identity::AuthenticatedUser;
use crate::application::Marketplace;
use crate::domain::User;

pub async fn register(
    State(market): State<Marketplace>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    let Json(body) = body?;
    let (email, display_name, role) = body.into_parts()?;
    let (user, token) = market.register(email, display_name, role).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            user,
            token: token.expose().to_string(),
        }),
    ))
}

pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}
