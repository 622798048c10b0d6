use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::ApiResult;
use crate::api::dto::{EventChanges, ListParams, NewEvent, ReservationView, SeatRequest};
use crate::api::identity::AuthenticatedUser;
use crate::application::{EventQuery, Marketplace};
use crate::domain::{EventId, FarmEvent};

/// Events in start order; past events only when `upcoming=false`
pub async fn list(
    State(market): State<Marketplace>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<FarmEvent>>> {
    let Query(params) = params?;
    let query = EventQuery {
        search: params.search(),
        vendor_id: params.vendor_id(),
        starting_after: params.upcoming.unwrap_or(true).then(Utc::now),
        page: market.page(params.limit, params.offset)?,
    };
    Ok(Json(market.list_events(query).await?))
}

pub async fn create(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FarmEvent>)> {
    let Json(body) = body?;
    let event = market.create_event(&user, body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn show(
    State(market): State<Marketplace>,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Json<FarmEvent>> {
    let Path(id) = id?;
    Ok(Json(market.event(id).await?))
}

pub async fn update(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<EventId>, PathRejection>,
    body: Result<Json<EventChanges>, JsonRejection>,
) -> ApiResult<Json<FarmEvent>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(market.update_event(&user, id, body.into_patch()?).await?))
}

pub async fn delete(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    market.delete_event(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reserve seats at an event
pub async fn reserve(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<EventId>, PathRejection>,
    body: Result<Json<SeatRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReservationView>)> {
    let Path(id) = id?;
    let Json(body) = body?;
    let (seats, method) = body.into_parts()?;
    let (reservation, payment) = market.reserve_event(&user, id, seats, method).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationView {
            reservation,
            payment,
        }),
    ))
}
