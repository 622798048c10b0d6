use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::ApiResult;
use crate::api::dto::{BookingRequest, ListParams, NewService, ReservationView, ServiceChanges};
use crate::api::identity::{AuthenticatedUser, MaybeUser};
use crate::application::{Marketplace, ServiceQuery};
use crate::domain::{ServiceId, ServiceListing};

pub async fn list(
    State(market): State<Marketplace>,
    viewer: MaybeUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ServiceListing>>> {
    let Query(params) = params?;
    let query = ServiceQuery {
        search: params.search(),
        vendor_id: params.vendor_id(),
        include_inactive: false,
        page: market.page(params.limit, params.offset)?,
    };
    Ok(Json(market.list_services(viewer.user(), query).await?))
}

pub async fn create(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<NewService>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ServiceListing>)> {
    let Json(body) = body?;
    let service = market.create_service(&user, body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn show(
    State(market): State<Marketplace>,
    viewer: MaybeUser,
    id: Result<Path<ServiceId>, PathRejection>,
) -> ApiResult<Json<ServiceListing>> {
    let Path(id) = id?;
    Ok(Json(market.service(viewer.user(), id).await?))
}

pub async fn update(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ServiceId>, PathRejection>,
    body: Result<Json<ServiceChanges>, JsonRejection>,
) -> ApiResult<Json<ServiceListing>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(market.update_service(&user, id, body.into_patch()?).await?))
}

pub async fn delete(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ServiceId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    market.delete_service(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Book a time slot on a service
pub async fn book(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ServiceId>, PathRejection>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReservationView>)> {
    let Path(id) = id?;
    let Json(body) = body?;
    let (reservation, payment) = market
        .book_service(&user, id, body.starts_at, body.payment_method)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationView {
            reservation,
            payment,
        }),
    ))
}
