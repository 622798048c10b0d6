use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};

use super::ApiResult;
use crate::api::dto::{PageParams, PaymentConfirmation, ReservationView};
use crate::api::identity::AuthenticatedUser;
use crate::application::Marketplace;
use crate::domain::{Payment, PaymentSubject, Reservation, ReservationId};

pub async fn list(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let Query(params) = params?;
    let page = market.page(params.limit, params.offset)?;
    Ok(Json(market.list_reservations(&user, page).await?))
}

pub async fn show(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ReservationId>, PathRejection>,
) -> ApiResult<Json<ReservationView>> {
    let Path(id) = id?;
    let (reservation, payment) = market.reservation(&user, id).await?;
    Ok(Json(ReservationView {
        reservation,
        payment,
    }))
}

pub async fn cancel(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ReservationId>, PathRejection>,
) -> ApiResult<Json<ReservationView>> {
    let Path(id) = id?;
    let (reservation, payment) = market.cancel_reservation(&user, id).await?;
    Ok(Json(ReservationView {
        reservation,
        payment,
    }))
}

pub async fn pay(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ReservationId>, PathRejection>,
    body: Result<Json<PaymentConfirmation>, JsonRejection>,
) -> ApiResult<Json<Payment>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let payment = market
        .complete_payment(
            &user,
            PaymentSubject::Reservation(id),
            body.into_reference()?,
        )
        .await?;
    Ok(Json(payment))
}
