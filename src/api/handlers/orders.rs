use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::ApiResult;
use crate::api::dto::{NewOrder, OrderView, PageParams, PaymentConfirmation, StatusChange};
use crate::api::identity::AuthenticatedUser;
use crate::application::Marketplace;
use crate::domain::{Order, OrderId, Payment, PaymentSubject};

/// Orders the caller placed or received, newest first
pub async fn list(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Order>>> {
    let Query(params) = params?;
    let page = market.page(params.limit, params.offset)?;
    Ok(Json(market.list_orders(&user, page).await?))
}

/// Check out: stock is taken and a pending payment recorded in one step
pub async fn place(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<NewOrder>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let Json(body) = body?;
    let (lines, method, note) = body.into_parts()?;
    let (order, payment) = market.place_order(&user, lines, method, note).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderView {
            order,
            payment: Some(payment),
        }),
    ))
}

pub async fn show(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<OrderId>, PathRejection>,
) -> ApiResult<Json<OrderView>> {
    let Path(id) = id?;
    let (order, payment) = market.order(&user, id).await?;
    Ok(Json(OrderView { order, payment }))
}

pub async fn cancel(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<OrderId>, PathRejection>,
) -> ApiResult<Json<OrderView>> {
    let Path(id) = id?;
    let (order, payment) = market.cancel_order(&user, id).await?;
    Ok(Json(OrderView {
        order,
        payment: Some(payment),
    }))
}

pub async fn change_status(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(market.advance_order(&user, id, body.status).await?))
}

pub async fn pay(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<OrderId>, PathRejection>,
    body: Result<Json<PaymentConfirmation>, JsonRejection>,
) -> ApiResult<Json<Payment>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let payment = market
        .complete_payment(&user, PaymentSubject::Order(id), body.into_reference()?)
        .await?;
    Ok(Json(payment))
}
