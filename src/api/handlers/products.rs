use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::ApiResult;
use crate::api::dto::{ListParams, NewProduct, ProductChanges};
use crate::api::identity::{AuthenticatedUser, MaybeUser};
use crate::application::{Marketplace, ProductQuery};
use crate::domain::{Product, ProductId};

pub async fn list(
    State(market): State<Marketplace>,
    viewer: MaybeUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Product>>> {
    let Query(params) = params?;
    let query = ProductQuery {
        search: params.search(),
        category: params.category()?,
        vendor_id: params.vendor_id(),
        include_inactive: false,
        page: market.page(params.limit, params.offset)?,
    };
    Ok(Json(market.list_products(viewer.user(), query).await?))
}

pub async fn create(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(body) = body?;
    let product = market.create_product(&user, body.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn show(
    State(market): State<Marketplace>,
    viewer: MaybeUser,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id?;
    Ok(Json(market.product(viewer.user(), id).await?))
}

pub async fn update(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<ProductChanges>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(market.update_product(&user, id, body.into_patch()?).await?))
}

pub async fn delete(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    market.delete_product(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
