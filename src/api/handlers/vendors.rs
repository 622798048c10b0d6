use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};

use super::ApiResult;
use crate::api::dto::{PageParams, VendorProfileBody};
use crate::api::identity::AuthenticatedUser;
use crate::application::Marketplace;
use crate::domain::{UserId, VendorDashboard, VendorProfile};

pub async fn list(
    State(market): State<Marketplace>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Vec<VendorProfile>>> {
    let Query(params) = params?;
    let page = market.page(params.limit, params.offset)?;
    Ok(Json(market.list_vendor_profiles(page).await?))
}

pub async fn show(
    State(market): State<Marketplace>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<VendorProfile>> {
    let Path(id) = id?;
    Ok(Json(market.vendor_profile(id).await?))
}

pub async fn upsert_profile(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<VendorProfileBody>, JsonRejection>,
) -> ApiResult<Json<VendorProfile>> {
    let Json(body) = body?;
    let (farm_name, description, location) = body.into_parts()?;
    let profile = market
        .upsert_vendor_profile(&user, farm_name, description, location)
        .await?;
    Ok(Json(profile))
}

pub async fn dashboard(
    State(market): State<Marketplace>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ApiResult<Json<VendorDashboard>> {
    Ok(Json(market.vendor_dashboard(&user).await?))
}
