//! Route table for the marketplace API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::handlers::{
    events, health, orders, products, reservations, services, users, vendors,
};
use crate::api::headers::paths;
use crate::api::middleware_stack::ApiMiddlewareStack;
use crate::application::Marketplace;
use crate::config::HttpSettings;

fn api_routes() -> Router<Marketplace> {
    Router::new()
        .route("/users", post(users::register))
        .route("/users/me", get(users::me))
        .route("/vendors", get(vendors::list))
        .route("/vendors/me", put(vendors::upsert_profile))
        .route("/vendors/me/dashboard", get(vendors::dashboard))
        .route("/vendors/{id}", get(vendors::show))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/{id}",
            get(services::show)
                .patch(services::update)
                .delete(services::delete),
        )
        .route("/services/{id}/bookings", post(services::book))
        .route("/events", get(events::list).post(events::create))
        .route(
            "/events/{id}",
            get(events::show).patch(events::update).delete(events::delete),
        )
        .route("/events/{id}/reservations", post(events::reserve))
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/status", post(orders::change_status))
        .route("/orders/{id}/payment", post(orders::pay))
        .route("/reservations", get(reservations::list))
        .route("/reservations/{id}", get(reservations::show))
        .route("/reservations/{id}/cancel", post(reservations::cancel))
        .route("/reservations/{id}/payment", post(reservations::pay))
}

/// Build the full application router with its middleware stack
pub fn router(market: Marketplace, http: &HttpSettings) -> Router {
    let routes = Router::new()
        .route(paths::HEALTH, get(health::health))
        .nest(paths::API, api_routes());

    ApiMiddlewareStack::new(market.clone(), http.body_limit_bytes)
        .apply_to_router(routes)
        .with_state(market)
}
