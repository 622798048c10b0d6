//! End-to-end tests of the HTTP API over the in-memory store

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use farm_market::api::headers::X_REQUEST_ID;
use farm_market::config::HttpSettings;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self {
            router: farm_market::api::router(
                common::marketplace(),
                &HttpSettings {
                    body_limit_bytes: 64 * 1024,
                },
            ),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, name: &str, role: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/users",
                None,
                Some(json!({
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "display_name": name,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_product(&self, token: &str, name: &str, stock: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/products",
                Some(token),
                Some(json!({
                    "name": name,
                    "category": "Dairy",
                    "unit": "each",
                    "price": "3.25",
                    "stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn stock_of(&self, product_id: &str) -> u64 {
        let (status, body) = self
            .send(Method::GET, &format!("/api/products/{product_id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["stock"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check_reports_healthy() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_registration_returns_a_working_token() {
    let app = TestApp::new();
    let token = app.register("Ada", "client").await;

    let (status, me) = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["display_name"], "Ada");
    assert_eq!(me["role"], "client");

    let (status, body) = app.send(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/users/me", Some("fm_bogus"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let app = TestApp::new();
    app.register("Ada", "client").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({"email": "ADA@example.com", "display_name": "Ada", "role": "vendor"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_order_lifecycle_moves_stock() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    let client = app.register("Basil", "client").await;
    let cheese = app.create_product(&vendor, "Goat cheese", 10).await;

    let (status, order) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&client),
            Some(json!({
                "items": [{"product_id": cheese, "quantity": 4}],
                "payment_method": "card",
                "note": "Leave at the gate"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], "13.00");
    assert_eq!(order["payment"]["status"], "pending");
    assert_eq!(app.stock_of(&cheese).await, 6);

    let order_id = order["id"].as_str().unwrap();
    let (status, seen) = app
        .send(Method::GET, &format!("/api/orders/{order_id}"), Some(&vendor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["items"][0]["quantity"], 4);

    let (status, cancelled) = app
        .send(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["payment"]["status"], "cancelled");
    assert_eq!(app.stock_of(&cheese).await, 10);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_insufficient_stock_is_a_conflict_with_details() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    let client = app.register("Basil", "client").await;
    let butter = app.create_product(&vendor, "Butter", 2).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&client),
            Some(json!({
                "items": [{"product_id": butter, "quantity": 3}],
                "payment_method": "card"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["details"]["available"], 2);
    assert!(body["request_id"].is_string());
    assert_eq!(app.stock_of(&butter).await, 2);
}

#[tokio::test]
async fn test_vendors_edit_only_their_own_products() {
    let app = TestApp::new();
    let owner = app.register("Fern", "vendor").await;
    let rival = app.register("Rowan", "vendor").await;
    let client = app.register("Basil", "client").await;
    let yogurt = app.create_product(&owner, "Yogurt", 8).await;
    let uri = format!("/api/products/{yogurt}");

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&rival), Some(json!({"stock": 0})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&rival), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&client),
            Some(json!({"name": "Fake", "category": "x", "unit": "each", "price": "1", "stock": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&owner),
            Some(json!({"stock": 3, "price": "3.50"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"], 3);
    assert_eq!(updated["price"], "3.50");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_fields_are_named_in_the_error() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&vendor),
            Some(json!({"name": "Cream", "category": "dairy", "unit": "each", "price": "-2", "stock": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(body["details"]["field"], "price");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&vendor),
            Some(json!({"name": "Cream"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_BODY");

    let (status, body) = app
        .send(Method::GET, "/api/products/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PATH");

    let (status, body) = app
        .send(Method::GET, "/api/products?limit=1000", None, None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["field"], "limit");
}

#[tokio::test]
async fn test_product_listing_filters_and_hides_inactive() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    app.create_product(&vendor, "Raw milk", 5).await;
    app.create_product(&vendor, "Buttermilk", 5).await;
    let hidden = app.create_product(&vendor, "Kefir", 5).await;
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/products/{hidden}"),
            Some(&vendor),
            Some(json!({"is_active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = app.send(Method::GET, "/api/products", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, milk) = app.send(Method::GET, "/api/products?q=MILK", None, None).await;
    assert_eq!(milk.as_array().unwrap().len(), 2);

    let (_, page) = app
        .send(Method::GET, "/api/products?limit=1&offset=1", None, None)
        .await;
    assert_eq!(page.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::GET, &format!("/api/products/{hidden}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/products/{hidden}"),
            Some(&vendor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_event_reservations_respect_capacity() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    let client = app.register("Basil", "client").await;
    let starts_at = chrono::Utc::now() + chrono::Duration::days(10);

    let (status, event) = app
        .send(
            Method::POST,
            "/api/events",
            Some(&vendor),
            Some(json!({
                "name": "Cheese making class",
                "location": "Dairy barn",
                "starts_at": starts_at,
                "ends_at": starts_at + chrono::Duration::hours(2),
                "capacity": 4,
                "price_per_seat": "15.00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap();
    let reserve_uri = format!("/api/events/{event_id}/reservations");

    let (status, reservation) = app
        .send(
            Method::POST,
            &reserve_uri,
            Some(&client),
            Some(json!({"seats": 3, "payment_method": "bank_transfer"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["total"], "45.00");
    assert_eq!(reservation["payment"]["method"], "bank_transfer");

    let (status, body) = app
        .send(
            Method::POST,
            &reserve_uri,
            Some(&client),
            Some(json!({"seats": 2, "payment_method": "card"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    let reservation_id = reservation["id"].as_str().unwrap();
    let (status, paid) = app
        .send(
            Method::POST,
            &format!("/api/reservations/{reservation_id}/payment"),
            Some(&client),
            Some(json!({"reference": "TRX-881"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "completed");

    let (status, cancelled) = app
        .send(
            Method::POST,
            &format!("/api/reservations/{reservation_id}/cancel"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["payment"]["status"], "refunded");

    let (_, event) = app
        .send(Method::GET, &format!("/api/events/{event_id}"), None, None)
        .await;
    assert_eq!(event["seats_reserved"], 0);
}

#[tokio::test]
async fn test_vendor_profile_and_dashboard() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    let client = app.register("Basil", "client").await;

    let (status, profile) = app
        .send(
            Method::PUT,
            "/api/vendors/me",
            Some(&vendor),
            Some(json!({"farm_name": "Fernhill Farm", "location": "Valley Road 4"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let vendor_id = profile["vendor_id"].as_str().unwrap();

    let (status, fetched) = app
        .send(Method::GET, &format!("/api/vendors/{vendor_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["farm_name"], "Fernhill Farm");

    let (_, listed) = app.send(Method::GET, "/api/vendors", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/vendors/me",
            Some(&client),
            Some(json!({"farm_name": "Nope", "location": "Nowhere"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.create_product(&vendor, "Cream", 2).await;
    let (status, dashboard) = app
        .send(Method::GET, "/api/vendors/me/dashboard", Some(&vendor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["active_products"], 1);
    assert_eq!(dashboard["low_stock"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_responses_carry_a_request_id() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key(X_REQUEST_ID));
}

#[tokio::test]
async fn test_booking_at_the_far_end_of_the_calendar_is_unprocessable() {
    let app = TestApp::new();
    let vendor = app.register("Fern", "vendor").await;
    let client = app.register("Basil", "client").await;

    let (status, tour) = app
        .send(
            Method::POST,
            "/api/services",
            Some(&vendor),
            Some(json!({
                "name": "Orchard tour",
                "price": "20.00",
                "duration_minutes": 60,
                "location": "North field"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let tour_id = tour["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/services/{tour_id}/bookings"),
            Some(&client),
            Some(json!({
                "starts_at": "+262142-12-31T23:59:00Z",
                "payment_method": "card"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_SCHEDULE");

    let (status, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
