//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use farm_market::config::MarketplaceSettings;
use farm_market::domain::{
    Capacity, Category, Description, DisplayName, DurationMinutes, EmailAddress, EventDraft,
    Location, Money, ProductDraft, Role, ServiceDraft, StockLevel, Title, Unit, User,
};
use farm_market::infrastructure::InMemoryStore;
use farm_market::Marketplace;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub fn settings() -> MarketplaceSettings {
    MarketplaceSettings {
        low_stock_threshold: 5,
        default_page_size: 20,
        max_page_size: 100,
    }
}

pub fn marketplace() -> Marketplace {
    Marketplace::new(Arc::new(InMemoryStore::new()), settings())
}

pub fn money(amount: &str) -> Money {
    Money::try_new(Decimal::from_str(amount).unwrap()).unwrap()
}

pub async fn user(market: &Marketplace, name: &str, role: Role) -> User {
    let (user, _token) = market
        .register(
            EmailAddress::try_new(format!("{}@example.com", name.to_lowercase())).unwrap(),
            DisplayName::try_new(name.to_string()).unwrap(),
            role,
        )
        .await
        .unwrap();
    user
}

pub async fn vendor(market: &Marketplace, name: &str) -> User {
    user(market, name, Role::Vendor).await
}

pub async fn client(market: &Marketplace, name: &str) -> User {
    user(market, name, Role::Client).await
}

pub fn product(name: &str, price: &str, stock: u32) -> ProductDraft {
    ProductDraft {
        name: Title::try_new(name.to_string()).unwrap(),
        description: Description::default(),
        category: Category::try_new("vegetables".to_string()).unwrap(),
        unit: Unit::Each,
        price: money(price),
        stock: StockLevel::new(stock),
        image_urls: Vec::new(),
    }
}

pub fn event(capacity: u32, price_per_seat: &str) -> EventDraft {
    let starts_at = Utc::now() + Duration::days(7);
    EventDraft {
        name: Title::try_new("Pumpkin patch weekend".to_string()).unwrap(),
        description: Description::default(),
        location: Location::try_new("North field".to_string()).unwrap(),
        starts_at,
        ends_at: starts_at + Duration::hours(4),
        capacity: Capacity::try_new(capacity).unwrap(),
        price_per_seat: money(price_per_seat),
    }
}

pub fn service(price: &str, minutes: u32) -> ServiceDraft {
    ServiceDraft {
        name: Title::try_new("Guided orchard tour".to_string()).unwrap(),
        description: Description::default(),
        price: money(price),
        duration_minutes: DurationMinutes::try_new(minutes).unwrap(),
        location: Location::try_new("Orchard gate".to_string()).unwrap(),
    }
}
