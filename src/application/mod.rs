//! Application services and business logic orchestration
//!
//! This module contains application services that coordinate
//! domain logic and infrastructure components.

pub mod app;
pub mod marketplace;
pub mod store;
pub mod transactions;

pub use app::Application;
pub use marketplace::Marketplace;
pub use store::{
    CatalogStore, EventQuery, MarketplaceStore, OrderStore, Page, ProductQuery, ReservationStore,
    ServiceQuery, UserStore,
};
