//! Domain types and business rules for the farm marketplace
//!
//! This module contains the core domain types that represent the business
//! concepts of the marketplace, following type-driven development principles.
//! Stock, seat and payment rules live here so every store applies them the
//! same way.

pub mod dashboard;
pub mod errors;
pub mod farm_event;
pub mod identifiers;
pub mod order;
pub mod payment;
pub mod product;
pub mod reservation;
pub mod service_listing;
pub mod types;
pub mod user;
pub mod validation_constants;
pub mod vendor;

pub use dashboard::*;
pub use errors::DomainError;
pub use farm_event::*;
pub use identifiers::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use reservation::*;
pub use service_listing::*;
pub use types::*;
pub use user::*;
pub use vendor::*;
