//! Farm Market - a marketplace for farm vendors and their clients
//!
//! Vendors list products, bookable services and events; clients order,
//! pay and reserve. Placing an order takes stock and records a payment in
//! one atomic step, and cancelling a pending order puts the stock back.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{Application, Marketplace};
pub use error::{Error, Result};
