//! Infrastructure layer for the farm market
//!
//! This module contains the storage backends and other external concerns:
//! the PostgreSQL store, the in-memory store used for development and tests,
//! and shared log messages.

pub mod database;
pub mod log_messages;
pub mod memory;
pub mod postgres;

pub use database::*;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
