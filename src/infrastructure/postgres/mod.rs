//! PostgreSQL implementation of the marketplace store
//!
//! Multi-record operations run in a single transaction and take row locks
//! (`SELECT ... FOR UPDATE`) on every record they change before calling the
//! shared transaction logic. Products are always locked in id order so two
//! concurrent checkouts cannot deadlock on each other.

mod catalog;
mod orders;
mod reservations;
mod rows;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::application::store::MarketplaceStore;
use crate::infrastructure::database::Database;
use crate::Result;

#[derive(Clone)]
pub struct PostgresStore {
    db: Database,
}

impl PostgresStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}

#[async_trait]
impl MarketplaceStore for PostgresStore {
    async fn health_check(&self) -> Result<()> {
        self.db.health_check().await
    }
}

/// Escape a user search term for use inside an `ILIKE` pattern
fn contains_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
