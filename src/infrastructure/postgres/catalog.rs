use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

use super::reservations::confirmed_slots;
use super::rows::{self, int, EVENT_COLUMNS, PRODUCT_COLUMNS, SERVICE_COLUMNS};
use super::{contains_pattern, PostgresStore};
use crate::application::store::{
    CatalogStore, EventChange, EventQuery, ProductChange, ProductQuery, ServiceChange,
    ServiceQuery,
};
use crate::application::transactions;
use crate::domain::{EventId, FarmEvent, Product, ProductId, ServiceId, ServiceListing, UserId};
use crate::{Error, Result};

/// Lock the given products for the rest of the transaction, in id order
///
/// Ids with no matching row are simply absent from the result.
pub(super) async fn lock_products(
    conn: &mut PgConnection,
    ids: impl IntoIterator<Item = ProductId>,
) -> Result<HashMap<ProductId, Product>> {
    let ids: Vec<Uuid> = ids.into_iter().map(ProductId::into_inner).collect();
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    let locked = sqlx::query(&sql).bind(ids).fetch_all(&mut *conn).await?;
    locked
        .iter()
        .map(|row| rows::product(row).map(|product| (product.id, product)))
        .collect()
}

pub(super) async fn save_product(conn: &mut PgConnection, product: &Product) -> Result<()> {
    let image_urls: Vec<&str> = product.image_urls.iter().map(|url| url.as_ref()).collect();
    sqlx::query(
        "UPDATE products SET name = $2, description = $3, category = $4, unit = $5, \
         price = $6, stock = $7, image_urls = $8, is_active = $9, updated_at = $10 \
         WHERE id = $1",
    )
    .bind(product.id.into_inner())
    .bind(product.name.as_ref())
    .bind(product.description.as_ref())
    .bind(product.category.as_ref())
    .bind(product.unit.as_str())
    .bind(product.price.into_inner())
    .bind(i64::from(product.stock.into_inner()))
    .bind(image_urls)
    .bind(product.is_active)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn lock_event(conn: &mut PgConnection, id: EventId) -> Result<Option<FarmEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(rows::event).transpose()
}

pub(super) async fn save_event(conn: &mut PgConnection, event: &FarmEvent) -> Result<()> {
    sqlx::query(
        "UPDATE events SET name = $2, description = $3, location = $4, starts_at = $5, \
         ends_at = $6, capacity = $7, seats_reserved = $8, price_per_seat = $9, \
         updated_at = $10 WHERE id = $1",
    )
    .bind(event.id.into_inner())
    .bind(event.name.as_ref())
    .bind(event.description.as_ref())
    .bind(event.location.as_ref())
    .bind(event.starts_at)
    .bind(event.ends_at)
    .bind(int(event.capacity.into_inner())?)
    .bind(int(event.seats_reserved)?)
    .bind(event.price_per_seat.into_inner())
    .bind(event.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn lock_service(
    conn: &mut PgConnection,
    id: ServiceId,
) -> Result<Option<ServiceListing>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(rows::service).transpose()
}

async fn save_service(conn: &mut PgConnection, service: &ServiceListing) -> Result<()> {
    sqlx::query(
        "UPDATE services SET name = $2, description = $3, price = $4, duration_minutes = $5, \
         location = $6, is_active = $7, updated_at = $8 WHERE id = $1",
    )
    .bind(service.id.into_inner())
    .bind(service.name.as_ref())
    .bind(service.description.as_ref())
    .bind(service.price.into_inner())
    .bind(int(service.duration_minutes.into_inner())?)
    .bind(service.location.as_ref())
    .bind(service.is_active)
    .bind(service.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let image_urls: Vec<&str> = product.image_urls.iter().map(|url| url.as_ref()).collect();
        sqlx::query(
            "INSERT INTO products (id, vendor_id, name, description, category, unit, price, \
             stock, image_urls, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(product.id.into_inner())
        .bind(product.vendor_id.into_inner())
        .bind(product.name.as_ref())
        .bind(product.description.as_ref())
        .bind(product.category.as_ref())
        .bind(product.unit.as_str())
        .bind(product.price.into_inner())
        .bind(i64::from(product.stock.into_inner()))
        .bind(image_urls)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_product(&self, id: ProductId, change: ProductChange) -> Result<Product> {
        let mut tx = self.pool().begin().await?;
        let mut product = lock_products(&mut tx, [id])
            .await?
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("product {id}")))?;

        change(&mut product)?;

        save_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::product).transpose()
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
               AND ($2::text IS NULL OR category = $2) \
               AND ($3::uuid IS NULL OR vendor_id = $3) \
               AND ($4 OR is_active) \
             ORDER BY id DESC LIMIT $5 OFFSET $6"
        );
        let found = sqlx::query(&sql)
            .bind(query.search.as_deref().map(contains_pattern))
            .bind(query.category.as_ref().map(|c| c.as_ref().to_string()))
            .bind(query.vendor_id.map(|v| v.into_inner()))
            .bind(query.include_inactive)
            .bind(i64::from(query.page.limit))
            .bind(i64::from(query.page.offset))
            .fetch_all(self.pool())
            .await?;
        found.iter().map(rows::product).collect()
    }

    async fn insert_service(&self, service: &ServiceListing) -> Result<()> {
        sqlx::query(
            "INSERT INTO services (id, vendor_id, name, description, price, duration_minutes, \
             location, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(service.id.into_inner())
        .bind(service.vendor_id.into_inner())
        .bind(service.name.as_ref())
        .bind(service.description.as_ref())
        .bind(service.price.into_inner())
        .bind(int(service.duration_minutes.into_inner())?)
        .bind(service.location.as_ref())
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_service(&self, id: ServiceId, change: ServiceChange) -> Result<ServiceListing> {
        let mut tx = self.pool().begin().await?;
        let mut service = lock_service(&mut tx, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("service {id}")))?;

        change(&mut service)?;

        save_service(&mut tx, &service).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn delete_service(&self, id: ServiceId, owner: UserId) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        // Bookings take the same row lock before checking for overlaps.
        let service = lock_service(&mut tx, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("service {id}")))?;
        let upcoming = confirmed_slots(&mut tx, id, Utc::now()).await?;
        transactions::check_service_removal(&service, owner, &upcoming)?;

        sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_service(&self, id: ServiceId) -> Result<Option<ServiceListing>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::service).transpose()
    }

    async fn list_services(&self, query: &ServiceQuery) -> Result<Vec<ServiceListing>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
               AND ($2::uuid IS NULL OR vendor_id = $2) \
               AND ($3 OR is_active) \
             ORDER BY id DESC LIMIT $4 OFFSET $5"
        );
        let found = sqlx::query(&sql)
            .bind(query.search.as_deref().map(contains_pattern))
            .bind(query.vendor_id.map(|v| v.into_inner()))
            .bind(query.include_inactive)
            .bind(i64::from(query.page.limit))
            .bind(i64::from(query.page.offset))
            .fetch_all(self.pool())
            .await?;
        found.iter().map(rows::service).collect()
    }

    async fn insert_event(&self, event: &FarmEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (id, vendor_id, name, description, location, starts_at, \
             ends_at, capacity, seats_reserved, price_per_seat, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(event.id.into_inner())
        .bind(event.vendor_id.into_inner())
        .bind(event.name.as_ref())
        .bind(event.description.as_ref())
        .bind(event.location.as_ref())
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(int(event.capacity.into_inner())?)
        .bind(int(event.seats_reserved)?)
        .bind(event.price_per_seat.into_inner())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn update_event(&self, id: EventId, change: EventChange) -> Result<FarmEvent> {
        let mut tx = self.pool().begin().await?;
        let mut event = lock_event(&mut tx, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("event {id}")))?;

        change(&mut event)?;

        save_event(&mut tx, &event).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn delete_event(&self, id: EventId, owner: UserId) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        let event = lock_event(&mut tx, id)
            .await?
            .ok_or_else(|| Error::not_found(format!("event {id}")))?;
        transactions::check_event_removal(&event, owner)?;

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<FarmEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::event).transpose()
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<FarmEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
               AND ($2::uuid IS NULL OR vendor_id = $2) \
               AND ($3::timestamptz IS NULL OR starts_at > $3) \
             ORDER BY starts_at, id LIMIT $4 OFFSET $5"
        );
        let found = sqlx::query(&sql)
            .bind(query.search.as_deref().map(contains_pattern))
            .bind(query.vendor_id.map(|v| v.into_inner()))
            .bind(query.starting_after)
            .bind(i64::from(query.page.limit))
            .bind(i64::from(query.page.offset))
            .fetch_all(self.pool())
            .await?;
        found.iter().map(rows::event).collect()
    }
}
