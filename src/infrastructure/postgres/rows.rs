//! Row decoding and column lists for the PostgreSQL store
//!
//! Stored values pass back through the same validated constructors as
//! request input; a row that fails validation is reported as corrupt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    Capacity, Category, Description, DisplayName, DurationMinutes, EmailAddress, EventId,
    FarmEvent, ImageUrl, Location, Money, Order, OrderId, OrderItem, OrderNote, Payment,
    PaymentId, PaymentSubject, Product, ProductId, Quantity, Reservation, ReservationId,
    ReservationTarget, ServiceId, ServiceListing, StockLevel, TimeSlot, Title,
    TransactionReference, User, UserId, VendorProfile,
};
use crate::{Error, Result};

pub const USER_COLUMNS: &str = "id, email, display_name, role, created_at";

pub const PROFILE_COLUMNS: &str = "vendor_id, farm_name, description, location, updated_at";

pub const PRODUCT_COLUMNS: &str = "id, vendor_id, name, description, category, unit, price, \
     stock, image_urls, is_active, created_at, updated_at";

pub const SERVICE_COLUMNS: &str = "id, vendor_id, name, description, price, duration_minutes, \
     location, is_active, created_at, updated_at";

pub const EVENT_COLUMNS: &str = "id, vendor_id, name, description, location, starts_at, ends_at, \
     capacity, seats_reserved, price_per_seat, created_at, updated_at";

pub const ORDER_COLUMNS: &str =
    "id, client_id, vendor_id, total, status, note, created_at, updated_at";

pub const ORDER_ITEM_COLUMNS: &str = "order_id, product_id, product_name, unit_price, quantity";

pub const PAYMENT_COLUMNS: &str = "id, order_id, reservation_id, payer_id, amount, method, \
     status, reference, created_at, updated_at";

pub const RESERVATION_COLUMNS: &str = "id, client_id, vendor_id, kind, event_id, seats, \
     service_id, slot_starts_at, slot_ends_at, total, status, created_at, updated_at";

fn corrupt(field: &str, error: impl Display) -> Error {
    Error::application(format!("stored {field} is invalid: {error}"))
}

/// Convert a bounded domain count into a Postgres INTEGER
pub fn int(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid_input("integer"))
}

fn uint(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).map_err(|e| corrupt(column, e))
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    let value: Decimal = row.try_get(column)?;
    Money::try_new(value).map_err(|e| corrupt(column, e))
}

fn parsed<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value: String = row.try_get(column)?;
    value.parse().map_err(|e| corrupt(column, e))
}

fn text<T, E: Display>(
    row: &PgRow,
    column: &str,
    make: impl FnOnce(String) -> std::result::Result<T, E>,
) -> Result<T> {
    let value: String = row.try_get(column)?;
    make(value).map_err(|e| corrupt(column, e))
}

pub fn user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        email: text(row, "email", EmailAddress::try_new)?,
        display_name: text(row, "display_name", DisplayName::try_new)?,
        role: parsed(row, "role")?,
        created_at: row.try_get("created_at")?,
    })
}

pub fn vendor_profile(row: &PgRow) -> Result<VendorProfile> {
    Ok(VendorProfile {
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        farm_name: text(row, "farm_name", Title::try_new)?,
        description: text(row, "description", Description::try_new)?,
        location: text(row, "location", Location::try_new)?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn product(row: &PgRow) -> Result<Product> {
    let stock: i64 = row.try_get("stock")?;
    let image_urls: Vec<String> = row.try_get("image_urls")?;
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        name: text(row, "name", Title::try_new)?,
        description: text(row, "description", Description::try_new)?,
        category: text(row, "category", Category::try_new)?,
        unit: parsed(row, "unit")?,
        price: money(row, "price")?,
        stock: StockLevel::new(u32::try_from(stock).map_err(|e| corrupt("stock", e))?),
        image_urls: image_urls
            .into_iter()
            .map(|url| ImageUrl::try_new(url).map_err(|e| corrupt("image_urls", e)))
            .collect::<Result<_>>()?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn service(row: &PgRow) -> Result<ServiceListing> {
    Ok(ServiceListing {
        id: ServiceId::new(row.try_get("id")?),
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        name: text(row, "name", Title::try_new)?,
        description: text(row, "description", Description::try_new)?,
        price: money(row, "price")?,
        duration_minutes: DurationMinutes::try_new(uint(row, "duration_minutes")?)
            .map_err(|e| corrupt("duration_minutes", e))?,
        location: text(row, "location", Location::try_new)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn event(row: &PgRow) -> Result<FarmEvent> {
    Ok(FarmEvent {
        id: EventId::new(row.try_get("id")?),
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        name: text(row, "name", Title::try_new)?,
        description: text(row, "description", Description::try_new)?,
        location: text(row, "location", Location::try_new)?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        capacity: Capacity::try_new(uint(row, "capacity")?).map_err(|e| corrupt("capacity", e))?,
        seats_reserved: uint(row, "seats_reserved")?,
        price_per_seat: money(row, "price_per_seat")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decode an order item together with the id of the order it belongs to
pub fn order_item(row: &PgRow) -> Result<(OrderId, OrderItem)> {
    let order_id = OrderId::new(row.try_get("order_id")?);
    let item = OrderItem {
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: text(row, "product_name", Title::try_new)?,
        unit_price: money(row, "unit_price")?,
        quantity: Quantity::try_new(uint(row, "quantity")?).map_err(|e| corrupt("quantity", e))?,
    };
    Ok((order_id, item))
}

/// Decode an order header; items are attached by the caller
pub fn order(row: &PgRow) -> Result<Order> {
    let note: Option<String> = row.try_get("note")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        client_id: UserId::new(row.try_get("client_id")?),
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        items: Vec::new(),
        total: money(row, "total")?,
        status: parsed(row, "status")?,
        note: note
            .map(|n| OrderNote::try_new(n).map_err(|e| corrupt("note", e)))
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn payment(row: &PgRow) -> Result<Payment> {
    let order_id: Option<Uuid> = row.try_get("order_id")?;
    let reservation_id: Option<Uuid> = row.try_get("reservation_id")?;
    let subject = match (order_id, reservation_id) {
        (Some(id), None) => PaymentSubject::Order(OrderId::new(id)),
        (None, Some(id)) => PaymentSubject::Reservation(ReservationId::new(id)),
        _ => return Err(corrupt("payment subject", "expected exactly one of order or reservation")),
    };
    let reference: Option<String> = row.try_get("reference")?;

    Ok(Payment {
        id: PaymentId::new(row.try_get("id")?),
        subject,
        payer_id: UserId::new(row.try_get("payer_id")?),
        amount: money(row, "amount")?,
        method: parsed(row, "method")?,
        status: parsed(row, "status")?,
        reference: reference
            .map(|r| TransactionReference::try_new(r).map_err(|e| corrupt("reference", e)))
            .transpose()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn reservation(row: &PgRow) -> Result<Reservation> {
    let kind: String = row.try_get("kind")?;
    let target = match kind.as_str() {
        "event" => {
            let event_id: Option<Uuid> = row.try_get("event_id")?;
            let seats: Option<i32> = row.try_get("seats")?;
            let (Some(event_id), Some(seats)) = (event_id, seats) else {
                return Err(corrupt("reservation", "event reservation without event"));
            };
            let seats = u32::try_from(seats).map_err(|e| corrupt("seats", e))?;
            ReservationTarget::Event {
                event_id: EventId::new(event_id),
                seats: Quantity::try_new(seats).map_err(|e| corrupt("seats", e))?,
            }
        }
        "service" => {
            let service_id: Option<Uuid> = row.try_get("service_id")?;
            let starts_at: Option<DateTime<Utc>> = row.try_get("slot_starts_at")?;
            let ends_at: Option<DateTime<Utc>> = row.try_get("slot_ends_at")?;
            let (Some(service_id), Some(starts_at), Some(ends_at)) =
                (service_id, starts_at, ends_at)
            else {
                return Err(corrupt("reservation", "service booking without slot"));
            };
            ReservationTarget::Service {
                service_id: ServiceId::new(service_id),
                slot: TimeSlot { starts_at, ends_at },
            }
        }
        other => return Err(corrupt("reservation kind", other)),
    };

    Ok(Reservation {
        id: ReservationId::new(row.try_get("id")?),
        client_id: UserId::new(row.try_get("client_id")?),
        vendor_id: UserId::new(row.try_get("vendor_id")?),
        target,
        total: money(row, "total")?,
        status: parsed(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn slot(row: &PgRow) -> Result<TimeSlot> {
    Ok(TimeSlot {
        starts_at: row.try_get("slot_starts_at")?,
        ends_at: row.try_get("slot_ends_at")?,
    })
}
