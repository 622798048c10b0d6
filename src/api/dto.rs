//! Request and response bodies for the HTTP API
//!
//! Request bodies carry plain JSON values and are converted into validated
//! domain types here, so a bad value is reported with the name of the field
//! that held it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::validation_constants::{listing::MAX_IMAGES, order::MAX_LINES};
use crate::domain::{
    Capacity, CartLine, Category, Description, DisplayName, DurationMinutes, EmailAddress,
    EventDraft, EventPatch, ImageUrl, Location, Money, Order, OrderNote, OrderStatus, Payment,
    PaymentMethod, ProductDraft, ProductId, ProductPatch, Quantity, Reservation, Role,
    ServiceDraft, ServicePatch, StockLevel, Title, TransactionReference, Unit, User, UserId,
};
use crate::{Error, Result};

fn field<T, E>(name: &str, value: std::result::Result<T, E>) -> Result<T> {
    value.map_err(|_| Error::invalid_input(name))
}

fn optional<V, T, E>(
    name: &str,
    value: Option<V>,
    parse: impl FnOnce(V) -> std::result::Result<T, E>,
) -> Result<Option<T>> {
    field(name, value.map(parse).transpose())
}

fn image_urls(urls: Vec<String>) -> Result<Vec<ImageUrl>> {
    if urls.len() > MAX_IMAGES {
        return Err(Error::invalid_input("image_urls"));
    }
    urls.into_iter()
        .map(|url| field("image_urls", ImageUrl::try_new(url)))
        .collect()
}

// Users and vendors

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl RegisterUser {
    pub fn into_parts(self) -> Result<(EmailAddress, DisplayName, Role)> {
        Ok((
            field("email", EmailAddress::try_new(self.email))?,
            field("display_name", DisplayName::try_new(self.display_name))?,
            self.role,
        ))
    }
}

/// A new account and the only copy of its API token
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct VendorProfileBody {
    pub farm_name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
}

impl VendorProfileBody {
    pub fn into_parts(self) -> Result<(Title, Description, Location)> {
        Ok((
            field("farm_name", Title::try_new(self.farm_name))?,
            field("description", Description::try_new(self.description))?,
            field("location", Location::try_new(self.location))?,
        ))
    }
}

// Products

#[derive(Debug, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub unit: Unit,
    pub price: Decimal,
    pub stock: u32,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl NewProduct {
    pub fn into_draft(self) -> Result<ProductDraft> {
        Ok(ProductDraft {
            name: field("name", Title::try_new(self.name))?,
            description: field("description", Description::try_new(self.description))?,
            category: field("category", Category::try_new(self.category))?,
            unit: self.unit,
            price: field("price", Money::try_new(self.price))?,
            stock: StockLevel::new(self.stock),
            image_urls: image_urls(self.image_urls)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<Unit>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl ProductChanges {
    pub fn into_patch(self) -> Result<ProductPatch> {
        Ok(ProductPatch {
            name: optional("name", self.name, Title::try_new)?,
            description: optional("description", self.description, Description::try_new)?,
            category: optional("category", self.category, Category::try_new)?,
            unit: self.unit,
            price: optional("price", self.price, Money::try_new)?,
            stock: self.stock.map(StockLevel::new),
            image_urls: self.image_urls.map(image_urls).transpose()?,
            is_active: self.is_active,
        })
    }
}

// Services

#[derive(Debug, Deserialize)]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub duration_minutes: u32,
    pub location: String,
}

impl NewService {
    pub fn into_draft(self) -> Result<ServiceDraft> {
        Ok(ServiceDraft {
            name: field("name", Title::try_new(self.name))?,
            description: field("description", Description::try_new(self.description))?,
            price: field("price", Money::try_new(self.price))?,
            duration_minutes: field(
                "duration_minutes",
                DurationMinutes::try_new(self.duration_minutes),
            )?,
            location: field("location", Location::try_new(self.location))?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

impl ServiceChanges {
    pub fn into_patch(self) -> Result<ServicePatch> {
        Ok(ServicePatch {
            name: optional("name", self.name, Title::try_new)?,
            description: optional("description", self.description, Description::try_new)?,
            price: optional("price", self.price, Money::try_new)?,
            duration_minutes: optional(
                "duration_minutes",
                self.duration_minutes,
                DurationMinutes::try_new,
            )?,
            location: optional("location", self.location, Location::try_new)?,
            is_active: self.is_active,
        })
    }
}

// Events

#[derive(Debug, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: u32,
    pub price_per_seat: Decimal,
}

impl NewEvent {
    pub fn into_draft(self) -> Result<EventDraft> {
        Ok(EventDraft {
            name: field("name", Title::try_new(self.name))?,
            description: field("description", Description::try_new(self.description))?,
            location: field("location", Location::try_new(self.location))?,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            capacity: field("capacity", Capacity::try_new(self.capacity))?,
            price_per_seat: field("price_per_seat", Money::try_new(self.price_per_seat))?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub price_per_seat: Option<Decimal>,
}

impl EventChanges {
    pub fn into_patch(self) -> Result<EventPatch> {
        Ok(EventPatch {
            name: optional("name", self.name, Title::try_new)?,
            description: optional("description", self.description, Description::try_new)?,
            location: optional("location", self.location, Location::try_new)?,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            capacity: optional("capacity", self.capacity, Capacity::try_new)?,
            price_per_seat: optional("price_per_seat", self.price_per_seat, Money::try_new)?,
        })
    }
}

// Orders, payments and reservations

#[derive(Debug, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

impl NewOrder {
    pub fn into_parts(self) -> Result<(Vec<CartLine>, PaymentMethod, Option<OrderNote>)> {
        if self.items.len() > MAX_LINES {
            return Err(Error::invalid_input("items"));
        }
        let lines = self
            .items
            .into_iter()
            .map(|line| {
                Ok(CartLine {
                    product_id: ProductId::new(line.product_id),
                    quantity: field("quantity", Quantity::try_new(line.quantity))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // An empty note is the same as no note
        let note = self.note.filter(|note| !note.trim().is_empty());
        Ok((
            lines,
            self.payment_method,
            optional("note", note, OrderNote::try_new)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: String,
}

impl PaymentConfirmation {
    pub fn into_reference(self) -> Result<TransactionReference> {
        field("reference", TransactionReference::try_new(self.reference))
    }
}

#[derive(Debug, Deserialize)]
pub struct SeatRequest {
    pub seats: u32,
    pub payment_method: PaymentMethod,
}

impl SeatRequest {
    pub fn into_parts(self) -> Result<(Quantity, PaymentMethod)> {
        Ok((
            field("seats", Quantity::try_new(self.seats))?,
            self.payment_method,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub starts_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
}

/// An order with its payment record
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub payment: Option<Payment>,
}

/// A reservation with its payment record, absent for free reservations
#[derive(Debug, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub payment: Option<Payment>,
}

// Query strings

/// Filters and paging accepted by listing routes
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Events only: hide events that already started (default true)
    pub upcoming: Option<bool>,
}

impl ListParams {
    pub fn search(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
    }

    pub fn category(&self) -> Result<Option<Category>> {
        optional("category", self.category.clone(), Category::try_new)
    }

    pub fn vendor_id(&self) -> Option<UserId> {
        self.vendor_id.map(UserId::new)
    }
}

/// Paging accepted by per-user listings
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
