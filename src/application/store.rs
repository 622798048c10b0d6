//! Storage interfaces for marketplace data
//!
//! Every method that touches more than one record (placing or cancelling an
//! order, reserving seats, booking a slot) is atomic: either all of its
//! writes land or none do. Record updates go through a closure that runs
//! while the record is locked, so concurrent stock changes are never
//! overwritten with stale values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    CartLine, Category, EventId, FarmEvent, Order, OrderId, OrderNote, OrderStatus, Payment,
    PaymentMethod, PaymentSubject, Product, ProductId, Quantity, Reservation, ReservationId,
    ServiceId, ServiceListing, TokenDigest, TransactionReference, User, UserId,
    VendorProfile,
};
use crate::Result;

/// In-place edit applied to a locked product
pub type ProductChange = Box<dyn FnOnce(&mut Product) -> Result<()> + Send>;

/// In-place edit applied to a locked service listing
pub type ServiceChange = Box<dyn FnOnce(&mut ServiceListing) -> Result<()> + Send>;

/// In-place edit applied to a locked event
pub type EventChange = Box<dyn FnOnce(&mut FarmEvent) -> Result<()> + Send>;

/// Limit/offset window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Every row, for internal aggregation
    pub fn unbounded() -> Self {
        Self {
            limit: u32::MAX,
            offset: 0,
        }
    }

    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(20, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Case-insensitive substring match on the product name
    pub search: Option<String>,
    pub category: Option<Category>,
    pub vendor_id: Option<UserId>,
    pub include_inactive: bool,
    pub page: Page,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        (self.include_inactive || product.is_active)
            && self.vendor_id.is_none_or(|vendor| product.vendor_id == vendor)
            && self
                .category
                .as_ref()
                .is_none_or(|category| &product.category == category)
            && name_matches(self.search.as_deref(), product.name.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceQuery {
    pub search: Option<String>,
    pub vendor_id: Option<UserId>,
    pub include_inactive: bool,
    pub page: Page,
}

impl ServiceQuery {
    pub fn matches(&self, service: &ServiceListing) -> bool {
        (self.include_inactive || service.is_active)
            && self.vendor_id.is_none_or(|vendor| service.vendor_id == vendor)
            && name_matches(self.search.as_deref(), service.name.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub search: Option<String>,
    pub vendor_id: Option<UserId>,
    /// Only events that have not started yet
    pub starting_after: Option<DateTime<Utc>>,
    pub page: Page,
}

impl EventQuery {
    pub fn matches(&self, event: &FarmEvent) -> bool {
        self.vendor_id.is_none_or(|vendor| event.vendor_id == vendor)
            && self.starting_after.is_none_or(|after| event.starts_at > after)
            && name_matches(self.search.as_deref(), event.name.as_ref())
    }
}

fn name_matches(search: Option<&str>, name: &str) -> bool {
    search.is_none_or(|needle| name.to_lowercase().contains(&needle.to_lowercase()))
}

/// A client's checkout request
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub client_id: UserId,
    pub lines: Vec<CartLine>,
    pub method: PaymentMethod,
    pub note: Option<OrderNote>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventReservationRequest {
    pub client_id: UserId,
    pub event_id: EventId,
    pub seats: Quantity,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceBookingRequest {
    pub client_id: UserId,
    pub service_id: ServiceId,
    pub starts_at: DateTime<Utc>,
    pub method: PaymentMethod,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Store a new user with the digest of their API token
    ///
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: &User, token: &TokenDigest) -> Result<()>;

    async fn find_user_by_token(&self, token: &TokenDigest) -> Result<Option<User>>;

    async fn upsert_vendor_profile(&self, profile: &VendorProfile) -> Result<()>;

    async fn find_vendor_profile(&self, vendor_id: UserId) -> Result<Option<VendorProfile>>;

    async fn list_vendor_profiles(&self, page: Page) -> Result<Vec<VendorProfile>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn update_product(&self, id: ProductId, change: ProductChange) -> Result<Product>;

    /// Returns false when no such product existed
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;

    async fn insert_service(&self, service: &ServiceListing) -> Result<()>;

    async fn update_service(&self, id: ServiceId, change: ServiceChange) -> Result<ServiceListing>;

    /// Delete a service owned by `owner` that has no upcoming bookings
    ///
    /// The check and the delete happen under the same lock as bookings, so
    /// no booking can land in between.
    async fn delete_service(&self, id: ServiceId, owner: UserId) -> Result<()>;

    async fn find_service(&self, id: ServiceId) -> Result<Option<ServiceListing>>;

    async fn list_services(&self, query: &ServiceQuery) -> Result<Vec<ServiceListing>>;

    async fn insert_event(&self, event: &FarmEvent) -> Result<()>;

    async fn update_event(&self, id: EventId, change: EventChange) -> Result<FarmEvent>;

    /// Delete an event owned by `owner` that nobody holds seats for
    async fn delete_event(&self, id: EventId, owner: UserId) -> Result<()>;

    async fn find_event(&self, id: EventId) -> Result<Option<FarmEvent>>;

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<FarmEvent>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Decrement stock, create the order and its pending payment, atomically
    async fn place_order(&self, request: &OrderRequest) -> Result<(Order, Payment)>;

    /// Cancel a pending order, restore its stock and void its payment, atomically
    async fn cancel_order(&self, id: OrderId, actor: UserId) -> Result<(Order, Payment)>;

    /// Move an order forward on behalf of its vendor
    async fn advance_order(&self, id: OrderId, actor: UserId, next: OrderStatus)
        -> Result<Order>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn list_orders_for_client(&self, client_id: UserId, page: Page) -> Result<Vec<Order>>;

    async fn list_orders_for_vendor(&self, vendor_id: UserId, page: Page) -> Result<Vec<Order>>;

    async fn find_payment(&self, subject: PaymentSubject) -> Result<Option<Payment>>;

    /// Mark a pending payment as completed by its payer
    async fn settle_payment(
        &self,
        subject: PaymentSubject,
        payer: UserId,
        reference: TransactionReference,
    ) -> Result<Payment>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn reserve_event(
        &self,
        request: &EventReservationRequest,
    ) -> Result<(Reservation, Option<Payment>)>;

    async fn book_service(
        &self,
        request: &ServiceBookingRequest,
    ) -> Result<(Reservation, Option<Payment>)>;

    async fn cancel_reservation(
        &self,
        id: ReservationId,
        actor: UserId,
    ) -> Result<(Reservation, Option<Payment>)>;

    async fn find_reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    async fn list_reservations_for_client(
        &self,
        client_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>>;

    async fn list_reservations_for_vendor(
        &self,
        vendor_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>>;
}

/// Everything the marketplace needs from its storage backend
#[async_trait]
pub trait MarketplaceStore: UserStore + CatalogStore + OrderStore + ReservationStore {
    async fn health_check(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::test_support::draft;

    #[test]
    fn test_page_window() {
        let page = Page::new(2, 1);
        assert_eq!(page.apply(1..=5), vec![2, 3]);
        assert_eq!(Page::unbounded().apply(1..=3), vec![1, 2, 3]);
    }

    #[test]
    fn test_product_query_filters() {
        let vendor = UserId::generate();
        let mut product = Product::new(vendor, draft("Purple Carrots", 300, 4));

        let search = ProductQuery {
            search: Some("carrot".to_string()),
            ..ProductQuery::default()
        };
        assert!(search.matches(&product));

        let other_vendor = ProductQuery {
            vendor_id: Some(UserId::generate()),
            ..ProductQuery::default()
        };
        assert!(!other_vendor.matches(&product));

        product.is_active = false;
        assert!(!ProductQuery::default().matches(&product));
        let owner = ProductQuery {
            vendor_id: Some(vendor),
            include_inactive: true,
            ..ProductQuery::default()
        };
        assert!(owner.matches(&product));
    }
}
