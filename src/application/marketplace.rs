//! Marketplace service: authorization and orchestration over the store
//!
//! Every operation takes the acting user (when there is one) and checks
//! roles and ownership before the store is touched. Ownership checks that
//! guard a write run inside the store's locked update, so the record that
//! is checked is the record that is changed.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::application::store::{
    EventQuery, EventReservationRequest, MarketplaceStore, OrderRequest, Page, ProductQuery,
    ServiceBookingRequest, ServiceQuery,
};
use crate::config::MarketplaceSettings;
use crate::domain::{
    ApiToken, CartLine, Description, DisplayName, EmailAddress, EventDraft, EventId, EventPatch,
    FarmEvent, Location, Order, OrderId, OrderNote, OrderStatus, Payment, PaymentMethod,
    PaymentSubject, Product, ProductDraft, ProductId, ProductPatch, Quantity, Reservation,
    ReservationId, Role, ServiceDraft, ServiceId, ServiceListing, ServicePatch, Title,
    TransactionReference, User, UserId, VendorDashboard, VendorProfile,
};
use crate::infrastructure::log_messages::marketplace as messages;
use crate::{Error, Result};

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn MarketplaceStore>,
    settings: MarketplaceSettings,
}

fn require_vendor(actor: &User) -> Result<()> {
    if actor.is_vendor() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn require_client(actor: &User) -> Result<()> {
    if actor.is_client() {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

/// True when `viewer` is the vendor a listing query is scoped to
fn is_own_listing(viewer: Option<&User>, vendor_id: Option<UserId>) -> bool {
    viewer.is_some_and(|user| vendor_id == Some(user.id))
}

impl Marketplace {
    pub fn new(store: Arc<dyn MarketplaceStore>, settings: MarketplaceSettings) -> Self {
        Self { store, settings }
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }

    /// Build a listing window, applying the configured default and maximum
    pub fn page(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Page> {
        let limit = limit.unwrap_or(self.settings.default_page_size);
        if limit == 0 || limit > self.settings.max_page_size {
            return Err(Error::invalid_input("limit"));
        }
        Ok(Page::new(limit, offset.unwrap_or(0)))
    }

    // Users and vendor profiles

    /// Create an account and return its API token
    ///
    /// The token is only ever available here; the store keeps its digest.
    #[instrument(skip(self, email, display_name), fields(email = %email))]
    pub async fn register(
        &self,
        email: EmailAddress,
        display_name: DisplayName,
        role: Role,
    ) -> Result<(User, ApiToken)> {
        let user = User::new(email, display_name, role);
        let token = ApiToken::generate();
        self.store.insert_user(&user, &token.digest()).await?;
        info!(user_id = %user.id, role = %user.role, "{}", messages::USER_REGISTERED);
        Ok((user, token))
    }

    pub async fn authenticate(&self, token: &ApiToken) -> Result<User> {
        self.store
            .find_user_by_token(&token.digest())
            .await?
            .ok_or(Error::Unauthorized)
    }

    #[instrument(skip(self, actor, farm_name, description, location), fields(vendor_id = %actor.id))]
    pub async fn upsert_vendor_profile(
        &self,
        actor: &User,
        farm_name: Title,
        description: Description,
        location: Location,
    ) -> Result<VendorProfile> {
        require_vendor(actor)?;
        let profile = VendorProfile::new(actor.id, farm_name, description, location);
        self.store.upsert_vendor_profile(&profile).await?;
        Ok(profile)
    }

    pub async fn vendor_profile(&self, vendor_id: UserId) -> Result<VendorProfile> {
        self.store
            .find_vendor_profile(vendor_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("vendor {vendor_id}")))
    }

    pub async fn list_vendor_profiles(&self, page: Page) -> Result<Vec<VendorProfile>> {
        self.store.list_vendor_profiles(page).await
    }

    // Products

    #[instrument(skip(self, actor, draft), fields(vendor_id = %actor.id))]
    pub async fn create_product(&self, actor: &User, draft: ProductDraft) -> Result<Product> {
        require_vendor(actor)?;
        let product = Product::new(actor.id, draft);
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, "{}", messages::LISTING_CREATED);
        Ok(product)
    }

    #[instrument(skip(self, actor, patch), fields(vendor_id = %actor.id))]
    pub async fn update_product(
        &self,
        actor: &User,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product> {
        require_vendor(actor)?;
        let owner = actor.id;
        let product = self
            .store
            .update_product(
                id,
                Box::new(move |product: &mut Product| {
                    if !product.is_owned_by(&owner) {
                        return Err(Error::Forbidden);
                    }
                    product.apply_update(patch);
                    Ok(())
                }),
            )
            .await?;
        info!(product_id = %id, "{}", messages::LISTING_UPDATED);
        Ok(product)
    }

    #[instrument(skip(self, actor), fields(vendor_id = %actor.id))]
    pub async fn delete_product(&self, actor: &User, id: ProductId) -> Result<()> {
        let product = self
            .store
            .find_product(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("product {id}")))?;
        if !product.is_owned_by(&actor.id) {
            return Err(Error::Forbidden);
        }
        if !self.store.delete_product(id).await? {
            return Err(Error::not_found(format!("product {id}")));
        }
        info!(product_id = %id, "{}", messages::LISTING_DELETED);
        Ok(())
    }

    /// A product as seen by `viewer`; inactive products are only visible to their owner
    pub async fn product(&self, viewer: Option<&User>, id: ProductId) -> Result<Product> {
        self.store
            .find_product(id)
            .await?
            .filter(|p| p.is_active || viewer.is_some_and(|user| p.is_owned_by(&user.id)))
            .ok_or_else(|| Error::not_found(format!("product {id}")))
    }

    pub async fn list_products(
        &self,
        viewer: Option<&User>,
        mut query: ProductQuery,
    ) -> Result<Vec<Product>> {
        query.include_inactive = is_own_listing(viewer, query.vendor_id);
        self.store.list_products(&query).await
    }

    // Services

    #[instrument(skip(self, actor, draft), fields(vendor_id = %actor.id))]
    pub async fn create_service(
        &self,
        actor: &User,
        draft: ServiceDraft,
    ) -> Result<ServiceListing> {
        require_vendor(actor)?;
        let service = ServiceListing::new(actor.id, draft);
        self.store.insert_service(&service).await?;
        info!(service_id = %service.id, "{}", messages::LISTING_CREATED);
        Ok(service)
    }

    #[instrument(skip(self, actor, patch), fields(vendor_id = %actor.id))]
    pub async fn update_service(
        &self,
        actor: &User,
        id: ServiceId,
        patch: ServicePatch,
    ) -> Result<ServiceListing> {
        require_vendor(actor)?;
        let owner = actor.id;
        let service = self
            .store
            .update_service(
                id,
                Box::new(move |service: &mut ServiceListing| {
                    if !service.is_owned_by(&owner) {
                        return Err(Error::Forbidden);
                    }
                    service.apply_update(patch);
                    Ok(())
                }),
            )
            .await?;
        info!(service_id = %id, "{}", messages::LISTING_UPDATED);
        Ok(service)
    }

    /// Remove a service listing that has no upcoming bookings
    #[instrument(skip(self, actor), fields(vendor_id = %actor.id))]
    pub async fn delete_service(&self, actor: &User, id: ServiceId) -> Result<()> {
        self.store.delete_service(id, actor.id).await?;
        info!(service_id = %id, "{}", messages::LISTING_DELETED);
        Ok(())
    }

    pub async fn service(&self, viewer: Option<&User>, id: ServiceId) -> Result<ServiceListing> {
        self.store
            .find_service(id)
            .await?
            .filter(|s| s.is_active || viewer.is_some_and(|user| s.is_owned_by(&user.id)))
            .ok_or_else(|| Error::not_found(format!("service {id}")))
    }

    pub async fn list_services(
        &self,
        viewer: Option<&User>,
        mut query: ServiceQuery,
    ) -> Result<Vec<ServiceListing>> {
        query.include_inactive = is_own_listing(viewer, query.vendor_id);
        self.store.list_services(&query).await
    }

    // Events

    #[instrument(skip(self, actor, draft), fields(vendor_id = %actor.id))]
    pub async fn create_event(&self, actor: &User, draft: EventDraft) -> Result<FarmEvent> {
        require_vendor(actor)?;
        let event = FarmEvent::new(actor.id, draft)?;
        self.store.insert_event(&event).await?;
        info!(event_id = %event.id, "{}", messages::LISTING_CREATED);
        Ok(event)
    }

    #[instrument(skip(self, actor, patch), fields(vendor_id = %actor.id))]
    pub async fn update_event(
        &self,
        actor: &User,
        id: EventId,
        patch: EventPatch,
    ) -> Result<FarmEvent> {
        require_vendor(actor)?;
        let owner = actor.id;
        let event = self
            .store
            .update_event(
                id,
                Box::new(move |event: &mut FarmEvent| {
                    if !event.is_owned_by(&owner) {
                        return Err(Error::Forbidden);
                    }
                    event.apply_update(patch)?;
                    Ok(())
                }),
            )
            .await?;
        info!(event_id = %id, "{}", messages::LISTING_UPDATED);
        Ok(event)
    }

    /// Remove an event nobody holds seats for
    #[instrument(skip(self, actor), fields(vendor_id = %actor.id))]
    pub async fn delete_event(&self, actor: &User, id: EventId) -> Result<()> {
        self.store.delete_event(id, actor.id).await?;
        info!(event_id = %id, "{}", messages::LISTING_DELETED);
        Ok(())
    }

    pub async fn event(&self, id: EventId) -> Result<FarmEvent> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("event {id}")))
    }

    pub async fn list_events(&self, query: EventQuery) -> Result<Vec<FarmEvent>> {
        self.store.list_events(&query).await
    }

    // Orders and payments

    /// Check out a cart: stock, order and payment are written together or not at all
    #[instrument(skip(self, actor, lines, note), fields(client_id = %actor.id, lines = lines.len()))]
    pub async fn place_order(
        &self,
        actor: &User,
        lines: Vec<CartLine>,
        method: PaymentMethod,
        note: Option<OrderNote>,
    ) -> Result<(Order, Payment)> {
        require_client(actor)?;
        let request = OrderRequest {
            client_id: actor.id,
            lines,
            method,
            note,
        };

        match self.store.place_order(&request).await {
            Ok((order, payment)) => {
                info!(
                    order_id = %order.id,
                    vendor_id = %order.vendor_id,
                    total = %order.total,
                    "{}",
                    messages::ORDER_PLACED
                );
                Ok((order, payment))
            }
            Err(error) => {
                warn!(error = %error, "{}", messages::ORDER_REJECTED);
                Err(error)
            }
        }
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_order(&self, actor: &User, id: OrderId) -> Result<(Order, Payment)> {
        let (order, payment) = self.store.cancel_order(id, actor.id).await?;
        info!(order_id = %id, "{}", messages::ORDER_CANCELLED);
        Ok((order, payment))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn advance_order(
        &self,
        actor: &User,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order> {
        require_vendor(actor)?;
        let order = self.store.advance_order(id, actor.id, next).await?;
        info!(order_id = %id, status = %order.status, "{}", messages::ORDER_ADVANCED);
        Ok(order)
    }

    /// An order and its payment, visible to its client and vendor
    pub async fn order(&self, actor: &User, id: OrderId) -> Result<(Order, Option<Payment>)> {
        let order = self
            .store
            .find_order(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("order {id}")))?;
        if !order.is_participant(&actor.id) {
            return Err(Error::Forbidden);
        }
        let payment = self.store.find_payment(PaymentSubject::Order(id)).await?;
        Ok((order, payment))
    }

    /// Orders the actor placed (clients) or received (vendors), newest first
    pub async fn list_orders(&self, actor: &User, page: Page) -> Result<Vec<Order>> {
        match actor.role {
            Role::Client => self.store.list_orders_for_client(actor.id, page).await,
            Role::Vendor => self.store.list_orders_for_vendor(actor.id, page).await,
        }
    }

    /// Record an externally settled payment against an order or reservation
    #[instrument(skip(self, actor, reference), fields(actor = %actor.id))]
    pub async fn complete_payment(
        &self,
        actor: &User,
        subject: PaymentSubject,
        reference: TransactionReference,
    ) -> Result<Payment> {
        let payment = self
            .store
            .settle_payment(subject, actor.id, reference)
            .await?;
        info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            "{}",
            messages::PAYMENT_COMPLETED
        );
        Ok(payment)
    }

    // Reservations

    #[instrument(skip(self, actor), fields(client_id = %actor.id))]
    pub async fn reserve_event(
        &self,
        actor: &User,
        event_id: EventId,
        seats: Quantity,
        method: PaymentMethod,
    ) -> Result<(Reservation, Option<Payment>)> {
        require_client(actor)?;
        let request = EventReservationRequest {
            client_id: actor.id,
            event_id,
            seats,
            method,
        };
        let (reservation, payment) = self.store.reserve_event(&request).await?;
        info!(
            reservation_id = %reservation.id,
            event_id = %event_id,
            "{}",
            messages::RESERVATION_CONFIRMED
        );
        Ok((reservation, payment))
    }

    #[instrument(skip(self, actor), fields(client_id = %actor.id))]
    pub async fn book_service(
        &self,
        actor: &User,
        service_id: ServiceId,
        starts_at: DateTime<Utc>,
        method: PaymentMethod,
    ) -> Result<(Reservation, Option<Payment>)> {
        require_client(actor)?;
        let request = ServiceBookingRequest {
            client_id: actor.id,
            service_id,
            starts_at,
            method,
        };
        let (reservation, payment) = self.store.book_service(&request).await?;
        info!(
            reservation_id = %reservation.id,
            service_id = %service_id,
            "{}",
            messages::RESERVATION_CONFIRMED
        );
        Ok((reservation, payment))
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_reservation(
        &self,
        actor: &User,
        id: ReservationId,
    ) -> Result<(Reservation, Option<Payment>)> {
        let (reservation, payment) = self.store.cancel_reservation(id, actor.id).await?;
        info!(reservation_id = %id, "{}", messages::RESERVATION_CANCELLED);
        Ok((reservation, payment))
    }

    pub async fn reservation(
        &self,
        actor: &User,
        id: ReservationId,
    ) -> Result<(Reservation, Option<Payment>)> {
        let reservation = self
            .store
            .find_reservation(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("reservation {id}")))?;
        if !reservation.is_participant(&actor.id) {
            return Err(Error::Forbidden);
        }
        let payment = self
            .store
            .find_payment(PaymentSubject::Reservation(id))
            .await?;
        Ok((reservation, payment))
    }

    pub async fn list_reservations(&self, actor: &User, page: Page) -> Result<Vec<Reservation>> {
        match actor.role {
            Role::Client => self.store.list_reservations_for_client(actor.id, page).await,
            Role::Vendor => self.store.list_reservations_for_vendor(actor.id, page).await,
        }
    }

    // Dashboard

    #[instrument(skip(self, actor), fields(vendor_id = %actor.id))]
    pub async fn vendor_dashboard(&self, actor: &User) -> Result<VendorDashboard> {
        require_vendor(actor)?;
        let orders = self
            .store
            .list_orders_for_vendor(actor.id, Page::unbounded())
            .await?;
        let products = self
            .store
            .list_products(&ProductQuery {
                vendor_id: Some(actor.id),
                include_inactive: true,
                page: Page::unbounded(),
                ..ProductQuery::default()
            })
            .await?;
        VendorDashboard::from_orders(&orders, &products, self.settings.low_stock_threshold)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::test_support::draft;
    use crate::infrastructure::memory::InMemoryStore;
    use rstest::rstest;

    fn settings() -> MarketplaceSettings {
        MarketplaceSettings {
            low_stock_threshold: 5,
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    fn marketplace() -> Marketplace {
        Marketplace::new(Arc::new(InMemoryStore::new()), settings())
    }

    async fn user(market: &Marketplace, email: &str, role: Role) -> User {
        let (user, _) = market
            .register(
                EmailAddress::try_new(email.to_string()).unwrap(),
                DisplayName::try_new("Test User".to_string()).unwrap(),
                role,
            )
            .await
            .unwrap();
        user
    }

    #[rstest]
    #[case(None, None, Some(Page::new(20, 0)))]
    #[case(Some(100), Some(40), Some(Page::new(100, 40)))]
    #[case(Some(0), None, None)]
    #[case(Some(101), None, None)]
    fn test_page_bounds(
        #[case] limit: Option<u32>,
        #[case] offset: Option<u32>,
        #[case] expected: Option<Page>,
    ) {
        assert_eq!(marketplace().page(limit, offset).ok(), expected);
    }

    #[tokio::test]
    async fn test_tokens_authenticate_their_user() {
        let market = marketplace();
        let (user, token) = market
            .register(
                EmailAddress::try_new("hen@farm.test".to_string()).unwrap(),
                DisplayName::try_new("Hen".to_string()).unwrap(),
                Role::Client,
            )
            .await
            .unwrap();

        assert_eq!(market.authenticate(&token).await.unwrap(), user);
        assert!(matches!(
            market.authenticate(&ApiToken::generate()).await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_only_vendors_create_listings() {
        let market = marketplace();
        let client = user(&market, "client@farm.test", Role::Client).await;
        let result = market.create_product(&client, draft("Leeks", 300, 3)).await;
        assert!(matches!(result, Err(Error::Forbidden)));
    }

    #[tokio::test]
    async fn test_vendors_cannot_touch_other_vendors_products() {
        let market = marketplace();
        let owner = user(&market, "owner@farm.test", Role::Vendor).await;
        let rival = user(&market, "rival@farm.test", Role::Vendor).await;
        let product = market
            .create_product(&owner, draft("Pears", 400, 6))
            .await
            .unwrap();

        let patch = ProductPatch {
            stock: Some(crate::domain::StockLevel::new(0)),
            ..ProductPatch::default()
        };
        assert!(matches!(
            market.update_product(&rival, product.id, patch).await,
            Err(Error::Forbidden)
        ));
        assert!(matches!(
            market.delete_product(&rival, product.id).await,
            Err(Error::Forbidden)
        ));

        let stored = market.product(None, product.id).await.unwrap();
        assert_eq!(stored.stock.into_inner(), 6);
    }

    #[tokio::test]
    async fn test_inactive_products_are_hidden_from_the_public() {
        let market = marketplace();
        let owner = user(&market, "owner@farm.test", Role::Vendor).await;
        let product = market
            .create_product(&owner, draft("Quince", 500, 2))
            .await
            .unwrap();
        market
            .update_product(
                &owner,
                product.id,
                ProductPatch {
                    is_active: Some(false),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            market.product(None, product.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(market.product(Some(&owner), product.id).await.is_ok());

        let public = market
            .list_products(None, ProductQuery::default())
            .await
            .unwrap();
        assert!(public.is_empty());
        let own = market
            .list_products(
                Some(&owner),
                ProductQuery {
                    vendor_id: Some(owner.id),
                    ..ProductQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_update_is_not_found() {
        let market = marketplace();
        let owner = user(&market, "owner@farm.test", Role::Vendor).await;
        let result = market
            .update_product(&owner, ProductId::generate(), ProductPatch::default())
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
