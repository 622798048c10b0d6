//! Process-local marketplace storage
//!
//! A single `RwLock` guards all state, so every multi-record operation runs
//! under one write guard and is applied to cloned records that are written
//! back only on success.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::store::{
    CatalogStore, EventChange, EventQuery, EventReservationRequest, MarketplaceStore, OrderRequest,
    OrderStore, Page, ProductChange, ProductQuery, ReservationStore, ServiceBookingRequest,
    ServiceChange, ServiceQuery, UserStore,
};
use crate::application::transactions;
use crate::domain::{
    EventId, FarmEvent, Order, OrderId, OrderStatus, Payment, PaymentSubject, Product, ProductId,
    Reservation, ReservationId, ReservationTarget, ServiceId, ServiceListing, TimeSlot,
    TokenDigest, TransactionReference, User, UserId, VendorProfile,
};
use crate::{Error, Result};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    tokens: HashMap<TokenDigest, UserId>,
    profiles: BTreeMap<UserId, VendorProfile>,
    products: BTreeMap<ProductId, Product>,
    services: BTreeMap<ServiceId, ServiceListing>,
    events: BTreeMap<EventId, FarmEvent>,
    orders: BTreeMap<OrderId, Order>,
    payments: HashMap<PaymentSubject, Payment>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl State {
    fn payment(&self, subject: PaymentSubject) -> Result<Payment> {
        self.payments
            .get(&subject)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("payment for {subject:?}")))
    }

    fn booked_slots(&self, service_id: ServiceId, after: DateTime<Utc>) -> Vec<TimeSlot> {
        self.reservations
            .values()
            .filter(|r| r.is_confirmed())
            .filter_map(|r| match r.target {
                ReservationTarget::Service { service_id: id, slot }
                    if id == service_id && slot.ends_at > after =>
                {
                    Some(slot)
                }
                _ => None,
            })
            .collect()
    }
}

/// In-memory implementation of [`MarketplaceStore`]
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, windowed by `page`
fn newest_first<'a, T: Clone + 'a>(
    items: impl DoubleEndedIterator<Item = &'a T>,
    page: Page,
) -> Vec<T> {
    page.apply(items.rev().cloned())
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User, token: &TokenDigest) -> Result<()> {
        let mut state = self.state.write().await;
        let email = user.email.as_ref().to_string();
        if state.emails.contains_key(&email) {
            return Err(Error::conflict(format!("email {email} is already registered")));
        }

        state.emails.insert(email, user.id);
        state.tokens.insert(token.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_token(&self, token: &TokenDigest) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .tokens
            .get(token)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn upsert_vendor_profile(&self, profile: &VendorProfile) -> Result<()> {
        let mut state = self.state.write().await;
        state.profiles.insert(profile.vendor_id, profile.clone());
        Ok(())
    }

    async fn find_vendor_profile(&self, vendor_id: UserId) -> Result<Option<VendorProfile>> {
        Ok(self.state.read().await.profiles.get(&vendor_id).cloned())
    }

    async fn list_vendor_profiles(&self, page: Page) -> Result<Vec<VendorProfile>> {
        let state = self.state.read().await;
        Ok(page.apply(state.profiles.values().cloned()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, id: ProductId, change: ProductChange) -> Result<Product> {
        let mut state = self.state.write().await;
        let mut product = state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("product {id}")))?;
        change(&mut product)?;
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.state.write().await.products.remove(&id).is_some())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let matching: Vec<&Product> = state
            .products
            .values()
            .filter(|p| query.matches(p))
            .collect();
        Ok(newest_first(matching.into_iter(), query.page))
    }

    async fn insert_service(&self, service: &ServiceListing) -> Result<()> {
        let mut state = self.state.write().await;
        state.services.insert(service.id, service.clone());
        Ok(())
    }

    async fn update_service(&self, id: ServiceId, change: ServiceChange) -> Result<ServiceListing> {
        let mut state = self.state.write().await;
        let mut service = state
            .services
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("service {id}")))?;
        change(&mut service)?;
        state.services.insert(id, service.clone());
        Ok(service)
    }

    async fn delete_service(&self, id: ServiceId, owner: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        let service = state
            .services
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("service {id}")))?;
        let upcoming = state.booked_slots(id, Utc::now());
        transactions::check_service_removal(service, owner, &upcoming)?;
        state.services.remove(&id);
        Ok(())
    }

    async fn find_service(&self, id: ServiceId) -> Result<Option<ServiceListing>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }

    async fn list_services(&self, query: &ServiceQuery) -> Result<Vec<ServiceListing>> {
        let state = self.state.read().await;
        let matching: Vec<&ServiceListing> = state
            .services
            .values()
            .filter(|s| query.matches(s))
            .collect();
        Ok(newest_first(matching.into_iter(), query.page))
    }

    async fn insert_event(&self, event: &FarmEvent) -> Result<()> {
        let mut state = self.state.write().await;
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, id: EventId, change: EventChange) -> Result<FarmEvent> {
        let mut state = self.state.write().await;
        let mut event = state
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("event {id}")))?;
        change(&mut event)?;
        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn delete_event(&self, id: EventId, owner: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        let event = state
            .events
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("event {id}")))?;
        transactions::check_event_removal(event, owner)?;
        state.events.remove(&id);
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<FarmEvent>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self, query: &EventQuery) -> Result<Vec<FarmEvent>> {
        let state = self.state.read().await;
        let mut matching: Vec<&FarmEvent> =
            state.events.values().filter(|e| query.matches(e)).collect();
        matching.sort_by_key(|e| (e.starts_at, e.id));
        Ok(query.page.apply(matching.into_iter().cloned()))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, request: &OrderRequest) -> Result<(Order, Payment)> {
        let mut state = self.state.write().await;
        let mut products: HashMap<ProductId, Product> = request
            .lines
            .iter()
            .filter_map(|line| state.products.get(&line.product_id))
            .map(|product| (product.id, product.clone()))
            .collect();

        let (order, payment) = transactions::checkout(request, &mut products)?;

        state.products.extend(products);
        state.payments.insert(payment.subject, payment.clone());
        state.orders.insert(order.id, order.clone());
        Ok((order, payment))
    }

    async fn cancel_order(&self, id: OrderId, actor: UserId) -> Result<(Order, Payment)> {
        let mut state = self.state.write().await;
        let mut order = state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("order {id}")))?;
        let mut payment = state.payment(PaymentSubject::Order(id))?;
        let mut products: HashMap<ProductId, Product> = order
            .items
            .iter()
            .filter_map(|item| state.products.get(&item.product_id))
            .map(|product| (product.id, product.clone()))
            .collect();

        transactions::cancel_order(&mut order, &mut payment, &mut products, actor)?;

        state.products.extend(products);
        state.payments.insert(payment.subject, payment.clone());
        state.orders.insert(order.id, order.clone());
        Ok((order, payment))
    }

    async fn advance_order(
        &self,
        id: OrderId,
        actor: UserId,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        let mut order = state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("order {id}")))?;

        transactions::advance_order(&mut order, actor, next)?;

        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_client(&self, client_id: UserId, page: Page) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.client_id == client_id)
            .collect();
        Ok(newest_first(matching.into_iter(), page))
    }

    async fn list_orders_for_vendor(&self, vendor_id: UserId, page: Page) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.vendor_id == vendor_id)
            .collect();
        Ok(newest_first(matching.into_iter(), page))
    }

    async fn find_payment(&self, subject: PaymentSubject) -> Result<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&subject).cloned())
    }

    async fn settle_payment(
        &self,
        subject: PaymentSubject,
        payer: UserId,
        reference: TransactionReference,
    ) -> Result<Payment> {
        let mut state = self.state.write().await;
        let mut payment = state.payment(subject)?;

        transactions::settle_payment(&mut payment, payer, reference)?;

        state.payments.insert(subject, payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn reserve_event(
        &self,
        request: &EventReservationRequest,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut state = self.state.write().await;
        let mut event = state
            .events
            .get(&request.event_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("event {}", request.event_id)))?;

        let (reservation, payment) = transactions::reserve_event(request, &mut event, Utc::now())?;

        state.events.insert(event.id, event);
        if let Some(payment) = &payment {
            state.payments.insert(payment.subject, payment.clone());
        }
        state.reservations.insert(reservation.id, reservation.clone());
        Ok((reservation, payment))
    }

    async fn book_service(
        &self,
        request: &ServiceBookingRequest,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut state = self.state.write().await;
        let service = state
            .services
            .get(&request.service_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("service {}", request.service_id)))?;
        let now = Utc::now();
        let booked = state.booked_slots(service.id, now);

        let (reservation, payment) = transactions::book_service(request, &service, &booked, now)?;

        if let Some(payment) = &payment {
            state.payments.insert(payment.subject, payment.clone());
        }
        state.reservations.insert(reservation.id, reservation.clone());
        Ok((reservation, payment))
    }

    async fn cancel_reservation(
        &self,
        id: ReservationId,
        actor: UserId,
    ) -> Result<(Reservation, Option<Payment>)> {
        let mut state = self.state.write().await;
        let mut reservation = state
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("reservation {id}")))?;
        let mut payment = state
            .payments
            .get(&PaymentSubject::Reservation(id))
            .cloned();
        let mut event = match reservation.target {
            ReservationTarget::Event { event_id, .. } => state.events.get(&event_id).cloned(),
            ReservationTarget::Service { .. } => None,
        };

        transactions::cancel_reservation(
            &mut reservation,
            payment.as_mut(),
            event.as_mut(),
            actor,
        )?;

        if let Some(event) = event {
            state.events.insert(event.id, event);
        }
        if let Some(payment) = &payment {
            state.payments.insert(payment.subject, payment.clone());
        }
        state.reservations.insert(reservation.id, reservation.clone());
        Ok((reservation, payment))
    }

    async fn find_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.state.read().await.reservations.get(&id).cloned())
    }

    async fn list_reservations_for_client(
        &self,
        client_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let matching: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.client_id == client_id)
            .collect();
        Ok(newest_first(matching.into_iter(), page))
    }

    async fn list_reservations_for_vendor(
        &self,
        vendor_id: UserId,
        page: Page,
    ) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let matching: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.vendor_id == vendor_id)
            .collect();
        Ok(newest_first(matching.into_iter(), page))
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
