//! Multi-record marketplace transactions, independent of storage
//!
//! Stores load and lock the records involved, run one of these functions on
//! the loaded copies, and persist the result only when it returns `Ok`. A
//! returned error means nothing may be written.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::application::store::{EventReservationRequest, OrderRequest, ServiceBookingRequest};
use crate::domain::{
    merge_cart, DomainError, FarmEvent, Order, OrderItem, OrderStatus, Payment, PaymentMethod,
    PaymentSubject, Product, ProductId, Reservation, ReservationTarget, ServiceListing, TimeSlot,
    TransactionReference, UserId,
};
use crate::{Error, Result};

/// Validate a cart against the locked products and build the order
///
/// Stock is decremented on the entries of `products`; the caller writes them
/// back together with the returned order and payment.
pub fn checkout(
    request: &OrderRequest,
    products: &mut HashMap<ProductId, Product>,
) -> Result<(Order, Payment)> {
    let lines = merge_cart(&request.lines)?;

    let mut vendor_id = None;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = products
            .get_mut(&line.product_id)
            .ok_or_else(|| Error::not_found(format!("product {}", line.product_id)))?;

        match vendor_id {
            None => vendor_id = Some(product.vendor_id),
            Some(vendor) if vendor != product.vendor_id => {
                return Err(DomainError::MixedVendors.into())
            }
            Some(_) => {}
        }

        product.reserve_stock(line.quantity)?;
        items.push(OrderItem::from_product(product, line.quantity));
    }

    let vendor_id = vendor_id.ok_or(DomainError::EmptyOrder)?;
    let order = Order::place(request.client_id, vendor_id, items, request.note.clone())?;
    let payment = Payment::new(
        PaymentSubject::Order(order.id),
        request.client_id,
        order.total,
        request.method,
    );
    Ok((order, payment))
}

/// Cancel a pending order and put its stock back
///
/// Products that were deleted since the order was placed are skipped.
pub fn cancel_order(
    order: &mut Order,
    payment: &mut Payment,
    products: &mut HashMap<ProductId, Product>,
    actor: UserId,
) -> Result<()> {
    if !order.can_be_cancelled_by(&actor) {
        return Err(Error::Forbidden);
    }

    order.cancel()?;
    for item in &order.items {
        if let Some(product) = products.get_mut(&item.product_id) {
            product.release_stock(item.quantity);
        }
    }
    payment.void();
    Ok(())
}

/// Vendor-driven status change; cancellation has its own path
pub fn advance_order(order: &mut Order, actor: UserId, next: OrderStatus) -> Result<()> {
    if order.vendor_id != actor {
        return Err(Error::Forbidden);
    }
    if next == OrderStatus::Cancelled {
        return Err(Error::invalid_input("status"));
    }
    order.transition_to(next)?;
    Ok(())
}

pub fn settle_payment(
    payment: &mut Payment,
    payer: UserId,
    reference: TransactionReference,
) -> Result<()> {
    if payment.payer_id != payer {
        return Err(Error::Forbidden);
    }
    payment.complete(reference)?;
    Ok(())
}

/// Free reservations carry no payment record
fn reservation_payment(reservation: &Reservation, method: PaymentMethod) -> Option<Payment> {
    (!reservation.total.is_zero()).then(|| {
        Payment::new(
            PaymentSubject::Reservation(reservation.id),
            reservation.client_id,
            reservation.total,
            method,
        )
    })
}

pub fn reserve_event(
    request: &EventReservationRequest,
    event: &mut FarmEvent,
    now: DateTime<Utc>,
) -> Result<(Reservation, Option<Payment>)> {
    let reservation = Reservation::for_event(request.client_id, event, request.seats, now)?;
    let payment = reservation_payment(&reservation, request.method);
    Ok((reservation, payment))
}

pub fn book_service(
    request: &ServiceBookingRequest,
    service: &ServiceListing,
    booked: &[TimeSlot],
    now: DateTime<Utc>,
) -> Result<(Reservation, Option<Payment>)> {
    if !service.is_active {
        return Err(Error::conflict(format!(
            "service {} is not accepting bookings",
            service.id
        )));
    }
    let reservation =
        Reservation::for_service(request.client_id, service, request.starts_at, booked, now)?;
    let payment = reservation_payment(&reservation, request.method);
    Ok((reservation, payment))
}

/// Cancel a reservation, giving seats back to the event when it has one
pub fn cancel_reservation(
    reservation: &mut Reservation,
    payment: Option<&mut Payment>,
    event: Option<&mut FarmEvent>,
    actor: UserId,
) -> Result<()> {
    if !reservation.can_be_cancelled_by(&actor) {
        return Err(Error::Forbidden);
    }

    reservation.cancel()?;
    if let (ReservationTarget::Event { seats, .. }, Some(event)) = (reservation.target, event) {
        event.release_seats(seats);
    }
    if let Some(payment) = payment {
        payment.void();
    }
    Ok(())
}

/// Check that `owner` may delete an event right now
///
/// Events with reserved seats stay; the vendor has to cancel them first.
pub fn check_event_removal(event: &FarmEvent, owner: UserId) -> Result<()> {
    if !event.is_owned_by(&owner) {
        return Err(Error::Forbidden);
    }
    if event.seats_reserved > 0 {
        return Err(Error::conflict(format!(
            "event {} has {} reserved seats",
            event.id, event.seats_reserved
        )));
    }
    Ok(())
}

/// Check that `owner` may delete a service, given its upcoming confirmed slots
pub fn check_service_removal(
    service: &ServiceListing,
    owner: UserId,
    upcoming: &[TimeSlot],
) -> Result<()> {
    if !service.is_owned_by(&owner) {
        return Err(Error::Forbidden);
    }
    if !upcoming.is_empty() {
        return Err(Error::conflict(format!(
            "service {} has upcoming bookings; deactivate it instead",
            service.id
        )));
    }
    Ok(())
}
