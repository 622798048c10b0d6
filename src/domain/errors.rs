//! Business rule violations raised by domain entities

use thiserror::Error;

use crate::domain::identifiers::ProductId;

/// A marketplace rule was broken by the requested operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Product {0} is not available for ordering")]
    ProductUnavailable(ProductId),

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Not enough seats: requested {requested}, available {available}")]
    CapacityExceeded { requested: u32, available: u32 },

    #[error("Capacity {capacity} is below the {reserved} seats already reserved")]
    CapacityBelowReserved { capacity: u32, reserved: u32 },

    #[error("The requested time slot is already booked")]
    SlotUnavailable,

    #[error("Cannot reserve an event or service slot that starts in the past")]
    StartsInPast,

    #[error("Schedule must end after it starts and within the supported time range")]
    InvalidSchedule,

    #[error("An order needs at least one item")]
    EmptyOrder,

    #[error("Quantity {requested} of product {product_id} exceeds the per-line limit of {limit}")]
    QuantityTooLarge {
        product_id: ProductId,
        requested: u32,
        limit: u32,
    },

    #[error("All items in an order must come from the same vendor")]
    MixedVendors,

    #[error("Amount overflowed while computing a total")]
    AmountOverflow,
}

impl DomainError {
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
