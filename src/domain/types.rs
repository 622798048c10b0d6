//! Validated value types shared by marketplace listings
//!
//! This module provides newtypes for common domain concepts to avoid
//! primitive obsession and ensure validation at boundaries.

use nutype::nutype;
use rust_decimal::Decimal;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

/// Name of a product, service or event
///
/// Limited to 120 characters so listings render on a single card line.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 120),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Title(String);

/// Free-form listing description, may be empty
#[nutype(
    sanitize(trim),
    validate(len_char_max = 5000),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display, Default),
    default = ""
)]
pub struct Description(String);

/// Where a farm, service or event is located
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct Location(String);

/// Product category, normalized to lowercase for filtering
#[nutype(
    sanitize(trim, lowercase),
    validate(not_empty, len_char_max = 60),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Category(String);

/// Publicly reachable image location
#[nutype(
    sanitize(trim),
    validate(
        len_char_max = 2048,
        predicate = |url| url.starts_with("https://") || url.starts_with("http://")
    ),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct ImageUrl(String);

/// Note left by a client on an order
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 1000),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct OrderNote(String);

/// External reference for a settled payment (card authorization, transfer id)
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct TransactionReference(String);

/// A non-negative amount of money with at most two decimal places
#[nutype(
    validate(predicate = |amount| !amount.is_sign_negative() && amount.normalize().scale() <= 2),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Self::try_new(Decimal::ZERO).unwrap_or_else(|_| unreachable!("zero is a valid amount"))
    }

    /// Price of `quantity` units at this unit price
    pub fn times(self, quantity: u32) -> Option<Self> {
        self.into_inner()
            .checked_mul(Decimal::from(quantity))
            .and_then(|total| Self::try_new(total).ok())
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.into_inner()
            .checked_add(other.into_inner())
            .and_then(|total| Self::try_new(total).ok())
    }

    pub fn is_zero(&self) -> bool {
        self.as_ref().is_zero()
    }
}

/// Units of a product in a single order line or seats in a reservation
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 10000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Quantity(u32);

/// Units of a product currently on hand
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRef,
    Display,
    Default
), default = 0)]
pub struct StockLevel(u32);

/// Maximum number of seats an event can hold
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 100000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Capacity(u32);

/// Length of a bookable service
#[nutype(
    validate(greater_or_equal = 15, less_or_equal = 1440),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct DurationMinutes(u32);

/// Error message
///
/// Limited to 5000 characters to capture detailed error information
/// while preventing excessive log/storage usage.
#[nutype(
    validate(not_empty, len_char_max = 5000),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct ErrorMessage(String);

/// Name of an input field that failed validation
#[nutype(
    validate(not_empty, len_char_max = 100),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct FieldName(String);

/// Description of a resource that could not be found
#[nutype(
    validate(not_empty, len_char_max = 200),
    derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRef, Display)
)]
pub struct ResourceId(String);
