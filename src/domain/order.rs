//! Orders and their lifecycle
//!
//! An order is placed against a single vendor and moves through
//! `pending → confirmed → shipped → delivered`. Only a pending order may be
//! cancelled; cancellation is what triggers the stock to be put back.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::identifiers::{OrderId, ProductId, UserId};
use crate::domain::product::Product;
use crate::domain::types::{Money, OrderNote, Quantity, Title};
use crate::domain::validation_constants::order::MAX_LINE_QUANTITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[display("pending")]
    Pending,
    #[display("confirmed")]
    Confirmed,
    #[display("shipped")]
    Shipped,
    #[display("delivered")]
    Delivered,
    #[display("cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// One requested cart line before it is matched against the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Merge duplicate product lines, preserving first-seen order
///
/// Fails with `QuantityTooLarge` when the merged lines for one product add
/// up to more than a single line may carry.
pub fn merge_cart(lines: &[CartLine]) -> Result<Vec<CartLine>, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyOrder);
    }

    let mut totals: BTreeMap<ProductId, u32> = BTreeMap::new();
    let mut order = Vec::new();
    for line in lines {
        let entry = totals.entry(line.product_id).or_insert_with(|| {
            order.push(line.product_id);
            0
        });
        *entry = entry.saturating_add(line.quantity.into_inner());
    }

    order
        .into_iter()
        .map(|product_id| {
            let requested = totals.get(&product_id).copied().unwrap_or_default();
            Quantity::try_new(requested)
                .map(|quantity| CartLine {
                    product_id,
                    quantity,
                })
                .map_err(|_| DomainError::QuantityTooLarge {
                    product_id,
                    requested,
                    limit: MAX_LINE_QUANTITY,
                })
        })
        .collect()
}

/// Price and name snapshot of a product at the time it was ordered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: Title,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl OrderItem {
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.times(self.quantity.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: UserId,
    pub vendor_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub note: Option<OrderNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(
        client_id: UserId,
        vendor_id: UserId,
        items: Vec<OrderItem>,
        note: Option<OrderNote>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let total = items.iter().try_fold(Money::zero(), |sum, item| {
            item.line_total()
                .and_then(|line| sum.checked_add(line))
                .ok_or(DomainError::AmountOverflow)
        })?;

        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            client_id,
            vendor_id,
            items,
            total,
            status: OrderStatus::Pending,
            note,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        &self.client_id == user_id || &self.vendor_id == user_id
    }

    pub fn can_be_cancelled_by(&self, user_id: &UserId) -> bool {
        self.is_participant(user_id)
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition("order", self.status, next));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Cancelled)
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .filter(|item| &item.product_id == product_id)
            .map(|item| item.quantity.into_inner())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::test_support::draft;
    use rstest::rstest;
    use rust_decimal::Decimal;

    fn qty(n: u32) -> Quantity {
        Quantity::try_new(n).unwrap()
    }

    fn order_with(items: Vec<(&Product, u32)>) -> Order {
        let vendor = items[0].0.vendor_id;
        let items = items
            .into_iter()
            .map(|(product, n)| OrderItem::from_product(product, qty(n)))
            .collect();
        Order::place(UserId::generate(), vendor, items, None).unwrap()
    }

    #[test]
    fn test_order_total_sums_line_totals() {
        let vendor = UserId::generate();
        let carrots = Product::new(vendor, draft("Carrots", 250, 20));
        let eggs = Product::new(vendor, draft("Eggs", 599, 20));

        let order = order_with(vec![(&carrots, 4), (&eggs, 2)]);
        assert_eq!(order.total.into_inner(), Decimal::new(2198, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.quantity_of(&carrots.id), 4);
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let result = Order::place(UserId::generate(), UserId::generate(), Vec::new(), None);
        assert_eq!(result, Err(DomainError::EmptyOrder));
    }

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed, true)]
    #[case(OrderStatus::Pending, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Confirmed, OrderStatus::Shipped, true)]
    #[case(OrderStatus::Shipped, OrderStatus::Delivered, true)]
    #[case(OrderStatus::Confirmed, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Shipped, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Delivered, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Pending, false)]
    #[case(OrderStatus::Pending, OrderStatus::Delivered, false)]
    fn test_order_state_machine(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_only_pending_orders_cancel() {
        let product = Product::new(UserId::generate(), draft("Milk", 300, 5));
        let mut order = order_with(vec![(&product, 1)]);
        order.transition_to(OrderStatus::Confirmed).unwrap();

        let result = order.cancel();
        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition { entity: "order", .. })
        ));
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[test]
    fn test_merge_cart_combines_duplicate_lines() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let merged = merge_cart(&[
            CartLine { product_id: a, quantity: qty(2) },
            CartLine { product_id: b, quantity: qty(1) },
            CartLine { product_id: a, quantity: qty(3) },
        ])
        .unwrap();

        assert_eq!(
            merged,
            vec![
                CartLine { product_id: a, quantity: qty(5) },
                CartLine { product_id: b, quantity: qty(1) },
            ]
        );
        assert_eq!(merge_cart(&[]), Err(DomainError::EmptyOrder));
    }

    #[test]
    fn test_merged_lines_over_the_line_limit_are_rejected() {
        let a = ProductId::generate();
        let result = merge_cart(&[
            CartLine { product_id: a, quantity: qty(6000) },
            CartLine { product_id: a, quantity: qty(6000) },
        ]);

        assert_eq!(
            result,
            Err(DomainError::QuantityTooLarge {
                product_id: a,
                requested: 12000,
                limit: MAX_LINE_QUANTITY,
            })
        );
    }

    #[test]
    fn test_status_names_parse_back() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
