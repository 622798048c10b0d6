//! Vendor sales overview computed from orders and the vendor's catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::DomainError;
use crate::domain::identifiers::ProductId;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::product::Product;
use crate::domain::types::{Money, StockLevel, Title};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub product_id: ProductId,
    pub name: Title,
    pub stock: StockLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDashboard {
    pub orders_by_status: BTreeMap<String, u64>,
    /// Sum of all orders that were not cancelled
    pub gross_revenue: Money,
    /// Sum of orders the vendor has not yet confirmed
    pub pending_revenue: Money,
    pub active_products: u64,
    pub low_stock: Vec<LowStockProduct>,
}

impl VendorDashboard {
    /// Fails with `AmountOverflow` when a revenue sum leaves the decimal range.
    pub fn from_orders(
        orders: &[Order],
        products: &[Product],
        low_stock_threshold: u32,
    ) -> Result<Self, DomainError> {
        let mut orders_by_status: BTreeMap<String, u64> = OrderStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();

        let mut gross_revenue = Money::zero();
        let mut pending_revenue = Money::zero();
        for order in orders {
            *orders_by_status
                .entry(order.status.as_str().to_string())
                .or_default() += 1;

            if order.status == OrderStatus::Cancelled {
                continue;
            }
            gross_revenue = gross_revenue
                .checked_add(order.total)
                .ok_or(DomainError::AmountOverflow)?;
            if order.status == OrderStatus::Pending {
                pending_revenue = pending_revenue
                    .checked_add(order.total)
                    .ok_or(DomainError::AmountOverflow)?;
            }
        }

        let active: Vec<&Product> = products.iter().filter(|p| p.is_active).collect();
        let mut low_stock: Vec<LowStockProduct> = active
            .iter()
            .filter(|p| p.stock.into_inner() < low_stock_threshold)
            .map(|p| LowStockProduct {
                product_id: p.id,
                name: p.name.clone(),
                stock: p.stock,
            })
            .collect();
        low_stock.sort_by_key(|p| p.stock);

        Ok(Self {
            orders_by_status,
            gross_revenue,
            pending_revenue,
            active_products: active.len() as u64,
            low_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identifiers::UserId;
    use crate::domain::order::OrderItem;
    use crate::domain::product::test_support::draft;
    use crate::domain::product::ProductPatch;
    use crate::domain::types::Quantity;
    use rust_decimal::Decimal;

    #[test]
    fn test_dashboard_counts_and_revenue() {
        let vendor = UserId::generate();
        let apples = Product::new(vendor, draft("Apples", 100, 2));
        let pears = Product::new(vendor, draft("Pears", 200, 40));
        let mut hidden = Product::new(vendor, draft("Quince", 300, 0));
        hidden.apply_update(ProductPatch {
            is_active: Some(false),
            ..ProductPatch::default()
        });

        let place = |product: &Product, n: u32| {
            Order::place(
                UserId::generate(),
                vendor,
                vec![OrderItem::from_product(product, Quantity::try_new(n).unwrap())],
                None,
            )
            .unwrap()
        };

        let pending = place(&apples, 1);
        let mut confirmed = place(&apples, 3);
        confirmed.transition_to(OrderStatus::Confirmed).unwrap();
        let mut delivered = place(&pears, 2);
        delivered.transition_to(OrderStatus::Confirmed).unwrap();
        delivered.transition_to(OrderStatus::Shipped).unwrap();
        delivered.transition_to(OrderStatus::Delivered).unwrap();
        let mut cancelled = place(&pears, 5);
        cancelled.cancel().unwrap();

        let dashboard = VendorDashboard::from_orders(
            &[pending, confirmed, delivered, cancelled],
            &[apples.clone(), pears, hidden],
            5,
        )
        .unwrap();

        assert_eq!(dashboard.orders_by_status["pending"], 1);
        assert_eq!(dashboard.orders_by_status["confirmed"], 1);
        assert_eq!(dashboard.orders_by_status["delivered"], 1);
        assert_eq!(dashboard.orders_by_status["cancelled"], 1);
        assert_eq!(dashboard.orders_by_status["shipped"], 0);
        assert_eq!(dashboard.gross_revenue.into_inner(), Decimal::new(800, 2));
        assert_eq!(dashboard.pending_revenue.into_inner(), Decimal::new(100, 2));
        assert_eq!(dashboard.active_products, 2);
        assert_eq!(dashboard.low_stock.len(), 1);
        assert_eq!(dashboard.low_stock[0].product_id, apples.id);
    }

    #[test]
    fn test_revenue_past_the_decimal_range_is_an_error() {
        let vendor = UserId::generate();
        let mut costly = draft("Prize bull", 100, 10);
        costly.price = Money::try_new(Decimal::MAX).unwrap();
        let bull = Product::new(vendor, costly);
        let order = Order::place(
            UserId::generate(),
            vendor,
            vec![OrderItem::from_product(&bull, Quantity::try_new(1).unwrap())],
            None,
        )
        .unwrap();

        let result = VendorDashboard::from_orders(&[order.clone(), order], &[bull], 5);

        assert_eq!(result, Err(DomainError::AmountOverflow));
    }
}
