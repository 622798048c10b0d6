//! Stocked goods listed by vendors
//!
//! Stock is only ever changed through [`Product::reserve_stock`] and
//! [`Product::release_stock`], so every store applies the same rules when an
//! order is placed or cancelled.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::DomainError;
use crate::domain::identifiers::{ProductId, UserId};
use crate::domain::types::{Category, Description, ImageUrl, Money, Quantity, StockLevel, Title};

/// Unit a product is priced and stocked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[display("each")]
    Each,
    #[display("kilogram")]
    Kilogram,
    #[display("pound")]
    Pound,
    #[display("dozen")]
    Dozen,
    #[display("bunch")]
    Bunch,
    #[display("liter")]
    Liter,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Each => "each",
            Self::Kilogram => "kilogram",
            Self::Pound => "pound",
            Self::Dozen => "dozen",
            Self::Bunch => "bunch",
            Self::Liter => "liter",
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "each" => Ok(Self::Each),
            "kilogram" => Ok(Self::Kilogram),
            "pound" => Ok(Self::Pound),
            "dozen" => Ok(Self::Dozen),
            "bunch" => Ok(Self::Bunch),
            "liter" => Ok(Self::Liter),
            other => Err(format!("unknown unit: {other}")),
        }
    }
}

/// Validated fields for a new product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: Title,
    pub description: Description,
    pub category: Category,
    pub unit: Unit,
    pub price: Money,
    pub stock: StockLevel,
    pub image_urls: Vec<ImageUrl>,
}

/// Partial update to a product; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<Title>,
    pub description: Option<Description>,
    pub category: Option<Category>,
    pub unit: Option<Unit>,
    pub price: Option<Money>,
    pub stock: Option<StockLevel>,
    pub image_urls: Option<Vec<ImageUrl>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: UserId,
    pub name: Title,
    pub description: Description,
    pub category: Category,
    pub unit: Unit,
    pub price: Money,
    pub stock: StockLevel,
    pub image_urls: Vec<ImageUrl>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(vendor_id: UserId, draft: ProductDraft) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::generate(),
            vendor_id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            unit: draft.unit,
            price: draft.price,
            stock: draft.stock,
            image_urls: draft.image_urls,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.vendor_id == user_id
    }

    pub fn apply_update(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(image_urls) = patch.image_urls {
            self.image_urls = image_urls;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }

    /// Take `quantity` units out of stock for an order
    pub fn reserve_stock(&mut self, quantity: Quantity) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::ProductUnavailable(self.id));
        }

        let available = self.stock.into_inner();
        let requested = quantity.into_inner();
        if available < requested {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested,
                available,
            });
        }

        self.stock = StockLevel::new(available - requested);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Put `quantity` units back into stock after a cancellation
    pub fn release_stock(&mut self, quantity: Quantity) {
        self.stock = StockLevel::new(self.stock.into_inner().saturating_add(quantity.into_inner()));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rust_decimal::Decimal;

    pub fn draft(name: &str, price_cents: i64, stock: u32) -> ProductDraft {
        ProductDraft {
            name: Title::try_new(name.to_string()).unwrap(),
            description: Description::default(),
            category: Category::try_new("vegetables".to_string()).unwrap(),
            unit: Unit::Kilogram,
            price: Money::try_new(Decimal::new(price_cents, 2)).unwrap(),
            stock: StockLevel::new(stock),
            image_urls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::draft;
    use super::*;

    fn qty(n: u32) -> Quantity {
        Quantity::try_new(n).unwrap()
    }

    #[test]
    fn test_reserve_stock_decrements_exactly() {
        let mut product = Product::new(UserId::generate(), draft("Carrots", 300, 10));
        product.reserve_stock(qty(4)).unwrap();
        assert_eq!(product.stock.into_inner(), 6);
    }

    #[test]
    fn test_reserve_stock_rejects_overdraw_without_changes() {
        let mut product = Product::new(UserId::generate(), draft("Carrots", 300, 3));
        let result = product.reserve_stock(qty(4));

        assert_eq!(
            result,
            Err(DomainError::InsufficientStock {
                product_id: product.id,
                requested: 4,
                available: 3,
            })
        );
        assert_eq!(product.stock.into_inner(), 3);
    }

    #[test]
    fn test_inactive_products_cannot_be_reserved() {
        let mut product = Product::new(UserId::generate(), draft("Kale", 250, 10));
        product.apply_update(ProductPatch {
            is_active: Some(false),
            ..ProductPatch::default()
        });

        assert_eq!(
            product.reserve_stock(qty(1)),
            Err(DomainError::ProductUnavailable(product.id))
        );
    }

    #[test]
    fn test_release_restores_stock() {
        let mut product = Product::new(UserId::generate(), draft("Eggs", 600, 12));
        product.reserve_stock(qty(5)).unwrap();
        product.release_stock(qty(5));
        assert_eq!(product.stock.into_inner(), 12);
    }

    #[test]
    fn test_partial_update_leaves_other_fields() {
        let mut product = Product::new(UserId::generate(), draft("Honey", 1200, 8));
        let original_price = product.price;
        product.apply_update(ProductPatch {
            name: Some(Title::try_new("Wildflower Honey".to_string()).unwrap()),
            ..ProductPatch::default()
        });

        assert_eq!(product.name.as_ref(), "Wildflower Honey");
        assert_eq!(product.price, original_price);
        assert_eq!(product.stock.into_inner(), 8);
    }

    #[test]
    fn test_ownership() {
        let vendor = UserId::generate();
        let product = Product::new(vendor, draft("Apples", 199, 1));
        assert!(product.is_owned_by(&vendor));
        assert!(!product.is_owned_by(&UserId::generate()));
    }

    #[test]
    fn test_unit_names_parse_back() {
        for unit in [
            Unit::Each,
            Unit::Kilogram,
            Unit::Pound,
            Unit::Dozen,
            Unit::Bunch,
            Unit::Liter,
        ] {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
    }
}
