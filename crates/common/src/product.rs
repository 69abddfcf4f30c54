//! Product record held by the catalog.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Money, ProductId, ValidationError};

/// A cataloged product and its current stock position.
///
/// Stock counters (`quantity_in_stock`, `quantity_sold`, `last_restocked`) are
/// owned by the inventory engine; everything else is descriptive data that
/// catalog updates may replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub barcode: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub quantity_in_stock: u32,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
    #[serde(default)]
    pub perishable: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub quantity_sold: u64,
    #[serde(default)]
    pub last_restocked: Option<NaiveDate>,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl Product {
    pub const DEFAULT_MIN_STOCK: u32 = 10;
    pub const DEFAULT_MAX_STOCK: u32 = 100;
    /// Highest accepted unit price ($10,000,000.00). A full `u32` of stock at
    /// this price still fits in `i64` cents.
    pub const MAX_PRICE: Money = Money::from_cents(1_000_000_000);

    /// Creates a product with no stock and the default reorder window.
    pub fn new(
        id: impl Into<ProductId>,
        barcode: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        purchase_price: Money,
        selling_price: Money,
    ) -> Self {
        Self {
            id: id.into(),
            barcode: barcode.into(),
            name: name.into(),
            category: category.into(),
            description: None,
            purchase_price,
            selling_price,
            quantity_in_stock: 0,
            min_stock_level: Self::DEFAULT_MIN_STOCK,
            max_stock_level: Self::DEFAULT_MAX_STOCK,
            perishable: false,
            expiry_date: None,
            quantity_sold: 0,
            last_restocked: None,
            supplier_id: None,
            location: None,
            unit: None,
        }
    }

    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.quantity_in_stock = quantity;
        self
    }

    pub fn with_levels(mut self, min: u32, max: u32) -> Self {
        self.min_stock_level = min;
        self.max_stock_level = max;
        self
    }

    /// Marks the product perishable with an optional initial expiry date.
    pub fn perishable(mut self, expiry_date: Option<NaiveDate>) -> Self {
        self.perishable = true;
        self.expiry_date = expiry_date;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_supplier(mut self, supplier_id: impl Into<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Checks the price and stock-level relationships.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::new("product id is required"));
        }
        if self.barcode.trim().is_empty() {
            return Err(ValidationError::new("barcode is required"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("product name is required"));
        }
        if self.purchase_price.is_negative() {
            return Err(ValidationError::new("purchase price cannot be negative"));
        }
        if self.selling_price > Self::MAX_PRICE {
            return Err(ValidationError::new(format!(
                "selling price {} exceeds the maximum of {}",
                self.selling_price,
                Self::MAX_PRICE
            )));
        }
        if self.selling_price < self.purchase_price {
            return Err(ValidationError::new(format!(
                "selling price {} is below purchase price {}",
                self.selling_price, self.purchase_price
            )));
        }
        if self.max_stock_level <= self.min_stock_level {
            return Err(ValidationError::new(format!(
                "max stock level {} must exceed min stock level {}",
                self.max_stock_level, self.min_stock_level
            )));
        }
        Ok(())
    }

    /// Returns true when stock is at or below the reorder threshold.
    pub fn needs_reorder(&self) -> bool {
        self.quantity_in_stock <= self.min_stock_level
    }

    /// A product is expired once its expiry date lies strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Perishable, not yet expired, and expiring on or before `today + days`.
    pub fn expires_within(&self, today: NaiveDate, days: u32) -> bool {
        let Some(expiry) = self.expiry_date else {
            return false;
        };
        let horizon = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        self.perishable && !self.is_expired(today) && expiry <= horizon
    }

    /// Stock valued at purchase price.
    pub fn stock_value(&self) -> Money {
        self.purchase_price.multiply(self.quantity_in_stock)
    }

    /// Stock valued at selling price.
    pub fn potential_revenue(&self) -> Money {
        self.selling_price.multiply(self.quantity_in_stock)
    }

    pub fn unit_margin(&self) -> Money {
        self.selling_price - self.purchase_price
    }

    /// Case-insensitive substring match over the searchable fields.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [
            Some(self.name.as_str()),
            Some(self.category.as_str()),
            self.description.as_deref(),
            Some(self.id.as_str()),
            Some(self.barcode.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}
