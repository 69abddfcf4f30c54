//! Order record, line items, and the order status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, Money, OrderId, ProductId, ValidationError};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──process──► Completed ──cancel──► Cancelled
///    │                                           ▲
///    └──────────────────cancel───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created with validated availability; no stock consumed yet.
    #[default]
    Pending,

    /// Stock consumed for every item.
    Completed,

    /// Terminal.
    Cancelled,
}

impl OrderStatus {
    pub fn can_process(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Completed)
    }

    /// Discount, notes and payment method may only change before processing.
    pub fn can_modify(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

/// Sales tax rate in basis points (800 = 8%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    pub const STANDARD: TaxRate = TaxRate(800);

    pub fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    pub fn basis_points(&self) -> u32 {
        self.0
    }

    pub fn tax_on(&self, amount: Money) -> Money {
        amount.apply_rate(self.0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// An item in an order. Name and price are snapshots taken when the order
/// was created and do not follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Line discount percentage (0-100), applied to per-line revenue.
    #[serde(default)]
    pub discount_percent: Option<u8>,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            unit_price,
            quantity,
            discount_percent: None,
        }
    }

    pub fn with_discount_percent(mut self, percent: u8) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    /// Returns quantity * unit_price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Line total after the line discount.
    pub fn net_total(&self) -> Money {
        let gross = self.line_total();
        match self.discount_percent {
            Some(percent) => gross - gross.apply_rate(u32::from(percent) * 100),
            None => gross,
        }
    }
}

/// A customer order.
///
/// `final_amount` is always `subtotal + tax - discount`; every mutator that
/// touches items, discount or tax recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    items: Vec<OrderItem>,
    subtotal: Money,
    tax_rate: TaxRate,
    tax: Money,
    discount: Money,
    final_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Amount credited to the customer ledger at completion.
    #[serde(default)]
    pub recorded_purchase: Option<Money>,
}

impl Order {
    /// Creates a pending order and computes its totals.
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        created_at: DateTime<Utc>,
        items: Vec<OrderItem>,
        tax_rate: TaxRate,
        discount: Money,
    ) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::new("order has no items"));
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(ValidationError::new(format!(
                    "quantity for {} must be greater than 0",
                    item.product_id
                )));
            }
            if item.unit_price.is_negative() {
                return Err(ValidationError::new(format!(
                    "unit price for {} cannot be negative",
                    item.product_id
                )));
            }
            if item.discount_percent.is_some_and(|p| p > 100) {
                return Err(ValidationError::new(format!(
                    "line discount for {} exceeds 100%",
                    item.product_id
                )));
            }
        }

        let mut order = Self {
            id,
            customer_id,
            created_at,
            items,
            subtotal: Money::zero(),
            tax_rate,
            tax: Money::zero(),
            discount: Money::zero(),
            final_amount: Money::zero(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::default(),
            completed_at: None,
            cancelled_at: None,
            notes: None,
            recorded_purchase: None,
        };
        order.set_discount(discount)?;
        Ok(order)
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn final_amount(&self) -> Money {
        self.final_amount
    }

    /// Total number of units across all items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Replaces the order-level discount. The discount may not be negative
    /// nor exceed subtotal + tax.
    pub fn set_discount(&mut self, discount: Money) -> Result<(), ValidationError> {
        if discount.is_negative() {
            return Err(ValidationError::new("discount cannot be negative"));
        }
        let gross = self.checked_gross()?;
        if discount > gross {
            return Err(ValidationError::new(format!(
                "discount {discount} exceeds order total {gross}"
            )));
        }
        self.discount = discount;
        self.recalculate_totals();
        Ok(())
    }

    /// Subtotal plus tax, or an error when the amount does not fit in cents.
    fn checked_gross(&self) -> Result<Money, ValidationError> {
        let overflow = || ValidationError::new("order total is too large");
        let subtotal = self.items.iter().try_fold(Money::zero(), |acc, item| {
            item.unit_price
                .checked_multiply(item.quantity)
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(overflow)
        })?;
        subtotal
            .checked_add(self.tax_rate.tax_on(subtotal))
            .ok_or_else(overflow)
    }

    pub fn recalculate_totals(&mut self) {
        self.subtotal = self.items.iter().map(OrderItem::line_total).sum();
        self.tax = self.tax_rate.tax_on(self.subtotal);
        self.final_amount = self.subtotal + self.tax - self.discount;
    }
}
