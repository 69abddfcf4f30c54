//! Order commands.

use common::{CustomerId, Money, PaymentMethod, ProductId};

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub discount_percent: Option<u8>,
}

/// Command to create a new order.
///
/// Names and prices are not part of the command; they are captured from
/// the catalog when the order is created.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Requested products and quantities.
    pub lines: Vec<OrderLine>,

    /// Order-level discount.
    pub discount: Money,

    pub payment_method: PaymentMethod,

    pub notes: Option<String>,
}

impl CreateOrder {
    /// Creates an empty command for a customer.
    pub fn for_customer(customer_id: impl Into<CustomerId>) -> Self {
        Self {
            customer_id: customer_id.into(),
            lines: Vec::new(),
            discount: Money::zero(),
            payment_method: PaymentMethod::default(),
            notes: None,
        }
    }

    /// Creates an empty command for an unregistered customer.
    pub fn walk_in() -> Self {
        Self::for_customer(CustomerId::walk_in())
    }

    /// Adds a line.
    pub fn item(mut self, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        self.lines.push(OrderLine {
            product_id: product_id.into(),
            quantity,
            discount_percent: None,
        });
        self
    }

    /// Adds a line with a percentage discount on its revenue.
    pub fn discounted_item(
        mut self,
        product_id: impl Into<ProductId>,
        quantity: u32,
        discount_percent: u8,
    ) -> Self {
        self.lines.push(OrderLine {
            product_id: product_id.into(),
            quantity,
            discount_percent: Some(discount_percent),
        });
        self
    }

    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Changes to a pending order, applied together or not at all.
#[derive(Debug, Clone, Default)]
pub struct ModifyOrder {
    pub discount: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl ModifyOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.discount.is_none() && self.payment_method.is_none() && self.notes.is_none()
    }
}
