//! Domain error types.

use chrono::NaiveDate;
use common::{OrderId, OrderStatus, ProductId, ValidationError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during catalog, inventory and order operations.
///
/// Callers branch on the variant; the message is for logs and humans.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An identifier or barcode is already taken.
    #[error("{entity} already exists: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    /// Input failed validation before anything was mutated.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A sale asked for more units than are on hand.
    #[error(
        "Insufficient stock for {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A restock would push stock above the product's maximum level.
    #[error(
        "Restocking {product_id} by {requested} exceeds max stock level {max} (current {current})"
    )]
    CapacityExceeded {
        product_id: ProductId,
        requested: u32,
        current: u32,
        max: u32,
    },

    /// The product's expiry date has passed.
    #[error("Cannot sell expired product {product_id} (expired {expiry_date})")]
    ExpiredProduct {
        product_id: ProductId,
        expiry_date: NaiveDate,
    },

    /// The order's status does not allow the requested transition.
    #[error("Cannot {action} order {order_id} in {status} state")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        action: &'static str,
    },

    /// The persistence port failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The customer purchase ledger failed.
    #[error("Customer ledger error: {0}")]
    CustomerLedger(String),
}

impl DomainError {
    pub fn product_not_found(id: &ProductId) -> Self {
        DomainError::NotFound {
            entity: "Product",
            id: id.to_string(),
        }
    }

    pub fn order_not_found(id: &OrderId) -> Self {
        DomainError::NotFound {
            entity: "Order",
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

impl From<ValidationError> for DomainError {
    fn from(e: ValidationError) -> Self {
        DomainError::Validation(e.message().to_string())
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
