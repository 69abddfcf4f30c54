//! Stock movement ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// What caused a stock quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Restock,
    Sale,
    Return,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Restock => "RESTOCK",
            MovementKind::Sale => "SALE",
            MovementKind::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable record of one stock quantity change.
///
/// `sequence` is assigned by the ledger on append and is strictly increasing,
/// so it orders entries even when timestamps collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Signed change: positive for restocks and returns, negative for sales.
    pub delta: i64,
    pub quantity_after: u32,
    /// Batch number, order id, or cancellation reason.
    pub reference: String,
}
