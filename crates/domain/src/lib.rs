//! Inventory and order transaction engine.
//!
//! This crate provides:
//! - [`Catalog`], the in-memory product store with per-product locking
//! - [`StockLedger`], the append-only record of every stock change
//! - [`InventoryEngine`], the only component that changes stock levels
//! - [`OrderEngine`], the order state machine built on the inventory engine
//!
//! All of them persist through the [`store::Persistence`] port.

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod order;
pub mod services;

pub use catalog::Catalog;
pub use error::{DomainError, Result};
pub use inventory::{CategorySummary, InventoryEngine, InventoryStatistics, OPENING_BALANCE_REFERENCE};
pub use ledger::{Discrepancy, Movements, MovementsIter, NewMovement, StockLedger};
pub use order::{
    CANCELLATION_REASON, CreateOrder, ModifyOrder, OrderEngine, OrderLine, ProductSales,
    SalesReport,
};
pub use services::{
    CustomerAccount, CustomerLedger, InMemoryCustomerLedger, LoggingAlert, LowStockAlert,
    RecordedAlert, RecordingAlert,
};

pub use common::{
    Clock, CustomerId, FixedClock, IdGenerator, Money, MovementKind, Order, OrderId, OrderItem,
    OrderStatus, PaymentMethod, Product, ProductId, SequentialIdGenerator, StockMovement,
    SystemClock, TaxRate, UuidIdGenerator,
};
