//! Shared types for the inventory and order engine.
//!
//! Records here are plain data: the catalog, ledger, and engines in the
//! `domain` crate decide when they change.

pub mod clock;
pub mod error;
pub mod id;
pub mod movement;
pub mod order;
pub mod product;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ValidationError;
pub use id::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use movement::{MovementKind, StockMovement};
pub use order::{Order, OrderItem, OrderStatus, PaymentMethod, TaxRate};
pub use product::Product;
pub use types::{CustomerId, Money, OrderId, ProductId};
