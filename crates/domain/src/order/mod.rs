//! Order lifecycle: creation, fulfillment, cancellation and sales queries.

mod commands;
mod engine;
mod report;

pub use commands::{CreateOrder, ModifyOrder, OrderLine};
pub use engine::{CANCELLATION_REASON, OrderEngine};
pub use report::{ProductSales, SalesReport};
