//! Collaborator ports used by the engines and their shipped implementations.

pub mod alerts;
pub mod customer;

pub use alerts::{LoggingAlert, LowStockAlert, RecordedAlert, RecordingAlert};
pub use customer::{CustomerAccount, CustomerLedger, InMemoryCustomerLedger};
