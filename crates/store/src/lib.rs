//! Persistence port for the inventory engine.
//!
//! The engines only see the [`Persistence`] traits. Two implementations ship:
//! [`InMemoryStore`] for tests and embedded use, and [`FileStore`] which keeps
//! JSON documents on disk.

pub mod error;
pub mod file;
pub mod memory;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use query::MovementQuery;
pub use store::{MovementLog, OrderStore, Persistence, ProductStore};
