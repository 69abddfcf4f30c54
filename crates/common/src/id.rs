//! Order identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::OrderId;

/// Produces unique order identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_order_id(&self) -> OrderId;
}

/// Monotonic `ORD-000001`, `ORD-000002`, ... identifiers.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues numbering after `last`, e.g. when orders were reloaded.
    pub fn starting_after(last: u64) -> Self {
        Self {
            next: AtomicU64::new(last),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_order_id(&self) -> OrderId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        OrderId::new(format!("ORD-{n:06}"))
    }
}

/// Random `ORD-<uuid>` identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_order_id(&self) -> OrderId {
        OrderId::new(format!("ORD-{}", Uuid::new_v4()))
    }
}
