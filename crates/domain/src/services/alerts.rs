//! Low-stock signal port.

use std::sync::Arc;

use common::{Product, ProductId};
use parking_lot::Mutex;
use tracing::warn;

/// Receives a signal when an operation leaves a product at or below its
/// minimum stock level.
pub trait LowStockAlert: Send + Sync {
    fn low_stock(&self, product: &Product);
}

/// Emits low-stock signals as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAlert;

impl LowStockAlert for LoggingAlert {
    fn low_stock(&self, product: &Product) {
        warn!(
            product_id = %product.id,
            name = %product.name,
            quantity_in_stock = product.quantity_in_stock,
            min_stock_level = product.min_stock_level,
            "Low stock"
        );
    }
}

/// A raised alert as seen by [`RecordingAlert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    pub product_id: ProductId,
    pub quantity_in_stock: u32,
}

/// Records alerts in memory for testing.
#[derive(Debug, Clone, Default)]
pub struct RecordingAlert {
    alerts: Arc<Mutex<Vec<RecordedAlert>>>,
}

impl RecordingAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

impl LowStockAlert for RecordingAlert {
    fn low_stock(&self, product: &Product) {
        self.alerts.lock().push(RecordedAlert {
            product_id: product.id.clone(),
            quantity_in_stock: product.quantity_in_stock,
        });
    }
}
