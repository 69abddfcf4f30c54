use std::collections::BTreeMap;
use std::sync::Arc;

use common::{Order, OrderId, Product, ProductId, StockMovement};
use parking_lot::RwLock;

use crate::{
    Result, StoreError,
    store::{MovementLog, OrderStore, ProductStore},
};

#[derive(Debug, Default)]
struct InMemoryState {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    movements: Vec<StockMovement>,
    fail_product_saves: bool,
    /// Successful product saves left before saves start failing.
    product_saves_before_failure: Option<usize>,
    fail_product_deletes: bool,
    fail_order_saves: bool,
    fail_movement_appends: bool,
}

/// In-memory store implementation.
///
/// Behaves like a durable store from the engine's point of view and can be
/// told to fail specific operations so rollback paths can be exercised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures product saves to fail until reset.
    pub fn set_fail_product_saves(&self, fail: bool) {
        let mut state = self.state.write();
        state.fail_product_saves = fail;
        state.product_saves_before_failure = None;
    }

    /// Lets `successes` more product saves through, then fails every save.
    pub fn fail_product_saves_after(&self, successes: usize) {
        self.state.write().product_saves_before_failure = Some(successes);
    }

    pub fn set_fail_product_deletes(&self, fail: bool) {
        self.state.write().fail_product_deletes = fail;
    }

    pub fn set_fail_order_saves(&self, fail: bool) {
        self.state.write().fail_order_saves = fail;
    }

    pub fn set_fail_movement_appends(&self, fail: bool) {
        self.state.write().fail_movement_appends = fail;
    }

    /// Returns the durably stored copy of a product.
    pub fn stored_product(&self, id: &ProductId) -> Option<Product> {
        self.state.read().products.get(id).cloned()
    }

    /// Returns the durably stored copy of an order.
    pub fn stored_order(&self, id: &OrderId) -> Option<Order> {
        self.state.read().orders.get(id).cloned()
    }

    pub fn product_count(&self) -> usize {
        self.state.read().products.len()
    }

    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }

    pub fn movement_count(&self) -> usize {
        self.state.read().movements.len()
    }
}

impl ProductStore for InMemoryStore {
    fn save_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_product_saves {
            return Err(StoreError::Unavailable("product save rejected".to_string()));
        }
        if let Some(remaining) = state.product_saves_before_failure {
            if remaining == 0 {
                return Err(StoreError::Unavailable("product save rejected".to_string()));
            }
            state.product_saves_before_failure = Some(remaining - 1);
        }

        state.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    fn delete_product(&self, id: &ProductId) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_product_deletes {
            return Err(StoreError::Unavailable(
                "product delete rejected".to_string(),
            ));
        }

        state.products.remove(id);
        Ok(())
    }

    fn load_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().products.values().cloned().collect())
    }
}

impl OrderStore for InMemoryStore {
    fn save_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_order_saves {
            return Err(StoreError::Unavailable("order save rejected".to_string()));
        }

        state.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn load_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().orders.values().cloned().collect())
    }
}

impl MovementLog for InMemoryStore {
    fn append_movement(&self, movement: &StockMovement) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_movement_appends {
            return Err(StoreError::Unavailable(
                "movement append rejected".to_string(),
            ));
        }

        state.movements.push(movement.clone());
        Ok(())
    }

    fn load_movements(&self) -> Result<Vec<StockMovement>> {
        Ok(self.state.read().movements.clone())
    }
}
