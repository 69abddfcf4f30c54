use common::{Order, Product, ProductId, StockMovement};

use crate::Result;

/// Durable storage for catalog products.
///
/// Implementations must be durable when a call returns `Ok` and leave the
/// stored state unchanged when it returns `Err`.
pub trait ProductStore: Send + Sync {
    /// Inserts or replaces a product.
    fn save_product(&self, product: &Product) -> Result<()>;

    /// Removes a product. Removing an unknown product is not an error.
    fn delete_product(&self, id: &ProductId) -> Result<()>;

    /// Loads every stored product.
    fn load_products(&self) -> Result<Vec<Product>>;
}

/// Durable storage for orders.
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces an order.
    fn save_order(&self, order: &Order) -> Result<()>;

    /// Loads every stored order.
    fn load_orders(&self) -> Result<Vec<Order>>;
}

/// Append-only storage for stock movements.
pub trait MovementLog: Send + Sync {
    /// Appends one movement. Entries are never rewritten.
    fn append_movement(&self, movement: &StockMovement) -> Result<()>;

    /// Loads every movement in append order.
    fn load_movements(&self) -> Result<Vec<StockMovement>>;
}

/// The full persistence port consumed by the engines.
pub trait Persistence: ProductStore + OrderStore + MovementLog {}

impl<T: ProductStore + OrderStore + MovementLog + ?Sized> Persistence for T {}
