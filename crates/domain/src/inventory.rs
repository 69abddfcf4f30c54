//! Inventory engine: the only component that changes stock quantities.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::{Clock, Money, MovementKind, Product, ProductId, StockMovement};
use serde::Serialize;
use store::Persistence;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::error::{DomainError, Result};
use crate::ledger::{NewMovement, StockLedger};
use crate::services::LowStockAlert;

/// Reference recorded on the ledger entry for stock a product starts with.
pub const OPENING_BALANCE_REFERENCE: &str = "opening balance";

/// Point-in-time view of the whole inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryStatistics {
    pub total_products: usize,
    pub total_units: u64,
    pub total_value: Money,
    pub total_potential_revenue: Money,
    pub low_stock_count: usize,
    pub expired_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// Stock totals for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub product_count: usize,
    pub total_stock: u64,
    pub stock_value: Money,
    pub potential_revenue: Money,
}

impl CategorySummary {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            product_count: 0,
            total_stock: 0,
            stock_value: Money::zero(),
            potential_revenue: Money::zero(),
        }
    }

    fn add(&mut self, product: &Product) {
        self.product_count += 1;
        self.total_stock += u64::from(product.quantity_in_stock);
        self.stock_value += product.stock_value();
        self.potential_revenue += product.potential_revenue();
    }
}

/// Applies restocks, sales and returns.
///
/// Each operation validates first, then holds the product's lock while it
/// persists the product and appends the ledger entry. If the ledger append
/// fails, the previously stored product is written back and the in-memory
/// product is left untouched.
pub struct InventoryEngine<P: ?Sized> {
    catalog: Catalog<P>,
    ledger: StockLedger<P>,
    alerts: Arc<dyn LowStockAlert>,
    clock: Arc<dyn Clock>,
}

impl<P: Persistence + ?Sized> InventoryEngine<P> {
    /// Creates an engine with an empty catalog and ledger.
    pub fn new(store: Arc<P>, alerts: Arc<dyn LowStockAlert>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            ledger: StockLedger::new(store),
            alerts,
            clock,
        }
    }

    /// Restores the catalog and ledger from `store`.
    pub fn load(
        store: Arc<P>,
        alerts: Arc<dyn LowStockAlert>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let catalog = Catalog::load(store.clone())?;
        let ledger = StockLedger::load(store)?;
        info!(
            products = catalog.len(),
            movements = ledger.len(),
            "Inventory loaded"
        );
        Ok(Self {
            catalog,
            ledger,
            alerts,
            clock,
        })
    }

    pub fn catalog(&self) -> &Catalog<P> {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedger<P> {
        &self.ledger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Adds a product to the catalog, recording any starting stock on the
    /// ledger so stock and ledger balance agree from the first entry.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn register_product(&self, product: Product) -> Result<Product> {
        if product.quantity_in_stock > product.max_stock_level {
            return Err(DomainError::validation(format!(
                "initial stock {} exceeds max stock level {}",
                product.quantity_in_stock, product.max_stock_level
            )));
        }
        // A removed product's movements stay on the ledger, so its id is spent
        if self.ledger.for_product(&product.id).iter().next().is_some() {
            warn!("Registration rejected, id has ledger history");
            return Err(DomainError::DuplicateKey {
                entity: "Product history",
                key: product.id.to_string(),
            });
        }

        let product = self.catalog.add(product)?;
        if product.quantity_in_stock == 0 {
            return Ok(product);
        }

        let opening = NewMovement {
            product_id: product.id.clone(),
            kind: MovementKind::Restock,
            delta: i64::from(product.quantity_in_stock),
            quantity_after: product.quantity_in_stock,
            reference: OPENING_BALANCE_REFERENCE.to_string(),
            timestamp: self.clock.now(),
        };
        if let Err(e) = self.ledger.append(opening) {
            if let Err(undo) = self.catalog.remove(&product.id) {
                error!(
                    product_id = %product.id,
                    error = %undo,
                    "Failed to remove product after opening balance was not recorded"
                );
            }
            return Err(e);
        }

        Ok(product)
    }

    /// Receives `quantity` units into stock.
    ///
    /// For perishable products a supplied `expiry_date` replaces the current
    /// one; it is ignored for everything else.
    #[tracing::instrument(skip(self))]
    pub fn add_stock(
        &self,
        id: &ProductId,
        quantity: u32,
        batch_reference: &str,
        expiry_date: Option<NaiveDate>,
    ) -> Result<Product> {
        let product = self.catalog.with_product(id, |current| {
            if quantity == 0 {
                return Err(DomainError::validation("quantity must be greater than 0"));
            }

            let capacity_exceeded = || DomainError::CapacityExceeded {
                product_id: id.clone(),
                requested: quantity,
                current: current.quantity_in_stock,
                max: current.max_stock_level,
            };
            let new_quantity = current
                .quantity_in_stock
                .checked_add(quantity)
                .ok_or_else(capacity_exceeded)?;
            if new_quantity > current.max_stock_level {
                return Err(capacity_exceeded());
            }

            let mut updated = current.clone();
            updated.quantity_in_stock = new_quantity;
            updated.last_restocked = Some(self.clock.today());
            if updated.perishable && expiry_date.is_some() {
                updated.expiry_date = expiry_date;
            }

            self.commit(
                current,
                updated,
                MovementKind::Restock,
                i64::from(quantity),
                batch_reference.to_string(),
            )
        })?;

        info!(
            quantity_in_stock = product.quantity_in_stock,
            "Stock received"
        );
        self.signal_if_low(&product);
        Ok(product)
    }

    /// Takes `quantity` units out of stock as a sale.
    #[tracing::instrument(skip(self))]
    pub fn sell(&self, id: &ProductId, quantity: u32, reference: &str) -> Result<Product> {
        let today = self.clock.today();
        let product = self.catalog.with_product(id, |current| {
            if quantity == 0 {
                return Err(DomainError::validation("quantity must be greater than 0"));
            }
            if quantity > current.quantity_in_stock {
                warn!(
                    requested = quantity,
                    available = current.quantity_in_stock,
                    "Sale rejected"
                );
                return Err(DomainError::InsufficientStock {
                    product_id: id.clone(),
                    requested: quantity,
                    available: current.quantity_in_stock,
                });
            }
            if let Some(expiry_date) = current.expiry_date
                && current.is_expired(today)
            {
                warn!(%expiry_date, "Sale of expired product rejected");
                return Err(DomainError::ExpiredProduct {
                    product_id: id.clone(),
                    expiry_date,
                });
            }

            let mut updated = current.clone();
            updated.quantity_in_stock -= quantity;
            updated.quantity_sold += u64::from(quantity);

            self.commit(
                current,
                updated,
                MovementKind::Sale,
                -i64::from(quantity),
                reference.to_string(),
            )
        })?;

        info!(quantity_in_stock = product.quantity_in_stock, "Stock sold");
        self.signal_if_low(&product);
        Ok(product)
    }

    /// Puts `quantity` units back into stock. Returns are not capped by the
    /// maximum stock level and never raise a low-stock signal.
    #[tracing::instrument(skip(self))]
    pub fn return_stock(
        &self,
        id: &ProductId,
        quantity: u32,
        reason: &str,
        reference: &str,
    ) -> Result<Product> {
        let product = self.catalog.with_product(id, |current| {
            if quantity == 0 {
                return Err(DomainError::validation("quantity must be greater than 0"));
            }
            let new_quantity = current
                .quantity_in_stock
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("returned quantity overflows stock"))?;

            let mut updated = current.clone();
            updated.quantity_in_stock = new_quantity;

            self.commit(
                current,
                updated,
                MovementKind::Return,
                i64::from(quantity),
                return_reference(reference, reason),
            )
        })?;

        info!(quantity_in_stock = product.quantity_in_stock, "Stock returned");
        Ok(product)
    }

    /// Ledger history of a cataloged product in append order.
    pub fn movements(&self, id: &ProductId) -> Result<Vec<StockMovement>> {
        if !self.catalog.contains(id) {
            return Err(DomainError::product_not_found(id));
        }
        Ok(self.ledger.for_product(id).to_vec())
    }

    /// Products at or below their minimum level, lowest stock first.
    pub fn needing_reorder(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .catalog
            .all()
            .into_iter()
            .filter(Product::needs_reorder)
            .collect();
        products.sort_by_key(|p| p.quantity_in_stock);
        products
    }

    /// Perishable products that expire within `days` days, soonest first.
    pub fn expiring_within(&self, days: u32) -> Vec<Product> {
        let today = self.clock.today();
        let mut products: Vec<Product> = self
            .catalog
            .all()
            .into_iter()
            .filter(|p| p.expires_within(today, days))
            .collect();
        products.sort_by_key(|p| p.expiry_date);
        products
    }

    /// Products whose expiry date has passed.
    pub fn expired(&self) -> Vec<Product> {
        let today = self.clock.today();
        self.catalog
            .all()
            .into_iter()
            .filter(|p| p.is_expired(today))
            .collect()
    }

    pub fn statistics(&self) -> InventoryStatistics {
        let today = self.clock.today();
        let products = self.catalog.all();

        InventoryStatistics {
            total_products: products.len(),
            total_units: products
                .iter()
                .map(|p| u64::from(p.quantity_in_stock))
                .sum(),
            total_value: products.iter().map(Product::stock_value).sum(),
            total_potential_revenue: products.iter().map(Product::potential_revenue).sum(),
            low_stock_count: products.iter().filter(|p| p.needs_reorder()).count(),
            expired_count: products.iter().filter(|p| p.is_expired(today)).count(),
            generated_at: self.clock.now(),
        }
    }

    /// Stock totals per category, ordered by category name.
    pub fn category_summary(&self) -> Vec<CategorySummary> {
        let mut summaries: BTreeMap<String, CategorySummary> = BTreeMap::new();
        for product in self.catalog.all() {
            summaries
                .entry(product.category.clone())
                .or_insert_with(|| CategorySummary::new(&product.category))
                .add(&product);
        }
        summaries.into_values().collect()
    }

    /// Persists `updated`, records the movement, then publishes the change
    /// in memory. Runs with the product lock held.
    fn commit(
        &self,
        current: &mut Product,
        updated: Product,
        kind: MovementKind,
        delta: i64,
        reference: String,
    ) -> Result<Product> {
        let store = self.catalog.store();
        store.save_product(&updated)?;

        let movement = NewMovement {
            product_id: updated.id.clone(),
            kind,
            delta,
            quantity_after: updated.quantity_in_stock,
            reference,
            timestamp: self.clock.now(),
        };
        if let Err(e) = self.ledger.append(movement) {
            if let Err(restore) = store.save_product(current) {
                error!(
                    product_id = %current.id,
                    error = %restore,
                    "Failed to restore stored product after ledger append failed"
                );
            }
            return Err(e);
        }

        *current = updated.clone();
        Ok(updated)
    }

    fn signal_if_low(&self, product: &Product) {
        if product.needs_reorder() {
            metrics::counter!("inventory_low_stock_alerts_total").increment(1);
            self.alerts.low_stock(product);
        }
    }
}

fn return_reference(reference: &str, reason: &str) -> String {
    match (reference.is_empty(), reason.is_empty()) {
        (false, false) => format!("{reference}: {reason}"),
        (true, _) => reason.to_string(),
        (false, true) => reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RecordingAlert;
    use chrono::TimeZone;
    use common::FixedClock;
    use store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        alerts: RecordingAlert,
        clock: FixedClock,
        engine: InventoryEngine<InMemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let alerts = RecordingAlert::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap());
        let engine =
            InventoryEngine::new(store.clone(), Arc::new(alerts.clone()), Arc::new(clock.clone()));
        Fixture {
            store,
            alerts,
            clock,
            engine,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(id: &str, stock: u32, min: u32, max: u32) -> Product {
        Product::new(
            id,
            format!("BC-{id}"),
            format!("Product {id}"),
            "General",
            Money::from_cents(100),
            Money::from_cents(150),
        )
        .with_stock(stock)
        .with_levels(min, max)
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_register_records_opening_balance() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();

        let entries = f.engine.ledger().for_product(&pid("P")).to_vec();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, MovementKind::Restock);
        assert_eq!(entries[0].delta, 10);
        assert_eq!(entries[0].reference, OPENING_BALANCE_REFERENCE);
    }

    #[test]
    fn test_register_without_stock_records_nothing() {
        let f = fixture();
        f.engine.register_product(product("P", 0, 5, 50)).unwrap();
        assert!(f.engine.ledger().is_empty());
    }

    #[test]
    fn test_register_rolls_back_when_ledger_fails() {
        let f = fixture();
        f.store.set_fail_movement_appends(true);

        assert!(f.engine.register_product(product("P", 10, 5, 50)).is_err());
        assert!(f.engine.catalog().get(&pid("P")).is_none());
        assert!(f.store.stored_product(&pid("P")).is_none());
    }

    #[test]
    fn test_removed_id_cannot_be_registered_again() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        f.engine.catalog().remove(&pid("P")).unwrap();

        let result = f.engine.register_product(product("P", 4, 5, 50));
        assert!(matches!(
            result,
            Err(DomainError::DuplicateKey {
                entity: "Product history",
                ..
            })
        ));
        assert!(!f.engine.catalog().contains(&pid("P")));
        assert_eq!(f.engine.ledger().len(), 1);

        // A removed product that never moved stock leaves its id free
        f.engine.register_product(product("Q", 0, 5, 50)).unwrap();
        f.engine.catalog().remove(&pid("Q")).unwrap();
        f.engine.register_product(product("Q", 4, 5, 50)).unwrap();
        assert_eq!(f.engine.ledger().balance(&pid("Q")), 4);
        assert!(f.engine.ledger().reconcile(f.engine.catalog()).is_empty());
    }

    #[test]
    fn test_add_stock() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();

        let updated = f.engine.add_stock(&pid("P"), 15, "BATCH-7", None).unwrap();
        assert_eq!(updated.quantity_in_stock, 25);
        assert_eq!(updated.last_restocked, Some(date(2024, 6, 10)));
        assert_eq!(f.engine.ledger().balance(&pid("P")), 25);
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn test_add_stock_validation() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();

        assert!(matches!(
            f.engine.add_stock(&pid("P"), 0, "B", None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            f.engine.add_stock(&pid("P"), 41, "B", None),
            Err(DomainError::CapacityExceeded {
                requested: 41,
                current: 10,
                max: 50,
                ..
            })
        ));
        assert!(matches!(
            f.engine.add_stock(&pid("Q"), 1, "B", None),
            Err(DomainError::NotFound { .. })
        ));
        assert_eq!(f.engine.catalog().get(&pid("P")).unwrap().quantity_in_stock, 10);
    }

    #[test]
    fn test_add_stock_to_exact_max() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        let updated = f.engine.add_stock(&pid("P"), 40, "B", None).unwrap();
        assert_eq!(updated.quantity_in_stock, 50);
    }

    #[test]
    fn test_add_stock_sets_expiry_only_for_perishables() {
        let f = fixture();
        f.engine
            .register_product(product("MILK", 0, 5, 50).perishable(None))
            .unwrap();
        f.engine.register_product(product("SOAP", 0, 5, 50)).unwrap();

        let milk = f
            .engine
            .add_stock(&pid("MILK"), 10, "B1", Some(date(2024, 6, 20)))
            .unwrap();
        assert_eq!(milk.expiry_date, Some(date(2024, 6, 20)));

        let soap = f
            .engine
            .add_stock(&pid("SOAP"), 10, "B2", Some(date(2024, 6, 20)))
            .unwrap();
        assert_eq!(soap.expiry_date, None);
    }

    #[test]
    fn test_low_stock_after_restock_still_signals() {
        let f = fixture();
        f.engine.register_product(product("P", 0, 5, 50)).unwrap();
        f.engine.add_stock(&pid("P"), 3, "B", None).unwrap();
        assert_eq!(f.alerts.count(), 1);
    }

    #[test]
    fn test_sell_and_low_stock_signal() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();

        let updated = f.engine.sell(&pid("P"), 7, "ORD-1").unwrap();
        assert_eq!(updated.quantity_in_stock, 3);
        assert_eq!(updated.quantity_sold, 7);
        assert_eq!(f.alerts.count(), 1);
        assert_eq!(f.alerts.alerts()[0].quantity_in_stock, 3);

        let sale = f.engine.ledger().for_product(&pid("P")).to_vec().pop().unwrap();
        assert_eq!(sale.kind, MovementKind::Sale);
        assert_eq!(sale.delta, -7);
        assert_eq!(sale.quantity_after, 3);
        assert_eq!(sale.reference, "ORD-1");
    }

    #[test]
    fn test_sell_insufficient_stock() {
        let f = fixture();
        f.engine.register_product(product("P", 3, 1, 50)).unwrap();

        let result = f.engine.sell(&pid("P"), 5, "ORD-1");
        match result {
            Err(DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, pid("P"));
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(f.engine.catalog().get(&pid("P")).unwrap().quantity_in_stock, 3);
        assert_eq!(f.engine.ledger().len(), 1);
    }

    #[test]
    fn test_sell_expired_product() {
        let f = fixture();
        f.engine
            .register_product(product("MILK", 10, 2, 50).perishable(Some(date(2024, 6, 12))))
            .unwrap();

        // Sellable on its expiry date
        f.clock.set(Utc.with_ymd_and_hms(2024, 6, 12, 18, 0, 0).unwrap());
        f.engine.sell(&pid("MILK"), 1, "ORD-1").unwrap();

        f.clock.set(Utc.with_ymd_and_hms(2024, 6, 13, 8, 0, 0).unwrap());
        assert!(matches!(
            f.engine.sell(&pid("MILK"), 1, "ORD-2"),
            Err(DomainError::ExpiredProduct { .. })
        ));
        assert_eq!(f.engine.catalog().get(&pid("MILK")).unwrap().quantity_in_stock, 9);
    }

    #[test]
    fn test_sell_rolls_back_when_store_fails() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        f.store.set_fail_product_saves(true);

        assert!(matches!(
            f.engine.sell(&pid("P"), 2, "ORD-1"),
            Err(DomainError::Persistence(_))
        ));
        let current = f.engine.catalog().get(&pid("P")).unwrap();
        assert_eq!(current.quantity_in_stock, 10);
        assert_eq!(current.quantity_sold, 0);
        assert_eq!(f.engine.ledger().len(), 1);
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn test_sell_rolls_back_when_ledger_fails() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        f.store.set_fail_movement_appends(true);

        assert!(f.engine.sell(&pid("P"), 2, "ORD-1").is_err());
        assert_eq!(f.engine.catalog().get(&pid("P")).unwrap().quantity_in_stock, 10);
        assert_eq!(f.store.stored_product(&pid("P")).unwrap().quantity_in_stock, 10);
    }

    #[test]
    fn test_sell_when_write_back_also_fails() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        f.store.set_fail_movement_appends(true);
        // The sale's save goes through; the write-back after the failed append does not
        f.store.fail_product_saves_after(1);

        assert!(matches!(
            f.engine.sell(&pid("P"), 2, "ORD-1"),
            Err(DomainError::Persistence(_))
        ));
        assert_eq!(f.engine.catalog().get(&pid("P")).unwrap().quantity_in_stock, 10);
        assert_eq!(f.store.stored_product(&pid("P")).unwrap().quantity_in_stock, 8);
        assert_eq!(f.engine.ledger().len(), 1);

        // Once the store recovers, the next sale rewrites the stored copy
        f.store.set_fail_product_saves(false);
        f.store.set_fail_movement_appends(false);
        f.engine.sell(&pid("P"), 1, "ORD-2").unwrap();
        assert_eq!(f.store.stored_product(&pid("P")).unwrap().quantity_in_stock, 9);
        assert!(f.engine.ledger().reconcile(f.engine.catalog()).is_empty());
    }

    #[test]
    fn test_return_is_not_capped() {
        let f = fixture();
        f.engine.register_product(product("P", 48, 5, 50)).unwrap();

        let updated = f
            .engine
            .return_stock(&pid("P"), 5, "damaged box", "ORD-9")
            .unwrap();
        assert_eq!(updated.quantity_in_stock, 53);

        let entry = f.engine.ledger().for_product(&pid("P")).to_vec().pop().unwrap();
        assert_eq!(entry.kind, MovementKind::Return);
        assert_eq!(entry.reference, "ORD-9: damaged box");
    }

    #[test]
    fn test_return_never_signals() {
        let f = fixture();
        f.engine.register_product(product("P", 0, 5, 50)).unwrap();
        f.engine.return_stock(&pid("P"), 1, "wrong size", "").unwrap();
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn test_needing_reorder_sorted_ascending() {
        let f = fixture();
        f.engine.register_product(product("A", 4, 5, 50)).unwrap();
        f.engine.register_product(product("B", 20, 5, 50)).unwrap();
        f.engine.register_product(product("C", 1, 5, 50)).unwrap();
        f.engine.register_product(product("D", 5, 5, 50)).unwrap();

        let ids: Vec<String> = f
            .engine
            .needing_reorder()
            .iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, vec!["C", "A", "D"]);
    }

    #[test]
    fn test_expiring_within() {
        let f = fixture();
        f.engine
            .register_product(product("A", 1, 0, 10).perishable(Some(date(2024, 6, 15))))
            .unwrap();
        f.engine
            .register_product(product("B", 1, 0, 10).perishable(Some(date(2024, 6, 11))))
            .unwrap();
        f.engine
            .register_product(product("C", 1, 0, 10).perishable(Some(date(2024, 7, 30))))
            .unwrap();
        f.engine
            .register_product(product("D", 1, 0, 10).perishable(Some(date(2024, 6, 1))))
            .unwrap();

        let ids: Vec<String> = f
            .engine
            .expiring_within(7)
            .iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(f.engine.expired().len(), 1);
    }

    #[test]
    fn test_statistics_and_categories() {
        let f = fixture();
        f.engine.register_product(product("A", 10, 5, 50)).unwrap();
        let mut dairy = product("B", 2, 5, 50);
        dairy.category = "Dairy".to_string();
        f.engine.register_product(dairy).unwrap();

        let stats = f.engine.statistics();
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.total_units, 12);
        assert_eq!(stats.total_value.cents(), 1_200);
        assert_eq!(stats.total_potential_revenue.cents(), 1_800);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.expired_count, 0);

        let summary = f.engine.category_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "Dairy");
        assert_eq!(summary[0].total_stock, 2);
        assert_eq!(summary[1].category, "General");
        assert_eq!(summary[1].stock_value.cents(), 1_000);
    }

    #[test]
    fn test_extreme_prices() {
        let f = fixture();
        let mut overpriced = product("X", 3, 0, 50);
        overpriced.purchase_price = Money::from_cents(i64::MAX / 2);
        overpriced.selling_price = Money::from_cents(i64::MAX / 2);
        assert!(matches!(
            f.engine.register_product(overpriced),
            Err(DomainError::Validation(_))
        ));

        for id in ["A", "B", "C"] {
            let mut priced = product(id, 0, 0, u32::MAX);
            priced.purchase_price = Product::MAX_PRICE;
            priced.selling_price = Product::MAX_PRICE;
            f.engine.register_product(priced).unwrap();
            f.engine.return_stock(&pid(id), u32::MAX, "bulk", "").unwrap();
        }

        let stats = f.engine.statistics();
        assert_eq!(stats.total_value.cents(), i64::MAX);
        assert_eq!(f.engine.category_summary()[0].potential_revenue.cents(), i64::MAX);
    }

    #[test]
    fn test_load_restores_state() {
        let f = fixture();
        f.engine.register_product(product("P", 10, 5, 50)).unwrap();
        f.engine.sell(&pid("P"), 4, "ORD-1").unwrap();

        let reloaded = InventoryEngine::load(
            f.store.clone(),
            Arc::new(RecordingAlert::new()),
            Arc::new(f.clock.clone()),
        )
        .unwrap();
        assert_eq!(reloaded.catalog().get(&pid("P")).unwrap().quantity_in_stock, 6);
        assert_eq!(reloaded.ledger().balance(&pid("P")), 6);
        assert!(reloaded.ledger().reconcile(reloaded.catalog()).is_empty());
    }
}
