//! Append-only stock movement ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{MovementKind, ProductId, StockMovement};
use parking_lot::RwLock;
use serde::Serialize;
use store::{MovementLog, MovementQuery, ProductStore};
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::Result;

/// A movement that has not been appended yet.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub delta: i64,
    pub quantity_after: u32,
    pub reference: String,
    pub timestamp: DateTime<Utc>,
}

/// A product whose stock disagrees with the sum of its ledger deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub product_id: ProductId,
    pub quantity_in_stock: u32,
    pub ledger_balance: i64,
}

/// The stock ledger.
///
/// Entries live in a shared vector that is cloned only when a snapshot is
/// still held during an append, so [`Movements`] handed out earlier keep
/// seeing exactly what existed when they were taken.
pub struct StockLedger<P: ?Sized> {
    store: Arc<P>,
    entries: RwLock<Arc<Vec<StockMovement>>>,
}

impl<P: MovementLog + ?Sized> StockLedger<P> {
    pub fn new(store: Arc<P>) -> Self {
        Self {
            store,
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Rebuilds the ledger from the movements already in `store`.
    pub fn load(store: Arc<P>) -> Result<Self> {
        let mut movements = store.load_movements()?;
        movements.sort_by_key(|m| m.sequence);
        debug!(count = movements.len(), "Loaded stock ledger");
        Ok(Self {
            store,
            entries: RwLock::new(Arc::new(movements)),
        })
    }

    /// Durably appends a movement and returns it with its sequence number.
    ///
    /// Store failures are surfaced as-is; nothing is retried.
    pub fn append(&self, movement: NewMovement) -> Result<StockMovement> {
        let mut entries = self.entries.write();
        let sequence = entries.last().map_or(1, |last| last.sequence + 1);

        let entry = StockMovement {
            sequence,
            timestamp: movement.timestamp,
            product_id: movement.product_id,
            kind: movement.kind,
            delta: movement.delta,
            quantity_after: movement.quantity_after,
            reference: movement.reference,
        };

        self.store.append_movement(&entry)?;
        Arc::make_mut(&mut *entries).push(entry.clone());

        metrics::counter!("inventory_movements_total", "kind" => entry.kind.as_str())
            .increment(1);
        Ok(entry)
    }

    /// Every movement in append order.
    pub fn all(&self) -> Movements {
        Movements {
            entries: self.snapshot(),
            product_id: None,
        }
    }

    /// Movements for one product in append order.
    pub fn for_product(&self, id: &ProductId) -> Movements {
        Movements {
            entries: self.snapshot(),
            product_id: Some(id.clone()),
        }
    }

    pub fn query(&self, query: &MovementQuery) -> Vec<StockMovement> {
        let entries = self.snapshot();
        query.apply(entries.iter()).cloned().collect()
    }

    /// Sum of the deltas recorded for a product.
    pub fn balance(&self, id: &ProductId) -> i64 {
        self.for_product(id).iter().map(|m| m.delta).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compares every cataloged product's stock with its ledger balance.
    pub fn reconcile<S: ProductStore + ?Sized>(&self, catalog: &Catalog<S>) -> Vec<Discrepancy> {
        let entries = self.snapshot();
        let mut balances: HashMap<&ProductId, i64> = HashMap::new();
        for movement in entries.iter() {
            *balances.entry(&movement.product_id).or_default() += movement.delta;
        }

        catalog
            .all()
            .into_iter()
            .filter_map(|product| {
                let balance = balances.get(&product.id).copied().unwrap_or(0);
                (balance != i64::from(product.quantity_in_stock)).then(|| Discrepancy {
                    product_id: product.id.clone(),
                    quantity_in_stock: product.quantity_in_stock,
                    ledger_balance: balance,
                })
            })
            .collect()
    }

    fn snapshot(&self) -> Arc<Vec<StockMovement>> {
        Arc::clone(&*self.entries.read())
    }
}

/// A finite, restartable view of ledger entries.
///
/// Each call to [`Movements::iter`] starts again from the first entry.
#[derive(Debug, Clone)]
pub struct Movements {
    entries: Arc<Vec<StockMovement>>,
    product_id: Option<ProductId>,
}

impl Movements {
    pub fn iter(&self) -> MovementsIter<'_> {
        MovementsIter {
            inner: self.entries.iter(),
            product_id: self.product_id.as_ref(),
        }
    }

    pub fn to_vec(&self) -> Vec<StockMovement> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a Movements {
    type Item = &'a StockMovement;
    type IntoIter = MovementsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Movements`] view.
#[derive(Debug, Clone)]
pub struct MovementsIter<'a> {
    inner: std::slice::Iter<'a, StockMovement>,
    product_id: Option<&'a ProductId>,
}

impl<'a> Iterator for MovementsIter<'a> {
    type Item = &'a StockMovement;

    fn next(&mut self) -> Option<Self::Item> {
        match self.product_id {
            Some(id) => self.inner.by_ref().find(|m| &m.product_id == id),
            None => self.inner.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    fn new_movement(product: &str, kind: MovementKind, delta: i64, after: u32) -> NewMovement {
        NewMovement {
            product_id: ProductId::new(product),
            kind,
            delta,
            quantity_after: after,
            reference: "ref".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn ledger() -> (Arc<InMemoryStore>, StockLedger<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), StockLedger::new(store))
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let (store, ledger) = ledger();
        let first = ledger
            .append(new_movement("A", MovementKind::Restock, 10, 10))
            .unwrap();
        let second = ledger
            .append(new_movement("A", MovementKind::Sale, -3, 7))
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(store.movement_count(), 2);
    }

    #[test]
    fn test_failed_append_is_not_visible() {
        let (store, ledger) = ledger();
        store.set_fail_movement_appends(true);

        assert!(ledger
            .append(new_movement("A", MovementKind::Restock, 10, 10))
            .is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_for_product_and_balance() {
        let (_store, ledger) = ledger();
        ledger.append(new_movement("A", MovementKind::Restock, 10, 10)).unwrap();
        ledger.append(new_movement("B", MovementKind::Restock, 4, 4)).unwrap();
        ledger.append(new_movement("A", MovementKind::Sale, -3, 7)).unwrap();
        ledger.append(new_movement("A", MovementKind::Return, 1, 8)).unwrap();

        let a = ledger.for_product(&ProductId::new("A"));
        let deltas: Vec<i64> = a.iter().map(|m| m.delta).collect();
        assert_eq!(deltas, vec![10, -3, 1]);

        assert_eq!(ledger.balance(&ProductId::new("A")), 8);
        assert_eq!(ledger.balance(&ProductId::new("B")), 4);
        assert_eq!(ledger.balance(&ProductId::new("C")), 0);
    }

    #[test]
    fn test_views_are_restartable_snapshots() {
        let (_store, ledger) = ledger();
        ledger.append(new_movement("A", MovementKind::Restock, 10, 10)).unwrap();

        let view = ledger.all();
        ledger.append(new_movement("A", MovementKind::Sale, -1, 9)).unwrap();

        assert_eq!(view.iter().count(), 1);
        assert_eq!(view.iter().count(), 1);
        assert_eq!(ledger.all().iter().count(), 2);
    }

    #[test]
    fn test_query() {
        let (_store, ledger) = ledger();
        ledger.append(new_movement("A", MovementKind::Restock, 10, 10)).unwrap();
        ledger.append(new_movement("A", MovementKind::Sale, -3, 7)).unwrap();
        ledger.append(new_movement("A", MovementKind::Sale, -2, 5)).unwrap();

        let sales = ledger.query(&MovementQuery::for_product("A").kind(MovementKind::Sale));
        assert_eq!(sales.len(), 2);

        let last = ledger.query(&MovementQuery::new().offset(2));
        assert_eq!(last[0].quantity_after, 5);
    }

    #[test]
    fn test_load_continues_sequence() {
        let store = Arc::new(InMemoryStore::new());
        {
            let ledger = StockLedger::new(store.clone());
            ledger.append(new_movement("A", MovementKind::Restock, 10, 10)).unwrap();
            ledger.append(new_movement("A", MovementKind::Sale, -3, 7)).unwrap();
        }

        let reloaded = StockLedger::load(store).unwrap();
        let next = reloaded
            .append(new_movement("A", MovementKind::Sale, -1, 6))
            .unwrap();
        assert_eq!(next.sequence, 3);
        assert_eq!(reloaded.balance(&ProductId::new("A")), 6);
    }
}
