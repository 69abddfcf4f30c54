//! Catalog store: the in-memory source of truth for products.

use std::collections::HashMap;
use std::sync::Arc;

use common::{Product, ProductId};
use parking_lot::{Mutex, RwLock};
use store::ProductStore;
use tracing::{debug, info};

use crate::error::{DomainError, Result};

#[derive(Debug, Default)]
struct CatalogIndex {
    products: HashMap<ProductId, Arc<Mutex<Product>>>,
    /// Insertion order, so listings are deterministic.
    order: Vec<ProductId>,
    barcodes: HashMap<String, ProductId>,
}

/// Products keyed by identifier, with a barcode index.
///
/// Each product sits behind its own mutex. Read-modify-write sequences lock
/// the product first and only touch the index briefly, so a product lock is
/// never requested while the index lock is held.
pub struct Catalog<P: ?Sized> {
    store: Arc<P>,
    index: RwLock<CatalogIndex>,
}

impl<P: ProductStore + ?Sized> Catalog<P> {
    /// Creates an empty catalog backed by `store`.
    pub fn new(store: Arc<P>) -> Self {
        Self {
            store,
            index: RwLock::new(CatalogIndex::default()),
        }
    }

    /// Rebuilds the catalog from the products already in `store`.
    pub fn load(store: Arc<P>) -> Result<Self> {
        let products = store.load_products()?;
        let catalog = Self::new(store);
        {
            let mut index = catalog.index.write();
            for product in products {
                index
                    .barcodes
                    .insert(product.barcode.clone(), product.id.clone());
                index.order.push(product.id.clone());
                index
                    .products
                    .insert(product.id.clone(), Arc::new(Mutex::new(product)));
            }
            debug!(count = index.order.len(), "Loaded catalog");
        }
        Ok(catalog)
    }

    /// Adds a new product.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add(&self, product: Product) -> Result<Product> {
        product.validate()?;

        let mut index = self.index.write();
        if index.products.contains_key(&product.id) {
            return Err(DomainError::DuplicateKey {
                entity: "Product",
                key: product.id.to_string(),
            });
        }
        if index.barcodes.contains_key(&product.barcode) {
            return Err(DomainError::DuplicateKey {
                entity: "Barcode",
                key: product.barcode.clone(),
            });
        }

        // Nothing is indexed until the store accepts the record
        self.store.save_product(&product)?;

        index
            .barcodes
            .insert(product.barcode.clone(), product.id.clone());
        index.order.push(product.id.clone());
        index
            .products
            .insert(product.id.clone(), Arc::new(Mutex::new(product.clone())));

        info!("Product added to catalog");
        Ok(product)
    }

    /// Replaces a product's descriptive data.
    ///
    /// The barcode and the stock counters cannot change here.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn update(&self, product: Product) -> Result<Product> {
        let id = product.id.clone();
        self.with_product(&id, |current| {
            if current.barcode != product.barcode {
                return Err(DomainError::validation("barcode cannot be changed"));
            }
            if current.quantity_in_stock != product.quantity_in_stock
                || current.quantity_sold != product.quantity_sold
                || current.last_restocked != product.last_restocked
            {
                return Err(DomainError::validation(
                    "stock counters change only through inventory operations",
                ));
            }
            product.validate()?;

            self.store.save_product(&product)?;
            *current = product.clone();
            Ok(product)
        })
    }

    /// Removes a product from the catalog.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: &ProductId) -> Result<Product> {
        let handle = self
            .handle(id)
            .ok_or_else(|| DomainError::product_not_found(id))?;
        let product = handle.lock();

        let mut index = self.index.write();
        if !index
            .products
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle))
        {
            return Err(DomainError::product_not_found(id));
        }

        self.store.delete_product(id)?;

        index.products.remove(id);
        index.order.retain(|existing| existing != id);
        index.barcodes.remove(&product.barcode);

        info!("Product removed from catalog");
        Ok(product.clone())
    }

    pub fn get(&self, id: &ProductId) -> Option<Product> {
        self.handle(id).map(|handle| handle.lock().clone())
    }

    pub fn get_by_barcode(&self, barcode: &str) -> Option<Product> {
        let id = self.index.read().barcodes.get(barcode).cloned()?;
        self.get(&id)
    }

    pub fn contains(&self, id: &ProductId) -> bool {
        self.index.read().products.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every product in insertion order.
    pub fn all(&self) -> Vec<Product> {
        self.handles()
            .into_iter()
            .map(|handle| handle.lock().clone())
            .collect()
    }

    /// Case-insensitive substring search over name, category, description,
    /// identifier and barcode.
    pub fn search(&self, term: &str) -> Vec<Product> {
        self.all()
            .into_iter()
            .filter(|product| product.matches(term))
            .collect()
    }

    /// Products whose category equals `category`, ignoring case.
    pub fn by_category(&self, category: &str) -> Vec<Product> {
        self.all()
            .into_iter()
            .filter(|product| product.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Runs `f` with exclusive access to one product.
    ///
    /// `f` must leave the product untouched when it returns an error.
    pub(crate) fn with_product<T>(
        &self,
        id: &ProductId,
        f: impl FnOnce(&mut Product) -> Result<T>,
    ) -> Result<T> {
        let handle = self
            .handle(id)
            .ok_or_else(|| DomainError::product_not_found(id))?;
        let mut product = handle.lock();

        // A concurrent remove may have won the race for the lock
        if !self
            .index
            .read()
            .products
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle))
        {
            return Err(DomainError::product_not_found(id));
        }

        f(&mut *product)
    }

    pub(crate) fn store(&self) -> &Arc<P> {
        &self.store
    }

    fn handle(&self, id: &ProductId) -> Option<Arc<Mutex<Product>>> {
        self.index.read().products.get(id).cloned()
    }

    fn handles(&self) -> Vec<Arc<Mutex<Product>>> {
        let index = self.index.read();
        index
            .order
            .iter()
            .filter_map(|id| index.products.get(id).cloned())
            .collect()
    }
}
