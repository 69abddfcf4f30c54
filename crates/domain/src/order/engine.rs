//! Order engine: order lifecycle and sales queries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{
    Clock, CustomerId, IdGenerator, Money, Order, OrderId, OrderItem, OrderStatus, PaymentMethod,
    ProductId, TaxRate,
};
use parking_lot::{Mutex, RwLock};
use store::Persistence;
use tracing::{error, info, warn};

use crate::error::{DomainError, Result};
use crate::inventory::InventoryEngine;
use crate::services::CustomerLedger;

use super::{CreateOrder, ModifyOrder};
use super::report::{self, ProductSales, SalesReport};

/// Reason recorded on the stock returns made when a completed order is
/// cancelled.
pub const CANCELLATION_REASON: &str = "order cancellation";

#[derive(Debug, Default)]
struct OrderIndex {
    orders: HashMap<OrderId, Arc<Mutex<Order>>>,
    /// Creation order.
    order: Vec<OrderId>,
}

/// Owns orders and drives them through their lifecycle.
///
/// Every mutation holds the order's own lock for the whole
/// read-modify-persist sequence. Stock moves only through the
/// [`InventoryEngine`], one product at a time.
pub struct OrderEngine<P: ?Sized> {
    inventory: Arc<InventoryEngine<P>>,
    customers: Arc<dyn CustomerLedger>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    tax_rate: TaxRate,
    index: RwLock<OrderIndex>,
}

impl<P: Persistence + ?Sized> OrderEngine<P> {
    /// Creates an engine with no orders and the standard tax rate.
    pub fn new(
        inventory: Arc<InventoryEngine<P>>,
        customers: Arc<dyn CustomerLedger>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inventory,
            customers,
            ids,
            clock,
            tax_rate: TaxRate::STANDARD,
            index: RwLock::new(OrderIndex::default()),
        }
    }

    /// Creates an engine holding the orders already in the store.
    pub fn load(
        inventory: Arc<InventoryEngine<P>>,
        customers: Arc<dyn CustomerLedger>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut orders = inventory.catalog().store().load_orders()?;
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let engine = Self::new(inventory, customers, ids, clock);
        {
            let mut index = engine.index.write();
            for order in orders {
                index.order.push(order.id.clone());
                index
                    .orders
                    .insert(order.id.clone(), Arc::new(Mutex::new(order)));
            }
            info!(orders = index.order.len(), "Orders loaded");
        }
        Ok(engine)
    }

    /// Sets the tax rate applied to orders created from now on.
    pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn inventory(&self) -> &Arc<InventoryEngine<P>> {
        &self.inventory
    }

    /// Creates a pending order.
    ///
    /// Every product must exist and have enough stock for the combined
    /// quantity requested across lines. No stock is consumed yet.
    #[tracing::instrument(skip(self, cmd), fields(customer_id = %cmd.customer_id))]
    pub fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("order has no items"));
        }

        let catalog = self.inventory.catalog();
        let mut requested: HashMap<&ProductId, u32> = HashMap::new();
        let mut items = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if line.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for {} must be greater than 0",
                    line.product_id
                )));
            }
            let product = catalog
                .get(&line.product_id)
                .ok_or_else(|| DomainError::product_not_found(&line.product_id))?;

            let total = requested.entry(&line.product_id).or_default();
            *total = total.saturating_add(line.quantity);
            if *total > product.quantity_in_stock {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id.clone(),
                    requested: *total,
                    available: product.quantity_in_stock,
                });
            }

            let mut item = OrderItem::new(
                product.id.clone(),
                product.name.clone(),
                product.selling_price,
                line.quantity,
            );
            if let Some(percent) = line.discount_percent {
                item = item.with_discount_percent(percent);
            }
            items.push(item);
        }

        let mut order = Order::new(
            self.ids.next_order_id(),
            cmd.customer_id,
            self.clock.now(),
            items,
            self.tax_rate,
            cmd.discount,
        )?;
        order.payment_method = cmd.payment_method;
        order.notes = cmd.notes;

        let mut index = self.index.write();
        if index.orders.contains_key(&order.id) {
            return Err(DomainError::DuplicateKey {
                entity: "Order",
                key: order.id.to_string(),
            });
        }
        self.inventory.catalog().store().save_order(&order)?;
        index.order.push(order.id.clone());
        index
            .orders
            .insert(order.id.clone(), Arc::new(Mutex::new(order.clone())));
        drop(index);

        metrics::counter!("orders_created_total").increment(1);
        info!(order_id = %order.id, total = %order.final_amount(), "Order created");
        Ok(order)
    }

    /// Sells every item and completes the order.
    ///
    /// Items are sold in order. If one fails the error is returned, the order
    /// stays PENDING, and items sold before it are not put back.
    #[tracing::instrument(skip(self))]
    pub fn process_order(&self, id: &OrderId) -> Result<Order> {
        let started = Instant::now();
        let result = self.with_order(id, |order| {
            if !order.status.can_process() {
                return Err(invalid_state(order, "process"));
            }

            for item in order.items() {
                self.inventory
                    .sell(&item.product_id, item.quantity, order.id.as_str())
                    .inspect_err(|e| {
                        warn!(
                            product_id = %item.product_id,
                            error = %e,
                            "Order item could not be sold"
                        );
                    })?;
            }

            let amount = order.final_amount();
            let credited = !order.customer_id.is_walk_in();
            if credited {
                self.customers.apply_purchase(&order.customer_id, amount)?;
            }

            let mut updated = order.clone();
            updated.status = OrderStatus::Completed;
            updated.completed_at = Some(self.clock.now());
            updated.recorded_purchase = credited.then_some(amount);

            if let Err(e) = self.inventory.catalog().store().save_order(&updated) {
                if credited
                    && let Err(undo) = self.customers.reverse_purchase(&order.customer_id, amount)
                {
                    error!(
                        error = %undo,
                        "Failed to reverse customer purchase after order save failed"
                    );
                }
                return Err(e.into());
            }

            *order = updated.clone();
            Ok(updated)
        });

        match &result {
            Ok(order) => {
                metrics::counter!("orders_completed_total").increment(1);
                metrics::histogram!("order_processing_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                info!(total = %order.final_amount(), "Order completed");
            }
            Err(e) => {
                metrics::counter!("order_processing_failures_total").increment(1);
                warn!(error = %e, "Order processing failed");
            }
        }
        result
    }

    /// Cancels an order.
    ///
    /// A completed order has every item returned to stock and its recorded
    /// customer purchase reversed before it is marked CANCELLED. If any step
    /// fails the status is unchanged; items already returned stay returned.
    #[tracing::instrument(skip(self))]
    pub fn cancel_order(&self, id: &OrderId) -> Result<Order> {
        let cancelled = self.with_order(id, |order| {
            if !order.status.can_cancel() {
                return Err(invalid_state(order, "cancel"));
            }

            let reversed = match order.status {
                OrderStatus::Completed => {
                    for item in order.items() {
                        self.inventory.return_stock(
                            &item.product_id,
                            item.quantity,
                            CANCELLATION_REASON,
                            order.id.as_str(),
                        )?;
                    }
                    if let Some(amount) = order.recorded_purchase {
                        self.customers
                            .reverse_purchase(&order.customer_id, amount)?;
                    }
                    order.recorded_purchase
                }
                _ => None,
            };

            let mut updated = order.clone();
            updated.status = OrderStatus::Cancelled;
            updated.cancelled_at = Some(self.clock.now());

            if let Err(e) = self.inventory.catalog().store().save_order(&updated) {
                if let Some(amount) = reversed
                    && let Err(undo) = self.customers.apply_purchase(&order.customer_id, amount)
                {
                    error!(
                        error = %undo,
                        "Failed to restore customer purchase after order save failed"
                    );
                }
                return Err(e.into());
            }

            *order = updated.clone();
            Ok(updated)
        })?;

        metrics::counter!("orders_cancelled_total").increment(1);
        info!("Order cancelled");
        Ok(cancelled)
    }

    /// Applies every requested change to a pending order in one save.
    #[tracing::instrument(skip(self))]
    pub fn modify_order(&self, id: &OrderId, changes: ModifyOrder) -> Result<Order> {
        if changes.is_empty() {
            return Err(DomainError::validation("nothing to change"));
        }
        self.modify_pending(id, "modify", |order| {
            if let Some(discount) = changes.discount {
                order.set_discount(discount)?;
            }
            if let Some(method) = changes.payment_method {
                order.payment_method = method;
            }
            if let Some(notes) = changes.notes {
                order.notes = Some(notes);
            }
            Ok(())
        })
    }

    /// Replaces the order-level discount on a pending order.
    #[tracing::instrument(skip(self))]
    pub fn apply_discount(&self, id: &OrderId, discount: Money) -> Result<Order> {
        self.modify_pending(id, "discount", |order| {
            order.set_discount(discount)?;
            Ok(())
        })
    }

    #[tracing::instrument(skip(self, notes))]
    pub fn set_notes(&self, id: &OrderId, notes: Option<String>) -> Result<Order> {
        self.modify_pending(id, "annotate", |order| {
            order.notes = notes;
            Ok(())
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn set_payment_method(&self, id: &OrderId, method: PaymentMethod) -> Result<Order> {
        self.modify_pending(id, "change payment method of", |order| {
            order.payment_method = method;
            Ok(())
        })
    }

    pub fn get(&self, id: &OrderId) -> Option<Order> {
        let handle = self.index.read().orders.get(id).cloned()?;
        let order = handle.lock().clone();
        Some(order)
    }

    /// Every order in creation order.
    pub fn all(&self) -> Vec<Order> {
        let handles: Vec<Arc<Mutex<Order>>> = {
            let index = self.index.read();
            index
                .order
                .iter()
                .filter_map(|id| index.orders.get(id).cloned())
                .collect()
        };
        handles.iter().map(|handle| handle.lock().clone()).collect()
    }

    /// A customer's orders, newest first.
    pub fn by_customer(&self, customer_id: &CustomerId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|order| &order.customer_id == customer_id)
            .collect();
        sort_newest_first(&mut orders);
        orders
    }

    /// Orders created within `[from, to]`, newest first.
    pub fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|order| order.created_at >= from && order.created_at <= to)
            .collect();
        sort_newest_first(&mut orders);
        orders
    }

    /// Final amounts of completed orders created within `[from, to]`.
    pub fn total_sales(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Money {
        let orders = self.by_date_range(from, to);
        report::completed(&orders).map(Order::final_amount).sum()
    }

    /// Units in completed orders created within `[from, to]`.
    pub fn items_sold(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
        let orders = self.by_date_range(from, to);
        report::completed(&orders).map(Order::total_quantity).sum()
    }

    /// Line revenue of completed orders grouped by each product's current
    /// category. Products no longer in the catalog are left out.
    pub fn sales_by_category(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BTreeMap<String, Money> {
        let orders = self.by_date_range(from, to);
        let catalog = self.inventory.catalog();

        let mut categories: HashMap<ProductId, Option<String>> = HashMap::new();
        let mut sales: BTreeMap<String, Money> = BTreeMap::new();
        for order in report::completed(&orders) {
            for item in order.items() {
                let category = categories
                    .entry(item.product_id.clone())
                    .or_insert_with(|| catalog.get(&item.product_id).map(|p| p.category));
                if let Some(category) = category {
                    *sales.entry(category.clone()).or_default() += item.net_total();
                }
            }
        }
        sales
    }

    /// Best-selling products by units in completed orders.
    pub fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Vec<ProductSales> {
        let orders = self.by_date_range(from, to);
        report::rank_products(&orders, limit)
    }

    pub fn sales_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        top: usize,
    ) -> SalesReport {
        let orders = self.by_date_range(from, to);
        SalesReport {
            from,
            to,
            completed_orders: report::completed(&orders).count(),
            total_sales: report::completed(&orders).map(Order::final_amount).sum(),
            items_sold: report::completed(&orders).map(Order::total_quantity).sum(),
            sales_by_category: self.sales_by_category(from, to),
            top_products: report::rank_products(&orders, top),
        }
    }

    pub fn len(&self) -> usize {
        self.index.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_order<T>(&self, id: &OrderId, f: impl FnOnce(&mut Order) -> Result<T>) -> Result<T> {
        let handle = self
            .index
            .read()
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::order_not_found(id))?;
        let mut order = handle.lock();
        f(&mut *order)
    }

    fn modify_pending(
        &self,
        id: &OrderId,
        action: &'static str,
        edit: impl FnOnce(&mut Order) -> Result<()>,
    ) -> Result<Order> {
        self.with_order(id, |order| {
            if !order.status.can_modify() {
                return Err(invalid_state(order, action));
            }
            let mut updated = order.clone();
            edit(&mut updated)?;
            self.inventory.catalog().store().save_order(&updated)?;
            *order = updated.clone();
            Ok(updated)
        })
    }
}

fn invalid_state(order: &Order, action: &'static str) -> DomainError {
    DomainError::InvalidState {
        order_id: order.id.clone(),
        status: order.status,
        action,
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
