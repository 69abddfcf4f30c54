//! Integration tests for the order engine.
//!
//! These tests cover the full order lifecycle including stock consumption,
//! customer ledger updates, cancellation and the documented partial-failure
//! behaviour of processing.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use domain::{
    Clock, CreateOrder, CustomerId, DomainError, FixedClock, InMemoryCustomerLedger, InventoryEngine,
    ModifyOrder, Money, MovementKind, OrderEngine, OrderId, OrderStatus, PaymentMethod, Product,
    ProductId, RecordingAlert, SequentialIdGenerator,
};
use store::InMemoryStore;

struct Harness {
    store: Arc<InMemoryStore>,
    customers: InMemoryCustomerLedger,
    clock: FixedClock,
    orders: OrderEngine<InMemoryStore>,
}

impl Harness {
    fn inventory(&self) -> &InventoryEngine<InMemoryStore> {
        self.orders.inventory()
    }

    fn stock(&self, id: &str) -> u32 {
        self.inventory()
            .catalog()
            .get(&ProductId::new(id))
            .unwrap()
            .quantity_in_stock
    }
}

/// Apple at 2.00 (stock 20) and Bread at 5.00 (stock 10).
fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap());
    let inventory = Arc::new(InventoryEngine::new(
        store.clone(),
        Arc::new(RecordingAlert::new()),
        Arc::new(clock.clone()),
    ));

    inventory
        .register_product(
            Product::new(
                "APPLE",
                "1001",
                "Apple",
                "Produce",
                Money::from_cents(120),
                Money::from_cents(200),
            )
            .with_stock(20)
            .with_levels(2, 100),
        )
        .unwrap();
    inventory
        .register_product(
            Product::new(
                "BREAD",
                "1002",
                "Bread",
                "Bakery",
                Money::from_cents(300),
                Money::from_cents(500),
            )
            .with_stock(10)
            .with_levels(2, 100),
        )
        .unwrap();

    let customers = InMemoryCustomerLedger::new();
    let orders = OrderEngine::new(
        inventory,
        Arc::new(customers.clone()),
        Arc::new(SequentialIdGenerator::new()),
        Arc::new(clock.clone()),
    );

    Harness {
        store,
        customers,
        clock,
        orders,
    }
}

fn basket(customer: &str) -> CreateOrder {
    CreateOrder::for_customer(customer)
        .item("APPLE", 3)
        .item("BREAD", 1)
}

mod creation {
    use super::*;

    #[test]
    fn computes_totals_with_tax() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        assert_eq!(order.id, OrderId::new("ORD-000001"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal().cents(), 1_100);
        assert_eq!(order.tax().cents(), 88);
        assert_eq!(order.final_amount().cents(), 1_188);
        assert_eq!(order.items()[0].product_name, "Apple");
        assert_eq!(order.items()[0].unit_price.cents(), 200);

        // Creation does not consume stock
        assert_eq!(h.stock("APPLE"), 20);
        assert_eq!(h.store.stored_order(&order.id), Some(order));
    }

    #[test]
    fn snapshots_survive_price_changes() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        let mut apple = h.inventory().catalog().get(&ProductId::new("APPLE")).unwrap();
        apple.selling_price = Money::from_cents(900);
        h.inventory().catalog().update(apple).unwrap();

        let stored = h.orders.get(&order.id).unwrap();
        assert_eq!(stored.items()[0].unit_price.cents(), 200);
    }

    #[test]
    fn rejects_unknown_products_and_short_stock() {
        let h = harness();

        let unknown = h
            .orders
            .create_order(CreateOrder::walk_in().item("GHOST", 1));
        assert!(matches!(unknown, Err(DomainError::NotFound { .. })));

        let short = h
            .orders
            .create_order(CreateOrder::walk_in().item("BREAD", 6).item("BREAD", 5));
        assert!(matches!(
            short,
            Err(DomainError::InsufficientStock {
                requested: 11,
                available: 10,
                ..
            })
        ));

        let empty = h.orders.create_order(CreateOrder::walk_in());
        assert!(matches!(empty, Err(DomainError::Validation(_))));

        assert!(h.orders.is_empty());
    }

    #[test]
    fn store_failure_leaves_nothing_visible() {
        let h = harness();
        h.store.set_fail_order_saves(true);

        assert!(matches!(
            h.orders.create_order(basket("CUST-1")),
            Err(DomainError::Persistence(_))
        ));
        assert!(h.orders.all().is_empty());
        assert_eq!(h.store.order_count(), 0);
    }

    #[test]
    fn optional_fields_are_kept() {
        let h = harness();
        let order = h
            .orders
            .create_order(
                basket("CUST-1")
                    .discount(Money::from_cents(88))
                    .payment_method(PaymentMethod::Card)
                    .notes("leave at door"),
            )
            .unwrap();

        assert_eq!(order.final_amount().cents(), 1_100);
        assert_eq!(order.payment_method, PaymentMethod::Card);
        assert_eq!(order.notes.as_deref(), Some("leave at door"));
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn process_consumes_stock_and_credits_customer() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        let completed = h.orders.process_order(&order.id).unwrap();
        assert_eq!(completed.status, OrderStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.recorded_purchase, Some(Money::from_cents(1_188)));

        assert_eq!(h.stock("APPLE"), 17);
        assert_eq!(h.stock("BREAD"), 9);

        let account = h.customers.account(&CustomerId::new("CUST-1")).unwrap();
        assert_eq!(account.total_spent.cents(), 1_188);
        assert_eq!(account.loyalty_points, 1);

        let sale = h
            .inventory()
            .ledger()
            .for_product(&ProductId::new("APPLE"))
            .to_vec()
            .pop()
            .unwrap();
        assert_eq!(sale.kind, MovementKind::Sale);
        assert_eq!(sale.reference, order.id.as_str());
    }

    #[test]
    fn walk_in_orders_skip_customer_ledger() {
        let h = harness();
        let order = h
            .orders
            .create_order(CreateOrder::walk_in().item("APPLE", 1))
            .unwrap();

        let completed = h.orders.process_order(&order.id).unwrap();
        assert_eq!(completed.recorded_purchase, None);
        assert!(h.customers.account(&CustomerId::walk_in()).is_none());
    }

    #[test]
    fn cannot_process_twice() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.orders.process_order(&order.id).unwrap();

        assert!(matches!(
            h.orders.process_order(&order.id),
            Err(DomainError::InvalidState {
                status: OrderStatus::Completed,
                ..
            })
        ));
        assert_eq!(h.stock("APPLE"), 17);
    }

    #[test]
    fn cancel_completed_restores_stock_and_reverses_purchase() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.orders.process_order(&order.id).unwrap();

        let cancelled = h.orders.cancel_order(&order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        assert_eq!(h.stock("APPLE"), 20);
        assert_eq!(h.stock("BREAD"), 10);

        let account = h.customers.account(&CustomerId::new("CUST-1")).unwrap();
        assert_eq!(account.total_spent, Money::zero());
        assert_eq!(account.loyalty_points, 0);

        let ret = h
            .inventory()
            .ledger()
            .for_product(&ProductId::new("BREAD"))
            .to_vec()
            .pop()
            .unwrap();
        assert_eq!(ret.kind, MovementKind::Return);
        assert!(ret.reference.contains("order cancellation"));
    }

    #[test]
    fn cancel_pending_touches_no_stock() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        let cancelled = h.orders.cancel_order(&order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(h.stock("APPLE"), 20);
        assert_eq!(h.inventory().ledger().len(), 2);

        assert!(matches!(
            h.orders.cancel_order(&order.id),
            Err(DomainError::InvalidState { .. })
        ));
        assert!(matches!(
            h.orders.process_order(&order.id),
            Err(DomainError::InvalidState { .. })
        ));
    }

    #[test]
    fn unknown_order() {
        let h = harness();
        let missing = OrderId::new("ORD-999999");
        assert!(matches!(
            h.orders.process_order(&missing),
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            h.orders.cancel_order(&missing),
            Err(DomainError::NotFound { .. })
        ));
        assert!(h.orders.get(&missing).is_none());
    }

    #[test]
    fn pending_modifications() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        let updated = h
            .orders
            .apply_discount(&order.id, Money::from_cents(188))
            .unwrap();
        assert_eq!(updated.final_amount().cents(), 1_000);

        assert!(matches!(
            h.orders.apply_discount(&order.id, Money::from_cents(5_000)),
            Err(DomainError::Validation(_))
        ));

        h.orders
            .set_payment_method(&order.id, PaymentMethod::Transfer)
            .unwrap();
        h.orders
            .set_notes(&order.id, Some("call first".to_string()))
            .unwrap();

        let stored = h.store.stored_order(&order.id).unwrap();
        assert_eq!(stored.payment_method, PaymentMethod::Transfer);
        assert_eq!(stored.notes.as_deref(), Some("call first"));
        assert_eq!(stored.discount().cents(), 188);

        h.orders.process_order(&order.id).unwrap();
        assert!(matches!(
            h.orders.set_notes(&order.id, None),
            Err(DomainError::InvalidState { .. })
        ));
    }

    #[test]
    fn combined_modification_is_all_or_nothing() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        // The oversized discount fails after the other changes were staged
        let rejected = ModifyOrder::new()
            .payment_method(PaymentMethod::Card)
            .notes("ring twice")
            .discount(Money::from_cents(5_000));
        assert!(matches!(
            h.orders.modify_order(&order.id, rejected),
            Err(DomainError::Validation(_))
        ));
        let stored = h.store.stored_order(&order.id).unwrap();
        assert_eq!(stored.payment_method, order.payment_method);
        assert_eq!(stored.notes, order.notes);
        assert_eq!(h.orders.get(&order.id).unwrap(), order);

        let accepted = ModifyOrder::new()
            .payment_method(PaymentMethod::Card)
            .notes("ring twice")
            .discount(Money::from_cents(188));
        let updated = h.orders.modify_order(&order.id, accepted).unwrap();
        assert_eq!(updated.final_amount().cents(), 1_000);
        assert_eq!(h.store.stored_order(&order.id).unwrap(), updated);

        assert!(matches!(
            h.orders.modify_order(&order.id, ModifyOrder::new()),
            Err(DomainError::Validation(_))
        ));
    }
}

mod failures {
    use super::*;

    #[test]
    fn partial_processing_is_not_rolled_back() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();

        // Bread sells out between creation and processing
        h.inventory()
            .sell(&ProductId::new("BREAD"), 10, "COUNTER")
            .unwrap();

        let result = h.orders.process_order(&order.id);
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock { available: 0, .. })
        ));

        // The apples sold before the failure stay sold
        assert_eq!(h.stock("APPLE"), 17);
        assert_eq!(h.orders.get(&order.id).unwrap().status, OrderStatus::Pending);
        assert!(h.customers.account(&CustomerId::new("CUST-1")).is_none());
    }

    #[test]
    fn order_save_failure_reverses_customer_credit() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.store.set_fail_order_saves(true);

        assert!(matches!(
            h.orders.process_order(&order.id),
            Err(DomainError::Persistence(_))
        ));
        assert_eq!(h.orders.get(&order.id).unwrap().status, OrderStatus::Pending);

        let account = h.customers.account(&CustomerId::new("CUST-1")).unwrap();
        assert_eq!(account.total_spent, Money::zero());
    }

    #[test]
    fn customer_ledger_failure_keeps_order_pending() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.customers.set_fail_on_apply(true);

        assert!(matches!(
            h.orders.process_order(&order.id),
            Err(DomainError::CustomerLedger(_))
        ));
        assert_eq!(h.orders.get(&order.id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn failed_cancellation_keeps_status() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.orders.process_order(&order.id).unwrap();
        h.customers.set_fail_on_reverse(true);

        assert!(matches!(
            h.orders.cancel_order(&order.id),
            Err(DomainError::CustomerLedger(_))
        ));
        assert_eq!(
            h.orders.get(&order.id).unwrap().status,
            OrderStatus::Completed
        );
    }
}

mod queries {
    use super::*;

    #[test]
    fn by_customer_and_date_range_are_newest_first() {
        let h = harness();
        let first = h.orders.create_order(basket("CUST-1")).unwrap();
        h.clock.advance(Duration::hours(1));
        let second = h
            .orders
            .create_order(CreateOrder::for_customer("CUST-2").item("APPLE", 1))
            .unwrap();
        h.clock.advance(Duration::hours(1));
        let third = h
            .orders
            .create_order(CreateOrder::for_customer("CUST-1").item("BREAD", 2))
            .unwrap();

        let mine: Vec<OrderId> = h
            .orders
            .by_customer(&CustomerId::new("CUST-1"))
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(mine, vec![third.id.clone(), first.id.clone()]);

        // Both bounds are inclusive
        let window: Vec<OrderId> = h
            .orders
            .by_date_range(first.created_at, second.created_at)
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(window, vec![second.id, first.id]);
    }

    #[test]
    fn sales_figures_count_completed_orders_only() {
        let h = harness();
        let start = h.clock.now();

        let done = h.orders.create_order(basket("CUST-1")).unwrap();
        h.orders.process_order(&done.id).unwrap();

        let discounted = h
            .orders
            .create_order(CreateOrder::walk_in().discounted_item("BREAD", 2, 50))
            .unwrap();
        h.orders.process_order(&discounted.id).unwrap();

        h.orders
            .create_order(CreateOrder::walk_in().item("APPLE", 5))
            .unwrap();

        let end = start + Duration::days(1);
        assert_eq!(h.orders.total_sales(start, end).cents(), 1_188 + 1_080);
        assert_eq!(h.orders.items_sold(start, end), 6);

        let by_category = h.orders.sales_by_category(start, end);
        assert_eq!(by_category["Produce"].cents(), 600);
        assert_eq!(by_category["Bakery"].cents(), 500 + 500);

        // Apple and bread tie on units; bread earned more
        let top = h.orders.top_products(start, end, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, ProductId::new("BREAD"));
        assert_eq!(top[0].quantity, 3);
        assert_eq!(top[0].revenue.cents(), 1_000);

        let report = h.orders.sales_report(start, end, 5);
        assert_eq!(report.completed_orders, 2);
        assert_eq!(report.top_products.len(), 2);
    }

    #[test]
    fn reload_restores_orders() {
        let h = harness();
        let order = h.orders.create_order(basket("CUST-1")).unwrap();
        h.orders.process_order(&order.id).unwrap();

        let reloaded = OrderEngine::load(
            h.orders.inventory().clone(),
            Arc::new(InMemoryCustomerLedger::new()),
            Arc::new(SequentialIdGenerator::starting_after(1)),
            Arc::new(h.clock.clone()),
        )
        .unwrap();
        assert_eq!(reloaded.get(&order.id).unwrap().status, OrderStatus::Completed);

        let next = reloaded
            .create_order(CreateOrder::walk_in().item("APPLE", 1))
            .unwrap();
        assert_eq!(next.id, OrderId::new("ORD-000002"));
    }
}
