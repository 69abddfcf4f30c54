//! HTTP API server for the inventory and order engine.
//!
//! Provides REST endpoints for the product catalog, stock movements, orders
//! and sales reports, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use common::{Clock, IdGenerator, OrderStatus, SequentialIdGenerator, UuidIdGenerator};
use domain::{CustomerLedger, InMemoryCustomerLedger, InventoryEngine, LoggingAlert, OrderEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{OrderStore, Persistence};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, OrderIdScheme};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub inventory: Arc<InventoryEngine<dyn Persistence>>,
    pub orders: OrderEngine<dyn Persistence>,
    pub customers: Arc<InMemoryCustomerLedger>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/products",
            get(routes::products::list).post(routes::products::create),
        )
        .route(
            "/products/{id}",
            get(routes::products::get)
                .put(routes::products::update)
                .delete(routes::products::remove),
        )
        .route(
            "/products/barcode/{barcode}",
            get(routes::products::by_barcode),
        )
        .route("/products/{id}/restock", post(routes::products::restock))
        .route("/products/{id}/sell", post(routes::products::sell))
        .route("/products/{id}/return", post(routes::products::return_stock))
        .route("/products/{id}/movements", get(routes::products::movements))
        .route("/inventory/reorder", get(routes::inventory::reorder))
        .route("/inventory/expiring", get(routes::inventory::expiring))
        .route("/inventory/expired", get(routes::inventory::expired))
        .route("/inventory/statistics", get(routes::inventory::statistics))
        .route("/inventory/categories", get(routes::inventory::categories))
        .route("/inventory/reconcile", get(routes::inventory::reconcile))
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get).patch(routes::orders::modify),
        )
        .route("/orders/{id}/process", post(routes::orders::process))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/customers/{id}", get(routes::customers::account))
        .route("/customers/{id}/orders", get(routes::customers::orders))
        .route("/reports/sales", get(routes::reports::sales))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the engines over `store`, restoring whatever it already holds.
///
/// Customer accounts are not persisted; they are rebuilt from the purchases
/// recorded on completed orders. Sequential order numbering continues after
/// the highest stored `ORD-` number.
pub fn create_state(
    store: Arc<dyn Persistence>,
    config: &Config,
    clock: Arc<dyn Clock>,
) -> domain::Result<Arc<AppState>> {
    let inventory = Arc::new(InventoryEngine::load(
        store.clone(),
        Arc::new(LoggingAlert),
        clock.clone(),
    )?);

    let stored = store.load_orders()?;
    let ids: Arc<dyn IdGenerator> = match config.order_ids {
        OrderIdScheme::Uuid => Arc::new(UuidIdGenerator),
        OrderIdScheme::Sequential => {
            let last = stored
                .iter()
                .filter_map(|order| order.id.as_str().strip_prefix("ORD-")?.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            Arc::new(SequentialIdGenerator::starting_after(last))
        }
    };

    let customers = Arc::new(InMemoryCustomerLedger::new());
    for order in &stored {
        if order.status == OrderStatus::Completed
            && let Some(amount) = order.recorded_purchase
        {
            customers.apply_purchase(&order.customer_id, amount)?;
        }
    }

    let orders = OrderEngine::load(
        inventory.clone(),
        customers.clone(),
        ids,
        clock,
    )?
    .with_tax_rate(config.tax_rate);

    Ok(Arc::new(AppState {
        inventory,
        orders,
        customers,
    }))
}

/// Registers descriptions for the engine's metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "inventory_movements_total",
        "Stock movements appended to the ledger, by kind"
    );
    metrics::describe_counter!(
        "inventory_low_stock_alerts_total",
        "Low-stock alerts raised after a sale"
    );
    metrics::describe_counter!("orders_created_total", "Orders created");
    metrics::describe_counter!("orders_completed_total", "Orders processed to completion");
    metrics::describe_counter!("orders_cancelled_total", "Orders cancelled");
    metrics::describe_counter!(
        "order_processing_failures_total",
        "Order processing attempts that failed"
    );
    metrics::describe_histogram!(
        "order_processing_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent processing an order"
    );
}
