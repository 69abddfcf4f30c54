//! Inventory-wide reads: reorder list, expiry, statistics and reconciliation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use domain::{CategorySummary, Discrepancy, InventoryStatistics};
use serde::{Deserialize, Serialize};

use super::products::{ProductResponse, respond};
use crate::AppState;

const DEFAULT_EXPIRY_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<u32>,
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub total_products: usize,
    pub total_units: u64,
    pub total_value_cents: i64,
    pub total_potential_revenue_cents: i64,
    pub low_stock_count: usize,
    pub expired_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl From<InventoryStatistics> for StatisticsResponse {
    fn from(s: InventoryStatistics) -> Self {
        Self {
            total_products: s.total_products,
            total_units: s.total_units,
            total_value_cents: s.total_value.cents(),
            total_potential_revenue_cents: s.total_potential_revenue.cents(),
            low_stock_count: s.low_stock_count,
            expired_count: s.expired_count,
            generated_at: s.generated_at,
        }
    }
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub category: String,
    pub product_count: usize,
    pub total_stock: u64,
    pub stock_value_cents: i64,
    pub potential_revenue_cents: i64,
}

impl From<CategorySummary> for CategoryResponse {
    fn from(c: CategorySummary) -> Self {
        Self {
            category: c.category,
            product_count: c.product_count,
            total_stock: c.total_stock,
            stock_value_cents: c.stock_value.cents(),
            potential_revenue_cents: c.potential_revenue.cents(),
        }
    }
}

/// GET /inventory/reorder — products at or below their minimum level.
pub async fn reorder(State(state): State<Arc<AppState>>) -> Json<Vec<ProductResponse>> {
    respond(state.inventory.needing_reorder())
}

/// GET /inventory/expiring?days=N — perishables expiring within N days (default 7).
#[tracing::instrument(skip(state))]
pub async fn expiring(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiringQuery>,
) -> Json<Vec<ProductResponse>> {
    let days = query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
    respond(state.inventory.expiring_within(days))
}

/// GET /inventory/expired
pub async fn expired(State(state): State<Arc<AppState>>) -> Json<Vec<ProductResponse>> {
    respond(state.inventory.expired())
}

/// GET /inventory/statistics
pub async fn statistics(State(state): State<Arc<AppState>>) -> Json<StatisticsResponse> {
    Json(state.inventory.statistics().into())
}

/// GET /inventory/categories — stock totals per category, by name.
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryResponse>> {
    Json(
        state
            .inventory
            .category_summary()
            .into_iter()
            .map(CategoryResponse::from)
            .collect(),
    )
}

/// GET /inventory/reconcile — products whose stock disagrees with the ledger.
#[tracing::instrument(skip(state))]
pub async fn reconcile(State(state): State<Arc<AppState>>) -> Json<Vec<Discrepancy>> {
    let drift = state.inventory.ledger().reconcile(state.inventory.catalog());
    if !drift.is_empty() {
        tracing::warn!(products = drift.len(), "stock disagrees with ledger");
    }
    Json(drift)
}
