//! Sales reporting endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use common::Clock;
use domain::{ProductSales, SalesReport};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const DEFAULT_TOP_PRODUCTS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub top: Option<usize>,
}

#[derive(Serialize)]
pub struct SalesReportResponse {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub completed_orders: usize,
    pub total_sales_cents: i64,
    pub items_sold: u64,
    pub sales_by_category: Vec<CategorySalesResponse>,
    pub top_products: Vec<ProductSalesResponse>,
}

#[derive(Serialize)]
pub struct CategorySalesResponse {
    pub category: String,
    pub revenue_cents: i64,
}

#[derive(Serialize)]
pub struct ProductSalesResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u64,
    pub revenue_cents: i64,
}

impl From<ProductSales> for ProductSalesResponse {
    fn from(p: ProductSales) -> Self {
        Self {
            product_id: p.product_id.to_string(),
            product_name: p.product_name,
            quantity: p.quantity,
            revenue_cents: p.revenue.cents(),
        }
    }
}

impl From<SalesReport> for SalesReportResponse {
    fn from(r: SalesReport) -> Self {
        Self {
            from: r.from,
            to: r.to,
            completed_orders: r.completed_orders,
            total_sales_cents: r.total_sales.cents(),
            items_sold: r.items_sold,
            sales_by_category: r
                .sales_by_category
                .into_iter()
                .map(|(category, revenue)| CategorySalesResponse {
                    category,
                    revenue_cents: revenue.cents(),
                })
                .collect(),
            top_products: r
                .top_products
                .into_iter()
                .map(ProductSalesResponse::from)
                .collect(),
        }
    }
}

/// GET /reports/sales?from=..&to=..&top=N — completed orders in `[from, to]`.
///
/// A missing bound is open: `from` defaults to the beginning of time and
/// `to` to now.
#[tracing::instrument(skip(state))]
pub async fn sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SalesReportResponse>, ApiError> {
    let from = query.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let to = query.to.unwrap_or_else(|| state.inventory.clock().now());
    if from > to {
        return Err(ApiError::BadRequest(format!(
            "report window starts after it ends ({from} > {to})"
        )));
    }

    let report = state
        .orders
        .sales_report(from, to, query.top.unwrap_or(DEFAULT_TOP_PRODUCTS));
    Ok(Json(report.into()))
}
