//! Customer purchase history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::CustomerId;
use serde::Serialize;

use super::orders::{OrderResponse, respond};
use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct AccountResponse {
    pub customer_id: String,
    pub total_spent_cents: i64,
    pub loyalty_points: u64,
    pub purchase_count: u32,
}

/// GET /customers/:id — purchase totals and loyalty points.
#[tracing::instrument(skip(state))]
pub async fn account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let customer_id = CustomerId::new(id.as_str());
    let account = state
        .customers
        .account(&customer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Customer {id} has no purchases")))?;
    Ok(Json(AccountResponse {
        customer_id: id,
        total_spent_cents: account.total_spent.cents(),
        loyalty_points: account.loyalty_points,
        purchase_count: account.purchase_count,
    }))
}

/// GET /customers/:id/orders — newest first.
#[tracing::instrument(skip(state))]
pub async fn orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<OrderResponse>> {
    respond(state.orders.by_customer(&CustomerId::new(id)))
}
