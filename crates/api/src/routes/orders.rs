//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, Order, OrderId, OrderItem, OrderStatus, PaymentMethod};
use domain::{CreateOrder, ModifyOrder};
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Omitted for walk-in sales.
    pub customer_id: Option<String>,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub discount_percent: Option<u8>,
}

impl CreateOrderRequest {
    fn into_command(self) -> CreateOrder {
        let customer = self
            .customer_id
            .filter(|id| !id.trim().is_empty())
            .map(CustomerId::new)
            .unwrap_or_else(CustomerId::walk_in);

        let mut cmd = CreateOrder::for_customer(customer)
            .discount(Money::from_cents(self.discount_cents))
            .payment_method(self.payment_method);
        for item in self.items {
            cmd = match item.discount_percent {
                Some(percent) => cmd.discounted_item(item.product_id, item.quantity, percent),
                None => cmd.item(item.product_id, item.quantity),
            };
        }
        if let Some(notes) = self.notes {
            cmd = cmd.notes(notes);
        }
        cmd
    }
}

/// Changes allowed while an order is pending.
#[derive(Debug, Deserialize)]
pub struct ModifyOrderRequest {
    pub discount_cents: Option<i64>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub final_amount_cents: i64,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub discount_percent: Option<u8>,
    pub line_total_cents: i64,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.to_string(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            discount_percent: item.discount_percent,
            line_total_cents: item.line_total().cents(),
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            items: order.items().iter().map(OrderItemResponse::from).collect(),
            subtotal_cents: order.subtotal().cents(),
            tax_rate_bps: order.tax_rate().basis_points(),
            tax_cents: order.tax().cents(),
            discount_cents: order.discount().cents(),
            final_amount_cents: order.final_amount().cents(),
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            status: order.status,
            created_at: order.created_at,
            completed_at: order.completed_at,
            cancelled_at: order.cancelled_at,
            payment_method: order.payment_method,
            notes: order.notes,
        }
    }
}

pub(crate) fn respond(orders: Vec<Order>) -> Json<Vec<OrderResponse>> {
    Json(orders.into_iter().map(OrderResponse::from).collect())
}

// -- Handlers --

/// POST /orders — create a pending order. No stock moves until processing.
#[tracing::instrument(skip(state, req), fields(lines = req.items.len()))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let cmd = req.into_command();
    let order = blocking(&state, move |s| s.orders.create_order(cmd)).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — every order in creation order, or newest first when a
/// date range is given.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut orders = match (query.from, query.to) {
        (Some(from), Some(to)) => state.orders.by_date_range(from, to),
        (None, None) => state.orders.all(),
        _ => {
            return Err(ApiError::BadRequest(
                "from and to must be given together".to_string(),
            ));
        }
    };
    if let Some(status) = query.status {
        orders.retain(|o| o.status == status);
    }
    Ok(respond(orders))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get(&OrderId::new(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(order.into()))
}

/// PATCH /orders/:id — change discount, notes or payment method.
#[tracing::instrument(skip(state, req))]
pub async fn modify(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ModifyOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let mut changes = ModifyOrder::new();
    if let Some(cents) = req.discount_cents {
        changes = changes.discount(Money::from_cents(cents));
    }
    if let Some(method) = req.payment_method {
        changes = changes.payment_method(method);
    }
    if let Some(notes) = req.notes {
        changes = changes.notes(notes);
    }
    if changes.is_empty() {
        return Err(ApiError::BadRequest("nothing to change".to_string()));
    }

    let id = OrderId::new(id);
    let order = blocking(&state, move |s| s.orders.modify_order(&id, changes)).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/process — sell every item and complete the order.
#[tracing::instrument(skip(state))]
pub async fn process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = OrderId::new(id);
    let order = blocking(&state, move |s| s.orders.process_order(&id)).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/cancel — cancel, returning stock if already completed.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = OrderId::new(id);
    let order = blocking(&state, move |s| s.orders.cancel_order(&id)).await?;
    Ok(Json(order.into()))
}
