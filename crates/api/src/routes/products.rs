//! Product catalog and stock movement endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use common::{Money, MovementKind, Product, ProductId, StockMovement};
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring match on the searchable product fields.
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub id: String,
    pub barcode: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub quantity_in_stock: u32,
    pub min_stock_level: Option<u32>,
    pub max_stock_level: Option<u32>,
    #[serde(default)]
    pub perishable: bool,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub location: Option<String>,
    pub unit: Option<String>,
}

impl CreateProductRequest {
    fn into_product(self) -> Product {
        let mut product = Product::new(
            self.id,
            self.barcode,
            self.name,
            self.category,
            Money::from_cents(self.purchase_price_cents),
            Money::from_cents(self.selling_price_cents),
        )
        .with_stock(self.quantity_in_stock)
        .with_levels(
            self.min_stock_level.unwrap_or(Product::DEFAULT_MIN_STOCK),
            self.max_stock_level.unwrap_or(Product::DEFAULT_MAX_STOCK),
        );
        if self.perishable {
            product = product.perishable(self.expiry_date);
        }
        product.description = self.description;
        product.supplier_id = self.supplier_id;
        product.location = self.location;
        product.unit = self.unit;
        product
    }
}

/// Descriptive fields only; stock counters change through movements.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub purchase_price_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub min_stock_level: Option<u32>,
    pub max_stock_level: Option<u32>,
    pub perishable: Option<bool>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub location: Option<String>,
    pub unit: Option<String>,
}

impl UpdateProductRequest {
    fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if self.description.is_some() {
            product.description = self.description;
        }
        if let Some(cents) = self.purchase_price_cents {
            product.purchase_price = Money::from_cents(cents);
        }
        if let Some(cents) = self.selling_price_cents {
            product.selling_price = Money::from_cents(cents);
        }
        if let Some(min) = self.min_stock_level {
            product.min_stock_level = min;
        }
        if let Some(max) = self.max_stock_level {
            product.max_stock_level = max;
        }
        if let Some(perishable) = self.perishable {
            product.perishable = perishable;
            if !perishable {
                product.expiry_date = None;
            }
        }
        if self.expiry_date.is_some() && product.perishable {
            product.expiry_date = self.expiry_date;
        }
        if self.supplier_id.is_some() {
            product.supplier_id = self.supplier_id;
        }
        if self.location.is_some() {
            product.location = self.location;
        }
        if self.unit.is_some() {
            product.unit = self.unit;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: u32,
    #[serde(default)]
    pub batch_reference: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub quantity: u32,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub quantity: u32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub reference: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub barcode: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    pub quantity_in_stock: u32,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
    pub needs_reorder: bool,
    pub perishable: bool,
    pub expiry_date: Option<NaiveDate>,
    pub quantity_sold: u64,
    pub last_restocked: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub location: Option<String>,
    pub unit: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            needs_reorder: p.needs_reorder(),
            id: p.id.to_string(),
            barcode: p.barcode,
            name: p.name,
            category: p.category,
            description: p.description,
            purchase_price_cents: p.purchase_price.cents(),
            selling_price_cents: p.selling_price.cents(),
            quantity_in_stock: p.quantity_in_stock,
            min_stock_level: p.min_stock_level,
            max_stock_level: p.max_stock_level,
            perishable: p.perishable,
            expiry_date: p.expiry_date,
            quantity_sold: p.quantity_sold,
            last_restocked: p.last_restocked,
            supplier_id: p.supplier_id,
            location: p.location,
            unit: p.unit,
        }
    }
}

#[derive(Serialize)]
pub struct MovementResponse {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub product_id: String,
    pub kind: MovementKind,
    pub delta: i64,
    pub quantity_after: u32,
    pub reference: String,
}

impl From<StockMovement> for MovementResponse {
    fn from(m: StockMovement) -> Self {
        Self {
            sequence: m.sequence,
            timestamp: m.timestamp,
            product_id: m.product_id.to_string(),
            kind: m.kind,
            delta: m.delta,
            quantity_after: m.quantity_after,
            reference: m.reference,
        }
    }
}

pub(crate) fn respond(products: Vec<Product>) -> Json<Vec<ProductResponse>> {
    Json(products.into_iter().map(ProductResponse::from).collect())
}

// -- Handlers --

/// GET /products — list the catalog, optionally filtered.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ProductResponse>> {
    let catalog = state.inventory.catalog();
    let term = query.q.as_deref().filter(|q| !q.trim().is_empty());
    let products = match (term, query.category.as_deref()) {
        (Some(term), Some(category)) => catalog
            .search(term)
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect(),
        (Some(term), None) => catalog.search(term),
        (None, Some(category)) => catalog.by_category(category),
        (None, None) => catalog.all(),
    };
    respond(products)
}

/// POST /products — register a product with its opening stock.
#[tracing::instrument(skip(state, req), fields(product_id = %req.id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = req.into_product();
    let created = blocking(&state, move |s| s.inventory.register_product(product)).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /products/:id
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .inventory
        .catalog()
        .get(&ProductId::new(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(product.into()))
}

/// GET /products/barcode/:barcode
#[tracing::instrument(skip(state))]
pub async fn by_barcode(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .inventory
        .catalog()
        .get_by_barcode(&barcode)
        .ok_or_else(|| ApiError::NotFound(format!("No product with barcode {barcode}")))?;
    Ok(Json(product.into()))
}

/// PUT /products/:id — replace descriptive fields.
#[tracing::instrument(skip(state, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = ProductId::new(id);
    let updated = blocking(&state, move |s| {
        let catalog = s.inventory.catalog();
        let mut product = catalog
            .get(&id)
            .ok_or_else(|| domain::DomainError::product_not_found(&id))?;
        req.apply(&mut product);
        catalog.update(product)
    })
    .await?;
    Ok(Json(updated.into()))
}

/// DELETE /products/:id
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = ProductId::new(id);
    let removed = blocking(&state, move |s| s.inventory.catalog().remove(&id)).await?;
    Ok(Json(removed.into()))
}

/// POST /products/:id/restock
#[tracing::instrument(skip(state, req), fields(quantity = req.quantity))]
pub async fn restock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = ProductId::new(id);
    let product = blocking(&state, move |s| {
        s.inventory
            .add_stock(&id, req.quantity, &req.batch_reference, req.expiry_date)
    })
    .await?;
    Ok(Json(product.into()))
}

/// POST /products/:id/sell — direct sale outside an order.
#[tracing::instrument(skip(state, req), fields(quantity = req.quantity))]
pub async fn sell(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SellRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = ProductId::new(id);
    let product =
        blocking(&state, move |s| s.inventory.sell(&id, req.quantity, &req.reference)).await?;
    Ok(Json(product.into()))
}

/// POST /products/:id/return
#[tracing::instrument(skip(state, req), fields(quantity = req.quantity))]
pub async fn return_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = ProductId::new(id);
    let product = blocking(&state, move |s| {
        s.inventory
            .return_stock(&id, req.quantity, &req.reason, &req.reference)
    })
    .await?;
    Ok(Json(product.into()))
}

/// GET /products/:id/movements — ledger history, oldest first.
#[tracing::instrument(skip(state))]
pub async fn movements(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    let movements = state.inventory.movements(&ProductId::new(id))?;
    Ok(Json(
        movements.into_iter().map(MovementResponse::from).collect(),
    ))
}
