//! Sales reporting over completed orders.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use common::{Money, Order, OrderStatus, ProductId};
use serde::Serialize;

/// Units and revenue for one product over a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u64,
    pub revenue: Money,
}

/// Summary of completed orders in a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub completed_orders: usize,
    pub total_sales: Money,
    pub items_sold: u64,
    pub sales_by_category: BTreeMap<String, Money>,
    pub top_products: Vec<ProductSales>,
}

pub(crate) fn completed(orders: &[Order]) -> impl Iterator<Item = &Order> {
    orders
        .iter()
        .filter(|order| order.status == OrderStatus::Completed)
}

/// Ranks products by units sold, then by revenue, then by id.
pub(crate) fn rank_products(orders: &[Order], limit: usize) -> Vec<ProductSales> {
    let mut totals: HashMap<&ProductId, ProductSales> = HashMap::new();
    for order in completed(orders) {
        for item in order.items() {
            let entry = totals.entry(&item.product_id).or_insert_with(|| ProductSales {
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
            entry.quantity += u64::from(item.quantity);
            entry.revenue += item.net_total();
        }
    }

    let mut ranked: Vec<ProductSales> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}
