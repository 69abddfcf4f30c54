use chrono::{DateTime, Utc};
use common::{MovementKind, ProductId, StockMovement};

/// Builder for filtering stock movements.
///
/// Allows filtering by product, movement kind, and time range, with
/// offset/limit paging applied after filtering.
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    /// Filter by product.
    pub product_id: Option<ProductId>,

    /// Filter by movement kinds (any of these).
    pub kinds: Option<Vec<MovementKind>>,

    /// Filter by movements at or after this timestamp.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Filter by movements at or before this timestamp.
    pub to_timestamp: Option<DateTime<Utc>>,

    /// Maximum number of movements to return.
    pub limit: Option<usize>,

    /// Number of movements to skip.
    pub offset: Option<usize>,
}

impl MovementQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a specific product.
    pub fn for_product(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: Some(product_id.into()),
            ..Default::default()
        }
    }

    /// Filters by movement kind.
    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kinds = Some(vec![kind]);
        self
    }

    /// Filters by multiple movement kinds (any of these).
    pub fn kinds(mut self, kinds: Vec<MovementKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Filters to movements at or after this timestamp.
    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    /// Filters to movements at or before this timestamp.
    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    /// Sets the maximum number of movements to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of movements to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the movement passes every filter (paging excluded).
    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(ref id) = self.product_id
            && &movement.product_id != id
        {
            return false;
        }
        if let Some(ref kinds) = self.kinds
            && !kinds.contains(&movement.kind)
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && movement.timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && movement.timestamp > to
        {
            return false;
        }
        true
    }

    /// Filters and pages a sequence of movements, preserving its order.
    pub fn apply<'a, I>(&'a self, movements: I) -> impl Iterator<Item = &'a StockMovement> + 'a
    where
        I: IntoIterator<Item = &'a StockMovement>,
        I::IntoIter: 'a,
    {
        movements
            .into_iter()
            .filter(move |m| self.matches(m))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
    }
}
