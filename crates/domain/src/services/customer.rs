//! Customer purchase ledger port and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CustomerId, Money};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{DomainError, Result};

/// Tracks what each customer has spent.
///
/// Walk-in orders never reach this port.
pub trait CustomerLedger: Send + Sync {
    /// Credits a completed purchase to the customer.
    fn apply_purchase(&self, customer_id: &CustomerId, amount: Money) -> Result<()>;

    /// Reverses a purchase credited earlier with exactly `amount`.
    fn reverse_purchase(&self, customer_id: &CustomerId, amount: Money) -> Result<()>;
}

/// Running totals for one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CustomerAccount {
    pub total_spent: Money,
    pub loyalty_points: u64,
    pub purchase_count: u32,
}

impl CustomerAccount {
    /// Cents per loyalty point: one point for every whole 10.00 spent.
    pub const CENTS_PER_POINT: i64 = 1_000;

    pub fn points_for(amount: Money) -> u64 {
        u64::try_from(amount.cents() / Self::CENTS_PER_POINT).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct InMemoryCustomerState {
    accounts: HashMap<CustomerId, CustomerAccount>,
    fail_on_apply: bool,
    fail_on_reverse: bool,
}

/// In-memory customer ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerLedger {
    state: Arc<RwLock<InMemoryCustomerState>>,
}

impl InMemoryCustomerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to reject purchases.
    pub fn set_fail_on_apply(&self, fail: bool) {
        self.state.write().fail_on_apply = fail;
    }

    /// Configures the ledger to reject reversals.
    pub fn set_fail_on_reverse(&self, fail: bool) {
        self.state.write().fail_on_reverse = fail;
    }

    /// Returns the account for a customer, if any purchase was recorded.
    pub fn account(&self, customer_id: &CustomerId) -> Option<CustomerAccount> {
        self.state.read().accounts.get(customer_id).copied()
    }
}

impl CustomerLedger for InMemoryCustomerLedger {
    fn apply_purchase(&self, customer_id: &CustomerId, amount: Money) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_on_apply {
            return Err(DomainError::CustomerLedger(format!(
                "purchase for {customer_id} rejected"
            )));
        }

        let account = state.accounts.entry(customer_id.clone()).or_default();
        account.total_spent += amount;
        account.loyalty_points += CustomerAccount::points_for(amount);
        account.purchase_count += 1;
        Ok(())
    }

    fn reverse_purchase(&self, customer_id: &CustomerId, amount: Money) -> Result<()> {
        let mut state = self.state.write();

        if state.fail_on_reverse {
            return Err(DomainError::CustomerLedger(format!(
                "reversal for {customer_id} rejected"
            )));
        }

        let account = state.accounts.get_mut(customer_id).ok_or_else(|| {
            DomainError::CustomerLedger(format!("no purchases recorded for {customer_id}"))
        })?;
        account.total_spent -= amount;
        account.loyalty_points = account
            .loyalty_points
            .saturating_sub(CustomerAccount::points_for(amount));
        account.purchase_count = account.purchase_count.saturating_sub(1);
        Ok(())
    }
}
