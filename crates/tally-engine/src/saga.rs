//! # Compensation Stack
//!
//! The undo side of the client-driven sale saga.
//!
//! ## How Compensation Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Forward / Compensate                               │
//! │                                                                         │
//! │  Forward step succeeds ──► push the matching Compensation               │
//! │  Forward step fails    ──► unwind(): run the stack in REVERSE order     │
//! │                                                                         │
//! │  Each compensation is attempted exactly once. A failed compensation     │
//! │  is logged and collected as a warning - the unwind continues with the   │
//! │  remaining steps, and the PRIMARY error (the forward failure) is what   │
//! │  the caller gets back.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Compensations are data, not closures, so the stack can be logged and the
//! unwind order inspected in tests.

use tracing::{error, info};

use tally_ledger::LedgerStore;

/// One undo step, recorded after its forward counterpart succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Put `quantity` units back on the shelf.
    RestoreStock { product_id: String, quantity: i64 },

    /// Take `delta_cents` back off the customer's balance.
    ReverseBalance {
        customer_id: String,
        delta_cents: i64,
    },

    /// Remove the drawer movement written for the sale.
    RemoveCashMovement { sale_id: String },

    /// Remove the sale's line items.
    DeleteLines { sale_id: String },

    /// Remove the sale header itself.
    DeleteSale { sale_id: String },
}

/// LIFO stack of compensations accumulated by a forward sequence.
#[derive(Debug, Default)]
pub struct CompensationStack {
    steps: Vec<Compensation>,
}

impl CompensationStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        CompensationStack::default()
    }

    /// Records a compensation for a forward step that just succeeded.
    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no forward step has been applied yet.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs all recorded compensations in reverse order, each attempted once.
    ///
    /// Returns human-readable warnings for the compensations that failed;
    /// an empty vector means the store was restored completely.
    pub async fn unwind(self, store: &LedgerStore) -> Vec<String> {
        let mut warnings = Vec::new();

        info!(steps = self.steps.len(), "Unwinding sale compensations");

        for step in self.steps.into_iter().rev() {
            if let Err(err) = execute(store, &step).await {
                error!(step = ?step, error = %err, "Compensation failed");
                warnings.push(format!("compensation {step:?} failed: {err}"));
            }
        }

        warnings
    }
}

async fn execute(store: &LedgerStore, step: &Compensation) -> tally_ledger::StoreResult<()> {
    match step {
        Compensation::RestoreStock {
            product_id,
            quantity,
        } => {
            store.products().adjust_stock(product_id, *quantity).await?;
        }
        Compensation::ReverseBalance {
            customer_id,
            delta_cents,
        } => {
            store
                .customers()
                .adjust_balance(customer_id, -delta_cents)
                .await?;
        }
        Compensation::RemoveCashMovement { sale_id } => {
            store.cash_movements().delete_by_sale(sale_id).await?;
        }
        Compensation::DeleteLines { sale_id } => {
            store.sales().delete_lines(sale_id).await?;
        }
        Compensation::DeleteSale { sale_id } => {
            store.sales().delete_sale(sale_id).await?;
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
