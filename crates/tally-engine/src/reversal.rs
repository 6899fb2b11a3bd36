//! # Sale Reversal Orchestrator
//!
//! Undoes a committed sale. Deliberately asymmetric with the forward saga:
//! a forward failure is fatal and fully compensated, while a reversal step
//! failure is downgraded to a warning and the undo keeps going. Once the
//! operator has decided the sale is wrong, a half-finished reversal plus
//! warnings beats refusing to reverse at all.
//!
//! ## The Reverse Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      cancel(sale_id)                                    │
//! │                                                                         │
//! │  1. load sale                    ── fatal: NotFound                     │
//! │  2. mark cancelled               ── fatal: guards "reversed once"       │
//! │  3. restock each line            ── best effort, warn on failure        │
//! │  4. credit tender: balance -= net── best effort, warn on failure        │
//! │  5. delete drawer movement       ── best effort, warn on failure        │
//! │  6. delete lines, delete sale    ── fatal (the sale must not linger)    │
//! │  7. fiscal.sale_cancelled()      ── fire-and-forget                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 2 flips the row out of `completed` before any ledger write is
//! undone, so a concurrent or repeated cancel of the same sale fails fast
//! instead of restocking twice.
//!
//! A sale found already in the `cancelled` state with its rows still present
//! is a cancellation that died between the status flip and the deletions.
//! Calling `cancel` again on it resumes: the ledger undo is skipped (it
//! already ran once) and only the deletions are retried.

use std::sync::Arc;

use tracing::{info, warn};

use tally_core::{SaleStatus, TenderType};
use tally_ledger::LedgerStore;

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalNotifier, NoopFiscal};

/// Result of a cancellation: the undo ran, possibly imperfectly.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CancelOutcome {
    pub sale_id: String,
    /// One entry per best-effort step that failed; empty means a clean undo.
    pub warnings: Vec<String>,
}

/// Orchestrator for the reverse sale sequence.
#[derive(Clone)]
pub struct SaleReversal {
    store: LedgerStore,
    fiscal: Arc<dyn FiscalNotifier>,
}

impl SaleReversal {
    /// Creates a reversal orchestrator with the no-op fiscal hook.
    pub fn new(store: LedgerStore) -> Self {
        SaleReversal {
            store,
            fiscal: Arc::new(NoopFiscal),
        }
    }

    /// Creates a reversal orchestrator with a custom fiscal hook.
    pub fn with_fiscal(store: LedgerStore, fiscal: Arc<dyn FiscalNotifier>) -> Self {
        SaleReversal { store, fiscal }
    }

    /// Cancels a completed sale and undoes its ledger effects.
    ///
    /// ## Errors
    /// - `NotFound` when the sale does not exist (a fully reversed sale has
    ///   no header left, so a second cancel lands here)
    /// - `Store` when the final row deletion fails
    pub async fn cancel(&self, sale_id: &str) -> EngineResult<CancelOutcome> {
        let sale = self
            .store
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Sale".to_string(),
                id: sale_id.to_string(),
            })?;

        let mut warnings = Vec::new();

        // A header already in the cancelled state is a previous cancel that
        // died before its deletions; the ledger undo below already ran once,
        // so only the deletions are retried.
        let resuming = sale.status == SaleStatus::Cancelled;
        if resuming {
            info!(sale_id = %sale_id, "Resuming interrupted cancellation");
        } else {
            // Claim the sale: only one cancel may proceed past this point.
            self.store.sales().mark_cancelled(sale_id).await?;

            let lines = match self.store.sales().get_lines(sale_id).await {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(sale_id = %sale_id, error = %err, "Could not load lines for restock");
                    warnings.push(format!("loading lines failed: {err}"));
                    Vec::new()
                }
            };

            for line in &lines {
                if let Err(err) = self
                    .store
                    .products()
                    .adjust_stock(&line.product_id, line.quantity)
                    .await
                {
                    warn!(
                        sale_id = %sale_id,
                        product_id = %line.product_id,
                        error = %err,
                        "Restock failed during reversal"
                    );
                    warnings.push(format!("restock of {} failed: {err}", line.product_id));
                }
            }

            // Only a pure credit tender had its full amount booked as debt
            // that the reversal takes back off the ledger.
            if sale.tender_type == TenderType::Credit {
                if let Some(customer_id) = &sale.customer_id {
                    if let Err(err) = self
                        .store
                        .customers()
                        .adjust_balance(customer_id, -sale.net_cents)
                        .await
                    {
                        warn!(
                            sale_id = %sale_id,
                            customer_id = %customer_id,
                            error = %err,
                            "Balance reversal failed"
                        );
                        warnings.push(format!("balance reversal for {customer_id} failed: {err}"));
                    }
                }
            }
        }

        if let Err(err) = self.store.cash_movements().delete_by_sale(sale_id).await {
            warn!(sale_id = %sale_id, error = %err, "Drawer movement removal failed");
            warnings.push(format!("drawer movement removal failed: {err}"));
        }

        // The row deletions are the one part that must succeed: a cancelled
        // sale left in place would keep lines pointing at reversed stock.
        self.store.sales().delete_lines(sale_id).await?;
        self.store.sales().delete_sale(sale_id).await?;

        info!(
            sale_id = %sale_id,
            number = %sale.number,
            warnings = warnings.len(),
            "Sale cancelled"
        );
        self.fiscal.sale_cancelled(&sale);

        Ok(CancelOutcome {
            sale_id: sale_id.to_string(),
            warnings,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
