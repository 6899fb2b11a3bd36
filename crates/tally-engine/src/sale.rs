//! # Sale Orchestrator
//!
//! Turns a validated cart into a committed sale, driving each store write as
//! an isolated step and compensating on failure.
//!
//! ## The Forward Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      process(input)                                     │
//! │                                                                         │
//! │  Phase 1: PURE (no writes, failures cost nothing)                       │
//! │  ├── validate cart                                                      │
//! │  ├── aggregate VAT over discounted line amounts                         │
//! │  └── resolve payment rule for the tender                                │
//! │                                                                         │
//! │  Phase 2: COMPENSABLE (each success pushes an undo step)                │
//! │  ├── 1. insert sale header (status = completed)                         │
//! │  ├── 2. insert sale lines                                               │
//! │  ├── 3. decrement stock per line          ← OutOfStock aborts here      │
//! │  ├── 4. credit/partial: balance += total                                │
//! │  └── 5. cash/partial: append drawer movement                            │
//! │                                                                         │
//! │  Phase 3: NOTIFY (fire-and-forget, never fails the sale)                │
//! │  └── fiscal.sale_committed()                                            │
//! │                                                                         │
//! │  Any Phase 2 failure unwinds the stack in reverse and returns the       │
//! │  PRIMARY error; failed compensations ride along on the error as         │
//! │  secondary warnings so the caller knows the store may be dirty.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Rules
//! | Tender  | paid constraint      | change               | balance delta |
//! |---------|----------------------|----------------------|---------------|
//! | cash    | as given             | max(0, paid - total) | -             |
//! | card    | as given             | max(0, paid - total) | -             |
//! | credit  | ignored, forced to 0 | 0                    | +total        |
//! | partial | 0 < paid < total     | 0                    | +total        |

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tally_core::validation::validate_cart;
use tally_core::vat::{aggregate, price_components};
use tally_core::{CartLine, CashMovement, MovementType, Sale, SaleLine, SaleStatus, TenderType, VatLine};
use tally_ledger::LedgerStore;

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalNotifier, NoopFiscal};
use crate::saga::{Compensation, CompensationStack};

// =============================================================================
// Input / Output
// =============================================================================

/// Everything the caller supplies to commit a sale.
#[derive(Debug, Clone)]
pub struct SaleInput {
    pub branch_id: String,
    /// Required for credit and partial tenders.
    pub customer_id: Option<String>,
    pub tender_type: TenderType,
    pub lines: Vec<CartLine>,
    /// Amount handed over now, in cents. Forced to zero for credit tenders.
    pub paid_cents: i64,
    /// Whether cart unit prices already include VAT.
    pub prices_include_vat: bool,
}

/// The committed result handed back to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SaleReceipt {
    pub sale_id: String,
    /// Branch-scoped display number.
    pub number: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub vat_cents: i64,
    pub net_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
}

// =============================================================================
// Sale Processor
// =============================================================================

/// Orchestrator for the forward sale sequence.
#[derive(Clone)]
pub struct SaleProcessor {
    store: LedgerStore,
    fiscal: Arc<dyn FiscalNotifier>,
}

impl SaleProcessor {
    /// Creates a processor with the no-op fiscal hook.
    pub fn new(store: LedgerStore) -> Self {
        SaleProcessor {
            store,
            fiscal: Arc::new(NoopFiscal),
        }
    }

    /// Creates a processor with a custom fiscal hook.
    pub fn with_fiscal(store: LedgerStore, fiscal: Arc<dyn FiscalNotifier>) -> Self {
        SaleProcessor { store, fiscal }
    }

    /// Commits a sale, or leaves the store as if it was never attempted.
    ///
    /// ## Errors
    /// - `InvalidCart` / `InvalidPayment` before any write
    /// - `OutOfStock` when a line cannot be fulfilled (after compensation)
    /// - `NotFound` when the customer or a product is missing
    /// - `CompensationIncomplete` wrapping the primary error when the unwind
    ///   itself left something behind
    pub async fn process(&self, input: SaleInput) -> EngineResult<SaleReceipt> {
        // Phase 1: pure checks, nothing written yet
        validate_cart(&input.lines)?;

        let vat_lines: Vec<VatLine> = input
            .lines
            .iter()
            .map(|line| VatLine {
                amount: line.discounted_amount(),
                quantity: 1, // discounted_amount already includes quantity
                rate: line.vat_rate(),
            })
            .collect();
        let totals = aggregate(&vat_lines, input.prices_include_vat)?;
        let discount_cents: i64 = input.lines.iter().map(|l| l.discount_cents).sum();

        let (paid_cents, change_cents) = resolve_payment(
            input.tender_type,
            input.customer_id.is_some(),
            input.paid_cents,
            totals.grand_total.cents(),
        )?;

        // The customer must exist before the sequence starts; afterwards a
        // missing customer would mean a failed step mid-saga.
        if input.tender_type.touches_customer_ledger() {
            if let Some(customer_id) = &input.customer_id {
                self.store.customers().require(customer_id).await?;
            }
        }

        // A failure after this point leaves a gap in the branch sequence,
        // which is fine; a duplicate number never is.
        let number = self.store.sales().next_number(&input.branch_id).await?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            branch_id: input.branch_id.clone(),
            number,
            customer_id: input.customer_id.clone(),
            tender_type: input.tender_type,
            status: SaleStatus::Completed,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents,
            vat_cents: totals.total_vat.cents(),
            net_cents: totals.grand_total.cents(),
            paid_cents,
            change_cents,
            sold_at: Utc::now(),
        };

        // Phase 2: compensable writes
        let mut stack = CompensationStack::new();
        match self.commit(&input, &sale, &mut stack).await {
            Ok(()) => {
                info!(
                    sale_id = %sale.id,
                    number = %sale.number,
                    net = %sale.net_cents,
                    tender = ?sale.tender_type,
                    "Sale committed"
                );

                // Phase 3: fire-and-forget
                self.fiscal.sale_committed(&sale);

                Ok(SaleReceipt {
                    sale_id: sale.id,
                    number: sale.number,
                    subtotal_cents: sale.subtotal_cents,
                    discount_cents: sale.discount_cents,
                    vat_cents: sale.vat_cents,
                    net_cents: sale.net_cents,
                    paid_cents: sale.paid_cents,
                    change_cents: sale.change_cents,
                })
            }
            Err(err) => {
                warn!(
                    sale_id = %sale.id,
                    applied_steps = stack.len(),
                    error = %err,
                    "Sale failed, compensating applied steps"
                );
                let warnings = stack.unwind(&self.store).await;
                if warnings.is_empty() {
                    Err(err)
                } else {
                    // A clean unwind re-raises the primary error alone; a
                    // dirty one attaches what could not be undone.
                    Err(EngineError::CompensationIncomplete {
                        primary: Box::new(err),
                        warnings,
                    })
                }
            }
        }
    }

    async fn commit(
        &self,
        input: &SaleInput,
        sale: &Sale,
        stack: &mut CompensationStack,
    ) -> EngineResult<()> {
        self.store.sales().insert_sale(sale).await?;
        // Pushed sale-then-lines so the unwind deletes lines first
        stack.push(Compensation::DeleteSale {
            sale_id: sale.id.clone(),
        });
        stack.push(Compensation::DeleteLines {
            sale_id: sale.id.clone(),
        });

        for line in &input.lines {
            let row = freeze_line(sale, line, input.prices_include_vat)?;
            self.store.sales().insert_line(&row).await?;
        }

        for line in &input.lines {
            self.store
                .products()
                .adjust_stock(&line.product_id, -line.quantity)
                .await?;
            stack.push(Compensation::RestoreStock {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }

        if sale.tender_type.touches_customer_ledger() {
            if let Some(customer_id) = &sale.customer_id {
                self.store
                    .customers()
                    .adjust_balance(customer_id, sale.net_cents)
                    .await?;
                stack.push(Compensation::ReverseBalance {
                    customer_id: customer_id.clone(),
                    delta_cents: sale.net_cents,
                });
            }
        }

        if sale.tender_type.touches_cash_drawer() {
            // The movement always carries the grand total, even for partial
            // tenders - day reporting tracks what the sale was worth, not
            // what was handed over.
            let movement = CashMovement {
                id: Uuid::new_v4().to_string(),
                branch_id: sale.branch_id.clone(),
                movement_date: sale.sold_at.date_naive(),
                movement_type: MovementType::Sale,
                amount_cents: sale.net_cents,
                difference_cents: None,
                sale_id: Some(sale.id.clone()),
                description: Some(format!("sale #{}", sale.number)),
                created_at: sale.sold_at,
            };
            self.store.cash_movements().insert(&movement).await?;
            stack.push(Compensation::RemoveCashMovement {
                sale_id: sale.id.clone(),
            });
        }

        Ok(())
    }
}

/// Freezes a cart line into a sale line row with its own VAT split.
fn freeze_line(sale: &Sale, line: &CartLine, prices_include_vat: bool) -> EngineResult<SaleLine> {
    let parts = price_components(line.discounted_amount(), line.vat_rate(), prices_include_vat)?;
    Ok(SaleLine {
        id: Uuid::new_v4().to_string(),
        sale_id: sale.id.clone(),
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        discount_cents: line.discount_cents,
        vat_cents: parts.vat.cents(),
        total_cents: parts.inc_vat.cents(),
    })
}

/// Applies the per-tender payment rule, returning `(paid, change)` in cents.
fn resolve_payment(
    tender: TenderType,
    has_customer: bool,
    paid_cents: i64,
    grand_cents: i64,
) -> EngineResult<(i64, i64)> {
    if tender.touches_customer_ledger() && !has_customer {
        return Err(EngineError::InvalidPayment(format!(
            "{tender:?} tender requires a customer"
        )));
    }

    match tender {
        TenderType::Credit => Ok((0, 0)),
        TenderType::Partial => {
            if paid_cents <= 0 || paid_cents >= grand_cents {
                return Err(EngineError::InvalidPayment(format!(
                    "partial payment must be strictly between 0 and {grand_cents}, got {paid_cents}"
                )));
            }
            Ok((paid_cents, 0))
        }
        TenderType::Cash | TenderType::Card => {
            Ok((paid_cents, (paid_cents - grand_cents).max(0)))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Customer, Product};

    async fn setup() -> (LedgerStore, SaleProcessor) {
        let store = LedgerStore::in_memory().await.unwrap();
        let processor = SaleProcessor::new(store.clone());
        (store, processor)
    }

    async fn add_product(store: &LedgerStore, stock: i64, price_cents: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: format!("SKU-{}", Uuid::new_v4()),
            name: "Test Widget".to_string(),
            sale_price_cents: price_cents,
            vat_rate_bps: 2000,
            stock_quantity: stock,
            critical_stock_level: 2,
            created_at: now,
            updated_at: now,
        };
        store.products().insert(&product).await.unwrap();
        product.id
    }

    async fn add_customer(store: &LedgerStore) -> String {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Ada".to_string(),
            balance_cents: 0,
            credit_limit_cents: 1_000_000,
            created_at: now,
            updated_at: now,
        };
        store.customers().insert(&customer).await.unwrap();
        customer.id
    }

    fn cart_line(product_id: &str, quantity: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
            discount_cents: 0,
            vat_rate_bps: 2000,
        }
    }

    fn cash_input(product_id: &str, quantity: i64, unit_price_cents: i64, paid: i64) -> SaleInput {
        SaleInput {
            branch_id: "b1".to_string(),
            customer_id: None,
            tender_type: TenderType::Cash,
            lines: vec![cart_line(product_id, quantity, unit_price_cents)],
            paid_cents: paid,
            prices_include_vat: false,
        }
    }

    async fn count_sales(store: &LedgerStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cash_sale_happy_path() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 10_000).await;

        // 2 x 100.00 at 20% = 240.00 gross; pay 250.00, expect 10.00 change
        let receipt = processor
            .process(cash_input(&product_id, 2, 10_000, 25_000))
            .await
            .unwrap();

        assert_eq!(receipt.number, 1);
        assert_eq!(receipt.subtotal_cents, 20_000);
        assert_eq!(receipt.vat_cents, 4_000);
        assert_eq!(receipt.net_cents, 24_000);
        assert_eq!(receipt.change_cents, 1_000);

        let product = store.products().require(&product_id).await.unwrap();
        assert_eq!(product.stock_quantity, 8);

        let lines = store.sales().get_lines(&receipt.sale_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].total_cents, 24_000);

        // The full total sits in the drawer (change was netted out)
        let movement = store
            .cash_movements()
            .get_by_sale(&receipt.sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.amount_cents, 24_000);
    }

    #[tokio::test]
    async fn test_out_of_stock_compensates_everything() {
        let (store, processor) = setup().await;
        let plenty = add_product(&store, 10, 1_000).await;
        let scarce = add_product(&store, 1, 2_000).await;

        let input = SaleInput {
            branch_id: "b1".to_string(),
            customer_id: None,
            tender_type: TenderType::Cash,
            lines: vec![cart_line(&plenty, 3, 1_000), cart_line(&scarce, 5, 2_000)],
            paid_cents: 100_000,
            prices_include_vat: false,
        };

        let err = processor.process(input).await;
        assert!(matches!(err, Err(EngineError::OutOfStock { available: 1, .. })));

        // The first line's decrement was rolled back and no sale row remains
        let product = store.products().require(&plenty).await.unwrap();
        assert_eq!(product.stock_quantity, 10);
        assert_eq!(count_sales(&store).await, 0);
    }

    #[tokio::test]
    async fn test_failed_compensation_attached_to_error() {
        let (store, processor) = setup().await;
        let plenty = add_product(&store, 10, 1_000).await;
        let scarce = add_product(&store, 1, 2_000).await;

        // Forbid restocks so the unwind of the first line's decrement fails
        sqlx::query(
            "CREATE TRIGGER block_restock BEFORE UPDATE ON products \
             WHEN NEW.stock_quantity > OLD.stock_quantity \
             BEGIN SELECT RAISE(ABORT, 'restock blocked'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let input = SaleInput {
            branch_id: "b1".to_string(),
            customer_id: None,
            tender_type: TenderType::Cash,
            lines: vec![cart_line(&plenty, 3, 1_000), cart_line(&scarce, 5, 2_000)],
            paid_cents: 100_000,
            prices_include_vat: false,
        };

        let err = processor.process(input).await.unwrap_err();
        match err {
            EngineError::CompensationIncomplete { primary, warnings } => {
                // The caller still sees what aborted the sale...
                assert!(matches!(*primary, EngineError::OutOfStock { available: 1, .. }));
                // ...and learns which undo was left unapplied
                assert_eq!(warnings.len(), 1);
                assert!(warnings[0].contains(&plenty));
            }
            other => panic!("expected CompensationIncomplete, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_credit_sale_puts_full_total_on_balance() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 12_500).await;
        let customer_id = add_customer(&store).await;

        let input = SaleInput {
            branch_id: "b1".to_string(),
            customer_id: Some(customer_id.clone()),
            tender_type: TenderType::Credit,
            lines: vec![cart_line(&product_id, 1, 12_500)],
            // Whatever the caller passes, credit forces paid to zero
            paid_cents: 999,
            prices_include_vat: false,
        };

        let receipt = processor.process(input).await.unwrap();
        assert_eq!(receipt.paid_cents, 0);
        assert_eq!(receipt.change_cents, 0);
        assert_eq!(receipt.net_cents, 15_000);

        let customer = store.customers().require(&customer_id).await.unwrap();
        assert_eq!(customer.balance_cents, 15_000);

        // No drawer movement for a pure credit tender
        let movement = store
            .cash_movements()
            .get_by_sale(&receipt.sale_id)
            .await
            .unwrap();
        assert!(movement.is_none());
    }

    #[tokio::test]
    async fn test_credit_requires_customer() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 1_000).await;

        let input = SaleInput {
            branch_id: "b1".to_string(),
            customer_id: None,
            tender_type: TenderType::Credit,
            lines: vec![cart_line(&product_id, 1, 1_000)],
            paid_cents: 0,
            prices_include_vat: false,
        };

        let err = processor.process(input).await;
        assert!(matches!(err, Err(EngineError::InvalidPayment(_))));
        assert_eq!(count_sales(&store).await, 0);
    }

    #[tokio::test]
    async fn test_partial_payment_bounds() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 10_000).await;
        let customer_id = add_customer(&store).await;

        let input = |paid: i64| SaleInput {
            branch_id: "b1".to_string(),
            customer_id: Some(customer_id.clone()),
            tender_type: TenderType::Partial,
            lines: vec![cart_line(&product_id, 1, 10_000)],
            paid_cents: paid,
            prices_include_vat: false,
        };

        // Grand total is 120.00; zero and full payments are both rejected
        assert!(matches!(
            processor.process(input(0)).await,
            Err(EngineError::InvalidPayment(_))
        ));
        assert!(matches!(
            processor.process(input(12_000)).await,
            Err(EngineError::InvalidPayment(_))
        ));

        let receipt = processor.process(input(5_000)).await.unwrap();
        assert_eq!(receipt.paid_cents, 5_000);
        assert_eq!(receipt.change_cents, 0);

        // The FULL total goes on the ledger AND onto the drawer movement;
        // only the receipt remembers what was actually handed over
        let customer = store.customers().require(&customer_id).await.unwrap();
        assert_eq!(customer.balance_cents, 12_000);
        let movement = store
            .cash_movements()
            .get_by_sale(&receipt.sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.amount_cents, 12_000);
    }

    #[tokio::test]
    async fn test_change_never_negative() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 10_000).await;

        // Underpaid cash sale still commits; change clamps at zero
        let receipt = processor
            .process(cash_input(&product_id, 1, 10_000, 11_000))
            .await
            .unwrap();
        assert_eq!(receipt.net_cents, 12_000);
        assert_eq!(receipt.paid_cents, 11_000);
        assert_eq!(receipt.change_cents, 0);
    }

    #[tokio::test]
    async fn test_sale_numbers_monotonic() {
        let (store, processor) = setup().await;
        let product_id = add_product(&store, 10, 1_000).await;

        let first = processor
            .process(cash_input(&product_id, 1, 1_000, 2_000))
            .await
            .unwrap();
        let second = processor
            .process(cash_input(&product_id, 1, 1_000, 2_000))
            .await
            .unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_numbering() {
        let (store, processor) = setup().await;

        let input = SaleInput {
            branch_id: "b1".to_string(),
            customer_id: None,
            tender_type: TenderType::Cash,
            lines: vec![],
            paid_cents: 0,
            prices_include_vat: false,
        };
        assert!(matches!(
            processor.process(input).await,
            Err(EngineError::InvalidCart(_))
        ));

        // The sequence was never touched
        assert_eq!(store.sales().next_number("b1").await.unwrap(), 1);
    }
}
