//! # Customer Balance Recalculator
//!
//! Rebuilds a customer's running balance from the authoritative history:
//!
//! ```text
//! balance = max(0, Σ completed credit-sale totals − Σ payments)
//! ```
//!
//! The running balance is an optimization over this sum; anything that makes
//! them disagree (a reversal warning that was never acted on, a manual row
//! edit) is repaired here. Idempotent: recalculating twice writes the same
//! value twice.

use tracing::info;

use tally_core::Customer;
use tally_ledger::LedgerStore;

use crate::error::EngineResult;

/// Rebuilds customer balances from sale and payment history.
#[derive(Clone)]
pub struct BalanceRecalculator {
    store: LedgerStore,
}

impl BalanceRecalculator {
    /// Creates a recalculator.
    pub fn new(store: LedgerStore) -> Self {
        BalanceRecalculator { store }
    }

    /// Recomputes and overwrites one customer's balance, returning the
    /// updated customer.
    ///
    /// ## Errors
    /// `NotFound` when the customer does not exist.
    pub async fn recalculate(&self, customer_id: &str) -> EngineResult<Customer> {
        self.store.customers().require(customer_id).await?;

        let credit_sales_cents = self.store.sales().sum_credit_sales(customer_id).await?;
        let payments_cents = self.store.customers().sum_payments(customer_id).await?;
        let balance_cents = (credit_sales_cents - payments_cents).max(0);

        let customer = self
            .store
            .customers()
            .set_balance(customer_id, balance_cents)
            .await?;

        info!(
            customer_id = %customer_id,
            credit_sales = %credit_sales_cents,
            payments = %payments_cents,
            balance = %balance_cents,
            "Customer balance recalculated"
        );

        Ok(customer)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use chrono::Utc;
    use tally_core::{CustomerPayment, Sale, SaleStatus, TenderType};
    use uuid::Uuid;

    async fn setup() -> (LedgerStore, BalanceRecalculator) {
        let store = LedgerStore::in_memory().await.unwrap();
        let recalc = BalanceRecalculator::new(store.clone());
        (store, recalc)
    }

    async fn add_customer(store: &LedgerStore, drifted_balance: i64) -> String {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Ada".to_string(),
            balance_cents: drifted_balance,
            credit_limit_cents: 1_000_000,
            created_at: now,
            updated_at: now,
        };
        store.customers().insert(&customer).await.unwrap();
        customer.id
    }

    async fn add_credit_sale(store: &LedgerStore, customer_id: &str, number: i64, net: i64) {
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            branch_id: "b1".to_string(),
            number,
            customer_id: Some(customer_id.to_string()),
            tender_type: TenderType::Credit,
            status: SaleStatus::Completed,
            subtotal_cents: net,
            discount_cents: 0,
            vat_cents: 0,
            net_cents: net,
            paid_cents: 0,
            change_cents: 0,
            sold_at: Utc::now(),
        };
        store.sales().insert_sale(&sale).await.unwrap();
    }

    async fn add_payment(store: &LedgerStore, customer_id: &str, amount: i64) {
        let payment = CustomerPayment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            amount_cents: amount,
            note: None,
            paid_at: Utc::now(),
        };
        store.customers().add_payment(&payment).await.unwrap();
    }

    #[tokio::test]
    async fn test_recalculate_repairs_drift() {
        let (store, recalc) = setup().await;
        // The stored balance has drifted to a nonsense value
        let customer_id = add_customer(&store, 77_777).await;
        add_credit_sale(&store, &customer_id, 1, 20_000).await;
        add_payment(&store, &customer_id, 8_000).await;

        // 200.00 in credit sales minus 80.00 paid
        let updated = recalc.recalculate(&customer_id).await.unwrap();
        assert_eq!(updated.balance_cents, 12_000);

        let customer = store.customers().require(&customer_id).await.unwrap();
        assert_eq!(customer.balance_cents, 12_000);
    }

    #[tokio::test]
    async fn test_recalculate_idempotent() {
        let (store, recalc) = setup().await;
        let customer_id = add_customer(&store, 0).await;
        add_credit_sale(&store, &customer_id, 1, 15_000).await;

        let first = recalc.recalculate(&customer_id).await.unwrap();
        let second = recalc.recalculate(&customer_id).await.unwrap();
        assert_eq!(first.balance_cents, second.balance_cents);

        let customer = store.customers().require(&customer_id).await.unwrap();
        assert_eq!(customer.balance_cents, 15_000);
    }

    #[tokio::test]
    async fn test_overpayment_clamps_to_zero() {
        let (store, recalc) = setup().await;
        let customer_id = add_customer(&store, 0).await;
        add_credit_sale(&store, &customer_id, 1, 5_000).await;
        add_payment(&store, &customer_id, 9_000).await;

        let updated = recalc.recalculate(&customer_id).await.unwrap();
        assert_eq!(updated.balance_cents, 0);
    }

    #[tokio::test]
    async fn test_cancelled_and_cash_sales_excluded() {
        let (store, recalc) = setup().await;
        let customer_id = add_customer(&store, 0).await;
        add_credit_sale(&store, &customer_id, 1, 10_000).await;

        // A cancelled credit sale and a completed cash sale both stay out
        let mut cancelled = Sale {
            id: Uuid::new_v4().to_string(),
            branch_id: "b1".to_string(),
            number: 2,
            customer_id: Some(customer_id.clone()),
            tender_type: TenderType::Credit,
            status: SaleStatus::Cancelled,
            subtotal_cents: 4_000,
            discount_cents: 0,
            vat_cents: 0,
            net_cents: 4_000,
            paid_cents: 0,
            change_cents: 0,
            sold_at: Utc::now(),
        };
        store.sales().insert_sale(&cancelled).await.unwrap();
        cancelled.id = Uuid::new_v4().to_string();
        cancelled.number = 3;
        cancelled.tender_type = TenderType::Cash;
        cancelled.status = SaleStatus::Completed;
        store.sales().insert_sale(&cancelled).await.unwrap();

        let updated = recalc.recalculate(&customer_id).await.unwrap();
        assert_eq!(updated.balance_cents, 10_000);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let (_store, recalc) = setup().await;
        let err = recalc.recalculate("missing").await;
        assert!(matches!(err, Err(EngineError::NotFound { .. })));
    }
}
