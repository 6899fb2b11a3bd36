//! # Sale Repository
//!
//! Store operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. NUMBER                                                             │
//! │     └── next_number(branch) → branch-scoped, monotonic, gaps allowed   │
//! │                                                                         │
//! │  2. COMMIT (driven by the sale orchestrator)                           │
//! │     └── insert_sale() → Sale { status: Completed }                     │
//! │     └── insert_line() per cart line                                    │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL (driven by the reversal orchestrator)            │
//! │     └── mark_cancelled() → guards against double reversal              │
//! │     └── delete_lines() then delete_sale()                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use tally_core::{Sale, SaleLine, SaleStatus};

/// Repository for sale store operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Allocates the next branch-scoped sale number.
    ///
    /// Single upsert statement on `branch_sequences`: monotonic per branch,
    /// never reused. A sale sequence that fails after this call leaves a gap,
    /// which is acceptable; duplicates are not.
    pub async fn next_number(&self, branch_id: &str) -> StoreResult<i64> {
        let number: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO branch_sequences (branch_id, last_number)
            VALUES (?1, 1)
            ON CONFLICT(branch_id) DO UPDATE SET last_number = last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(branch_id = %branch_id, number = %number, "Allocated sale number");
        Ok(number)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> StoreResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, branch_id, number, customer_id, tender_type, status,
                   subtotal_cents, discount_cents, vat_cents, net_cents,
                   paid_cents, change_cents, sold_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Inserts a sale header.
    pub async fn insert_sale(&self, sale: &Sale) -> StoreResult<()> {
        debug!(id = %sale.id, number = %sale.number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, branch_id, number, customer_id, tender_type, status,
                subtotal_cents, discount_cents, vat_cents, net_cents,
                paid_cents, change_cents, sold_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.branch_id)
        .bind(sale.number)
        .bind(&sale.customer_id)
        .bind(sale.tender_type)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.vat_cents)
        .bind(sale.net_cents)
        .bind(sale.paid_cents)
        .bind(sale.change_cents)
        .bind(sale.sold_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts one sale line.
    pub async fn insert_line(&self, line: &SaleLine) -> StoreResult<()> {
        debug!(sale_id = %line.sale_id, product_id = %line.product_id, "Inserting sale line");

        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, quantity,
                unit_price_cents, discount_cents, vat_cents, total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_cents)
        .bind(line.vat_cents)
        .bind(line.total_cents)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets all lines for a sale.
    pub async fn get_lines(&self, sale_id: &str) -> StoreResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, quantity,
                   unit_price_cents, discount_cents, vat_cents, total_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Marks a completed sale as cancelled.
    ///
    /// Guards the "reversed exactly once" invariant: fails with NotFound when
    /// the sale is absent or already cancelled, so a retried cancellation
    /// cannot re-apply the compensating ledger writes.
    pub async fn mark_cancelled(&self, sale_id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2
            WHERE id = ?1 AND status = ?3
            "#,
        )
        .bind(sale_id)
        .bind(SaleStatus::Cancelled)
        .bind(SaleStatus::Completed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Sale (completed)", sale_id));
        }

        Ok(())
    }

    /// Deletes all lines for a sale.
    pub async fn delete_lines(&self, sale_id: &str) -> StoreResult<()> {
        debug!(sale_id = %sale_id, "Deleting sale lines");

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes a sale header.
    pub async fn delete_sale(&self, sale_id: &str) -> StoreResult<()> {
        debug!(sale_id = %sale_id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    /// Sums net amounts of completed credit-tender sales for a customer.
    ///
    /// Feeds the balance recalculator: cancelled sales are excluded because
    /// their deltas have been reversed.
    pub async fn sum_credit_sales(&self, customer_id: &str) -> StoreResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(net_cents)
            FROM sales
            WHERE customer_id = ?1
              AND tender_type = 'credit'
              AND status = 'completed'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::LedgerStore;
    use chrono::Utc;
    use tally_core::TenderType;
    use uuid::Uuid;

    fn sample_sale(branch_id: &str, number: i64) -> Sale {
        Sale {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.to_string(),
            number,
            customer_id: None,
            tender_type: TenderType::Cash,
            status: SaleStatus::Completed,
            subtotal_cents: 10_000,
            discount_cents: 0,
            vat_cents: 1_800,
            net_cents: 11_800,
            paid_cents: 12_000,
            change_cents: 200,
            sold_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_next_number_monotonic_per_branch() {
        let store = LedgerStore::in_memory().await.unwrap();
        let sales = store.sales();

        assert_eq!(sales.next_number("branch-a").await.unwrap(), 1);
        assert_eq!(sales.next_number("branch-a").await.unwrap(), 2);
        assert_eq!(sales.next_number("branch-b").await.unwrap(), 1);
        assert_eq!(sales.next_number("branch-a").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insert_get_delete_roundtrip() {
        let store = LedgerStore::in_memory().await.unwrap();
        let sale = sample_sale("b1", 1);
        store.sales().insert_sale(&sale).await.unwrap();

        let line = SaleLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: "p1".to_string(),
            quantity: 2,
            unit_price_cents: 5_000,
            discount_cents: 0,
            vat_cents: 1_800,
            total_cents: 11_800,
        };
        store.sales().insert_line(&line).await.unwrap();

        let found = store.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(found.number, 1);
        assert_eq!(found.tender_type, TenderType::Cash);

        let lines = store.sales().get_lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);

        store.sales().delete_lines(&sale.id).await.unwrap();
        store.sales().delete_sale(&sale.id).await.unwrap();
        assert!(store.sales().get_by_id(&sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_cancelled_only_once() {
        let store = LedgerStore::in_memory().await.unwrap();
        let sale = sample_sale("b1", 1);
        store.sales().insert_sale(&sale).await.unwrap();

        store.sales().mark_cancelled(&sale.id).await.unwrap();

        // Second attempt fails - the completed row no longer exists
        let err = store.sales().mark_cancelled(&sale.id).await;
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_branch_number_conflicts() {
        let store = LedgerStore::in_memory().await.unwrap();
        let first = sample_sale("b1", 7);
        let second = sample_sale("b1", 7);
        store.sales().insert_sale(&first).await.unwrap();

        let err = store.sales().insert_sale(&second).await;
        assert!(matches!(err, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_sum_credit_sales_filters() {
        let store = LedgerStore::in_memory().await.unwrap();
        let customer_id = "c1".to_string();

        let mut credit = sample_sale("b1", 1);
        credit.customer_id = Some(customer_id.clone());
        credit.tender_type = TenderType::Credit;
        credit.net_cents = 20_000;

        let mut cash = sample_sale("b1", 2);
        cash.customer_id = Some(customer_id.clone());
        cash.net_cents = 5_000;

        let mut cancelled = sample_sale("b1", 3);
        cancelled.customer_id = Some(customer_id.clone());
        cancelled.tender_type = TenderType::Credit;
        cancelled.status = SaleStatus::Cancelled;
        cancelled.net_cents = 9_000;

        for sale in [&credit, &cash, &cancelled] {
            store.sales().insert_sale(sale).await.unwrap();
        }

        let total = store.sales().sum_credit_sales(&customer_id).await.unwrap();
        assert_eq!(total, 20_000);
    }
}
