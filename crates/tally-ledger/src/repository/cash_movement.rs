//! # Cash Movement Repository
//!
//! Store operations for the cash drawer ledger.
//!
//! Movements are append-only within a drawer day except the `opening` and
//! `closing` rows, which the schema keeps singleton per (branch, date) via a
//! partial unique index. The drawer state machine in the engine checks
//! explicitly first, so the index only fires under a race.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use tally_core::{CashMovement, MovementType};

/// Repository for cash movement store operations.
#[derive(Debug, Clone)]
pub struct CashMovementRepository {
    pool: SqlitePool,
}

impl CashMovementRepository {
    /// Creates a new CashMovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashMovementRepository { pool }
    }

    /// Appends a movement to the drawer ledger.
    pub async fn insert(&self, movement: &CashMovement) -> StoreResult<()> {
        debug!(
            branch_id = %movement.branch_id,
            date = %movement.movement_date,
            kind = ?movement.movement_type,
            amount = %movement.amount_cents,
            "Inserting cash movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, branch_id, movement_date, movement_type, amount_cents,
                difference_cents, sale_id, description, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.branch_id)
        .bind(movement.movement_date)
        .bind(movement.movement_type)
        .bind(movement.amount_cents)
        .bind(movement.difference_cents)
        .bind(&movement.sale_id)
        .bind(&movement.description)
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the `sale`-type movement referencing a sale, if any.
    pub async fn get_by_sale(&self, sale_id: &str) -> StoreResult<Option<CashMovement>> {
        let movement = sqlx::query_as::<_, CashMovement>(
            r#"
            SELECT id, branch_id, movement_date, movement_type, amount_cents,
                   difference_cents, sale_id, description, created_at
            FROM cash_movements
            WHERE sale_id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Deletes the movement referencing a sale.
    ///
    /// Returns the number of rows removed; zero is not an error (the sale
    /// may have been a card or credit tender with no drawer entry).
    pub async fn delete_by_sale(&self, sale_id: &str) -> StoreResult<u64> {
        debug!(sale_id = %sale_id, "Deleting cash movement for sale");

        let result = sqlx::query("DELETE FROM cash_movements WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists all movements for one branch on one date, oldest first.
    pub async fn list_for_day(
        &self,
        branch_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(
            r#"
            SELECT id, branch_id, movement_date, movement_type, amount_cents,
                   difference_cents, sale_id, description, created_at
            FROM cash_movements
            WHERE branch_id = ?1 AND movement_date = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(branch_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Whether an `opening` movement exists for the day.
    pub async fn has_opening(&self, branch_id: &str, date: NaiveDate) -> StoreResult<bool> {
        self.has_movement(branch_id, date, MovementType::Opening)
            .await
    }

    /// Whether a `closing` movement exists for the day.
    pub async fn has_closing(&self, branch_id: &str, date: NaiveDate) -> StoreResult<bool> {
        self.has_movement(branch_id, date, MovementType::Closing)
            .await
    }

    async fn has_movement(
        &self,
        branch_id: &str,
        date: NaiveDate,
        kind: MovementType,
    ) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM cash_movements
            WHERE branch_id = ?1 AND movement_date = ?2 AND movement_type = ?3
            "#,
        )
        .bind(branch_id)
        .bind(date)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
