//! # Cash Drawer Session
//!
//! The drawer day state machine: one opening, any number of incomes and
//! expenses, one closing, all scoped to a (branch, date) pair.
//!
//! ## Drawer Day Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    (branch, date) drawer day                            │
//! │                                                                         │
//! │   [no movements] ──open(counted)──► [open]                              │
//! │                                       │                                 │
//! │          record_income / record_expense / sale movements (engine)       │
//! │                                       │                                 │
//! │                                close(counted)                           │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │   [closed]  expected = opening + income + sales - expense               │
//! │             difference = counted - expected   (signed, stored)          │
//! │                                                                         │
//! │   open on [open]/[closed] → AlreadyOpen (an opening row exists)         │
//! │   income/expense/close    → DrawerNotOpen before open                   │
//! │   close on [closed]       → AlreadyClosed                               │
//! │   income/expense [closed] → DrawerAlreadyClosed                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! State is derived purely from the movement rows; there is no drawer table.
//! The in-process mutex serializes check-then-insert within one engine
//! instance, and the partial unique index on opening/closing rows backstops
//! races across processes.

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use tally_core::{CashDrawerDay, CashMovement, MovementType};
use tally_ledger::LedgerStore;

use crate::error::{EngineError, EngineResult};

/// Orchestrator for drawer day operations.
pub struct CashDrawer {
    store: LedgerStore,
    /// Serializes the check-then-insert of mutating operations.
    gate: Mutex<()>,
}

impl CashDrawer {
    /// Creates a drawer orchestrator.
    pub fn new(store: LedgerStore) -> Self {
        CashDrawer {
            store,
            gate: Mutex::new(()),
        }
    }

    /// Opens the drawer day with the counted float.
    ///
    /// ## Errors
    /// - `AlreadyOpen` when an opening movement exists for the day (a closed
    ///   day has one too)
    /// - `InvalidAmount` when the counted float is negative
    pub async fn open(
        &self,
        branch_id: &str,
        date: NaiveDate,
        counted_cents: i64,
        note: Option<String>,
    ) -> EngineResult<CashMovement> {
        if counted_cents < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "opening float must not be negative, got {counted_cents}"
            )));
        }

        let _guard = self.gate.lock().await;
        // A closed day still has its opening movement, so this single check
        // rejects re-opening in both the open and the closed state.
        if self.store.cash_movements().has_opening(branch_id, date).await? {
            return Err(EngineError::AlreadyOpen {
                branch_id: branch_id.to_string(),
                date: date.to_string(),
            });
        }

        let movement = self
            .insert(branch_id, date, MovementType::Opening, counted_cents, None, note)
            .await?;

        info!(branch_id = %branch_id, date = %date, float = %counted_cents, "Drawer opened");
        Ok(movement)
    }

    /// Records cash put into the drawer outside a sale.
    pub async fn record_income(
        &self,
        branch_id: &str,
        date: NaiveDate,
        amount_cents: i64,
        description: impl Into<String>,
    ) -> EngineResult<CashMovement> {
        self.record(branch_id, date, MovementType::Income, amount_cents, description.into())
            .await
    }

    /// Records cash taken out of the drawer outside a sale.
    pub async fn record_expense(
        &self,
        branch_id: &str,
        date: NaiveDate,
        amount_cents: i64,
        description: impl Into<String>,
    ) -> EngineResult<CashMovement> {
        self.record(branch_id, date, MovementType::Expense, amount_cents, description.into())
            .await
    }

    async fn record(
        &self,
        branch_id: &str,
        date: NaiveDate,
        kind: MovementType,
        amount_cents: i64,
        description: String,
    ) -> EngineResult<CashMovement> {
        if amount_cents <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "{kind:?} amount must be positive, got {amount_cents}"
            )));
        }

        let _guard = self.gate.lock().await;
        self.ensure_open(branch_id, date).await?;
        if self.store.cash_movements().has_closing(branch_id, date).await? {
            return Err(EngineError::DrawerAlreadyClosed {
                branch_id: branch_id.to_string(),
                date: date.to_string(),
            });
        }

        self.insert(branch_id, date, kind, amount_cents, None, Some(description))
            .await
    }

    /// Closes the drawer day against a counted amount.
    ///
    /// Stores the counted amount on the closing row together with the signed
    /// `counted - expected` difference, and returns the closing movement.
    pub async fn close(
        &self,
        branch_id: &str,
        date: NaiveDate,
        counted_cents: i64,
        note: Option<String>,
    ) -> EngineResult<CashMovement> {
        if counted_cents < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "counted amount must not be negative, got {counted_cents}"
            )));
        }

        let _guard = self.gate.lock().await;
        self.ensure_open(branch_id, date).await?;
        if self.store.cash_movements().has_closing(branch_id, date).await? {
            return Err(EngineError::AlreadyClosed {
                branch_id: branch_id.to_string(),
                date: date.to_string(),
            });
        }

        let movements = self.store.cash_movements().list_for_day(branch_id, date).await?;
        let day = CashDrawerDay::from_movements(branch_id, date, &movements);
        let difference = counted_cents - day.expected_cents;

        let movement = self
            .insert(
                branch_id,
                date,
                MovementType::Closing,
                counted_cents,
                Some(difference),
                note,
            )
            .await?;

        info!(
            branch_id = %branch_id,
            date = %date,
            expected = %day.expected_cents,
            counted = %counted_cents,
            difference = %difference,
            "Drawer closed"
        );

        Ok(movement)
    }

    /// Aggregates the day's movements into a summary.
    ///
    /// Read-only and valid in any drawer state, including before opening.
    pub async fn summarize(&self, branch_id: &str, date: NaiveDate) -> EngineResult<CashDrawerDay> {
        let movements = self.store.cash_movements().list_for_day(branch_id, date).await?;
        Ok(CashDrawerDay::from_movements(branch_id, date, &movements))
    }

    async fn ensure_open(&self, branch_id: &str, date: NaiveDate) -> EngineResult<()> {
        if !self.store.cash_movements().has_opening(branch_id, date).await? {
            return Err(EngineError::DrawerNotOpen {
                branch_id: branch_id.to_string(),
                date: date.to_string(),
            });
        }
        Ok(())
    }

    async fn insert(
        &self,
        branch_id: &str,
        date: NaiveDate,
        kind: MovementType,
        amount_cents: i64,
        difference_cents: Option<i64>,
        description: Option<String>,
    ) -> EngineResult<CashMovement> {
        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.to_string(),
            movement_date: date,
            movement_type: kind,
            amount_cents,
            difference_cents,
            sale_id: None,
            description,
            created_at: Utc::now(),
        };
        self.store.cash_movements().insert(&movement).await?;
        Ok(movement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (LedgerStore, CashDrawer) {
        let store = LedgerStore::in_memory().await.unwrap();
        let drawer = CashDrawer::new(store.clone());
        (store, drawer)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[tokio::test]
    async fn test_full_drawer_day() {
        let (_store, drawer) = setup().await;

        drawer.open("b1", day(), 10_000, None).await.unwrap();
        drawer.record_income("b1", day(), 2_000, "float top-up").await.unwrap();
        drawer.record_expense("b1", day(), 500, "window cleaner").await.unwrap();

        // Expected: 100.00 + 20.00 - 5.00 = 115.00; count 5.00 over
        let closing = drawer.close("b1", day(), 12_000, None).await.unwrap();
        assert_eq!(closing.amount_cents, 12_000);
        assert_eq!(closing.difference_cents, Some(500));

        let summary = drawer.summarize("b1", day()).await.unwrap();
        assert_eq!(summary.expected_cents, 11_500);
        assert_eq!(summary.closing_cents, Some(12_000));
        assert_eq!(summary.difference_cents, Some(500));
    }

    #[tokio::test]
    async fn test_double_open_rejected() {
        let (_store, drawer) = setup().await;

        drawer.open("b1", day(), 10_000, None).await.unwrap();
        let err = drawer.open("b1", day(), 10_000, None).await;
        assert!(matches!(err, Err(EngineError::AlreadyOpen { .. })));

        // Another branch or another day opens fine
        drawer.open("b2", day(), 5_000, None).await.unwrap();
        drawer
            .open("b1", NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(), 10_000, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_operations_require_open_drawer() {
        let (_store, drawer) = setup().await;

        assert!(matches!(
            drawer.record_income("b1", day(), 1_000, "x").await,
            Err(EngineError::DrawerNotOpen { .. })
        ));
        assert!(matches!(
            drawer.close("b1", day(), 1_000, None).await,
            Err(EngineError::DrawerNotOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_day_is_sealed() {
        let (_store, drawer) = setup().await;

        drawer.open("b1", day(), 10_000, None).await.unwrap();
        drawer.close("b1", day(), 10_000, None).await.unwrap();

        assert!(matches!(
            drawer.record_expense("b1", day(), 100, "x").await,
            Err(EngineError::DrawerAlreadyClosed { .. })
        ));
        assert!(matches!(
            drawer.close("b1", day(), 10_000, None).await,
            Err(EngineError::AlreadyClosed { .. })
        ));
        // Re-opening a closed day is still a double open
        assert!(matches!(
            drawer.open("b1", day(), 10_000, None).await,
            Err(EngineError::AlreadyOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_amount_domain_checks() {
        let (_store, drawer) = setup().await;

        assert!(matches!(
            drawer.open("b1", day(), -1, None).await,
            Err(EngineError::InvalidAmount(_))
        ));

        drawer.open("b1", day(), 0, None).await.unwrap();
        assert!(matches!(
            drawer.record_income("b1", day(), 0, "x").await,
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            drawer.record_expense("b1", day(), -5, "x").await,
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_any_state() {
        let (_store, drawer) = setup().await;

        // Before opening: an all-zero summary, not an error
        let empty = drawer.summarize("b1", day()).await.unwrap();
        assert!(empty.is_empty());

        drawer.open("b1", day(), 7_500, None).await.unwrap();
        let open = drawer.summarize("b1", day()).await.unwrap();
        assert_eq!(open.opening_cents, 7_500);
        assert_eq!(open.closing_cents, None);
    }
}
