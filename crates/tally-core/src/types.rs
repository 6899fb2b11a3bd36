//! # Domain Types
//!
//! Core domain types shared by the ledger gateway and the engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Product      │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  number (branch │   │  stock_quantity │   │  balance_cents  │       │
//! │  │   scoped, mono) │   │   (never < 0    │   │   (derived from │       │
//! │  │  tender_type    │   │    after a sale │   │    credit sales │       │
//! │  │  net_cents      │   │    commits)     │   │    − payments)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    SaleLine     │   │  CashMovement   │   │  CashDrawerDay  │       │
//! │  │  owned by Sale  │   │  append-only    │   │  derived, never │       │
//! │  │                 │   │  per drawer day │   │  stored         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for store relations
//! - Business ID where one exists: (sku, sale number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::vat::VatRate;

// =============================================================================
// Tender Type
// =============================================================================

/// The payment method selected for a sale.
///
/// Each tender carries different side effects when a sale commits:
/// - `Cash` - appends a drawer cash movement
/// - `Card` - no ledger side effects beyond the sale itself
/// - `Credit` - full amount onto the customer balance, paid amount forced to 0
/// - `Partial` - part paid now (cash movement), full amount onto the balance
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderType {
    Cash,
    Card,
    Credit,
    Partial,
}

impl TenderType {
    /// Tenders that put a delta on the customer ledger.
    #[inline]
    pub const fn touches_customer_ledger(&self) -> bool {
        matches!(self, TenderType::Credit | TenderType::Partial)
    }

    /// Tenders that put money in the cash drawer.
    #[inline]
    pub const fn touches_cash_drawer(&self) -> bool {
        matches!(self, TenderType::Cash | TenderType::Partial)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// A sale is immutable once `Completed` except for the transition to
/// `Cancelled`, which is performed by the reversal orchestrator together
/// with its compensating ledger writes.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

// =============================================================================
// Cash Movement Type
// =============================================================================

/// Kind of entry in the cash drawer ledger.
///
/// `Opening` and `Closing` are singletons per (branch, date); the other
/// kinds are append-only while the drawer day accumulates.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Opening,
    Closing,
    Income,
    Expense,
    Sale,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of a shopping cart.
///
/// Ephemeral: owned by the caller until a sale is committed, at which point
/// it is frozen into a [`SaleLine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    /// Absolute discount for the whole line, in cents.
    pub discount_cents: i64,
    /// VAT rate in basis points (1800 = 18%).
    pub vat_rate_bps: u32,
}

impl CartLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.vat_rate_bps)
    }

    /// Line amount after discount: `unit_price * quantity - discount`.
    #[inline]
    pub fn discounted_amount(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity) - self.discount()
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale transaction.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,
    /// Branch-scoped display number: monotonic, gaps allowed, never reused.
    pub number: i64,
    pub customer_id: Option<String>,
    pub tender_type: TenderType,
    pub status: SaleStatus,
    /// Sum of per-line ex-VAT amounts, in cents.
    pub subtotal_cents: i64,
    /// Sum of per-line discounts, in cents.
    pub discount_cents: i64,
    /// Sum of per-line VAT, in cents.
    pub vat_cents: i64,
    /// Grand total including VAT, in cents. The ledger delta for credit sales.
    pub net_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn net_total(&self) -> Money {
        Money::from_cents(self.net_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A line item owned exclusively by its [`Sale`]; deleted only together
/// with the sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// VAT for this line.
    pub vat_cents: i64,
    /// Line total including VAT.
    pub total_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - business identifier.
    pub sku: String,
    pub name: String,
    /// Price in cents (smallest currency unit).
    pub sale_price_cents: i64,
    /// VAT rate in basis points (1800 = 18%).
    pub vat_rate_bps: u32,
    /// Current stock level. Never allowed to go negative by a sale.
    pub stock_quantity: i64,
    /// Reorder threshold for the low-stock report.
    pub critical_stock_level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.vat_rate_bps)
    }

    /// Whether the stock level has fallen to or below the reorder threshold.
    #[inline]
    pub fn is_below_critical(&self) -> bool {
        self.stock_quantity <= self.critical_stock_level
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running ledger balance.
///
/// `balance_cents` is a derived quantity: it must always equal
/// `Σ(credit-sale net amounts) − Σ(payments)`. The balance recalculator is
/// the authority that restores this after drift.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Signed: positive means the customer owes the store.
    pub balance_cents: i64,
    pub credit_limit_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

// =============================================================================
// Customer Payment
// =============================================================================

/// A payment received against a customer's balance.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPayment {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Cash Movement
// =============================================================================

/// One entry in the cash drawer ledger.
///
/// Amounts are stored positive; `Expense` movements are subtracted during
/// aggregation. `difference_cents` is populated only on `Closing` movements.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashMovement {
    pub id: String,
    pub branch_id: String,
    pub movement_date: NaiveDate,
    pub movement_type: MovementType,
    pub amount_cents: i64,
    /// Counted-minus-expected at close time; `None` for every other kind.
    pub difference_cents: Option<i64>,
    /// Back-reference for `Sale` movements.
    pub sale_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Cash Drawer Day (derived)
// =============================================================================

/// The aggregate of all cash movements for one branch on one date.
///
/// Never stored; computed on demand from the movement rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashDrawerDay {
    pub branch_id: String,
    pub date: NaiveDate,
    pub opening_cents: i64,
    pub income_cents: i64,
    pub expense_cents: i64,
    pub sales_cents: i64,
    /// Counted amount recorded at close, if the drawer has been closed.
    pub closing_cents: Option<i64>,
    /// `opening + income + sales - expense`.
    pub expected_cents: i64,
    /// `closing - expected`, signed; `None` while the drawer is open.
    pub difference_cents: Option<i64>,
}

impl CashDrawerDay {
    /// Pure aggregation over a day's movements.
    ///
    /// Safe to call with an empty slice (returns an all-zero summary) and in
    /// any drawer state; never mutates anything.
    pub fn from_movements(
        branch_id: impl Into<String>,
        date: NaiveDate,
        movements: &[CashMovement],
    ) -> Self {
        let mut opening = 0i64;
        let mut income = 0i64;
        let mut expense = 0i64;
        let mut sales = 0i64;
        let mut closing: Option<i64> = None;

        for m in movements {
            match m.movement_type {
                MovementType::Opening => opening = m.amount_cents,
                MovementType::Closing => closing = Some(m.amount_cents),
                MovementType::Income => income += m.amount_cents,
                MovementType::Expense => expense += m.amount_cents,
                MovementType::Sale => sales += m.amount_cents,
            }
        }

        let expected = opening + income + sales - expense;

        CashDrawerDay {
            branch_id: branch_id.into(),
            date,
            opening_cents: opening,
            income_cents: income,
            expense_cents: expense,
            sales_cents: sales,
            closing_cents: closing,
            expected_cents: expected,
            difference_cents: closing.map(|c| c - expected),
        }
    }

    #[inline]
    pub fn expected(&self) -> Money {
        Money::from_cents(self.expected_cents)
    }

    /// Whether any movement exists for the day at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opening_cents == 0
            && self.income_cents == 0
            && self.expense_cents == 0
            && self.sales_cents == 0
            && self.closing_cents.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
