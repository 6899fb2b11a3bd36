//! # tally-engine: Sale & Reversal Orchestration for Tally
//!
//! The coordination layer of the sale engine. Everything multi-entity lives
//! here: committing a sale, cancelling one, running the cash drawer day, and
//! rebuilding customer balances.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  Caller (UI / API glue)                                                 │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │                ★ tally-engine (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────┐      │   │
//! │  │  │   sale    │ │ reversal  │ │  drawer   │ │  recalc   │      │   │
//! │  │  │  forward  │ │best-effort│ │ day state │ │ authority │      │   │
//! │  │  │   saga    │ │   undo    │ │  machine  │ │  rebuild  │      │   │
//! │  │  └─────┬─────┘ └─────┬─────┘ └─────┬─────┘ └─────┬─────┘      │   │
//! │  │        │      ┌──────┴──────┐      │             │            │   │
//! │  │        └──────►    saga     ◄──────┘             │            │   │
//! │  │               │(compensation)                    │            │   │
//! │  │               └─────────────┘                    │            │   │
//! │  └────────────────────────────┬──────────────────────────────────┘   │
//! │                               │                                       │
//! │  tally-ledger (isolated round trips, no cross-entity transaction)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! The store offers no transaction spanning a sale's writes. Instead:
//!
//! - **Forward (sale)**: each step that succeeds pushes a compensation; a
//!   failing step unwinds the stack in reverse and the caller gets the
//!   primary error. Compensation failures are attached to it as secondary
//!   warnings ([`error::EngineError::CompensationIncomplete`]).
//! - **Reverse (cancel)**: individual undo steps are best-effort - failures
//!   become warnings on the [`reversal::CancelOutcome`] and the undo keeps
//!   going. The [`recalc::BalanceRecalculator`] is the repair tool when a
//!   warning left the ledger inconsistent.
//!
//! ## Modules
//!
//! - [`sale`] - Forward sale saga
//! - [`reversal`] - Best-effort sale cancellation
//! - [`saga`] - Compensation stack shared by the orchestrators
//! - [`drawer`] - Cash drawer day state machine
//! - [`recalc`] - Customer balance recalculation
//! - [`fiscal`] - Fire-and-forget fiscal notification hook
//! - [`error`] - Engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod drawer;
pub mod error;
pub mod fiscal;
pub mod recalc;
pub mod reversal;
pub mod saga;
pub mod sale;

// =============================================================================
// Re-exports
// =============================================================================

pub use drawer::CashDrawer;
pub use error::{EngineError, EngineResult};
pub use fiscal::{FiscalNotifier, NoopFiscal};
pub use recalc::BalanceRecalculator;
pub use reversal::{CancelOutcome, SaleReversal};
pub use sale::{SaleInput, SaleProcessor, SaleReceipt};
