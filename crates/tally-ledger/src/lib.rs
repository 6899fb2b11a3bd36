//! # tally-ledger: Ledger Store Gateway for Tally
//!
//! This crate is the only component that reads or writes the relational
//! store behind the sale engine. It exposes entity-level CRUD over five
//! logical tables plus two conditional adjusters used by the orchestrators.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  tally-engine (process_sale, cancel_sale, drawer ops, recalc)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-ledger (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  LedgerStore  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Product       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Customer      │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ Sale          │    │              │  │   │
//! │  │   │               │    │ CashMovement  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (each call is one isolated round trip - no cross-entity        │
//! │  transaction is offered to the layers above)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded store migrations
//! - [`error`] - Store error types
//! - [`repository`] - Repository implementations

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{LedgerStore, StoreConfig};

// Repository re-exports for convenience
pub use repository::cash_movement::CashMovementRepository;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
