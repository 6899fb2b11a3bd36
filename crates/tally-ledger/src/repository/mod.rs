//! # Repository Module
//!
//! Repository implementations for the Tally ledger store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Engine orchestrator                                                   │
//! │       │                                                                 │
//! │       │  store.products().adjust_stock(id, -qty)                        │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, product)                                            │
//! │  └── adjust_stock(&self, id, delta)  ← conditional write               │
//! │       │                                                                 │
//! │       │  SQL (one round trip per call, no cross-call transaction)      │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and stock adjustment
//! - [`customer::CustomerRepository`] - Customer balance and payments
//! - [`sale::SaleRepository`] - Sale headers, lines, branch numbering
//! - [`cash_movement::CashMovementRepository`] - Drawer ledger entries

pub mod cash_movement;
pub mod customer;
pub mod product;
pub mod sale;
