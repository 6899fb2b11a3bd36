//! # Engine Error Types
//!
//! What callers of the engine see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (tally-core)        StoreError (tally-ledger)               │
//! │       │                             │                                   │
//! │       │  InvalidCart/Argument       │  OutOfStock, NotFound lifted to  │
//! │       │  → InvalidCart              │  first-class engine variants;    │
//! │       ▼                             ▼  the rest wrapped as Store       │
//! │  ┌───────────────────────────────────────────────────────────────┐    │
//! │  │                      EngineError                              │    │
//! │  └───────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::CoreError;
use tally_ledger::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine orchestrators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The cart failed validation before any write happened.
    #[error("invalid cart: {0}")]
    InvalidCart(String),

    /// The paid amount does not satisfy the tender's payment rule.
    ///
    /// ## When This Occurs
    /// - Partial tender with `paid <= 0` or `paid >= grand_total`
    /// - Credit or partial tender without a customer
    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    /// A stock decrement would drive a product's quantity below zero.
    ///
    /// By the time the caller sees this, every already-applied step of the
    /// sale has been compensated.
    #[error("out of stock for {name}: available {available}, requested {requested}")]
    OutOfStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A monetary amount is outside its valid domain for the operation.
    ///
    /// ## When This Occurs
    /// - Negative opening/closing count for the drawer
    /// - Non-positive income or expense amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A referenced entity does not exist (or, for reversal, the sale is no
    /// longer in the completed state).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `open` was called on a drawer day that already has an opening
    /// movement.
    #[error("cash drawer already open for branch {branch_id} on {date}")]
    AlreadyOpen { branch_id: String, date: String },

    /// `open` or `close` was called on a drawer day that already has a
    /// closing movement.
    #[error("cash drawer already closed for branch {branch_id} on {date}")]
    AlreadyClosed { branch_id: String, date: String },

    /// An income/expense/close was attempted before the day was opened.
    #[error("cash drawer not open for branch {branch_id} on {date}")]
    DrawerNotOpen { branch_id: String, date: String },

    /// An income or expense was attempted after the day was closed.
    #[error("cash drawer already closed for branch {branch_id} on {date}")]
    DrawerAlreadyClosed { branch_id: String, date: String },

    /// The forward sale sequence failed AND at least one compensating write
    /// also failed, so the store may be left partially uncompensated.
    ///
    /// `primary` is the error that aborted the sale; `warnings` describe the
    /// compensations that could not be applied.
    #[error("{primary} (compensation incomplete)")]
    CompensationIncomplete {
        primary: Box<EngineError>,
        warnings: Vec<String>,
    },

    /// A store operation failed for a reason the engine does not interpret.
    #[error("store error: {0}")]
    Store(StoreError),
}

/// Lift store errors, promoting the variants the engine reacts to.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfStock {
                name,
                available,
                requested,
            } => EngineError::OutOfStock {
                name,
                available,
                requested,
            },
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Store(other),
        }
    }
}

/// Pure domain failures all reach the caller as cart problems.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCart { reason } => EngineError::InvalidCart(reason),
            CoreError::InvalidArgument { what, reason } => {
                EngineError::InvalidCart(format!("{what}: {reason}"))
            }
        }
    }
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_lifting() {
        let lifted: EngineError = StoreError::OutOfStock {
            name: "Widget".to_string(),
            available: 1,
            requested: 3,
        }
        .into();
        assert!(matches!(lifted, EngineError::OutOfStock { available: 1, .. }));

        let lifted: EngineError = StoreError::not_found("Sale", "s1").into();
        assert!(matches!(lifted, EngineError::NotFound { .. }));

        let lifted: EngineError = StoreError::QueryFailed("boom".to_string()).into();
        assert!(matches!(lifted, EngineError::Store(_)));
    }

    #[test]
    fn test_core_error_lifting() {
        let lifted: EngineError = CoreError::InvalidCart {
            reason: "cart is empty".to_string(),
        }
        .into();
        assert_eq!(lifted.to_string(), "invalid cart: cart is empty");
    }
}
