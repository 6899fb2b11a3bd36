//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                          │
//! │  └── CoreError        - Pure domain failures (bad VAT input, bad cart)  │
//! │                                                                         │
//! │  tally-ledger errors (separate crate)                                   │
//! │  └── StoreError       - Ledger store operation failures                 │
//! │                                                                         │
//! │  tally-engine errors (separate crate)                                   │
//! │  └── EngineError      - What the caller sees                            │
//! │                                                                         │
//! │  Flow: CoreError → EngineError ← StoreError                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, value, reason)
//! 3. Errors are enum variants, never bare Strings

use thiserror::Error;

/// Pure domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A numeric input is outside its valid domain.
    ///
    /// ## When This Occurs
    /// - Negative amount passed to the VAT calculator
    /// - VAT rate above 100%
    /// - Non-positive quantity in an aggregation line
    #[error("invalid {what}: {reason}")]
    InvalidArgument { what: String, reason: String },

    /// The cart cannot be turned into a sale.
    ///
    /// ## When This Occurs
    /// - Empty cart
    /// - A line with quantity <= 0, negative price, or negative discount
    #[error("invalid cart: {reason}")]
    InvalidCart { reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidArgument {
            what: "vat rate".to_string(),
            reason: "must be between 0 and 100%, got 15000 bps".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid vat rate: must be between 0 and 100%, got 15000 bps"
        );

        let err = CoreError::InvalidCart {
            reason: "cart is empty".to_string(),
        };
        assert_eq!(err.to_string(), "invalid cart: cart is empty");
    }
}
