//! # Validation Module
//!
//! Business rule validation for carts and payment inputs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API glue)                                        │
//! │  ├── Basic format checks, required fields                               │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  ├── Cart shape (non-empty, positive quantities)                        │
//! │  └── Runs before any store write, so a bad cart never starts a saga     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store (SQLite)                                                │
//! │  ├── NOT NULL / UNIQUE constraints                                      │
//! │  └── Partial unique index on drawer opening/closing rows                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::CartLine;

/// Maximum lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Validates a cart before the sale sequence starts.
///
/// ## Rules
/// - Cart must not be empty
/// - Every quantity must be positive (and within bounds)
/// - Unit prices and discounts must not be negative
/// - A discount may not exceed the undiscounted line amount
///
/// ## Example
/// ```rust
/// use tally_core::types::CartLine;
/// use tally_core::validation::validate_cart;
///
/// let line = CartLine {
///     product_id: "p1".to_string(),
///     quantity: 2,
///     unit_price_cents: 1000,
///     discount_cents: 0,
///     vat_rate_bps: 1800,
/// };
/// assert!(validate_cart(&[line]).is_ok());
/// assert!(validate_cart(&[]).is_err());
/// ```
pub fn validate_cart(lines: &[CartLine]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::InvalidCart {
            reason: "cart is empty".to_string(),
        });
    }

    if lines.len() > MAX_CART_LINES {
        return Err(CoreError::InvalidCart {
            reason: format!("cart cannot have more than {MAX_CART_LINES} lines"),
        });
    }

    for line in lines {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidCart {
                reason: format!(
                    "product {}: quantity must be positive, got {}",
                    line.product_id, line.quantity
                ),
            });
        }
        if line.quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::InvalidCart {
                reason: format!(
                    "product {}: quantity {} exceeds maximum {MAX_LINE_QUANTITY}",
                    line.product_id, line.quantity
                ),
            });
        }
        if line.unit_price_cents < 0 {
            return Err(CoreError::InvalidCart {
                reason: format!("product {}: unit price must not be negative", line.product_id),
            });
        }
        if line.discount_cents < 0 {
            return Err(CoreError::InvalidCart {
                reason: format!("product {}: discount must not be negative", line.product_id),
            });
        }
        if line.discounted_amount().is_negative() {
            return Err(CoreError::InvalidCart {
                reason: format!(
                    "product {}: discount exceeds line amount",
                    line.product_id
                ),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
