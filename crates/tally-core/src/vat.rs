//! # VAT Calculator
//!
//! Pure arithmetic for value-added tax: splitting an amount into its
//! tax-exclusive and tax-inclusive components, and aggregating multi-line
//! cart totals.
//!
//! ## Rounding Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUNDING RULES (reproducible, callers assert on them)                  │
//! │                                                                         │
//! │  1. Intermediate math uses full precision (i128 numerators).            │
//! │  2. Round-half-up is applied ONCE, at the final step of each component. │
//! │  3. aggregate() rounds per line first, then sums the rounded lines.     │
//! │     Sums of integer cents are exact, so the totals carry no further     │
//! │     rounding error.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::vat::{price_components, VatRate};
//!
//! // 100.00 at 20%, price excludes VAT
//! let parts = price_components(Money::from_cents(10_000), VatRate::from_bps(2000), false).unwrap();
//! assert_eq!(parts.ex_vat.cents(), 10_000);
//! assert_eq!(parts.vat.cents(), 2_000);
//! assert_eq!(parts.inc_vat.cents(), 12_000);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2000 bps = 20.00%. Integer bps keep rate arithmetic exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRate(u32);

/// Upper bound of the valid rate domain: 100% = 10,000 bps.
pub const MAX_VAT_BPS: u32 = 10_000;

impl VatRate {
    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Creates a VAT rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        VatRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Price Components
// =============================================================================

/// The three faces of one amount: net of VAT, gross of VAT, and the VAT itself.
///
/// Invariant: `ex_vat + vat == inc_vat` (the unrounded side is derived by
/// subtraction, never rounded independently).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceComponents {
    /// Amount excluding VAT.
    pub ex_vat: Money,
    /// Amount including VAT.
    pub inc_vat: Money,
    /// The VAT portion.
    pub vat: Money,
}

/// One line fed into [`aggregate`].
#[derive(Debug, Clone, Copy)]
pub struct VatLine {
    /// Unit amount for the line (interpretation depends on the caller; the
    /// orchestrator passes the discounted unit price).
    pub amount: Money,
    /// Quantity multiplier applied before the VAT split.
    pub quantity: i64,
    /// Rate for this line.
    pub rate: VatRate,
}

/// Aggregated totals over a set of [`VatLine`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatTotals {
    /// Sum of per-line ex-VAT amounts.
    pub subtotal: Money,
    /// Sum of per-line VAT amounts.
    pub total_vat: Money,
    /// Sum of per-line inc-VAT amounts.
    pub grand_total: Money,
}

// =============================================================================
// Operations
// =============================================================================

/// Splits `amount` into ex-VAT / inc-VAT / VAT components.
///
/// ## Arguments
/// * `amount` - The known amount, non-negative
/// * `rate` - VAT rate, at most 10,000 bps (100%)
/// * `amount_includes_vat` - Whether `amount` is the gross (true) or the net
///   (false) side
///
/// ## Errors
/// `CoreError::InvalidArgument` when `amount` is negative or `rate` exceeds
/// 100%.
pub fn price_components(
    amount: Money,
    rate: VatRate,
    amount_includes_vat: bool,
) -> CoreResult<PriceComponents> {
    if amount.is_negative() {
        return Err(CoreError::InvalidArgument {
            what: "amount".to_string(),
            reason: format!("must not be negative, got {amount}"),
        });
    }
    if rate.bps() > MAX_VAT_BPS {
        return Err(CoreError::InvalidArgument {
            what: "vat rate".to_string(),
            reason: format!("must be between 0 and 100%, got {} bps", rate.bps()),
        });
    }

    let cents = amount.cents() as i128;
    let bps = rate.bps() as i128;

    if amount_includes_vat {
        // ex = amount / (1 + rate) = amount * 10000 / (10000 + bps),
        // rounded half-up at the final step only
        let ex = div_round_half_up(cents * 10_000, 10_000 + bps);
        let ex_vat = Money::from_cents(ex as i64);
        Ok(PriceComponents {
            ex_vat,
            inc_vat: amount,
            vat: amount - ex_vat,
        })
    } else {
        // vat = amount * rate = amount * bps / 10000, rounded half-up
        let vat = div_round_half_up(cents * bps, 10_000);
        let vat = Money::from_cents(vat as i64);
        Ok(PriceComponents {
            ex_vat: amount,
            inc_vat: amount + vat,
            vat,
        })
    }
}

/// Aggregates multi-line totals.
///
/// Each line is expanded to `amount * quantity`, split via
/// [`price_components`], rounded per line, and the rounded lines are summed.
/// This per-line-then-sum order is part of the calculator's contract.
pub fn aggregate(lines: &[VatLine], amounts_include_vat: bool) -> CoreResult<VatTotals> {
    let mut subtotal = Money::zero();
    let mut total_vat = Money::zero();
    let mut grand_total = Money::zero();

    for line in lines {
        if line.quantity <= 0 {
            return Err(CoreError::InvalidArgument {
                what: "quantity".to_string(),
                reason: format!("must be positive, got {}", line.quantity),
            });
        }

        let line_amount = line.amount.multiply_quantity(line.quantity);
        let parts = price_components(line_amount, line.rate, amounts_include_vat)?;

        subtotal += parts.ex_vat;
        total_vat += parts.vat;
        grand_total += parts.inc_vat;
    }

    Ok(VatTotals {
        subtotal,
        total_vat,
        grand_total,
    })
}

/// Integer division `n / d` rounded half-up.
///
/// Both operands must be non-negative and `d` must be positive; callers
/// guarantee this via the domain checks in [`price_components`].
#[inline]
fn div_round_half_up(n: i128, d: i128) -> i128 {
    (2 * n + d) / (2 * d)
}

// =============================================================================
// Unit Tests
// =============================================================================
