//! Premium/discount of a secondary-market rate over the primary benchmark.
//!
//! `premium = (secondary - primary) / primary`
//!
//! Positive means the token trades above its issuance rate, negative means
//! a discount. Computed in `Decimal` with no rounding; presentation rounding
//! belongs to whoever reads the store.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::PriceError;

/// Relative deviation of `secondary` from `primary`.
///
/// # Errors
/// `InvalidBenchmark` when `primary` is zero or negative.
pub fn premium(primary: Decimal, secondary: Decimal) -> Result<Decimal, PriceError> {
    if primary <= Decimal::ZERO {
        return Err(PriceError::InvalidBenchmark(format!(
            "benchmark must be positive, got {primary}"
        )));
    }

    (secondary - primary)
        .checked_div(primary)
        .ok_or_else(|| PriceError::InvalidBenchmark(format!("premium overflow for benchmark {primary}")))
}

/// Human-readable form used in logs, e.g. `0.476% premium`.
pub fn describe(premium: Decimal) -> String {
    let pct = (premium.abs() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
    let side = if premium.is_sign_negative() && !premium.is_zero() {
        "discount"
    } else {
        "premium"
    };
    format!("{pct:.3}% {side}")
}
