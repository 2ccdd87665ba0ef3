//! Money rounding.
//!
//! Monetary values are `rust_decimal::Decimal` throughout. Every amount is
//! rounded to cents at the point it is finalized, never deferred.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimal places, half away from zero (`0.005 -> 0.01`,
/// `-0.005 -> -0.01`).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Floor at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
