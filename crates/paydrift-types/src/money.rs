//! Currency normalization helpers.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::CURRENCY_SCALE;

/// Round to the currency scale (2 decimals), midpoint away from zero.
///
/// Reward computation depends on this: `round2(base × rate)` must land on
/// an exact cent so the credited amount equals what the notification says.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
