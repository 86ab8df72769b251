//! Fixed decimal scales and quantization helpers.
//!
//! All arithmetic in the system is carried out in exact decimal; values are
//! quantized half-up to their scale at assignment time:
//!
//! - money: 2 decimal places
//! - share quantity: 9 decimal places (fractional shares)
//! - allocation percentage (fraction of 1): 4 decimal places

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for cash amounts and prices (USD).
pub const MONEY_SCALE: u32 = 2;

/// Decimal places for share quantities.
pub const QUANTITY_SCALE: u32 = 9;

/// Decimal places for allocation fractions.
pub const PERCENT_SCALE: u32 = 4;

/// Quantizes a value to the money scale, rounding half-up.
#[must_use]
pub fn quantize_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Quantizes a value to the quantity scale, rounding half-up.
#[must_use]
pub fn quantize_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Quantizes a value to the percentage scale, rounding half-up.
#[must_use]
pub fn quantize_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// One tick at the quantity scale (`1e-9`).
#[must_use]
pub fn quantity_tick() -> Decimal {
    Decimal::new(1, QUANTITY_SCALE)
}

/// One tick at the percentage scale (`1e-4`).
#[must_use]
pub fn percent_tick() -> Decimal {
    Decimal::new(1, PERCENT_SCALE)
}
