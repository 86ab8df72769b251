//! Weight type for representing target allocation fractions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;
use crate::scale::quantize_percent;

/// Weight type - a stock's intended fraction of a portfolio's total value.
///
/// Wraps a `Decimal` in `(0, 1]`, quantized to the percentage scale
/// (4 decimal places, half-up) on construction. A portfolio's weights must
/// sum to exactly 1 at that scale; the sum invariant is enforced where the
/// portfolio is assembled.
///
/// # Examples
///
/// ```
/// use ballast_core::types::Weight;
/// use rust_decimal_macros::dec;
///
/// let weight = Weight::new(dec!(0.4)).unwrap();
/// assert_eq!(weight.as_decimal(), dec!(0.4000));
/// assert!(Weight::new(dec!(0)).is_err());
/// assert!(Weight::new(dec!(1.1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Weight(Decimal);

impl Weight {
    /// Full allocation constant (100%).
    pub const ONE: Self = Self(Decimal::ONE);

    /// Creates a new `Weight`, quantizing to the percentage scale.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidWeight` if the value is outside
    /// `(0, 1]` (before or after quantization).
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        let quantized = quantize_percent(value);
        if quantized <= Decimal::ZERO || quantized > Decimal::ONE {
            return Err(ValidationError::InvalidWeight(value));
        }
        Ok(Self(quantized))
    }

    /// Creates a new `Weight` without validation or quantization.
    #[must_use]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying `Decimal` value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Weight {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|_| ValidationError::InvalidWeight(Decimal::ZERO))?;
        Self::new(decimal)
    }
}

impl From<Weight> for Decimal {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}
