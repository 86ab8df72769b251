//! Amount type for representing monetary amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use super::{Price, Quantity, ValidationError};
use crate::scale::quantize_money;

/// Amount type - used for representing monetary amounts (price × quantity).
///
/// Wraps a `Decimal` value, quantized to the money scale (2 decimal places,
/// half-up) on construction. Amounts are non-negative; debits and credits
/// are expressed by the operation, not the sign.
///
/// # Examples
///
/// ```
/// use ballast_core::types::{Amount, Price, Quantity};
/// use rust_decimal_macros::dec;
///
/// let price = Price::new(dec!(100)).unwrap();
/// let qty = Quantity::new(dec!(10)).unwrap();
/// let amount = Amount::from_price_qty(price, qty);
/// assert_eq!(amount.as_decimal(), dec!(1000.00));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new `Amount`, quantizing to the money scale.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NegativeAmount` if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount(value));
        }
        Ok(Self(quantize_money(value)))
    }

    /// Creates a new `Amount` without validation or quantization.
    #[must_use]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Creates an `Amount` from price and quantity, quantized to the money
    /// scale.
    #[must_use]
    pub fn from_price_qty(price: Price, qty: Quantity) -> Self {
        Self(quantize_money(price.as_decimal() * qty.as_decimal()))
    }

    /// Returns the underlying `Decimal` value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|_| ValidationError::NegativeAmount(Decimal::ZERO))?;
        Self::new(decimal)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Decimal;

    /// Signed difference; callers decide how to interpret the sign.
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}
