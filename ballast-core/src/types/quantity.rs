//! Quantity type for representing share quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use super::ValidationError;
use crate::scale::quantize_quantity;

/// Quantity type - used for representing share quantities.
///
/// Wraps a `Decimal` value, quantized to the quantity scale (9 decimal
/// places, half-up) on construction. Fractional shares are first-class.
/// Held quantities are non-negative by invariant; use [`Quantity::new`]
/// to enforce it.
///
/// # Examples
///
/// ```
/// use ballast_core::types::Quantity;
/// use rust_decimal_macros::dec;
///
/// let qty = Quantity::new(dec!(13.3333333333)).unwrap();
/// assert_eq!(qty.as_decimal(), dec!(13.333333333));
/// assert!(Quantity::new(dec!(-1)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Zero quantity constant.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new non-negative `Quantity`, quantizing to the quantity
    /// scale.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NegativeQuantity` if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeQuantity(value));
        }
        Ok(Self(quantize_quantity(value)))
    }

    /// Creates a new `Quantity` without validation or quantization.
    #[must_use]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying `Decimal` value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true if the quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts `rhs`, returning `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Self(self.0 - rhs.0))
        }
    }

    /// Subtracts `rhs`, clamping at zero.
    #[must_use]
    pub fn saturating_sub(&self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|_| ValidationError::NegativeQuantity(Decimal::ZERO))?;
        Self::new(decimal)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Decimal;

    /// Signed difference; callers decide how to interpret the sign.
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl From<Quantity> for Decimal {
    fn from(qty: Quantity) -> Self {
        qty.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}
