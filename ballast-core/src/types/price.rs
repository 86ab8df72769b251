//! Price type for representing per-share prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;
use crate::scale::quantize_money;

/// Price type - used for representing per-share prices.
///
/// Wraps a `Decimal` value, quantized to the money scale (2 decimal places,
/// half-up) on construction. Prices are strictly positive; market-level
/// bounds (`min_price`/`max_price`) are enforced where the price enters the
/// system, not here.
///
/// # Examples
///
/// ```
/// use ballast_core::types::Price;
/// use rust_decimal_macros::dec;
///
/// let price = Price::new(dec!(100.505)).unwrap();
/// assert_eq!(price.as_decimal(), dec!(100.51));
/// assert!(Price::new(dec!(0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Creates a new `Price` from a `Decimal` value, quantizing to the
    /// money scale.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositivePrice` if the value is zero or
    /// negative.
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(value));
        }
        Ok(Self(quantize_money(value)))
    }

    /// Creates a new `Price` without validation or quantization.
    ///
    /// # Safety
    ///
    /// The caller must ensure the value is positive and at the money scale.
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

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s).map_err(|_| ValidationError::NonPositivePrice(Decimal::ZERO))?;
        Self::new(decimal)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_new_quantizes() {
        let price = Price::new(dec!(100.505)).unwrap();
        assert_eq!(price.as_decimal(), dec!(100.51));
    }

    #[test]
    fn test_price_new_rejects_zero() {
        assert!(matches!(
            Price::new(dec!(0)),
            Err(ValidationError::NonPositivePrice(_))
        ));
    }

    #[test]
    fn test_price_new_rejects_negative() {
        assert!(Price::new(dec!(-1.0)).is_err());
    }

    #[test]
    fn test_price_equality_at_scale() {
        // Sub-cent differences disappear at the money scale.
        let a = Price::new(dec!(250.001)).unwrap();
        let b = Price::new(dec!(250.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(dec!(100.50)).unwrap();
        assert_eq!(format!("{price}"), "100.50");
    }

    #[test]
    fn test_price_from_str() {
        let price: Price = "100.50".parse().unwrap();
        assert_eq!(price.as_decimal(), dec!(100.50));
    }

    #[test]
    fn test_price_serde_roundtrip() {
        let price = Price::new(dec!(123.45)).unwrap();
        let json = serde_json::to_string(&price).unwrap();
        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(price, parsed);
    }
}
