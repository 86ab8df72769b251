//! Stock-related error types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stock error type covering symbol format and price bound violations.
///
/// These are boundary validation errors: they fail where the price or
/// symbol enters the system and never propagate into the rebalancing
/// engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockError {
    /// Symbol does not match the four-uppercase-letter rule.
    #[error("[Stock] Invalid symbol: {symbol}")]
    InvalidSymbol {
        /// The rejected symbol text.
        symbol: String,
    },

    /// Price outside the configured market bounds or non-positive.
    #[error("[Stock] Invalid price {price} for {symbol}: must be within [{min}, {max}]")]
    InvalidPrice {
        /// Symbol the price was quoted for.
        symbol: String,
        /// The rejected price.
        price: Decimal,
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },

    /// Symbol is not listed in the market.
    #[error("[Stock] Not listed: {symbol}")]
    NotListed {
        /// The unknown symbol.
        symbol: String,
    },
}

impl StockError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Warning
    }
}
