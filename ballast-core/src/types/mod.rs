//! NewType wrappers for financial primitives.
//!
//! This module provides type-safe wrappers around decimal values
//! to prevent mixing incompatible quantities at compile time.
//!
//! # Types
//!
//! - [`Price`] - Per-share prices, quantized at the money scale
//! - [`Quantity`] - Share quantities, quantized at the quantity scale
//! - [`Amount`] - Monetary amounts (price × quantity), quantized at the money scale
//! - [`Weight`] - Target allocation fractions in `(0, 1]`
//! - [`Symbol`] - Ticker symbols (exactly four uppercase ASCII letters)
//! - [`OperationId`] / [`BatchId`] - Broker operation and batch identities
//! - [`Timestamp`] - Unix millisecond timestamps

mod amount;
mod ids;
mod price;
mod quantity;
mod symbol;
mod timestamp;
mod weight;

pub use amount::Amount;
pub use ids::{BatchId, OperationId};
pub use price::Price;
pub use quantity::Quantity;
pub use symbol::Symbol;
pub use timestamp::Timestamp;
pub use weight::Weight;

/// Validation error for `NewType` construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Symbol is empty
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// Symbol format is invalid
    #[error("invalid symbol (expected exactly {expected_len} uppercase ASCII letters): {symbol}")]
    InvalidSymbol {
        /// The rejected symbol text.
        symbol: String,
        /// Required symbol length.
        expected_len: usize,
    },

    /// Price value is zero or negative
    #[error("price must be positive: {0}")]
    NonPositivePrice(rust_decimal::Decimal),

    /// Quantity value is negative
    #[error("quantity cannot be negative: {0}")]
    NegativeQuantity(rust_decimal::Decimal),

    /// Amount value is negative
    #[error("amount cannot be negative: {0}")]
    NegativeAmount(rust_decimal::Decimal),

    /// Allocation weight outside `(0, 1]`
    #[error("allocation weight must be in (0, 1]: {0}")]
    InvalidWeight(rust_decimal::Decimal),

    /// Timestamp is negative
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Order amount outside the broker's money bounds
    #[error("order amount {amount} outside bounds [{min}, {max}]")]
    AmountOutOfRange {
        /// The rejected amount.
        amount: rust_decimal::Decimal,
        /// Smallest accepted amount.
        min: rust_decimal::Decimal,
        /// Largest accepted amount.
        max: rust_decimal::Decimal,
    },

    /// Order quantity outside the broker's quantity bounds
    #[error("order quantity {quantity} outside bounds [{min}, {max}]")]
    QuantityOutOfRange {
        /// The rejected quantity.
        quantity: rust_decimal::Decimal,
        /// Smallest accepted quantity.
        min: rust_decimal::Decimal,
        /// Largest accepted quantity.
        max: rust_decimal::Decimal,
    },
}
