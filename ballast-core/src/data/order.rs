//! Order request and outcome types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{
    Amount, BatchId, OperationId, Price, Quantity, Symbol, Timestamp, ValidationError,
};

/// Smallest cash amount an order may carry (USD).
pub const MIN_ORDER_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest cash amount an order may carry (USD).
pub const MAX_ORDER_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Smallest quantity a buy order may carry.
pub const MIN_BUY_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Smallest quantity a sell order may carry.
pub const MIN_SELL_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Largest quantity any order may carry.
pub const MAX_ORDER_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Order side - Buy or Sell direction.
///
/// # Examples
///
/// ```
/// use ballast_core::data::OrderSide;
///
/// let side = OrderSide::Buy;
/// assert!(side.is_buy());
/// assert_eq!(side.opposite(), OrderSide::Sell);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl OrderSide {
    /// Returns true if this is a buy order.
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Returns true if this is a sell order.
    #[must_use]
    pub const fn is_sell(&self) -> bool {
        matches!(self, Self::Sell)
    }

    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// How an order is sized: by cash amount or by share quantity.
///
/// By-amount orders realize a quantity of `amount / price` at execution
/// time; by-quantity orders trade exactly the requested share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSizing {
    /// Trade at most this cash amount at the current market price.
    Amount(Amount),
    /// Trade exactly this share quantity at the current market price.
    Quantity(Quantity),
}

impl OrderSizing {
    /// Returns true if this is a by-amount sizing.
    #[must_use]
    pub const fn is_amount(&self) -> bool {
        matches!(self, Self::Amount(_))
    }
}

/// A buy or sell instruction submitted to a broker.
///
/// Carries a per-operation unique id, the target symbol, the sizing, an
/// optional batch id grouping it with related operations, and a flag
/// marking compensating (rollback) orders. An order carries no outcome;
/// its outcome lives in the broker's batch registry.
///
/// # Examples
///
/// ```
/// use ballast_core::data::OrderRequest;
/// use ballast_core::types::{Amount, BatchId, Symbol};
/// use rust_decimal_macros::dec;
///
/// let request = OrderRequest::buy_by_amount(
///     Symbol::new("AAPL").unwrap(),
///     Amount::new(dec!(4000)).unwrap(),
/// )
/// .unwrap()
/// .with_batch(BatchId::generate());
/// assert!(request.batch_id.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Unique identity of this operation.
    pub id: OperationId,
    /// Ticker symbol to trade.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Sizing by cash amount or share quantity.
    pub sizing: OrderSizing,
    /// Batch this operation belongs to, if any.
    pub batch_id: Option<BatchId>,
    /// True when this order compensates a previously successful one.
    pub rollback: bool,
}

impl OrderRequest {
    /// Creates a buy order sized by cash amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::AmountOutOfRange` if the amount is outside
    /// the broker's money bounds.
    pub fn buy_by_amount(symbol: Symbol, amount: Amount) -> Result<Self, ValidationError> {
        Self::validate_amount(amount)?;
        Ok(Self::build(symbol, OrderSide::Buy, OrderSizing::Amount(amount)))
    }

    /// Creates a buy order sized by share quantity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::QuantityOutOfRange` if the quantity is
    /// outside the broker's buy-quantity bounds.
    pub fn buy_by_quantity(symbol: Symbol, quantity: Quantity) -> Result<Self, ValidationError> {
        Self::validate_quantity(quantity, MIN_BUY_QUANTITY)?;
        Ok(Self::build(
            symbol,
            OrderSide::Buy,
            OrderSizing::Quantity(quantity),
        ))
    }

    /// Creates a sell order sized by cash amount.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::AmountOutOfRange` if the amount is outside
    /// the broker's money bounds.
    pub fn sell_by_amount(symbol: Symbol, amount: Amount) -> Result<Self, ValidationError> {
        Self::validate_amount(amount)?;
        Ok(Self::build(
            symbol,
            OrderSide::Sell,
            OrderSizing::Amount(amount),
        ))
    }

    /// Creates a sell order sized by share quantity.
    ///
    /// Sells accept a finer minimum than buys so that small residual
    /// positions remain closable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::QuantityOutOfRange` if the quantity is
    /// outside the broker's sell-quantity bounds.
    pub fn sell_by_quantity(symbol: Symbol, quantity: Quantity) -> Result<Self, ValidationError> {
        Self::validate_quantity(quantity, MIN_SELL_QUANTITY)?;
        Ok(Self::build(
            symbol,
            OrderSide::Sell,
            OrderSizing::Quantity(quantity),
        ))
    }

    /// Creates an order for an engine-computed share delta.
    ///
    /// Rebalance deltas and rollback inverses bypass the stand-alone
    /// minimum-size bounds: any nonzero quantity at the quantity scale is
    /// tradable, so a persistently small drift can always be corrected and
    /// a successful operation can always be reversed. Callers ensure the
    /// quantity is nonzero; the broker's quantity ceiling still applies at
    /// execution.
    #[must_use]
    pub fn for_delta(symbol: Symbol, side: OrderSide, quantity: Quantity) -> Self {
        Self::build(symbol, side, OrderSizing::Quantity(quantity))
    }

    /// Attaches a batch id to this request.
    #[must_use]
    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Marks this request as a compensating (rollback) order.
    #[must_use]
    pub fn as_rollback(mut self) -> Self {
        self.rollback = true;
        self
    }

    fn build(symbol: Symbol, side: OrderSide, sizing: OrderSizing) -> Self {
        Self {
            id: OperationId::generate(),
            symbol,
            side,
            sizing,
            batch_id: None,
            rollback: false,
        }
    }

    fn validate_amount(amount: Amount) -> Result<(), ValidationError> {
        let value = amount.as_decimal();
        if value < MIN_ORDER_AMOUNT || value > MAX_ORDER_AMOUNT {
            return Err(ValidationError::AmountOutOfRange {
                amount: value,
                min: MIN_ORDER_AMOUNT,
                max: MAX_ORDER_AMOUNT,
            });
        }
        Ok(())
    }

    fn validate_quantity(quantity: Quantity, min: Decimal) -> Result<(), ValidationError> {
        let value = quantity.as_decimal();
        if value < min || value > MAX_ORDER_QUANTITY {
            return Err(ValidationError::QuantityOutOfRange {
                quantity: value,
                min,
                max: MAX_ORDER_QUANTITY,
            });
        }
        Ok(())
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sizing {
            OrderSizing::Amount(amount) => {
                write!(f, "{} {} ${}", self.side, self.symbol, amount)
            }
            OrderSizing::Quantity(quantity) => {
                write!(f, "{} {} x{}", self.side, self.symbol, quantity)
            }
        }
    }
}

/// The broker's record of an executed order.
///
/// Records the execution price, the realized quantity at the 9-decimal
/// quantity scale, and the realized cash amount at the money scale. The
/// broker is authoritative for realized values; the portfolio trusts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    /// Identity of the operation this outcome belongs to.
    pub operation_id: OperationId,
    /// Ticker symbol traded.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution price.
    pub price: Price,
    /// Realized share quantity.
    pub quantity: Quantity,
    /// Realized cash amount.
    pub amount: Amount,
    /// Batch this operation belongs to, if any.
    pub batch_id: Option<BatchId>,
    /// True when this outcome came from a compensating order.
    pub rollback: bool,
    /// Execution time.
    pub executed_at: Timestamp,
}

impl OrderOutcome {
    /// Derives the compensating request that reverses this outcome.
    ///
    /// The inverse is sized by the realized *quantity*, not the amount, so
    /// the share count reverses exactly; it trades at whatever the market
    /// price is when the rollback executes. Cash-value drift under moving
    /// prices is accepted and corrected by the next rebalance. The inverse
    /// bypasses the stand-alone minimum-size bounds so that every
    /// successful operation, however small its realized quantity, can be
    /// reversed.
    #[must_use]
    pub fn inverse_request(&self) -> OrderRequest {
        let request =
            OrderRequest::for_delta(self.symbol.clone(), self.side.opposite(), self.quantity);
        let request = match self.batch_id {
            Some(batch_id) => request.with_batch(batch_id),
            None => request,
        };
        request.as_rollback()
    }
}

impl fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} @ {} (${})",
            self.side, self.symbol, self.quantity, self.price, self.amount
        )
    }
}
