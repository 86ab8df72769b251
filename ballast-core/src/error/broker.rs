//! Broker-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BatchId, OperationId, Symbol};

/// Broker error type covering order execution failures.
///
/// Every variant carries the triggering operation id and, when the
/// operation belonged to a batch, the batch id: the context the portfolio
/// needs to decide between commit and compensation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerError {
    /// A buy primitive failed.
    #[error("[Broker] Buy {symbol} failed (operation {operation_id}): {reason}")]
    BuyFailed {
        /// Symbol being bought.
        symbol: Symbol,
        /// Identity of the failed operation.
        operation_id: OperationId,
        /// Batch the operation belonged to, if any.
        batch_id: Option<BatchId>,
        /// Underlying reason.
        reason: String,
    },

    /// A sell primitive failed.
    #[error("[Broker] Sell {symbol} failed (operation {operation_id}): {reason}")]
    SellFailed {
        /// Symbol being sold.
        symbol: Symbol,
        /// Identity of the failed operation.
        operation_id: OperationId,
        /// Batch the operation belonged to, if any.
        batch_id: Option<BatchId>,
        /// Underlying reason.
        reason: String,
    },

    /// Symbol is not present in the market the broker trades against.
    #[error("[Broker] Stock not found: {symbol} (operation {operation_id})")]
    StockNotFound {
        /// The unknown symbol.
        symbol: Symbol,
        /// Identity of the failed operation.
        operation_id: OperationId,
        /// Batch the operation belonged to, if any.
        batch_id: Option<BatchId>,
    },

    /// Transport-layer failure; retriable.
    #[error("[Broker] Connection failed: {reason}")]
    ConnectionFailed {
        /// Underlying reason.
        reason: String,
        /// Identity of the failed operation, if one was in flight.
        operation_id: Option<OperationId>,
        /// Batch the operation belonged to, if any.
        batch_id: Option<BatchId>,
    },

    /// Order rejected before execution (sizing outside the broker's limits).
    #[error("[Broker] Invalid order (operation {operation_id}): {reason}")]
    InvalidOrder {
        /// Identity of the rejected operation.
        operation_id: OperationId,
        /// Batch the operation belonged to, if any.
        batch_id: Option<BatchId>,
        /// Why the order was rejected.
        reason: String,
    },
}

impl BrokerError {
    /// Returns the identity of the operation that triggered this error,
    /// if one was in flight.
    #[must_use]
    pub fn operation_id(&self) -> Option<OperationId> {
        match self {
            Self::BuyFailed { operation_id, .. }
            | Self::SellFailed { operation_id, .. }
            | Self::StockNotFound { operation_id, .. }
            | Self::InvalidOrder { operation_id, .. } => Some(*operation_id),
            Self::ConnectionFailed { operation_id, .. } => *operation_id,
        }
    }

    /// Returns the batch the failed operation belonged to, if any.
    #[must_use]
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            Self::BuyFailed { batch_id, .. }
            | Self::SellFailed { batch_id, .. }
            | Self::StockNotFound { batch_id, .. }
            | Self::ConnectionFailed { batch_id, .. }
            | Self::InvalidOrder { batch_id, .. } => *batch_id,
        }
    }

    /// Returns the symbol involved, when the failure is symbol-specific.
    #[must_use]
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::BuyFailed { symbol, .. }
            | Self::SellFailed { symbol, .. }
            | Self::StockNotFound { symbol, .. } => Some(symbol),
            Self::ConnectionFailed { .. } | Self::InvalidOrder { .. } => None,
        }
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::ConnectionFailed { .. } => ErrorSeverity::Recoverable,
            Self::BuyFailed { .. }
            | Self::SellFailed { .. }
            | Self::StockNotFound { .. }
            | Self::InvalidOrder { .. } => ErrorSeverity::Warning,
        }
    }

    /// Returns true if this error is worth retrying.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }
}
