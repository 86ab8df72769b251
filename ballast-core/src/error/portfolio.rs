//! Portfolio-related error types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::BrokerError;
use crate::types::{BatchId, OperationId, Symbol};

/// Context for one failed broker operation, carried inside portfolio
/// errors so callers can see exactly which legs of a batch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedOperation {
    /// Identity of the failed operation, when the broker assigned one.
    pub operation_id: Option<OperationId>,
    /// Symbol the operation targeted, when known.
    pub symbol: Option<Symbol>,
    /// Underlying failure.
    pub reason: String,
}

impl FailedOperation {
    /// Builds failure context from a broker error.
    #[must_use]
    pub fn from_broker_error(error: &BrokerError) -> Self {
        Self {
            operation_id: error.operation_id(),
            symbol: error.symbol().cloned(),
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{symbol}: {}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Portfolio error type covering configuration shape, lifecycle, and
/// rebalancing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortfolioError {
    /// One or more opening orders failed; rollback succeeded.
    #[error("[Portfolio] {portfolio}: initialization failed, {} operation(s) rolled back", .failed.len())]
    Initialization {
        /// Portfolio name.
        portfolio: String,
        /// Batch the opening orders ran under.
        batch_id: Option<BatchId>,
        /// The operations that failed.
        failed: Vec<FailedOperation>,
    },

    /// A rebalance failed; rollback succeeded. The portfolio is consistent
    /// and the rebalance may be retried on the next price change.
    #[error("[Portfolio] {portfolio}: rebalance failed (attempt {attempt}), rolled back")]
    Retry {
        /// Portfolio name.
        portfolio: String,
        /// Batch the rebalance ran under.
        batch_id: Option<BatchId>,
        /// The operations that failed.
        failed: Vec<FailedOperation>,
        /// How many rebalances have now failed on this portfolio.
        attempt: u32,
    },

    /// A batch failed and its rollback also failed: holdings and broker
    /// state are known to be inconsistent. Terminal until operator
    /// intervention.
    #[error("[Portfolio] {portfolio}: stale state, manual recovery required")]
    Stale {
        /// Portfolio name.
        portfolio: String,
        /// Batch whose rollback failed, when staleness was just entered.
        batch_id: Option<BatchId>,
        /// The failures that led here.
        failed: Vec<FailedOperation>,
    },

    /// A stand-alone order targeted a symbol the portfolio does not hold.
    #[error("[Portfolio] {portfolio}: no allocation for {symbol}")]
    NotAllocated {
        /// Portfolio name.
        portfolio: String,
        /// The unknown symbol.
        symbol: Symbol,
    },

    /// Allocation weights do not sum to 1 at the percentage scale.
    #[error("[Portfolio] allocation weights sum to {sum}, expected exactly 1")]
    AllocationSum {
        /// The offending sum.
        sum: Decimal,
    },

    /// The same symbol appears in more than one allocation slot.
    #[error("[Portfolio] duplicate allocation for {symbol}")]
    DuplicateSymbol {
        /// The duplicated symbol.
        symbol: Symbol,
    },

    /// A portfolio must allocate at least one stock.
    #[error("[Portfolio] at least one stock must be allocated")]
    NoAllocations,

    /// Initial investment outside the configured bounds.
    #[error("[Portfolio] initial investment {amount} outside bounds [{min}, {max}]")]
    InvestmentOutOfRange {
        /// The rejected investment.
        amount: Decimal,
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },

    /// Portfolio name is empty or whitespace.
    #[error("[Portfolio] name cannot be empty")]
    EmptyName,

    /// A stand-alone broker operation failed.
    #[error("{0}")]
    Broker(#[from] BrokerError),
}

impl PortfolioError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::Stale { .. } => ErrorSeverity::Fatal,
            Self::Retry { .. } | Self::Initialization { .. } => ErrorSeverity::Recoverable,
            Self::Broker(e) => e.severity(),
            Self::NotAllocated { .. }
            | Self::AllocationSum { .. }
            | Self::DuplicateSymbol { .. }
            | Self::NoAllocations
            | Self::InvestmentOutOfRange { .. }
            | Self::EmptyName => ErrorSeverity::Warning,
        }
    }

    /// Returns true if this error left the portfolio stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns the failed-operation context, when this error carries one.
    #[must_use]
    pub fn failed_operations(&self) -> &[FailedOperation] {
        match self {
            Self::Initialization { failed, .. }
            | Self::Retry { failed, .. }
            | Self::Stale { failed, .. } => failed,
            _ => &[],
        }
    }
}
