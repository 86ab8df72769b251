//! Error types and handling framework.
//!
//! This module provides a hierarchical error type system with
//! domain-specific error categories for the Ballast rebalancing system.
//!
//! # Error Hierarchy
//!
//! - `BallastError` - Top-level error type
//!   - `StockError` - Symbol and price validation errors
//!   - `BrokerError` - Order execution errors
//!   - `PortfolioError` - Portfolio lifecycle and rebalancing errors
//!   - `ConfigError` - Configuration errors
//!
//! Validation errors raised while constructing the core `NewType`s live in
//! [`crate::types::ValidationError`]; they fail at the boundary and never
//! propagate into the rebalancing engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: the affected component cannot continue (e.g. a stale portfolio)
/// - `Recoverable`: the operation failed but may be retried
/// - `Warning`: the operation failed permanently but the system continues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable for the affected component; operator attention needed.
    Fatal,

    /// Can potentially be recovered from through retry.
    #[default]
    Recoverable,

    /// Permanent failure of one operation; the system continues.
    Warning,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod broker;
mod config;
mod portfolio;
mod stock;

pub use broker::BrokerError;
pub use config::ConfigError;
pub use portfolio::{FailedOperation, PortfolioError};
pub use stock::StockError;

/// Top-level error type for the Ballast system.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallastError {
    /// Symbol or price validation error.
    #[error("{0}")]
    Stock(#[from] StockError),

    /// Order execution error.
    #[error("{0}")]
    Broker(#[from] BrokerError),

    /// Portfolio lifecycle or rebalancing error.
    #[error("{0}")]
    Portfolio(#[from] PortfolioError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl BallastError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Stock(e) => e.severity(),
            Self::Broker(e) => e.severity(),
            Self::Portfolio(e) => e.severity(),
            Self::Config(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Stock(_) => "stock",
            Self::Broker(_) => "broker",
            Self::Portfolio(_) => "portfolio",
            Self::Config(_) => "config",
        }
    }
}

/// A specialized Result type for Ballast operations.
pub type Result<T> = std::result::Result<T, BallastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Fatal.to_string(), "FATAL");
        assert_eq!(ErrorSeverity::Recoverable.to_string(), "RECOVERABLE");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_error_severity_is_recoverable() {
        assert!(!ErrorSeverity::Fatal.is_recoverable());
        assert!(ErrorSeverity::Recoverable.is_recoverable());
        assert!(ErrorSeverity::Warning.is_recoverable());
    }

    #[test]
    fn test_broker_error_conversion() {
        let broker_err = BrokerError::ConnectionFailed {
            reason: "socket closed".to_string(),
            operation_id: None,
            batch_id: None,
        };
        let err: BallastError = broker_err.into();
        assert_eq!(err.category(), "broker");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_portfolio_stale_is_fatal() {
        let err: BallastError = PortfolioError::Stale {
            portfolio: "growth".to_string(),
            batch_id: None,
            failed: Vec::new(),
        }
        .into();
        assert_eq!(err.category(), "portfolio");
        assert!(err.severity().is_fatal());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = BallastError::Broker(BrokerError::ConnectionFailed {
            reason: "timeout".to_string(),
            operation_id: None,
            batch_id: None,
        });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: BallastError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
