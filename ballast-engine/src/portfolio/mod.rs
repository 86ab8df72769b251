//! Portfolio: allocated positions, deviation computation, and the
//! rebalance algorithm.
//!
//! This module provides:
//! - [`PortfolioSpec`] / [`StockAllocation`] - the validated configuration
//!   a portfolio is built from
//! - [`Portfolio`] - the per-portfolio state machine driving initialization
//!   and rebalancing under a TTL lock
//! - [`RebalanceOutcome`] - what a successful `rebalance` call did
//! - [`PortfolioId`] - opaque portfolio identity

mod spec;

#[allow(clippy::module_inception)]
mod portfolio;

pub use portfolio::{AllocatedStock, Portfolio};
pub use spec::{PortfolioSpec, StockAllocation};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique portfolio identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioId(Uuid);

impl PortfolioId {
    /// Generates a new unique portfolio id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a successful [`Portfolio::rebalance`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalanceOutcome {
    /// A rebalance was already in flight; this call returned with no side
    /// effects.
    Skipped,
    /// The portfolio has no market value (never initialized or fully sold
    /// out); nothing to do.
    Empty,
    /// Every deviation was below the threshold; no trades issued.
    BelowThreshold {
        /// The largest per-stock deviation observed.
        max_deviation: Decimal,
    },
    /// Trades were issued and committed.
    Rebalanced {
        /// Number of orders in the batch.
        orders: usize,
        /// The largest per-stock deviation that triggered the rebalance.
        max_deviation: Decimal,
    },
}

impl RebalanceOutcome {
    /// Returns true if this outcome committed trades.
    #[must_use]
    pub const fn traded(&self) -> bool {
        matches!(self, Self::Rebalanced { orders, .. } if *orders > 0)
    }

    /// Returns true if the call was skipped because the lock was held.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}
