//! # Ballast Engine
//!
//! The portfolio rebalancing engine for the Ballast system.
//!
//! This crate provides:
//! - [`Stock`] - a tradable asset with a validated symbol, bounded price,
//!   and change notification
//! - [`Market`] - the symbol → stock listing brokers resolve prices from
//! - [`Portfolio`] - allocated positions, deviation computation, and the
//!   rebalance algorithm driven under a TTL lock
//! - [`PortfolioRegistry`] - the weak symbol index that fans price changes
//!   out to exactly the portfolios holding the moved symbol
//!
//! # Data flow
//!
//! A price update enters through [`Stock::set_price`]. If the move exceeds
//! the alert threshold, the stock notifies its registry; the registry looks
//! up the portfolios holding the symbol and invokes
//! [`Portfolio::rebalance`] on each, concurrently. Each portfolio is
//! independently serialized by its own rebalance lock, computes its
//! deviation from the target allocation and, when the deviation gate
//! passes, executes one atomic batch of sells and buys through its broker.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::significant_drop_tightening)]

mod lock;
mod market;
pub mod portfolio;
mod registry;
mod stock;

pub use lock::{LockAttempt, RebalanceLock};
pub use market::Market;
pub use portfolio::{
    AllocatedStock, Portfolio, PortfolioId, PortfolioSpec, RebalanceOutcome, StockAllocation,
};
pub use registry::PortfolioRegistry;
pub use stock::Stock;
