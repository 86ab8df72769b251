//! Symbol-indexed portfolio registry with weak membership.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use ballast_core::types::{Price, Symbol};

use crate::portfolio::{Portfolio, PortfolioId};

/// Non-owning membership record for one portfolio under one symbol.
struct PortfolioHandle {
    id: PortfolioId,
    portfolio: Weak<Portfolio>,
}

/// Weak index mapping symbol → portfolios holding it.
///
/// The registry never owns portfolios: membership is held through weak
/// handles, so a portfolio dropped by all external holders becomes
/// reclaimable even if it was never explicitly unregistered. Dead handles
/// are pruned on lookup; a portfolio's destructor also removes its handles
/// eagerly.
///
/// On a significant price change the registry enumerates exactly the live
/// portfolios holding the moved symbol and invokes
/// [`Portfolio::rebalance`] on each, concurrently. One portfolio's failure
/// is logged and never affects another.
///
/// Multiple registries may coexist; tests and callers inject an isolated
/// registry into any portfolio.
#[derive(Default)]
pub struct PortfolioRegistry {
    index: DashMap<Symbol, Vec<PortfolioHandle>>,
}

impl PortfolioRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records the portfolio's membership under each of its allocated
    /// symbols. Registering the same portfolio twice is a no-op.
    pub fn register(&self, portfolio: &Arc<Portfolio>) {
        let id = portfolio.id();
        for symbol in portfolio.symbols() {
            let mut handles = self.index.entry(symbol).or_default();
            if !handles.iter().any(|h| h.id == id) {
                handles.push(PortfolioHandle {
                    id,
                    portfolio: Arc::downgrade(portfolio),
                });
            }
        }
        info!(portfolio = %portfolio.name(), "Portfolio registered");
    }

    /// Removes every membership entry of the given portfolio.
    pub fn unregister(&self, id: PortfolioId) {
        self.index.retain(|_, handles| {
            handles.retain(|h| h.id != id);
            !handles.is_empty()
        });
    }

    /// Returns the live portfolios currently holding `symbol`.
    ///
    /// Dead handles (portfolios dropped by all external holders) are
    /// pruned as a side effect.
    #[must_use]
    pub fn get_by_symbol(&self, symbol: &Symbol) -> Vec<Arc<Portfolio>> {
        let Some(mut handles) = self.index.get_mut(symbol) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(handles.len());
        handles.retain(|h| match h.portfolio.upgrade() {
            Some(portfolio) => {
                live.push(portfolio);
                true
            }
            None => false,
        });
        live
    }

    /// Returns the number of live portfolios holding `symbol`.
    #[must_use]
    pub fn holders_of(&self, symbol: &Symbol) -> usize {
        self.get_by_symbol(symbol).len()
    }

    /// Fans a price change out to every portfolio holding `symbol`.
    ///
    /// Dispatch is concurrent across portfolios; each portfolio is
    /// independently serialized by its own rebalance lock. Failures are
    /// logged and the dispatch continues; a stale or failing portfolio
    /// never blocks the others.
    pub async fn on_price_change(
        &self,
        symbol: &Symbol,
        old_price: Price,
        new_price: Price,
        percent_change: Decimal,
    ) {
        let portfolios = self.get_by_symbol(symbol);
        if portfolios.is_empty() {
            debug!(symbol = %symbol, "Price change with no holders");
            return;
        }

        info!(
            symbol = %symbol,
            old_price = %old_price,
            new_price = %new_price,
            percent_change = %percent_change,
            holders = portfolios.len(),
            "Dispatching price change"
        );

        let results = join_all(portfolios.iter().map(|p| p.rebalance())).await;
        for (portfolio, result) in portfolios.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    portfolio = %portfolio.name(),
                    symbol = %symbol,
                    error = %e,
                    "Rebalance dispatch failed"
                );
            }
        }
    }
}
