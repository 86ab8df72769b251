//! Market: the symbol → stock listing brokers resolve prices from.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::info;

use ballast_core::config::MarketConfig;
use ballast_core::error::StockError;
use ballast_core::traits::MarketData;
use ballast_core::types::{Price, Symbol};

use crate::registry::PortfolioRegistry;
use crate::stock::Stock;

/// The set of listed stocks.
///
/// A market owns the [`Stock`] instances and wires each one to the
/// portfolio registry it should notify on significant price changes.
/// Through the [`MarketData`] impl it doubles as the price source brokers
/// execute against, so the engine and the broker observe the same prices.
pub struct Market {
    config: MarketConfig,
    registry: Arc<PortfolioRegistry>,
    stocks: DashMap<Symbol, Arc<Stock>>,
}

impl Market {
    /// Creates an empty market dispatching into `registry`.
    #[must_use]
    pub fn new(config: MarketConfig, registry: Arc<PortfolioRegistry>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            stocks: DashMap::new(),
        })
    }

    /// Lists a stock at an initial price and returns its handle.
    ///
    /// The market is the boundary where raw ticker text enters the
    /// system: the symbol is validated here (exactly four uppercase ASCII
    /// letters). Re-listing an already listed symbol returns the existing
    /// stock untouched.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InvalidSymbol` if the symbol text is
    /// malformed, or `StockError::InvalidPrice` if the initial price is
    /// outside the configured bounds.
    pub fn list(&self, symbol: impl AsRef<str>, price: Decimal) -> Result<Arc<Stock>, StockError> {
        let symbol = Symbol::new(symbol.as_ref()).map_err(|_| StockError::InvalidSymbol {
            symbol: symbol.as_ref().to_string(),
        })?;
        if let Some(existing) = self.stocks.get(&symbol) {
            return Ok(Arc::clone(existing.value()));
        }

        let stock = Arc::new(Stock::new(symbol.clone(), price, self.config.clone())?);
        stock.attach_registry(Arc::clone(&self.registry));
        info!(symbol = %symbol, price = %price, "Stock listed");
        self.stocks.insert(symbol, Arc::clone(&stock));
        Ok(stock)
    }

    /// Returns the stock listed under `symbol`, if any.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<Arc<Stock>> {
        self.stocks.get(symbol).map(|s| Arc::clone(s.value()))
    }

    /// Updates the price of a listed stock.
    ///
    /// # Errors
    ///
    /// Returns `StockError::NotListed` for unknown symbols, or the price
    /// validation error from [`Stock::set_price`].
    pub async fn set_price(&self, symbol: &Symbol, price: Decimal) -> Result<(), StockError> {
        let stock = self.get(symbol).ok_or_else(|| StockError::NotListed {
            symbol: symbol.as_str().to_string(),
        })?;
        stock.set_price(price).await
    }

    /// Returns the number of listed stocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    /// Returns true if no stocks are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

impl MarketData for Market {
    fn price_of(&self, symbol: &Symbol) -> Option<Price> {
        self.stocks.get(symbol).map(|s| s.price())
    }
}
