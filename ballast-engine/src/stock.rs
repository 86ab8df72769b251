//! Stock: a named tradable asset with a validated price and change
//! notification.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use ballast_core::config::MarketConfig;
use ballast_core::error::StockError;
use ballast_core::types::{Price, Symbol};

use crate::registry::PortfolioRegistry;

/// A named tradable asset.
///
/// Identity is the validated symbol; the current price is an exact decimal
/// within the configured `[min_price, max_price]` bounds. On a price
/// mutation the stock notifies its registry with the old price, new price,
/// and percent change, but only when the move reaches the alert
/// threshold, so sub-noise drift never dispatches rebalance evaluations.
///
/// Stocks live for the process's duration; they are created when listed in
/// a [`crate::Market`] and never destroyed under normal operation.
pub struct Stock {
    symbol: Symbol,
    price: RwLock<Price>,
    config: MarketConfig,
    registry: RwLock<Option<Arc<PortfolioRegistry>>>,
}

impl Stock {
    /// Creates a new stock with an initial price.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InvalidPrice` if the price is non-positive or
    /// outside the configured bounds.
    pub fn new(symbol: Symbol, price: Decimal, config: MarketConfig) -> Result<Self, StockError> {
        let price = Self::validate_price(&symbol, price, &config)?;
        Ok(Self {
            symbol,
            price: RwLock::new(price),
            config,
            registry: RwLock::new(None),
        })
    }

    /// Returns the stock's symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Returns the current price. Pure read.
    #[must_use]
    pub fn price(&self) -> Price {
        *self.price.read()
    }

    /// Attaches the registry this stock notifies on significant price
    /// changes. Listing a stock in a market does this automatically.
    pub fn attach_registry(&self, registry: Arc<PortfolioRegistry>) {
        *self.registry.write() = Some(registry);
    }

    /// Updates the price from an external market observation.
    ///
    /// A new price equal to the current one (at the money scale) is a
    /// no-op. Otherwise the stored price is updated and, when
    /// `|Δprice / price|` reaches the configured alert threshold, the
    /// registry is notified and drives rebalancing on every portfolio
    /// holding this symbol.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InvalidPrice` if the new price is non-positive
    /// or outside the configured bounds. Rejected updates leave the stored
    /// price untouched.
    pub async fn set_price(&self, new_price: Decimal) -> Result<(), StockError> {
        let new_price = Self::validate_price(&self.symbol, new_price, &self.config)?;

        let old_price = {
            let mut price = self.price.write();
            let old = *price;
            if new_price == old {
                return Ok(());
            }
            *price = new_price;
            old
        };

        let percent_change =
            (new_price.as_decimal() - old_price.as_decimal()) / old_price.as_decimal();

        if percent_change.abs() < self.config.price_change_alert_threshold {
            debug!(
                symbol = %self.symbol,
                percent_change = %percent_change,
                "Price drift below alert threshold"
            );
            return Ok(());
        }

        let registry = self.registry.read().clone();
        if let Some(registry) = registry {
            registry
                .on_price_change(&self.symbol, old_price, new_price, percent_change)
                .await;
        }
        Ok(())
    }

    fn validate_price(
        symbol: &Symbol,
        price: Decimal,
        config: &MarketConfig,
    ) -> Result<Price, StockError> {
        let invalid = |price: Decimal| StockError::InvalidPrice {
            symbol: symbol.as_str().to_string(),
            price,
            min: config.min_price,
            max: config.max_price,
        };
        let price = Price::new(price).map_err(|_| invalid(price))?;
        let value = price.as_decimal();
        if value < config.min_price || value > config.max_price {
            return Err(invalid(value));
        }
        Ok(price)
    }
}

impl std::fmt::Debug for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stock")
            .field("symbol", &self.symbol)
            .field("price", &self.price())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stock(price: Decimal) -> Stock {
        Stock::new(
            Symbol::new("AAPL").unwrap(),
            price,
            MarketConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_bounds() {
        assert!(Stock::new(
            Symbol::new("AAPL").unwrap(),
            dec!(0.001),
            MarketConfig::default()
        )
        .is_err());
        assert!(Stock::new(
            Symbol::new("AAPL").unwrap(),
            dec!(2000000),
            MarketConfig::default()
        )
        .is_err());
        assert!(Stock::new(
            Symbol::new("AAPL").unwrap(),
            dec!(-5),
            MarketConfig::default()
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_set_price_updates() {
        let stock = stock(dec!(250));
        stock.set_price(dec!(260)).await.unwrap();
        assert_eq!(stock.price().as_decimal(), dec!(260));
    }

    #[tokio::test]
    async fn test_set_price_rejects_out_of_bounds() {
        let stock = stock(dec!(250));
        assert!(stock.set_price(dec!(0)).await.is_err());
        assert!(stock.set_price(dec!(1000001)).await.is_err());
        // Rejected updates leave the price untouched.
        assert_eq!(stock.price().as_decimal(), dec!(250));
    }

    #[tokio::test]
    async fn test_equal_price_is_noop() {
        let stock = stock(dec!(250));
        // Equal at the money scale even though the raw input differs.
        stock.set_price(dec!(250.001)).await.unwrap();
        assert_eq!(stock.price().as_decimal(), dec!(250));
    }
}
