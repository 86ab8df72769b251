//! Market data trait definition.

use crate::types::{Price, Symbol};

/// The price source a broker executes against.
///
/// The broker treats the market as opaque: it only resolves current prices
/// and checks listing. Implementations must be cheap to query, since the broker
/// consults this on every order.
pub trait MarketData: Send + Sync {
    /// Returns the current price of `symbol`, or `None` if it is not
    /// listed.
    fn price_of(&self, symbol: &Symbol) -> Option<Price>;

    /// Returns true if `symbol` is listed.
    fn has(&self, symbol: &Symbol) -> bool {
        self.price_of(symbol).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct SinglePrice(Symbol, Price);

    impl MarketData for SinglePrice {
        fn price_of(&self, symbol: &Symbol) -> Option<Price> {
            (symbol == &self.0).then_some(self.1)
        }
    }

    #[test]
    fn test_has_follows_price_of() {
        let aapl = Symbol::new("AAPL").unwrap();
        let msft = Symbol::new("MSFT").unwrap();
        let market = SinglePrice(aapl.clone(), Price::new(dec!(250)).unwrap());
        assert!(market.has(&aapl));
        assert!(!market.has(&msft));
    }
}
