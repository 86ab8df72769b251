//! Batch atomicity laws exercised through the `Broker` trait object.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rust_decimal_macros::dec;

use ballast_broker::BatchBroker;
use ballast_core::config::BrokerConfig;
use ballast_core::data::{OperationState, OrderRequest};
use ballast_core::traits::{Broker, MarketData};
use ballast_core::types::{Amount, BatchId, Price, Quantity, Symbol};

struct TableMarket {
    prices: RwLock<HashMap<Symbol, Price>>,
}

impl TableMarket {
    fn new(prices: &[(&str, rust_decimal::Decimal)]) -> Arc<Self> {
        let prices = prices
            .iter()
            .map(|(s, p)| (Symbol::new(*s).unwrap(), Price::new(*p).unwrap()))
            .collect();
        Arc::new(Self {
            prices: RwLock::new(prices),
        })
    }
}

impl MarketData for TableMarket {
    fn price_of(&self, symbol: &Symbol) -> Option<Price> {
        self.prices.read().get(symbol).copied()
    }
}

fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

fn broker(market: Arc<TableMarket>) -> Arc<dyn Broker> {
    let config = BrokerConfig {
        rollback_retry_delay: Duration::ZERO,
        ..BrokerConfig::default()
    };
    Arc::new(BatchBroker::new(market, config))
}

#[tokio::test]
async fn concurrent_batch_executes_all_legs() {
    let market = TableMarket::new(&[("AAAA", dec!(100)), ("BBBB", dec!(50)), ("CCCC", dec!(25))]);
    let broker = broker(market);
    let batch_id = BatchId::generate();

    let legs = vec![
        broker.buy_by_amount(sym("AAAA"), Amount::new(dec!(1000)).unwrap(), Some(batch_id)),
        broker.buy_by_amount(sym("BBBB"), Amount::new(dec!(500)).unwrap(), Some(batch_id)),
        broker.sell_by_quantity(sym("CCCC"), Quantity::new(dec!(8)).unwrap(), Some(batch_id)),
    ];
    let outcomes = futures::future::join_all(legs).await;

    assert!(outcomes.iter().all(Result::is_ok));
    let outcomes: Vec<_> = outcomes.into_iter().map(Result::unwrap).collect();
    assert_eq!(outcomes[0].quantity.as_decimal(), dec!(10));
    assert_eq!(outcomes[1].quantity.as_decimal(), dec!(10));
    assert_eq!(outcomes[2].amount.as_decimal(), dec!(200.00));
}

#[tokio::test]
async fn batch_is_all_or_rolled_back() {
    let market = TableMarket::new(&[("AAAA", dec!(100)), ("BBBB", dec!(50))]);
    let broker_impl = Arc::new(BatchBroker::new(
        Arc::clone(&market) as Arc<dyn MarketData>,
        BrokerConfig {
            rollback_retry_delay: Duration::ZERO,
            ..BrokerConfig::default()
        },
    ));
    let batch_id = BatchId::generate();

    broker_impl
        .buy_by_quantity(sym("AAAA"), Quantity::new(dec!(10)).unwrap(), Some(batch_id))
        .await
        .unwrap();
    broker_impl
        .sell_by_quantity(sym("BBBB"), Quantity::new(dec!(5)).unwrap(), Some(batch_id))
        .await
        .unwrap();
    // The third leg fails: the symbol is unknown.
    broker_impl
        .buy_by_quantity(sym("ZZZZ"), Quantity::new(dec!(1)).unwrap(), Some(batch_id))
        .await
        .unwrap_err();

    assert!(broker_impl.rollback_batch(batch_id).await);

    // No operation remains in `success` status after a rollback that
    // returned true.
    let entries = broker_impl.batch_entries(batch_id).unwrap();
    let stuck: Vec<_> = entries
        .iter()
        .filter(|e| !e.request.rollback && e.state == OperationState::Success)
        .collect();
    assert!(stuck.is_empty());
}

#[tokio::test]
async fn replaying_an_operation_does_not_duplicate_side_effects() {
    let market = TableMarket::new(&[("AAAA", dec!(100))]);
    let broker = broker(market);
    let batch_id = BatchId::generate();

    let request = OrderRequest::buy_by_quantity(sym("AAAA"), Quantity::new(dec!(3)).unwrap())
        .unwrap()
        .with_batch(batch_id);

    let first = broker.submit(request.clone()).await.unwrap();
    let second = broker.submit(request.clone()).await.unwrap();
    let third = broker.submit(request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first.executed_at, third.executed_at);
}

#[tokio::test]
async fn rollback_twice_second_call_is_noop_and_true() {
    let market = TableMarket::new(&[("AAAA", dec!(100))]);
    let broker = broker(market);
    let batch_id = BatchId::generate();

    broker
        .buy_by_quantity(sym("AAAA"), Quantity::new(dec!(2)).unwrap(), Some(batch_id))
        .await
        .unwrap();

    assert!(broker.rollback_batch(batch_id).await);
    assert!(broker.rollback_batch(batch_id).await);

    // And a discarded batch rolls back vacuously.
    assert!(broker.discard_batch(batch_id));
    assert!(broker.rollback_batch(batch_id).await);
}
