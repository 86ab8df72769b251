//! End-to-end rebalancing scenarios: initialization, threshold gating,
//! concurrent skip, rollback, stale state, and symbol-indexed dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ballast_broker::BatchBroker;
use ballast_core::config::{BallastConfig, BrokerConfig};
use ballast_core::data::OperationState;
use ballast_core::error::PortfolioError;
use ballast_core::traits::MarketData;
use ballast_core::types::{Amount, Price, Quantity, Symbol, Weight};
use ballast_engine::{
    Market, Portfolio, PortfolioRegistry, PortfolioSpec, RebalanceOutcome, StockAllocation,
};

fn sym(s: &str) -> Symbol {
    Symbol::new(s).unwrap()
}

/// Market wrapper with per-symbol lookup budgets and a call counter.
///
/// A symbol with an exhausted budget disappears from the broker's view
/// while the portfolio's own price snapshot (taken from the stocks
/// directly) still sees it, which makes it possible to fail chosen legs of a
/// batch deterministically.
struct ScriptedMarket {
    inner: Arc<Market>,
    budgets: Mutex<HashMap<Symbol, u32>>,
    calls: Mutex<u32>,
}

impl ScriptedMarket {
    fn new(inner: Arc<Market>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            budgets: Mutex::new(HashMap::new()),
            calls: Mutex::new(0),
        })
    }

    fn set_budget(&self, symbol: &str, remaining: u32) {
        self.budgets.lock().insert(sym(symbol), remaining);
    }

    fn clear_budgets(&self) {
        self.budgets.lock().clear();
    }

    fn lookup_count(&self) -> u32 {
        *self.calls.lock()
    }
}

impl MarketData for ScriptedMarket {
    fn price_of(&self, symbol: &Symbol) -> Option<Price> {
        *self.calls.lock() += 1;
        let mut budgets = self.budgets.lock();
        if let Some(remaining) = budgets.get_mut(symbol) {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        drop(budgets);
        self.inner.price_of(symbol)
    }
}

struct Fixture {
    market: Arc<Market>,
    scripted: Arc<ScriptedMarket>,
    broker: Arc<BatchBroker>,
    registry: Arc<PortfolioRegistry>,
    portfolio: Arc<Portfolio>,
}

/// Builds the standard $10,000 portfolio: 40% AAAA @ 250, 20% BBBB @ 150,
/// 40% CCCC @ 600.
///
/// With `wire_dispatch` the stocks notify the same registry the portfolio
/// registers in, so price changes drive rebalancing automatically; without
/// it the stocks dispatch into an isolated empty registry and prices can
/// be moved silently.
fn fixture(wire_dispatch: bool, broker_config: BrokerConfig) -> Fixture {
    let config = BallastConfig::default();

    let stock_registry = PortfolioRegistry::new();
    let portfolio_registry = if wire_dispatch {
        Arc::clone(&stock_registry)
    } else {
        PortfolioRegistry::new()
    };

    let market = Market::new(config.market.clone(), stock_registry);
    let aaaa = market.list("AAAA", dec!(250)).unwrap();
    let bbbb = market.list("BBBB", dec!(150)).unwrap();
    let cccc = market.list("CCCC", dec!(600)).unwrap();

    let scripted = ScriptedMarket::new(Arc::clone(&market));
    let broker = Arc::new(BatchBroker::new(
        Arc::clone(&scripted) as Arc<dyn MarketData>,
        broker_config,
    ));

    let spec = PortfolioSpec::new(
        "growth",
        Amount::new(dec!(10000)).unwrap(),
        vec![
            StockAllocation::new(aaaa, Weight::new(dec!(0.4)).unwrap()),
            StockAllocation::new(bbbb, Weight::new(dec!(0.2)).unwrap()),
            StockAllocation::new(cccc, Weight::new(dec!(0.4)).unwrap()),
        ],
        &config.portfolio,
    )
    .unwrap();

    let portfolio = Portfolio::new(
        spec,
        Arc::clone(&broker) as Arc<dyn ballast_core::traits::Broker>,
        Arc::clone(&portfolio_registry),
        &config.portfolio,
    );

    Fixture {
        market,
        scripted,
        broker,
        registry: portfolio_registry,
        portfolio,
    }
}

fn fast_broker_config() -> BrokerConfig {
    BrokerConfig {
        rollback_retry_delay: Duration::ZERO,
        ..BrokerConfig::default()
    }
}

fn held(portfolio: &Portfolio, symbol: &str) -> Decimal {
    portfolio
        .holdings()
        .get(&sym(symbol))
        .copied()
        .unwrap_or(Quantity::ZERO)
        .as_decimal()
}

/// Moves the three prices without triggering dispatch (non-wired fixtures
/// only).
async fn move_prices(market: &Market, aaaa: Decimal, bbbb: Decimal, cccc: Decimal) {
    market.set_price(&sym("AAAA"), aaaa).await.unwrap();
    market.set_price(&sym("BBBB"), bbbb).await.unwrap();
    market.set_price(&sym("CCCC"), cccc).await.unwrap();
}

#[tokio::test]
async fn initialize_establishes_target_positions() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();

    assert_eq!(held(&f.portfolio, "AAAA"), dec!(16));
    assert_eq!(held(&f.portfolio, "BBBB"), dec!(13.333333333));
    assert_eq!(held(&f.portfolio, "CCCC"), dec!(6.666666667));

    // Total value approximates the initial investment within per-order
    // quantization noise.
    let total = f.portfolio.total_value().as_decimal();
    assert!((total - dec!(10000)).abs() <= dec!(0.01), "total {total}");

    // Initialization registered the portfolio for each symbol.
    assert_eq!(f.registry.holders_of(&sym("AAAA")), 1);
    assert_eq!(f.registry.holders_of(&sym("BBBB")), 1);
    assert_eq!(f.registry.holders_of(&sym("CCCC")), 1);

    // The opening batch committed; nothing lingers in the broker.
    assert_eq!(f.broker.batch_count(), 0);
}

#[tokio::test]
async fn rebalance_restores_target_allocation() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();

    // New total: 16×200 + 13.333×300 + 6.667×900 = $13,200.
    move_prices(&f.market, dec!(200), dec!(300), dec!(900)).await;

    let outcome = f.portfolio.rebalance().await.unwrap();
    assert!(outcome.traded());
    assert!(matches!(outcome, RebalanceOutcome::Rebalanced { orders: 3, .. }));

    // Targets: 40% → $5,280/$200 = 26.4; 20% → $2,640/$300 = 8.8;
    // 40% → $5,280/$900 = 5.866666667.
    assert_eq!(held(&f.portfolio, "AAAA"), dec!(26.4));
    assert_eq!(held(&f.portfolio, "BBBB"), dec!(8.8));
    assert_eq!(held(&f.portfolio, "CCCC"), dec!(5.866666667));

    // Held percentages equal 40/20/40 within the quantization bound.
    let weights = f.portfolio.current_weights();
    for (symbol, target) in [("AAAA", dec!(0.4)), ("BBBB", dec!(0.2)), ("CCCC", dec!(0.4))] {
        let current = weights[&sym(symbol)];
        assert!(
            (current - target).abs() < dec!(0.000001),
            "{symbol}: {current}"
        );
    }
}

#[tokio::test]
async fn repeated_rebalance_without_price_move_is_gated() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();
    move_prices(&f.market, dec!(200), dec!(300), dec!(900)).await;
    f.portfolio.rebalance().await.unwrap();

    // Already on target: the deviation gate stops a second pass.
    let outcome = f.portfolio.rebalance().await.unwrap();
    assert!(matches!(outcome, RebalanceOutcome::BelowThreshold { .. }));
}

#[tokio::test]
async fn sub_threshold_price_change_does_not_dispatch() {
    let f = fixture(true, fast_broker_config());
    f.portfolio.initialize().await.unwrap();
    let before = f.portfolio.holdings();
    let lookups = f.scripted.lookup_count();

    // 0.8% move, below the 1% alert threshold: no dispatch, no broker
    // calls, no lock taken.
    f.market.set_price(&sym("AAAA"), dec!(252)).await.unwrap();

    assert_eq!(f.portfolio.holdings(), before);
    assert_eq!(f.scripted.lookup_count(), lookups);
}

#[tokio::test]
async fn concurrent_rebalance_skips() {
    let config = BrokerConfig {
        execution_delay: Duration::from_millis(50),
        rollback_retry_delay: Duration::ZERO,
        ..BrokerConfig::default()
    };
    let f = fixture(false, config);
    f.portfolio.initialize().await.unwrap();
    move_prices(&f.market, dec!(200), dec!(300), dec!(900)).await;

    let (first, second) = tokio::join!(f.portfolio.rebalance(), f.portfolio.rebalance());
    let first = first.unwrap();
    let second = second.unwrap();

    // Exactly one invocation issued orders; the other returned with no
    // side effects.
    assert!(matches!(first, RebalanceOutcome::Rebalanced { .. }));
    assert!(second.is_skipped());

    // Post-state: same as running one rebalance alone.
    assert_eq!(held(&f.portfolio, "AAAA"), dec!(26.4));
    assert_eq!(held(&f.portfolio, "BBBB"), dec!(8.8));
    assert_eq!(held(&f.portfolio, "CCCC"), dec!(5.866666667));
}

#[tokio::test]
async fn partial_failure_rolls_back() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();
    let before = f.portfolio.holdings();

    // These prices derive {sell BBBB, buy AAAA, buy CCCC}.
    move_prices(&f.market, dec!(300), dec!(400), dec!(450)).await;

    // The CCCC leg fails at the broker; everything else succeeds.
    f.scripted.set_budget("CCCC", 0);

    let err = f.portfolio.rebalance().await.unwrap_err();
    let PortfolioError::Retry {
        batch_id,
        failed,
        attempt,
        ..
    } = err
    else {
        panic!("expected Retry, got {err}");
    };
    assert_eq!(attempt, 1);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].symbol, Some(sym("CCCC")));

    // Held quantities equal their pre-rebalance values.
    assert_eq!(f.portfolio.holdings(), before);

    // Every successful operation in the batch was reversed; the failed
    // one was recorded as an error.
    let entries = f.broker.batch_entries(batch_id.unwrap()).unwrap();
    let originals: Vec<_> = entries.iter().filter(|e| !e.request.rollback).collect();
    assert_eq!(originals.len(), 3);
    for entry in &originals {
        if entry.request.symbol == sym("CCCC") {
            assert_eq!(entry.state, OperationState::Error);
        } else {
            assert_eq!(entry.state, OperationState::RolledBack);
        }
    }

    // The lock was released: the next attempt runs (and fails the same
    // way, bumping the attempt count).
    let err = f.portfolio.rebalance().await.unwrap_err();
    assert!(matches!(err, PortfolioError::Retry { attempt: 2, .. }));
    assert!(!f.portfolio.is_stale());
}

#[tokio::test]
async fn stale_after_rollback_failure() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();
    let before = f.portfolio.holdings();

    move_prices(&f.market, dec!(300), dec!(400), dec!(450)).await;

    // One lookup each for the sell-BBBB and buy-AAAA legs, none for CCCC:
    // the batch fails AND every rollback inverse fails.
    f.scripted.set_budget("AAAA", 1);
    f.scripted.set_budget("BBBB", 1);
    f.scripted.set_budget("CCCC", 0);

    let err = f.portfolio.rebalance().await.unwrap_err();
    assert!(matches!(err, PortfolioError::Stale { .. }));
    assert!(f.portfolio.is_stale());

    // Stale portfolios reject every mutating operation.
    assert!(matches!(
        f.portfolio.rebalance().await,
        Err(PortfolioError::Stale { .. })
    ));
    assert!(matches!(
        f.portfolio.initialize().await,
        Err(PortfolioError::Stale { .. })
    ));
    assert!(matches!(
        f.portfolio
            .buy(&sym("AAAA"), Quantity::new(dec!(1)).unwrap())
            .await,
        Err(PortfolioError::Stale { .. })
    ));

    // Registry dispatch to a stale portfolio logs and continues.
    f.registry
        .on_price_change(
            &sym("AAAA"),
            Price::new(dec!(300)).unwrap(),
            Price::new(dec!(330)).unwrap(),
            dec!(0.1),
        )
        .await;
    assert_eq!(f.portfolio.holdings(), before);

    // Operator intervention is the only way out.
    f.scripted.clear_budgets();
    f.portfolio.clear_stale();
    assert!(!f.portfolio.is_stale());
    assert!(f.portfolio.rebalance().await.is_ok());
}

#[tokio::test]
async fn symbol_indexed_dispatch() {
    let config = BallastConfig::default();
    let registry = PortfolioRegistry::new();
    let market = Market::new(config.market.clone(), Arc::clone(&registry));

    let aaaa = market.list("AAAA", dec!(100)).unwrap();
    let bbbb = market.list("BBBB", dec!(100)).unwrap();
    let cccc = market.list("CCCC", dec!(100)).unwrap();

    let scripted = ScriptedMarket::new(Arc::clone(&market));
    let broker = Arc::new(BatchBroker::new(
        scripted as Arc<dyn MarketData>,
        fast_broker_config(),
    ));

    let half = Weight::new(dec!(0.5)).unwrap();
    let build = |name: &str, allocations: Vec<StockAllocation>| {
        let spec = PortfolioSpec::new(
            name,
            Amount::new(dec!(10000)).unwrap(),
            allocations,
            &config.portfolio,
        )
        .unwrap();
        Portfolio::new(
            spec,
            Arc::clone(&broker) as Arc<dyn ballast_core::traits::Broker>,
            Arc::clone(&registry),
            &config.portfolio,
        )
    };

    let p1 = build(
        "p1",
        vec![
            StockAllocation::new(Arc::clone(&aaaa), half),
            StockAllocation::new(Arc::clone(&bbbb), half),
        ],
    );
    let p2 = build(
        "p2",
        vec![
            StockAllocation::new(Arc::clone(&bbbb), half),
            StockAllocation::new(Arc::clone(&cccc), half),
        ],
    );
    let p3 = build(
        "p3",
        vec![StockAllocation::new(
            Arc::clone(&cccc),
            Weight::new(dec!(1)).unwrap(),
        )],
    );

    p1.initialize().await.unwrap();
    p2.initialize().await.unwrap();
    p3.initialize().await.unwrap();

    // The index maps each symbol to exactly its holders.
    assert_eq!(registry.holders_of(&sym("AAAA")), 1);
    assert_eq!(registry.holders_of(&sym("BBBB")), 2);
    assert_eq!(registry.holders_of(&sym("CCCC")), 2);

    let p1_before = p1.holdings();
    let p2_before = p2.holdings();
    let p3_before = p3.holdings();

    // A 10% move on BBBB reaches P1 and P2 only.
    market.set_price(&sym("BBBB"), dec!(110)).await.unwrap();

    assert_ne!(p1.holdings(), p1_before, "P1 should have rebalanced");
    assert_ne!(p2.holdings(), p2_before, "P2 should have rebalanced");
    assert_eq!(p3.holdings(), p3_before, "P3 must not be touched");

    // Dropping a portfolio makes it reclaimable: the registry never
    // extends its lifetime.
    drop(p3);
    assert_eq!(registry.holders_of(&sym("CCCC")), 1);
}

#[tokio::test]
async fn sub_minimum_corrective_delta_still_trades() {
    let config = BallastConfig::default();
    let registry = PortfolioRegistry::new();
    let market = Market::new(config.market.clone(), PortfolioRegistry::new());

    let aaaa = market.list("AAAA", dec!(1)).unwrap();
    let dddd = market.list("DDDD", dec!(100000)).unwrap();

    let broker = Arc::new(BatchBroker::new(
        ScriptedMarket::new(Arc::clone(&market)) as Arc<dyn MarketData>,
        fast_broker_config(),
    ));

    let spec = PortfolioSpec::new(
        "barbell",
        Amount::new(dec!(1000)).unwrap(),
        vec![
            StockAllocation::new(aaaa, Weight::new(dec!(0.5)).unwrap()),
            StockAllocation::new(dddd, Weight::new(dec!(0.5)).unwrap()),
        ],
        &config.portfolio,
    )
    .unwrap();
    let portfolio = Portfolio::new(
        spec,
        Arc::clone(&broker) as Arc<dyn ballast_core::traits::Broker>,
        registry,
        &config.portfolio,
    );

    portfolio.initialize().await.unwrap();
    assert_eq!(held(&portfolio, "AAAA"), dec!(500));
    assert_eq!(held(&portfolio, "DDDD"), dec!(0.005));

    market.set_price(&sym("DDDD"), dec!(90000)).await.unwrap();

    // The corrective buy on DDDD is 0.000277778 shares, far below the
    // stand-alone buy minimum; it is issued anyway so the slot converges
    // instead of drifting forever.
    let outcome = portfolio.rebalance().await.unwrap();
    assert!(matches!(outcome, RebalanceOutcome::Rebalanced { orders: 2, .. }));
    assert_eq!(held(&portfolio, "AAAA"), dec!(475));
    assert_eq!(held(&portfolio, "DDDD"), dec!(0.005277778));

    // Converged: the next pass is gated by the deviation threshold.
    let outcome = portfolio.rebalance().await.unwrap();
    assert!(matches!(outcome, RebalanceOutcome::BelowThreshold { .. }));
}

#[tokio::test]
async fn failed_initialization_rolls_back_cleanly() {
    let f = fixture(false, fast_broker_config());

    // The CCCC opening buy fails; AAAA and BBBB succeed and are reversed.
    f.scripted.set_budget("CCCC", 0);

    let err = f.portfolio.initialize().await.unwrap_err();
    let PortfolioError::Initialization { failed, .. } = err else {
        panic!("expected Initialization, got {err}");
    };
    assert_eq!(failed.len(), 1);

    // Nothing was committed and nothing registered.
    assert!(!f.portfolio.is_stale());
    assert_eq!(held(&f.portfolio, "AAAA"), Decimal::ZERO);
    assert_eq!(f.registry.holders_of(&sym("AAAA")), 0);

    // With the market healthy again, initialization succeeds.
    f.scripted.clear_budgets();
    f.portfolio.initialize().await.unwrap();
    assert_eq!(held(&f.portfolio, "AAAA"), dec!(16));
}

#[tokio::test]
async fn standalone_buy_and_sell_adjust_positions() {
    let f = fixture(false, fast_broker_config());
    f.portfolio.initialize().await.unwrap();

    f.portfolio
        .buy(&sym("AAAA"), Quantity::new(dec!(4)).unwrap())
        .await
        .unwrap();
    assert_eq!(held(&f.portfolio, "AAAA"), dec!(20));

    f.portfolio
        .sell(&sym("AAAA"), Quantity::new(dec!(10)).unwrap())
        .await
        .unwrap();
    assert_eq!(held(&f.portfolio, "AAAA"), dec!(10));

    // Unallocated symbols are rejected before the broker is involved.
    let err = f
        .portfolio
        .buy(&sym("ZZZZ"), Quantity::new(dec!(1)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::NotAllocated { .. }));
}
