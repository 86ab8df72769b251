//! The per-portfolio rebalancing state machine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use ballast_core::config::PortfolioConfig;
use ballast_core::data::{OrderOutcome, OrderRequest, OrderSide};
use ballast_core::error::{BrokerError, FailedOperation, PortfolioError};
use ballast_core::scale::{quantize_money, quantize_quantity};
use ballast_core::traits::Broker;
use ballast_core::types::{Amount, BatchId, Quantity, Symbol, Weight};

use super::{PortfolioId, RebalanceOutcome};
use crate::lock::RebalanceLock;
use crate::registry::PortfolioRegistry;
use crate::stock::Stock;

/// A target slot within a portfolio: a stock, its target weight, and the
/// currently-held quantity.
pub struct AllocatedStock {
    stock: Arc<Stock>,
    weight: Weight,
    quantity: Quantity,
}

impl AllocatedStock {
    fn new(stock: Arc<Stock>, weight: Weight) -> Self {
        Self {
            stock,
            weight,
            quantity: Quantity::ZERO,
        }
    }

    /// Returns the underlying stock.
    #[must_use]
    pub fn stock(&self) -> &Arc<Stock> {
        &self.stock
    }

    /// Returns the target weight.
    #[must_use]
    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Returns the held quantity.
    #[must_use]
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Current market value of this slot (unquantized).
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        self.quantity.as_decimal() * self.stock.price().as_decimal()
    }
}

/// Price/holding snapshot of one slot, taken at the start of a rebalance.
/// Fresh prices arriving mid-rebalance do not reenter the calculation.
struct SlotSnapshot {
    symbol: Symbol,
    price: Decimal,
    held: Quantity,
    weight: Decimal,
}

/// A portfolio holding allocated positions against a declared target
/// distribution.
///
/// The portfolio is inert at construction; [`Portfolio::initialize`]
/// executes the opening batch of buys and registers the portfolio in its
/// registry. From then on [`Portfolio::rebalance`], usually driven by the
/// registry's price-change dispatch, keeps the composition aligned with
/// the target weights.
///
/// # Atomicity
///
/// Every rebalance runs as one batch: all orders commit together or the
/// broker compensates the successful ones. Held quantities are only
/// updated after a fully-successful batch, so a rolled-back rebalance
/// leaves the recorded positions identical to the real ones.
///
/// # Stale state
///
/// A portfolio whose rollback failed is *stale*: holdings and broker state
/// are known to be inconsistent, and every mutating operation fails with
/// `PortfolioError::Stale` until an operator verifies the books and calls
/// [`Portfolio::clear_stale`]. Clearing is an operator action, not a
/// recovery path.
pub struct Portfolio {
    id: PortfolioId,
    name: String,
    initial_investment: Amount,
    positions: RwLock<HashMap<Symbol, AllocatedStock>>,
    broker: Arc<dyn Broker>,
    registry: Arc<PortfolioRegistry>,
    lock: RebalanceLock,
    stale: AtomicBool,
    failed_rebalances: AtomicU32,
    deviation_threshold: Decimal,
    weak_self: Weak<Portfolio>,
}

impl Portfolio {
    /// Builds an inert portfolio from a validated specification.
    ///
    /// Nothing is traded and nothing is registered until
    /// [`Portfolio::initialize`] succeeds.
    #[must_use]
    pub fn new(
        spec: super::PortfolioSpec,
        broker: Arc<dyn Broker>,
        registry: Arc<PortfolioRegistry>,
        config: &PortfolioConfig,
    ) -> Arc<Self> {
        let (name, initial_investment, allocations) = spec.into_parts();
        let positions = allocations
            .into_iter()
            .map(|a| {
                (
                    a.stock.symbol().clone(),
                    AllocatedStock::new(a.stock, a.weight),
                )
            })
            .collect();

        Arc::new_cyclic(|weak| Self {
            id: PortfolioId::generate(),
            name,
            initial_investment,
            positions: RwLock::new(positions),
            broker,
            registry,
            lock: RebalanceLock::new(config.rebalance_lock_ttl),
            stale: AtomicBool::new(false),
            failed_rebalances: AtomicU32::new(0),
            deviation_threshold: config.rebalance_deviation_threshold,
            weak_self: weak.clone(),
        })
    }

    /// Returns the portfolio's unique id.
    #[must_use]
    pub fn id(&self) -> PortfolioId {
        self.id
    }

    /// Returns the portfolio's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the initial cash investment.
    #[must_use]
    pub fn initial_investment(&self) -> Amount {
        self.initial_investment
    }

    /// Returns the allocated symbols.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.positions.read().keys().cloned().collect()
    }

    /// Returns the held quantity per symbol.
    #[must_use]
    pub fn holdings(&self) -> HashMap<Symbol, Quantity> {
        self.positions
            .read()
            .iter()
            .map(|(symbol, alloc)| (symbol.clone(), alloc.quantity()))
            .collect()
    }

    /// Computes the current total market value, quantized to the money
    /// scale.
    #[must_use]
    pub fn total_value(&self) -> Amount {
        let total: Decimal = self
            .positions
            .read()
            .values()
            .map(AllocatedStock::market_value)
            .sum();
        Amount::new(quantize_money(total)).unwrap_or(Amount::ZERO)
    }

    /// Returns each stock's current fraction of the portfolio value.
    ///
    /// Empty when the portfolio has no market value.
    #[must_use]
    pub fn current_weights(&self) -> HashMap<Symbol, Decimal> {
        let positions = self.positions.read();
        let total: Decimal = positions.values().map(AllocatedStock::market_value).sum();
        if total.is_zero() {
            return HashMap::new();
        }
        positions
            .iter()
            .map(|(symbol, alloc)| (symbol.clone(), alloc.market_value() / total))
            .collect()
    }

    /// Returns true if the portfolio is in stale state.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Manually marks the portfolio stale. All mutating operations fail
    /// until cleared.
    pub fn set_stale(&self) {
        self.stale.store(true, Ordering::Release);
        info!(portfolio = %self.name, "Stale state set");
    }

    /// Clears the stale state after operator verification.
    pub fn clear_stale(&self) {
        self.stale.store(false, Ordering::Release);
        info!(portfolio = %self.name, "Stale state cleared");
    }

    /// Executes the opening batch of buys and registers the portfolio for
    /// its symbols.
    ///
    /// For each allocated stock, `initial_investment × weight` is bought
    /// by amount; the buys run concurrently under one batch id. If every
    /// buy succeeds the held quantities are taken from the outcomes and
    /// the portfolio registers itself. If any buy fails the batch is
    /// rolled back; a failed rollback leaves the portfolio stale.
    ///
    /// # Errors
    ///
    /// - `PortfolioError::Stale` if the portfolio is stale (or becomes so)
    /// - `PortfolioError::Initialization` if opening orders failed and
    ///   rollback succeeded
    pub async fn initialize(&self) -> Result<(), PortfolioError> {
        self.ensure_not_stale()?;

        let batch_id = BatchId::generate();
        let requests = self.opening_orders(batch_id)?;
        let order_count = requests.len();

        debug!(
            portfolio = %self.name,
            batch_id = %batch_id,
            orders = order_count,
            "Initializing portfolio"
        );

        let results = join_all(requests.into_iter().map(|r| self.broker.submit(r))).await;
        let (outcomes, failed) = split_results(results);

        if failed.is_empty() {
            self.apply_opening_outcomes(&outcomes);
            self.broker.discard_batch(batch_id);
            if let Some(this) = self.weak_self.upgrade() {
                self.registry.register(&this);
            }
            info!(
                portfolio = %self.name,
                invested = %self.initial_investment,
                "Portfolio initialized"
            );
            return Ok(());
        }

        warn!(
            portfolio = %self.name,
            batch_id = %batch_id,
            failures = failed.len(),
            "Initialization failed, rolling back"
        );

        if self.broker.rollback_batch(batch_id).await {
            Err(PortfolioError::Initialization {
                portfolio: self.name.clone(),
                batch_id: Some(batch_id),
                failed,
            })
        } else {
            self.set_stale();
            Err(PortfolioError::Stale {
                portfolio: self.name.clone(),
                batch_id: Some(batch_id),
                failed,
            })
        }
    }

    /// Restores the portfolio's composition to its target allocation.
    ///
    /// The algorithm:
    /// 1. Skip silently when a rebalance is already in flight (the lock
    ///    subsumes this call); take over locks stuck past their TTL.
    /// 2. Snapshot prices and holdings; compute the total value `V`.
    /// 3. If the maximum per-stock deviation is below the threshold,
    ///    release the lock and return without trading.
    /// 4. Otherwise compute per-stock target quantities
    ///    `V × weight / price`, derive sells for negative deltas and buys
    ///    for positive ones, and execute them under one batch id; sells
    ///    first so freed cash funds the buys, concurrent within each
    ///    phase.
    /// 5. Commit held quantities only if every order succeeded; otherwise
    ///    roll the batch back.
    ///
    /// # Errors
    ///
    /// - `PortfolioError::Stale` if the portfolio is stale, or if rollback
    ///   failed and it just became stale
    /// - `PortfolioError::Retry` if orders failed and rollback succeeded
    pub async fn rebalance(&self) -> Result<RebalanceOutcome, PortfolioError> {
        self.ensure_not_stale()?;

        if !self.lock.try_acquire().is_acquired() {
            return Ok(RebalanceOutcome::Skipped);
        }

        let result = self.rebalance_locked().await;
        self.lock.release();
        result
    }

    /// Buys `quantity` shares of an allocated symbol outside a rebalance.
    ///
    /// # Errors
    ///
    /// - `PortfolioError::Stale` if the portfolio is stale
    /// - `PortfolioError::NotAllocated` if the symbol has no slot
    /// - the underlying `BrokerError` on execution failure
    pub async fn buy(
        &self,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<OrderOutcome, PortfolioError> {
        self.ensure_not_stale()?;
        self.ensure_allocated(symbol)?;

        let outcome = self
            .broker
            .buy_by_quantity(symbol.clone(), quantity, None)
            .await?;
        let mut positions = self.positions.write();
        if let Some(alloc) = positions.get_mut(symbol) {
            alloc.quantity = alloc.quantity + outcome.quantity;
        }
        Ok(outcome)
    }

    /// Sells `quantity` shares of an allocated symbol outside a rebalance.
    ///
    /// # Errors
    ///
    /// - `PortfolioError::Stale` if the portfolio is stale
    /// - `PortfolioError::NotAllocated` if the symbol has no slot
    /// - the underlying `BrokerError` on execution failure
    pub async fn sell(
        &self,
        symbol: &Symbol,
        quantity: Quantity,
    ) -> Result<OrderOutcome, PortfolioError> {
        self.ensure_not_stale()?;
        self.ensure_allocated(symbol)?;

        let outcome = self
            .broker
            .sell_by_quantity(symbol.clone(), quantity, None)
            .await?;
        let mut positions = self.positions.write();
        if let Some(alloc) = positions.get_mut(symbol) {
            alloc.quantity = alloc.quantity.saturating_sub(outcome.quantity);
        }
        Ok(outcome)
    }

    // === Internals ===

    fn ensure_not_stale(&self) -> Result<(), PortfolioError> {
        if self.is_stale() {
            return Err(PortfolioError::Stale {
                portfolio: self.name.clone(),
                batch_id: None,
                failed: Vec::new(),
            });
        }
        Ok(())
    }

    fn ensure_allocated(&self, symbol: &Symbol) -> Result<(), PortfolioError> {
        if !self.positions.read().contains_key(symbol) {
            return Err(PortfolioError::NotAllocated {
                portfolio: self.name.clone(),
                symbol: symbol.clone(),
            });
        }
        Ok(())
    }

    /// Builds the opening buy-by-amount orders, one per allocation.
    fn opening_orders(&self, batch_id: BatchId) -> Result<Vec<OrderRequest>, PortfolioError> {
        let positions = self.positions.read();
        let mut requests = Vec::with_capacity(positions.len());
        for alloc in positions.values() {
            let target = self.initial_investment.as_decimal() * alloc.weight().as_decimal();
            let amount = Amount::new(target).unwrap_or(Amount::ZERO);
            let request = OrderRequest::buy_by_amount(alloc.stock().symbol().clone(), amount)
                .map_err(|e| PortfolioError::Initialization {
                    portfolio: self.name.clone(),
                    batch_id: Some(batch_id),
                    failed: vec![FailedOperation {
                        operation_id: None,
                        symbol: Some(alloc.stock().symbol().clone()),
                        reason: e.to_string(),
                    }],
                })?
                .with_batch(batch_id);
            requests.push(request);
        }
        Ok(requests)
    }

    fn apply_opening_outcomes(&self, outcomes: &[OrderOutcome]) {
        let mut positions = self.positions.write();
        for outcome in outcomes {
            if let Some(alloc) = positions.get_mut(&outcome.symbol) {
                alloc.quantity = outcome.quantity;
            }
        }
    }

    /// The rebalance body; runs with the lock held.
    async fn rebalance_locked(&self) -> Result<RebalanceOutcome, PortfolioError> {
        let slots = self.snapshot();
        let total = quantize_money(
            slots
                .iter()
                .map(|s| s.held.as_decimal() * s.price)
                .sum::<Decimal>(),
        );

        if total.is_zero() {
            debug!(portfolio = %self.name, "No market value, nothing to rebalance");
            return Ok(RebalanceOutcome::Empty);
        }

        let max_deviation = slots
            .iter()
            .map(|s| (s.held.as_decimal() * s.price / total - s.weight).abs())
            .max()
            .unwrap_or(Decimal::ZERO);

        if max_deviation < self.deviation_threshold {
            debug!(
                portfolio = %self.name,
                max_deviation = %max_deviation,
                threshold = %self.deviation_threshold,
                "Deviation below threshold, no trades"
            );
            return Ok(RebalanceOutcome::BelowThreshold { max_deviation });
        }

        let batch_id = BatchId::generate();
        let (sells, buys) = self.derive_orders(&slots, total, batch_id);
        let order_count = sells.len() + buys.len();
        if order_count == 0 {
            return Ok(RebalanceOutcome::Rebalanced {
                orders: 0,
                max_deviation,
            });
        }

        info!(
            portfolio = %self.name,
            batch_id = %batch_id,
            max_deviation = %max_deviation,
            sells = sells.len(),
            buys = buys.len(),
            "Rebalancing"
        );

        // Sells first, so freed cash funds the buys; concurrent within
        // each phase.
        let sell_results = join_all(sells.into_iter().map(|r| self.broker.submit(r))).await;
        let buy_results = join_all(buys.into_iter().map(|r| self.broker.submit(r))).await;

        let (outcomes, failed) = split_results(sell_results.into_iter().chain(buy_results));

        if failed.is_empty() {
            self.apply_rebalance_outcomes(&outcomes);
            self.broker.discard_batch(batch_id);
            self.failed_rebalances.store(0, Ordering::Relaxed);
            info!(
                portfolio = %self.name,
                batch_id = %batch_id,
                orders = order_count,
                "Rebalance committed"
            );
            return Ok(RebalanceOutcome::Rebalanced {
                orders: order_count,
                max_deviation,
            });
        }

        warn!(
            portfolio = %self.name,
            batch_id = %batch_id,
            failures = failed.len(),
            "Rebalance failed, rolling back"
        );

        if self.broker.rollback_batch(batch_id).await {
            let attempt = self.failed_rebalances.fetch_add(1, Ordering::Relaxed) + 1;
            Err(PortfolioError::Retry {
                portfolio: self.name.clone(),
                batch_id: Some(batch_id),
                failed,
                attempt,
            })
        } else {
            self.set_stale();
            Err(PortfolioError::Stale {
                portfolio: self.name.clone(),
                batch_id: Some(batch_id),
                failed,
            })
        }
    }

    /// Takes the price/holding snapshot the whole rebalance works from.
    fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.positions
            .read()
            .iter()
            .map(|(symbol, alloc)| SlotSnapshot {
                symbol: symbol.clone(),
                price: alloc.stock().price().as_decimal(),
                held: alloc.quantity(),
                weight: alloc.weight().as_decimal(),
            })
            .collect()
    }

    /// Derives sell and buy orders from target quantities.
    ///
    /// Only a zero delta (at the quantity scale) is dropped: rebalance
    /// deltas bypass the stand-alone order minimums so even the smallest
    /// persistent drift converges instead of being silently left behind.
    fn derive_orders(
        &self,
        slots: &[SlotSnapshot],
        total: Decimal,
        batch_id: BatchId,
    ) -> (Vec<OrderRequest>, Vec<OrderRequest>) {
        let mut sells = Vec::new();
        let mut buys = Vec::new();

        for slot in slots {
            let target = quantize_quantity(total * slot.weight / slot.price);
            let delta = target - slot.held.as_decimal();
            if delta.is_zero() {
                continue;
            }

            // Nonzero at the quantity scale, so at least one tick.
            let quantity = Quantity::new_unchecked(delta.abs());
            let side = if delta > Decimal::ZERO {
                OrderSide::Buy
            } else {
                OrderSide::Sell
            };
            let request =
                OrderRequest::for_delta(slot.symbol.clone(), side, quantity).with_batch(batch_id);
            match side {
                OrderSide::Buy => buys.push(request),
                OrderSide::Sell => sells.push(request),
            }
        }

        (sells, buys)
    }

    fn apply_rebalance_outcomes(&self, outcomes: &[OrderOutcome]) {
        let mut positions = self.positions.write();
        for outcome in outcomes {
            if let Some(alloc) = positions.get_mut(&outcome.symbol) {
                match outcome.side {
                    OrderSide::Buy => alloc.quantity = alloc.quantity + outcome.quantity,
                    OrderSide::Sell => {
                        alloc.quantity = alloc.quantity.saturating_sub(outcome.quantity);
                    }
                }
            }
        }
    }
}

impl Drop for Portfolio {
    fn drop(&mut self) {
        // The registry holds only weak handles, but removing them eagerly
        // keeps the index tight.
        self.registry.unregister(self.id);
    }
}

impl std::fmt::Debug for Portfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portfolio")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("initial_investment", &self.initial_investment)
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}

/// Splits gathered broker results into outcomes and failure context.
fn split_results(
    results: impl IntoIterator<Item = Result<OrderOutcome, BrokerError>>,
) -> (Vec<OrderOutcome>, Vec<FailedOperation>) {
    let mut outcomes = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => failed.push(FailedOperation::from_broker_error(&e)),
        }
    }
    (outcomes, failed)
}
