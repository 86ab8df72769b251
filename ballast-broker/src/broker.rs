//! Atomic batch broker implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use ballast_core::config::BrokerConfig;
use ballast_core::data::{BatchEntry, OrderOutcome, OrderRequest, OrderSide, OrderSizing};
use ballast_core::error::BrokerError;
use ballast_core::traits::{Broker, MarketData};
use ballast_core::types::{Amount, BatchId, OperationId, Quantity, Timestamp};

type BatchTable = HashMap<BatchId, HashMap<OperationId, BatchEntry>>;

/// Broker implementation that records batch state and performs
/// compensating rollback.
///
/// Execution resolves prices from a [`MarketData`] source, optionally
/// applies a configured execution delay, and computes realized quantities
/// at the quantity scale. Every batched operation, success or failure,
/// is recorded in the batch table; re-issuing a recorded operation id
/// replays the recorded result without re-executing.
///
/// # Rollback
///
/// [`BatchBroker::rollback_batch`] reverses each successful, not-yet-reversed
/// operation with an inverse order sized by the realized *quantity* (never
/// the amount), so the share count returns exactly to its pre-batch state.
/// The inverse executes at the current market price; cash drift under
/// moving prices is accepted and surfaces to the portfolio, which accounts
/// for it in the next rebalance. Each inverse gets up to
/// `rollback_max_attempts` attempts with a bounded delay between them.
///
/// The batch table mutex is held only around table mutations, never across
/// order I/O.
pub struct BatchBroker {
    market: Arc<dyn MarketData>,
    config: BrokerConfig,
    batches: Mutex<BatchTable>,
}

impl BatchBroker {
    /// Creates a new batch broker trading against `market`.
    #[must_use]
    pub fn new(market: Arc<dyn MarketData>, config: BrokerConfig) -> Self {
        Self {
            market,
            config,
            batches: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of batches currently tracked.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Returns true if `batch_id` is present in the batch table.
    #[must_use]
    pub fn has_batch(&self, batch_id: BatchId) -> bool {
        self.batches.lock().contains_key(&batch_id)
    }

    /// Returns a snapshot of the entries recorded under `batch_id`.
    #[must_use]
    pub fn batch_entries(&self, batch_id: BatchId) -> Option<Vec<BatchEntry>> {
        self.batches
            .lock()
            .get(&batch_id)
            .map(|ops| ops.values().cloned().collect())
    }

    /// Looks up an already-recorded result for `request`, if any.
    ///
    /// Returns `Some` when the operation id has a terminal record in its
    /// batch; `None` when the operation should execute.
    fn recorded_result(
        &self,
        request: &OrderRequest,
    ) -> Option<Result<OrderOutcome, BrokerError>> {
        let batch_id = request.batch_id?;
        let batches = self.batches.lock();
        let entry = batches.get(&batch_id)?.get(&request.id)?;
        match (&entry.outcome, &entry.error) {
            (Some(outcome), _) => {
                debug!(
                    operation_id = %request.id,
                    batch_id = %batch_id,
                    "Replaying recorded outcome"
                );
                Some(Ok(outcome.clone()))
            }
            (None, Some(reason)) => Some(Err(Self::execution_failure(request, reason.clone()))),
            // Pending: another submission is in flight; let this one run.
            (None, None) => None,
        }
    }

    fn execution_failure(request: &OrderRequest, reason: String) -> BrokerError {
        match request.side {
            OrderSide::Buy => BrokerError::BuyFailed {
                symbol: request.symbol.clone(),
                operation_id: request.id,
                batch_id: request.batch_id,
                reason,
            },
            OrderSide::Sell => BrokerError::SellFailed {
                symbol: request.symbol.clone(),
                operation_id: request.id,
                batch_id: request.batch_id,
                reason,
            },
        }
    }

    /// Registers a pending entry for a batched request. No-op for
    /// stand-alone requests or already-registered operation ids.
    fn register(&self, request: &OrderRequest) {
        let Some(batch_id) = request.batch_id else {
            return;
        };
        let mut batches = self.batches.lock();
        batches
            .entry(batch_id)
            .or_default()
            .entry(request.id)
            .or_insert_with(|| BatchEntry::pending(request.clone()));
    }

    /// Records the result of an executed operation in the batch table.
    fn record(&self, request: &OrderRequest, result: &Result<OrderOutcome, BrokerError>) {
        let Some(batch_id) = request.batch_id else {
            return;
        };
        let mut batches = self.batches.lock();
        if let Some(entry) = batches
            .get_mut(&batch_id)
            .and_then(|ops| ops.get_mut(&request.id))
        {
            match result {
                Ok(outcome) => entry.mark_success(outcome.clone()),
                Err(e) => entry.mark_error(e.to_string()),
            }
        }
    }

    fn mark_rolled_back(&self, batch_id: BatchId, operation_id: OperationId) {
        let mut batches = self.batches.lock();
        if let Some(entry) = batches
            .get_mut(&batch_id)
            .and_then(|ops| ops.get_mut(&operation_id))
        {
            entry.mark_rolled_back();
        }
    }

    fn record_rollback_attempt(&self, batch_id: BatchId, operation_id: OperationId, attempt: u32) {
        let mut batches = self.batches.lock();
        if let Some(entry) = batches
            .get_mut(&batch_id)
            .and_then(|ops| ops.get_mut(&operation_id))
        {
            entry.rollback_attempts = attempt;
        }
    }

    /// Executes a request against the market: resolve price, apply the
    /// configured delay, compute realized values.
    async fn execute(&self, request: &OrderRequest) -> Result<OrderOutcome, BrokerError> {
        if let OrderSizing::Quantity(quantity) = request.sizing {
            if quantity.as_decimal() > self.config.max_quantity {
                return Err(BrokerError::InvalidOrder {
                    operation_id: request.id,
                    batch_id: request.batch_id,
                    reason: format!(
                        "quantity {} exceeds ceiling {}",
                        quantity, self.config.max_quantity
                    ),
                });
            }
        }

        let price =
            self.market
                .price_of(&request.symbol)
                .ok_or_else(|| BrokerError::StockNotFound {
                    symbol: request.symbol.clone(),
                    operation_id: request.id,
                    batch_id: request.batch_id,
                })?;

        if !self.config.execution_delay.is_zero() {
            sleep(self.config.execution_delay).await;
        }

        let (quantity, amount) = match request.sizing {
            OrderSizing::Amount(amount) => {
                let quantity = Quantity::new(amount.as_decimal() / price.as_decimal())
                    .map_err(|e| Self::execution_failure(request, e.to_string()))?;
                (quantity, amount)
            }
            OrderSizing::Quantity(quantity) => {
                (quantity, Amount::from_price_qty(price, quantity))
            }
        };

        Ok(OrderOutcome {
            operation_id: request.id,
            symbol: request.symbol.clone(),
            side: request.side,
            price,
            quantity,
            amount,
            batch_id: request.batch_id,
            rollback: request.rollback,
            executed_at: Timestamp::now(),
        })
    }

    /// Reverses one recorded outcome, retrying up to the configured budget.
    async fn reverse_outcome(&self, batch_id: BatchId, outcome: &OrderOutcome) -> bool {
        for attempt in 1..=self.config.rollback_max_attempts {
            self.record_rollback_attempt(batch_id, outcome.operation_id, attempt);

            // A fresh inverse per attempt: retrying under the same
            // operation id would replay the recorded failure.
            let inverse = outcome.inverse_request();

            match self.submit(inverse).await {
                Ok(compensation) => {
                    self.mark_rolled_back(batch_id, outcome.operation_id);
                    debug!(
                        operation_id = %outcome.operation_id,
                        batch_id = %batch_id,
                        compensation = %compensation,
                        "Operation reversed"
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        operation_id = %outcome.operation_id,
                        batch_id = %batch_id,
                        attempt,
                        error = %e,
                        "Rollback attempt failed"
                    );
                    if attempt < self.config.rollback_max_attempts
                        && !self.config.rollback_retry_delay.is_zero()
                    {
                        sleep(self.config.rollback_retry_delay).await;
                    }
                }
            }
        }

        error!(
            operation_id = %outcome.operation_id,
            batch_id = %batch_id,
            attempts = self.config.rollback_max_attempts,
            "Failed to reverse operation"
        );
        false
    }
}

#[async_trait]
impl Broker for BatchBroker {
    async fn submit(&self, request: OrderRequest) -> Result<OrderOutcome, BrokerError> {
        if let Some(recorded) = self.recorded_result(&request) {
            return recorded;
        }

        self.register(&request);
        let result = self.execute(&request).await;
        self.record(&request, &result);

        match &result {
            Ok(outcome) => debug!(operation_id = %request.id, outcome = %outcome, "Order executed"),
            Err(e) => debug!(operation_id = %request.id, error = %e, "Order failed"),
        }
        result
    }

    async fn rollback_batch(&self, batch_id: BatchId) -> bool {
        let to_reverse: Vec<OrderOutcome> = {
            let batches = self.batches.lock();
            let Some(ops) = batches.get(&batch_id) else {
                // Unknown batch: nothing to undo.
                debug!(batch_id = %batch_id, "Rollback of unknown batch is a no-op");
                return true;
            };
            ops.values()
                .filter(|entry| entry.needs_rollback())
                .filter_map(|entry| entry.outcome.clone())
                .collect()
        };

        if to_reverse.is_empty() {
            debug!(batch_id = %batch_id, "No successful operations to roll back");
            return true;
        }

        info!(
            batch_id = %batch_id,
            operations = to_reverse.len(),
            "Rolling back batch"
        );

        let mut all_reversed = true;
        for outcome in &to_reverse {
            if !self.reverse_outcome(batch_id, outcome).await {
                all_reversed = false;
            }
        }

        if all_reversed {
            info!(batch_id = %batch_id, "Batch rolled back");
        } else {
            error!(batch_id = %batch_id, "Batch rollback incomplete");
        }
        all_reversed
    }

    fn discard_batch(&self, batch_id: BatchId) -> bool {
        let removed = self.batches.lock().remove(&batch_id).is_some();
        if removed {
            debug!(batch_id = %batch_id, "Batch discarded");
        }
        removed
    }
}
