//! Broker trait definition.

use async_trait::async_trait;

use crate::data::{OrderOutcome, OrderRequest};
use crate::error::BrokerError;
use crate::types::{Amount, BatchId, Quantity, Symbol};

/// Contract for executing buy/sell orders with atomic batch support.
///
/// The broker exposes four order primitives plus batch rollback. Every
/// operation it processes, success or failure, is recorded in its batch
/// table under the operation's batch id, if one was supplied; operations
/// without a batch id execute stand-alone and leave no residual state.
///
/// A primitive is idempotent relative to its operation id: re-issuing the
/// same operation id within a still-live batch returns the previously
/// recorded outcome without re-executing.
///
/// # Lifecycle of a batch
///
/// 1. Callers generate a [`BatchId`] and attach it to related requests.
/// 2. Each operation's outcome is recorded under the batch.
/// 3. On partial failure, [`Broker::rollback_batch`] reverses the
///    successful operations with quantity-based inverse trades.
/// 4. A fully committed batch is released with [`Broker::discard_batch`].
#[async_trait]
pub trait Broker: Send + Sync {
    /// Executes a single order request.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError` if execution fails; the failure is still
    /// recorded in the batch table when the request carried a batch id.
    async fn submit(&self, request: OrderRequest) -> Result<OrderOutcome, BrokerError>;

    /// Reverses the successful operations of a batch.
    ///
    /// Returns `true` if every successful operation was reversed (or there
    /// was nothing to undo; an unknown batch id is vacuously rolled back);
    /// `false` if any inverse operation exhausted its retry budget.
    async fn rollback_batch(&self, batch_id: BatchId) -> bool;

    /// Drops a batch from the broker's table.
    ///
    /// Returns `true` if the batch existed.
    fn discard_batch(&self, batch_id: BatchId) -> bool;

    /// Buys at most `amount` of `symbol` at the current market price.
    ///
    /// The realized quantity is returned at the quantity scale; the broker
    /// is authoritative for realized values.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidOrder` if the amount is outside the
    /// broker's bounds, or the underlying execution error.
    async fn buy_by_amount(
        &self,
        symbol: Symbol,
        amount: Amount,
        batch_id: Option<BatchId>,
    ) -> Result<OrderOutcome, BrokerError> {
        let request = OrderRequest::buy_by_amount(symbol, amount)
            .map_err(|e| invalid_order(e, batch_id))?;
        self.submit(attach(request, batch_id)).await
    }

    /// Buys exactly `quantity` shares of `symbol` at the current price.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidOrder` if the quantity is outside the
    /// broker's bounds, or the underlying execution error.
    async fn buy_by_quantity(
        &self,
        symbol: Symbol,
        quantity: Quantity,
        batch_id: Option<BatchId>,
    ) -> Result<OrderOutcome, BrokerError> {
        let request = OrderRequest::buy_by_quantity(symbol, quantity)
            .map_err(|e| invalid_order(e, batch_id))?;
        self.submit(attach(request, batch_id)).await
    }

    /// Sells at most `amount` of `symbol` at the current market price.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidOrder` if the amount is outside the
    /// broker's bounds, or the underlying execution error.
    async fn sell_by_amount(
        &self,
        symbol: Symbol,
        amount: Amount,
        batch_id: Option<BatchId>,
    ) -> Result<OrderOutcome, BrokerError> {
        let request = OrderRequest::sell_by_amount(symbol, amount)
            .map_err(|e| invalid_order(e, batch_id))?;
        self.submit(attach(request, batch_id)).await
    }

    /// Sells exactly `quantity` shares of `symbol` at the current price.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidOrder` if the quantity is outside the
    /// broker's bounds, or the underlying execution error.
    async fn sell_by_quantity(
        &self,
        symbol: Symbol,
        quantity: Quantity,
        batch_id: Option<BatchId>,
    ) -> Result<OrderOutcome, BrokerError> {
        let request = OrderRequest::sell_by_quantity(symbol, quantity)
            .map_err(|e| invalid_order(e, batch_id))?;
        self.submit(attach(request, batch_id)).await
    }
}

fn attach(request: OrderRequest, batch_id: Option<BatchId>) -> OrderRequest {
    match batch_id {
        Some(batch_id) => request.with_batch(batch_id),
        None => request,
    }
}

fn invalid_order(error: crate::types::ValidationError, batch_id: Option<BatchId>) -> BrokerError {
    BrokerError::InvalidOrder {
        operation_id: crate::types::OperationId::generate(),
        batch_id,
        reason: error.to_string(),
    }
}
