//! Order and batch data structures.
//!
//! This module provides:
//! - [`OrderRequest`] - A buy or sell instruction, sized by cash amount or share quantity
//! - [`OrderOutcome`] - The broker's record of an executed order
//! - [`OrderSide`] / [`OrderSizing`] - Direction and sizing of a request
//! - [`BatchEntry`] / [`OperationState`] - Per-operation tracking inside an atomic batch

mod batch;
mod order;

pub use batch::{BatchEntry, OperationState};
pub use order::{OrderOutcome, OrderRequest, OrderSide, OrderSizing};
