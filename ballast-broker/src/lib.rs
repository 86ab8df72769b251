//! # Ballast Broker
//!
//! The atomic batch broker for the Ballast rebalancing system.
//!
//! This crate provides [`BatchBroker`], an implementation of the
//! [`ballast_core::traits::Broker`] contract that:
//!
//! - resolves execution prices through a [`ballast_core::traits::MarketData`] source
//! - records every batched operation's outcome in a two-level
//!   `batch id → operation id → entry` table
//! - replays recorded outcomes idempotently when an operation id is
//!   re-issued within a live batch
//! - achieves batch atomicity through compensating rollback: quantity-based
//!   inverse trades with a bounded per-operation retry budget
//!
//! The batch table is the only process-wide shared mutable structure; it is
//! guarded by a mutex held only around table mutations, never across order
//! I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

mod broker;

pub use broker::BatchBroker;
