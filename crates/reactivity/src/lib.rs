//! Reactive subscriptions for tupledb
//!
//! The tracker indexes live listeners by the common prefix of their scan
//! bounds and, for any committed write batch, computes which listeners
//! to notify and with what subset of the batch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod tracker;

pub use tracker::{Callback, ReactivityTracker, Subscription};
