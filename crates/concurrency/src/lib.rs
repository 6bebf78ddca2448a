//! Optimistic concurrency control for tupledb
//!
//! The concurrency log records, per live transaction, the ranges it read
//! and the keys it wrote, in one time-ordered sequence. Commit-time
//! validation rejects any transaction whose recorded reads were
//! invalidated by a write another transaction committed in between.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log;

pub use log::{ConcurrencyLog, LogEntry};
