//! Public client layer for tupledb
//!
//! This crate provides the surface applications program against:
//! - [`TupleClient`]: a schema-typed façade over an engine, scoped to a
//!   subspace prefix
//! - [`Transaction`]: buffered writes with read-your-writes overlay and
//!   optimistic conflict detection at commit
//! - [`transactional`]: the retry-on-conflict wrapper
//!
//! Every client call desugars to exactly one engine call with subspace
//! prefixes rewritten at the boundary; the client adds no semantics of
//! its own. The value type parameter `V` is the schema surface: a
//! client typed at your value enum statically forbids ill-typed writes.
//!
//! Behind the `async` feature the same layer exists in a cooperative
//! flavor ([`AsyncTupleClient`] / [`AsyncTransaction`] /
//! [`transactional_async`]) with identical semantics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod retry;
pub mod transaction;

#[cfg(feature = "async")]
pub mod async_client;

pub use client::TupleClient;
pub use retry::{transactional, transactional_with_retries, Transactable, DEFAULT_RETRIES};
pub use transaction::Transaction;

#[cfg(feature = "async")]
pub use async_client::{transactional_async, AsyncTransaction, AsyncTupleClient};
