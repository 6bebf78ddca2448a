//! Database engine for tupledb
//!
//! The engine binds the three lower layers into one transactional,
//! reactive database:
//! - storage adapter: the sorted map holding committed state
//! - concurrency log: per-transaction read/write records, validated at
//!   commit
//! - reactivity tracker: listener fan-out after every committed batch
//!
//! The engine is the only component that coordinates across layers; a
//! single lock makes its operations linearizable. Two flavors exist
//! with identical semantics: the synchronous [`TupleDatabase`] and,
//! behind the `async` feature, the cooperative [`AsyncTupleDatabase`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;

#[cfg(feature = "async")]
pub mod async_database;

pub use database::TupleDatabase;

#[cfg(feature = "async")]
pub use async_database::AsyncTupleDatabase;

pub use tupledb_reactivity::{Callback, Subscription};
