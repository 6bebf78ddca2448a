//! # tupledb
//!
//! An embedded ordered tuple-key/value database: typed composite keys,
//! range scans, reactive subscriptions, and optimistic transactions,
//! after the FoundationDB data model.
//!
//! Applications store tuples of primitive values mapped to arbitrary
//! values, scan the lexicographic order of those tuples, observe
//! mutations through subscriptions whose bounds intersect the writes,
//! and compose atomic write batches with read-write conflict detection
//! at commit.
//!
//! # Quick Start
//!
//! ```
//! use tupledb::{transactional, tuple, ScanArgs, TupleClient};
//!
//! fn main() -> tupledb::Result<()> {
//!     let db: TupleClient<i64> = TupleClient::in_memory();
//!
//!     // Scope everything below to one game
//!     let game = db.subspace(&tuple!["game", "g1"]);
//!
//!     // Write scores in a transaction
//!     let tx = game.transact();
//!     tx.set(tuple!["score", "chet"], 2)?;
//!     tx.set(tuple!["score", "meghan"], 1)?;
//!     tx.commit()?;
//!
//!     // Keep a derived total consistent with a retry-on-conflict query
//!     let total = transactional(&game, |tx| {
//!         let sum: i64 = tx
//!             .scan(&ScanArgs::for_prefix(tuple!["score"]))?
//!             .iter()
//!             .map(|kv| kv.value)
//!             .sum();
//!         tx.set(tuple!["total"], sum)?;
//!         Ok(sum)
//!     })?;
//!     assert_eq!(total, 3);
//!
//!     // Watch the score range
//!     let sub = game.subscribe(&ScanArgs::for_prefix(tuple!["score"]), |writes| {
//!         println!("scores changed: {} writes", writes.len());
//!     });
//!     game.commit(&tupledb::WriteBatch::new().with_set(tuple!["score", "sara"], 5))?;
//!     sub.unsubscribe();
//!
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! | Crate | Role |
//! |---|---|
//! | `tupledb-core` | values, tuples, codec, bounds, batches, errors |
//! | `tupledb-storage` | storage adapter contract + in-memory backend |
//! | `tupledb-reactivity` | listener registry and per-write fan-out |
//! | `tupledb-concurrency` | read/write log, commit-time validation |
//! | `tupledb-engine` | the transactional, reactive engine (sync + async) |
//! | `tupledb-api` | clients, transactions, subspaces, retry wrapper |
//!
//! Keys sort by the tuple comparator; backends that store raw bytes
//! encode keys with the order-preserving codec in
//! [`codec`](tupledb_core::codec), so byte order equals tuple order.

pub use tupledb_core::{
    codec, sorted, subspace, tuple, DecodeError, Error, KeyValuePair, ListenerId, Result,
    ScanArgs, StorageScanArgs, Tuple, TxId, Value, WriteBatch,
};

pub use tupledb_storage::{InMemoryStorage, TupleStorage};

pub use tupledb_concurrency::ConcurrencyLog;
pub use tupledb_reactivity::ReactivityTracker;

pub use tupledb_engine::{AsyncTupleDatabase, Subscription, TupleDatabase};

pub use tupledb_api::{
    transactional, transactional_async, transactional_with_retries, AsyncTransaction,
    AsyncTupleClient, Transactable, Transaction, TupleClient, DEFAULT_RETRIES,
};
