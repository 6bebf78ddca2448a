//! Core data model for tupledb
//!
//! This crate defines everything the engine, storage backends, and the
//! client layer agree on:
//! - `Value` / `Tuple`: typed composite keys with a total order
//! - `codec`: order-preserving byte encoding for byte-keyed backends
//! - `sorted`: binary-search primitives over sorted tuple arrays
//! - `bounds`: range expressions (`ScanArgs`) and their normalization
//! - `subspace`: prefix prepend/strip for tuples, bounds, and batches
//! - `writes`: atomic write batches (`set` + `remove`)
//! - `error`: the unified error type
//!
//! Everything here is pure data plus pure functions; no locks, no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounds;
pub mod codec;
pub mod error;
pub mod id;
pub mod sorted;
pub mod subspace;
pub mod tuple;
pub mod value;
pub mod writes;

pub use bounds::{ScanArgs, StorageScanArgs};
pub use codec::{decode_tuple, encode_tuple, DecodeError};
pub use error::{Error, Result};
pub use id::{ListenerId, TxId};
pub use sorted::SearchResult;
pub use tuple::{KeyValuePair, Tuple};
pub use value::Value;
pub use writes::WriteBatch;
