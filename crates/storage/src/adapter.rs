//! The storage adapter contract

use tupledb_core::{KeyValuePair, Result, StorageScanArgs, WriteBatch};

/// A sorted map over tuple keys: the entire interface a backend must
/// provide.
///
/// The engine serializes all calls through its own lock, so
/// implementations need not be internally synchronized; they must only
/// make `commit` atomic with respect to the `scan`s the engine issues
/// around it (trivially true under that lock).
pub trait TupleStorage<V>: Send {
    /// Scan pairs inside `args`, ascending unless `args.reverse`,
    /// honoring `limit`.
    fn scan(&self, args: &StorageScanArgs) -> Result<Vec<KeyValuePair<V>>>;

    /// Apply a batch atomically: removals first, then upserts (the batch
    /// itself carries at most one instruction per key).
    fn commit(&mut self, writes: &WriteBatch<V>) -> Result<()>;

    /// Release resources; subsequent calls fail.
    fn close(&mut self) -> Result<()>;
}
