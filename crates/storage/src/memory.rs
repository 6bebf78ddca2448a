//! In-memory reference backend
//!
//! A key-sorted vector of pairs; every operation is one binary search
//! plus a splice. This is the backend the engine opens by default and
//! the one the test suites run against.

use crate::adapter::TupleStorage;
use tupledb_core::sorted::{pair_remove, pair_upsert, scan_pairs};
use tupledb_core::{Error, KeyValuePair, Result, StorageScanArgs, Tuple, WriteBatch};

/// Sorted-vector storage backend.
#[derive(Debug, Clone)]
pub struct InMemoryStorage<V> {
    pairs: Vec<(Tuple, V)>,
    closed: bool,
}

impl<V> InMemoryStorage<V> {
    /// An empty store.
    pub fn new() -> Self {
        InMemoryStorage {
            pairs: Vec::new(),
            closed: false,
        }
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::storage("in-memory store is closed"))
        } else {
            Ok(())
        }
    }
}

impl<V> Default for InMemoryStorage<V> {
    fn default() -> Self {
        InMemoryStorage::new()
    }
}

impl<V: Clone + Send> TupleStorage<V> for InMemoryStorage<V> {
    fn scan(&self, args: &StorageScanArgs) -> Result<Vec<KeyValuePair<V>>> {
        self.ensure_open()?;
        Ok(scan_pairs(&self.pairs, args))
    }

    fn commit(&mut self, writes: &WriteBatch<V>) -> Result<()> {
        self.ensure_open()?;
        for key in &writes.remove {
            pair_remove(&mut self.pairs, key);
        }
        for (key, value) in &writes.set {
            pair_upsert(&mut self.pairs, key.clone(), value.clone());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.pairs.clear();
        self.closed = true;
        Ok(())
    }
}
