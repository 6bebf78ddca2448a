//! Atomic write batches
//!
//! A batch is two key-sorted sides, `set` pairs and `remove` tuples,
//! with at most one entry per key across both. Setting a key cancels a
//! pending remove of the same key and vice-versa, so a batch is always a
//! well-formed instruction: per key, either "ends up with this value" or
//! "ends up absent".

use crate::sorted::{pair_remove, pair_upsert, sorted_insert, sorted_remove};
use crate::tuple::Tuple;
use serde::{Deserialize, Serialize};

/// An atomic batch of writes: upserts plus removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch<V> {
    /// Key-sorted pairs to upsert
    pub set: Vec<(Tuple, V)>,
    /// Key-sorted tuples to remove
    pub remove: Vec<Tuple>,
}

impl<V> WriteBatch<V> {
    /// An empty batch.
    pub fn new() -> Self {
        WriteBatch {
            set: Vec::new(),
            remove: Vec::new(),
        }
    }

    /// Buffer an upsert of `key`, canceling any pending remove of it.
    pub fn set(&mut self, key: Tuple, value: V) {
        sorted_remove(&mut self.remove, &key);
        pair_upsert(&mut self.set, key, value);
    }

    /// Buffer a removal of `key`, canceling any pending set of it.
    pub fn remove(&mut self, key: Tuple) {
        pair_remove(&mut self.set, &key);
        sorted_insert(&mut self.remove, key);
    }

    /// Chainable [`WriteBatch::set`], for building fixtures.
    pub fn with_set(mut self, key: Tuple, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Chainable [`WriteBatch::remove`].
    pub fn with_remove(mut self, key: Tuple) -> Self {
        self.remove(key);
        self
    }

    /// Total number of buffered writes across both sides.
    pub fn len(&self) -> usize {
        self.set.len() + self.remove.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Every key touched by this batch (set keys, then removed keys).
    pub fn keys(&self) -> impl Iterator<Item = &Tuple> {
        self.set.iter().map(|(k, _)| k).chain(self.remove.iter())
    }
}

impl<V> Default for WriteBatch<V> {
    fn default() -> Self {
        WriteBatch::new()
    }
}
