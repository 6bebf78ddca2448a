//! Buffered-write transactions with read-your-writes overlay
//!
//! A transaction buffers its writes in two key-sorted structures (the
//! same shape as a [`WriteBatch`]) and overlays them on every read, so
//! a transaction always sees storage as if its own writes had already
//! been applied. Nothing touches the engine until `commit`, which
//! submits the batch under the transaction's id for conflict
//! validation.
//!
//! Buffers hold absolute (fully-prefixed) keys. A subspace view shares
//! its parent's buffer and id and only translates keys at the boundary,
//! so writes made through either surface belong to the same commit.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;
use tupledb_core::sorted::{
    pair_get, pair_remove, pair_upsert, sorted_contains, sorted_insert, sorted_remove,
};
use tupledb_core::subspace::{normalize_subspace_scan_args, prepend_prefix, remove_prefix_from_pairs};
use tupledb_core::{Error, KeyValuePair, Result, ScanArgs, Tuple, TxId, WriteBatch};
use tupledb_engine::TupleDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    Canceled,
}

struct TxInner<V> {
    set: Vec<(Tuple, V)>,
    remove: Vec<Tuple>,
    state: TxState,
}

/// A buffered-write session with optimistic conflict detection.
///
/// State machine: `Active` → `Committed` or `Active` → `Canceled`;
/// both terminal. Any call on a closed transaction fails with
/// [`Error::TransactionClosed`]. A commit rejected for a read-write
/// conflict also closes the transaction (its log entries are already
/// released); retry by starting a fresh transaction, or let
/// [`crate::transactional`] do it.
///
/// Transactions are single-owner: share the buffers across threads only
/// through the subspace views, which clone the same shared state.
pub struct Transaction<V> {
    engine: Arc<TupleDatabase<V>>,
    prefix: Tuple,
    id: TxId,
    inner: Arc<Mutex<TxInner<V>>>,
}

impl<V> Clone for Transaction<V> {
    fn clone(&self) -> Self {
        Transaction {
            engine: self.engine.clone(),
            prefix: self.prefix.clone(),
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + Send + 'static> Transaction<V> {
    pub(crate) fn new(engine: Arc<TupleDatabase<V>>, prefix: Tuple, id: TxId) -> Self {
        Transaction {
            engine,
            prefix,
            id,
            inner: Arc::new(Mutex::new(TxInner {
                set: Vec::new(),
                remove: Vec::new(),
                state: TxState::Active,
            })),
        }
    }

    /// This transaction's id.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// True while neither committed nor canceled.
    pub fn is_active(&self) -> bool {
        self.inner.lock().state == TxState::Active
    }

    /// Buffer an upsert of `key` (subspace-relative).
    pub fn set(&self, key: Tuple, value: V) -> Result<()> {
        let full = prepend_prefix(&self.prefix, &key);
        let mut inner = self.inner.lock();
        ensure_active(&inner)?;
        sorted_remove(&mut inner.remove, &full);
        pair_upsert(&mut inner.set, full, value);
        Ok(())
    }

    /// Buffer a removal of `key` (subspace-relative).
    pub fn remove(&self, key: &Tuple) -> Result<()> {
        let full = prepend_prefix(&self.prefix, key);
        let mut inner = self.inner.lock();
        ensure_active(&inner)?;
        pair_remove(&mut inner.set, &full);
        sorted_insert(&mut inner.remove, full);
        Ok(())
    }

    /// Scan with read-your-writes: the engine result (read under this
    /// transaction's id, so the range is recorded for conflict
    /// detection) overlaid with the buffered writes, `reverse` and
    /// `limit` reapplied after the overlay.
    pub fn scan(&self, args: &ScanArgs) -> Result<Vec<KeyValuePair<V>>> {
        ensure_active(&self.inner.lock())?;

        let rebased = normalize_subspace_scan_args(&self.prefix, args);
        // Over-read: the storage cap must not run before the overlay,
        // or a buffered remove inside the window would undercount the
        // merged result. The cap is re-applied below, after the overlay.
        let mut uncapped = rebased.clone();
        uncapped.limit = None;
        let stored = self.engine.scan(&uncapped, Some(self.id))?;

        // Overlay in ascending key order, then re-apply direction and cap
        let mut pairs: Vec<(Tuple, V)> = stored.into_iter().map(|kv| (kv.key, kv.value)).collect();
        if args.reverse {
            pairs.reverse();
        }
        {
            let inner = self.inner.lock();
            for (key, value) in &inner.set {
                if rebased.contains(key) {
                    pair_upsert(&mut pairs, key.clone(), value.clone());
                }
            }
            for key in &inner.remove {
                if rebased.contains(key) {
                    pair_remove(&mut pairs, key);
                }
            }
        }
        if args.reverse {
            pairs.reverse();
        }
        if let Some(limit) = args.limit {
            pairs.truncate(limit);
        }

        let pairs = pairs
            .into_iter()
            .map(|(key, value)| KeyValuePair::new(key, value))
            .collect();
        remove_prefix_from_pairs(&self.prefix, pairs)
    }

    /// The value at exactly `key`, consulting the buffer first: a
    /// buffered set returns its value, a buffered remove returns
    /// `None`, otherwise the engine is read under this transaction's
    /// id.
    pub fn get(&self, key: &Tuple) -> Result<Option<V>> {
        let full = prepend_prefix(&self.prefix, key);
        {
            let inner = self.inner.lock();
            ensure_active(&inner)?;
            if let Some(value) = pair_get(&inner.set, &full) {
                return Ok(Some(value.clone()));
            }
            if sorted_contains(&inner.remove, &full) {
                return Ok(None);
            }
        }
        let mut pairs = self
            .engine
            .scan(&ScanArgs::point(full.clone()), Some(self.id))?;
        match pairs.len() {
            0 => Ok(None),
            1 => Ok(Some(pairs.remove(0).value)),
            found => Err(Error::GetExpectedSingle { key: full, found }),
        }
    }

    /// True when a value exists at exactly `key` (buffer-aware).
    pub fn exists(&self, key: &Tuple) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// A snapshot of the buffered writes, subspace-relative to this
    /// view.
    pub fn pending_writes(&self) -> Result<WriteBatch<V>> {
        let inner = self.inner.lock();
        let strip = |key: &Tuple| {
            key.strip_prefix(&self.prefix).ok_or_else(|| Error::SubspaceMismatch {
                prefix: self.prefix.clone(),
                tuple: key.clone(),
            })
        };
        Ok(WriteBatch {
            set: inner
                .set
                .iter()
                .map(|(k, v)| Ok((strip(k)?, v.clone())))
                .collect::<Result<_>>()?,
            remove: inner.remove.iter().map(strip).collect::<Result<_>>()?,
        })
    }

    /// Submit the buffered batch through the engine under this
    /// transaction's id and close the transaction.
    ///
    /// On a read-write conflict the transaction closes as canceled and
    /// the error propagates; callbacks of intersecting subscriptions
    /// run before a successful commit returns.
    pub fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_active(&inner)?;
        let writes = WriteBatch {
            set: inner.set.clone(),
            remove: inner.remove.clone(),
        };
        match self.engine.commit(&writes, Some(self.id)) {
            Ok(()) => {
                inner.state = TxState::Committed;
                trace!(tx = %self.id, writes = writes.len(), "transaction committed");
                Ok(())
            }
            Err(err) => {
                if err.is_conflict() {
                    inner.state = TxState::Canceled;
                }
                Err(err)
            }
        }
    }

    /// Cancel the transaction, releasing its concurrency-log entries
    /// and discarding the buffer.
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        ensure_active(&inner)?;
        self.engine.cancel(self.id)?;
        inner.state = TxState::Canceled;
        trace!(tx = %self.id, "transaction canceled");
        Ok(())
    }

    /// A view of this transaction one subspace level deeper. The view
    /// shares this transaction's buffer and id; committing either
    /// commits both.
    pub fn subspace(&self, prefix: &Tuple) -> Transaction<V> {
        Transaction {
            engine: self.engine.clone(),
            prefix: prepend_prefix(&self.prefix, prefix),
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

fn ensure_active<V>(inner: &TxInner<V>) -> Result<()> {
    match inner.state {
        TxState::Active => Ok(()),
        TxState::Committed => Err(Error::transaction_closed("committed")),
        TxState::Canceled => Err(Error::transaction_closed("canceled")),
    }
}
