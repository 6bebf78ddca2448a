//! The subspace-scoped client façade

use std::sync::Arc;
use tracing::warn;
use tupledb_core::subspace::{
    normalize_subspace_scan_args, prepend_prefix, prepend_prefix_to_writes,
    remove_prefix_from_pairs, remove_prefix_from_writes,
};
use tupledb_core::{Error, KeyValuePair, Result, ScanArgs, Tuple, TxId, WriteBatch};
use tupledb_engine::{Subscription, TupleDatabase};

use crate::transaction::Transaction;

/// A view over an engine where every key is transparently prefixed by
/// an immutable subspace tuple.
///
/// Clients are cheap to clone and to derive: [`TupleClient::subspace`]
/// returns a new client with an extended prefix and never mutates its
/// parent.
///
/// ```
/// use tupledb_api::TupleClient;
/// use tupledb_core::tuple;
///
/// let client: TupleClient<i64> = TupleClient::in_memory();
/// let game = client.subspace(&tuple!["game", "g1"]);
///
/// let tx = game.transact();
/// tx.set(tuple!["total"], 3).unwrap();
/// tx.commit().unwrap();
///
/// // The root client sees the fully-prefixed key
/// assert_eq!(client.get(&tuple!["game", "g1", "total"]).unwrap(), Some(3));
/// ```
pub struct TupleClient<V> {
    engine: Arc<TupleDatabase<V>>,
    prefix: Tuple,
}

impl<V> Clone for TupleClient<V> {
    fn clone(&self) -> Self {
        TupleClient {
            engine: self.engine.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

impl<V: Clone + Send + 'static> TupleClient<V> {
    /// A root client (empty prefix) over the given engine.
    pub fn new(engine: Arc<TupleDatabase<V>>) -> Self {
        TupleClient {
            engine,
            prefix: Tuple::new(),
        }
    }

    /// A root client over a fresh in-memory engine.
    pub fn in_memory() -> Self {
        TupleClient::new(Arc::new(TupleDatabase::in_memory()))
    }

    /// The subspace prefix this client applies.
    pub fn prefix(&self) -> &Tuple {
        &self.prefix
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<TupleDatabase<V>> {
        &self.engine
    }

    /// A client scoped one level deeper: its prefix is this client's
    /// prefix extended by `prefix`.
    pub fn subspace(&self, prefix: &Tuple) -> TupleClient<V> {
        TupleClient {
            engine: self.engine.clone(),
            prefix: prepend_prefix(&self.prefix, prefix),
        }
    }

    /// Scan pairs inside `args` (subspace-relative); results come back
    /// with the prefix stripped.
    pub fn scan(&self, args: &ScanArgs) -> Result<Vec<KeyValuePair<V>>> {
        let rebased = normalize_subspace_scan_args(&self.prefix, args);
        let pairs = self.engine.scan(&rebased, None)?;
        remove_prefix_from_pairs(&self.prefix, pairs)
    }

    /// The value at exactly `key`, or `None`. More than one value at a
    /// single-tuple range is a writer bug and fails with
    /// [`Error::GetExpectedSingle`].
    pub fn get(&self, key: &Tuple) -> Result<Option<V>> {
        let mut pairs = self.scan(&ScanArgs::point(key.clone()))?;
        match pairs.len() {
            0 => Ok(None),
            1 => Ok(Some(pairs.remove(0).value)),
            found => Err(Error::GetExpectedSingle {
                key: key.clone(),
                found,
            }),
        }
    }

    /// True when a value exists at exactly `key`.
    pub fn exists(&self, key: &Tuple) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Register a listener for writes intersecting `args`
    /// (subspace-relative). Notified batches have the prefix stripped.
    pub fn subscribe(
        &self,
        args: &ScanArgs,
        callback: impl Fn(&WriteBatch<V>) + Send + Sync + 'static,
    ) -> Subscription {
        let rebased = normalize_subspace_scan_args(&self.prefix, args);
        let prefix = self.prefix.clone();
        self.engine.subscribe(
            &rebased,
            Arc::new(move |batch: &WriteBatch<V>| {
                match remove_prefix_from_writes(&prefix, batch) {
                    Ok(scoped) => callback(&scoped),
                    // Bounds live inside the subspace, so every emitted
                    // key extends the prefix; anything else is a bug.
                    Err(err) => warn!(%err, "dropping notification outside subspace"),
                }
            }),
        )
    }

    /// Commit a batch (subspace-relative keys) without a transaction.
    pub fn commit(&self, writes: &WriteBatch<V>) -> Result<()> {
        self.engine
            .commit(&prepend_prefix_to_writes(&self.prefix, writes), None)
    }

    /// Cancel a transaction by id, releasing its concurrency-log
    /// entries.
    pub fn cancel(&self, tx_id: TxId) -> Result<()> {
        self.engine.cancel(tx_id)
    }

    /// Start a buffered-write transaction scoped to this client's
    /// subspace.
    pub fn transact(&self) -> Transaction<V> {
        self.transact_with_id(TxId::new())
    }

    /// Start a transaction under a caller-chosen id.
    pub fn transact_with_id(&self, tx_id: TxId) -> Transaction<V> {
        Transaction::new(self.engine.clone(), self.prefix.clone(), tx_id)
    }

    /// Close the underlying engine.
    pub fn close(&self) -> Result<()> {
        self.engine.close()
    }
}
