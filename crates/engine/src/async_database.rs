//! The cooperative engine flavor
//!
//! A thin façade over the synchronous engine: every operation that
//! touches engine state is an `async fn` that suspends while the work
//! runs on the blocking pool, and subscriptions are delivered over a
//! push-capable channel instead of a synchronous callback. Semantics
//! are identical to [`crate::TupleDatabase`]; this type adds a
//! suspension point, never a behavior.

use std::sync::Arc;
use tokio::sync::mpsc;
use tupledb_core::{Error, KeyValuePair, Result, ScanArgs, TxId, WriteBatch};
use tupledb_reactivity::Subscription;

use crate::database::TupleDatabase;

/// Async façade over a shared synchronous engine.
#[derive(Clone)]
pub struct AsyncTupleDatabase<V> {
    inner: Arc<TupleDatabase<V>>,
}

impl<V: Clone + Send + Sync + 'static> AsyncTupleDatabase<V> {
    /// Wrap an existing engine.
    pub fn new(inner: Arc<TupleDatabase<V>>) -> Self {
        AsyncTupleDatabase { inner }
    }

    /// Open an async engine over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        AsyncTupleDatabase::new(Arc::new(TupleDatabase::in_memory()))
    }

    /// The underlying synchronous engine.
    pub fn inner(&self) -> &Arc<TupleDatabase<V>> {
        &self.inner
    }

    /// Scan pairs inside `args`; see [`TupleDatabase::scan`].
    pub async fn scan(
        &self,
        args: &ScanArgs,
        tx_id: Option<TxId>,
    ) -> Result<Vec<KeyValuePair<V>>> {
        let db = self.inner.clone();
        let args = args.clone();
        run_blocking(move || db.scan(&args, tx_id)).await
    }

    /// Commit a batch; see [`TupleDatabase::commit`]. Channel-backed
    /// subscribers have their notifications queued before this returns.
    pub async fn commit(&self, writes: &WriteBatch<V>, tx_id: Option<TxId>) -> Result<()> {
        let db = self.inner.clone();
        let writes = writes.clone();
        run_blocking(move || db.commit(&writes, tx_id)).await
    }

    /// Cancel a transaction; see [`TupleDatabase::cancel`].
    pub async fn cancel(&self, tx_id: TxId) -> Result<()> {
        let db = self.inner.clone();
        run_blocking(move || db.cancel(tx_id)).await
    }

    /// Register a listener for writes intersecting `args`.
    ///
    /// Notifications arrive on the returned channel (the push-capable
    /// transport of this flavor). Dropping the receiver discards
    /// further notifications; call [`Subscription::unsubscribe`] to
    /// deregister.
    pub async fn subscribe(
        &self,
        args: &ScanArgs,
    ) -> (Subscription, mpsc::UnboundedReceiver<WriteBatch<V>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.inner.subscribe(
            args,
            Arc::new(move |batch: &WriteBatch<V>| {
                let _ = sender.send(batch.clone());
            }),
        );
        (subscription, receiver)
    }

    /// Close the engine; see [`TupleDatabase::close`].
    pub async fn close(&self) -> Result<()> {
        let db = self.inner.clone();
        run_blocking(move || db.close()).await
    }
}

async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> Result<T> + Send + 'static,
) -> Result<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join| Error::storage(format!("engine task failed: {join}")))?
}
