//! Cooperative flavor of the client layer
//!
//! Same semantics as [`crate::TupleClient`] / [`crate::Transaction`],
//! with a suspension point at every operation that reaches the engine.
//! Buffer-only operations (`set`, `remove`) stay synchronous; they
//! touch local state and never suspend. Subscriptions surface as a
//! channel, the push-capable transport this flavor assumes.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use tupledb_core::subspace::{normalize_subspace_scan_args, remove_prefix_from_writes};
use tupledb_core::{Error, KeyValuePair, Result, ScanArgs, Tuple, TxId, WriteBatch};
use tupledb_engine::{AsyncTupleDatabase, Subscription};

use crate::client::TupleClient;
use crate::retry::DEFAULT_RETRIES;
use crate::transaction::Transaction;

/// Async façade over a [`TupleClient`].
pub struct AsyncTupleClient<V> {
    inner: TupleClient<V>,
}

impl<V> Clone for AsyncTupleClient<V> {
    fn clone(&self) -> Self {
        AsyncTupleClient {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> AsyncTupleClient<V> {
    /// Wrap an async engine in a root client.
    pub fn new(db: &AsyncTupleDatabase<V>) -> Self {
        AsyncTupleClient {
            inner: TupleClient::new(db.inner().clone()),
        }
    }

    /// A root client over a fresh in-memory engine.
    pub fn in_memory() -> Self {
        AsyncTupleClient {
            inner: TupleClient::in_memory(),
        }
    }

    /// The synchronous client underneath.
    pub fn sync(&self) -> &TupleClient<V> {
        &self.inner
    }

    /// A client scoped one level deeper; see [`TupleClient::subspace`].
    pub fn subspace(&self, prefix: &Tuple) -> AsyncTupleClient<V> {
        AsyncTupleClient {
            inner: self.inner.subspace(prefix),
        }
    }

    /// Scan pairs inside `args`; see [`TupleClient::scan`].
    pub async fn scan(&self, args: &ScanArgs) -> Result<Vec<KeyValuePair<V>>> {
        let client = self.inner.clone();
        let args = args.clone();
        run_blocking(move || client.scan(&args)).await
    }

    /// Point read; see [`TupleClient::get`].
    pub async fn get(&self, key: &Tuple) -> Result<Option<V>> {
        let client = self.inner.clone();
        let key = key.clone();
        run_blocking(move || client.get(&key)).await
    }

    /// Point existence check; see [`TupleClient::exists`].
    pub async fn exists(&self, key: &Tuple) -> Result<bool> {
        let client = self.inner.clone();
        let key = key.clone();
        run_blocking(move || client.exists(&key)).await
    }

    /// Register a listener; notifications arrive on the returned
    /// channel with subspace prefixes stripped.
    pub async fn subscribe(
        &self,
        args: &ScanArgs,
    ) -> (Subscription, mpsc::UnboundedReceiver<WriteBatch<V>>) {
        let rebased = normalize_subspace_scan_args(self.inner.prefix(), args);
        let prefix = self.inner.prefix().clone();
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.inner.engine().subscribe(
            &rebased,
            Arc::new(move |batch: &WriteBatch<V>| {
                if let Ok(scoped) = remove_prefix_from_writes(&prefix, batch) {
                    let _ = sender.send(scoped);
                }
            }),
        );
        (subscription, receiver)
    }

    /// Commit a batch without a transaction; see
    /// [`TupleClient::commit`].
    pub async fn commit(&self, writes: &WriteBatch<V>) -> Result<()> {
        let client = self.inner.clone();
        let writes = writes.clone();
        run_blocking(move || client.commit(&writes)).await
    }

    /// Cancel a transaction by id.
    pub async fn cancel(&self, tx_id: TxId) -> Result<()> {
        let client = self.inner.clone();
        run_blocking(move || client.cancel(tx_id)).await
    }

    /// Start a buffered-write transaction.
    pub fn transact(&self) -> AsyncTransaction<V> {
        AsyncTransaction {
            inner: self.inner.transact(),
        }
    }

    /// Start a transaction under a caller-chosen id.
    pub fn transact_with_id(&self, tx_id: TxId) -> AsyncTransaction<V> {
        AsyncTransaction {
            inner: self.inner.transact_with_id(tx_id),
        }
    }

    /// Close the underlying engine.
    pub async fn close(&self) -> Result<()> {
        let client = self.inner.clone();
        run_blocking(move || client.close()).await
    }
}

/// Async façade over a [`Transaction`]; shares the same buffer rules.
pub struct AsyncTransaction<V> {
    inner: Transaction<V>,
}

impl<V> Clone for AsyncTransaction<V> {
    fn clone(&self) -> Self {
        AsyncTransaction {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> AsyncTransaction<V> {
    /// This transaction's id.
    pub fn id(&self) -> TxId {
        self.inner.id()
    }

    /// True while neither committed nor canceled.
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Buffer an upsert. Local; does not suspend.
    pub fn set(&self, key: Tuple, value: V) -> Result<()> {
        self.inner.set(key, value)
    }

    /// Buffer a removal. Local; does not suspend.
    pub fn remove(&self, key: &Tuple) -> Result<()> {
        self.inner.remove(key)
    }

    /// Read-your-writes scan; see [`Transaction::scan`].
    pub async fn scan(&self, args: &ScanArgs) -> Result<Vec<KeyValuePair<V>>> {
        let tx = self.inner.clone();
        let args = args.clone();
        run_blocking(move || tx.scan(&args)).await
    }

    /// Buffer-aware point read; see [`Transaction::get`].
    pub async fn get(&self, key: &Tuple) -> Result<Option<V>> {
        let tx = self.inner.clone();
        let key = key.clone();
        run_blocking(move || tx.get(&key)).await
    }

    /// Buffer-aware existence check.
    pub async fn exists(&self, key: &Tuple) -> Result<bool> {
        let tx = self.inner.clone();
        let key = key.clone();
        run_blocking(move || tx.exists(&key)).await
    }

    /// Commit the buffered batch; see [`Transaction::commit`].
    pub async fn commit(&self) -> Result<()> {
        let tx = self.inner.clone();
        run_blocking(move || tx.commit()).await
    }

    /// Cancel the transaction; see [`Transaction::cancel`].
    pub async fn cancel(&self) -> Result<()> {
        let tx = self.inner.clone();
        run_blocking(move || tx.cancel()).await
    }

    /// A view one subspace level deeper, sharing buffer and id.
    pub fn subspace(&self, prefix: &Tuple) -> AsyncTransaction<V> {
        AsyncTransaction {
            inner: self.inner.subspace(prefix),
        }
    }
}

/// Async twin of [`crate::transactional`]: run `f` in a fresh
/// transaction per attempt, retrying only on read-write conflict, up to
/// the default budget.
///
/// To compose with an existing [`AsyncTransaction`], call `f` with it
/// directly; commit and retry stay with whoever started the
/// transaction.
pub async fn transactional_async<V, T, F, Fut>(client: &AsyncTupleClient<V>, f: F) -> Result<T>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(AsyncTransaction<V>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_conflict = None;
    for attempt in 0..DEFAULT_RETRIES {
        let tx = client.transact();
        let result = match f(tx.clone()).await {
            Ok(result) => result,
            Err(err) => {
                let _ = tx.cancel().await;
                return Err(err);
            }
        };
        match tx.commit().await {
            Ok(()) => return Ok(result),
            Err(err) if err.is_conflict() => {
                debug!(attempt, %err, "conflict, retrying");
                last_conflict = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_conflict.unwrap_or_else(|| Error::storage("retry loop exited without attempts")))
}

async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> Result<T> + Send + 'static,
) -> Result<T> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|join| Error::storage(format!("client task failed: {join}")))?
}
