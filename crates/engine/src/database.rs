//! The synchronous engine
//!
//! One lock guards storage plus the concurrency log, so every engine
//! operation is atomic with respect to every other. The reactivity
//! registry carries its own lock; commit computes the fan-out buckets
//! while holding the state lock (so emits observe a consistent commit
//! order) and invokes the callbacks after releasing it (so a callback
//! may call back into the engine without deadlocking).

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace};
use tupledb_concurrency::ConcurrencyLog;
use tupledb_core::{Error, KeyValuePair, Result, ScanArgs, TxId, WriteBatch};
use tupledb_reactivity::{Callback, ReactivityTracker, Subscription};
use tupledb_storage::{InMemoryStorage, TupleStorage};

struct EngineState<V> {
    storage: Box<dyn TupleStorage<V>>,
    log: ConcurrencyLog,
    closed: bool,
}

/// The transactional, reactive tuple database engine.
///
/// Cheap to share: wrap it in an [`Arc`] and hand clones to any number
/// of clients. All methods take `&self`.
pub struct TupleDatabase<V> {
    state: Mutex<EngineState<V>>,
    reactivity: ReactivityTracker<V>,
}

impl<V: Clone + Send + 'static> TupleDatabase<V> {
    /// Open an engine over the given storage backend.
    pub fn new(storage: Box<dyn TupleStorage<V>>) -> Self {
        info!("tuple database opened");
        TupleDatabase {
            state: Mutex::new(EngineState {
                storage,
                log: ConcurrencyLog::new(),
                closed: false,
            }),
            reactivity: ReactivityTracker::new(),
        }
    }

    /// Open an engine over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        TupleDatabase::new(Box::new(InMemoryStorage::new()))
    }

    /// Scan pairs inside `args`. With a transaction id the read is
    /// recorded in the concurrency log before results are returned, so
    /// a later conflicting write is caught at that transaction's commit.
    pub fn scan(&self, args: &ScanArgs, tx_id: Option<TxId>) -> Result<Vec<KeyValuePair<V>>> {
        let mut state = self.state.lock();
        ensure_open(&state)?;
        let bounds = args.normalized();
        if let Some(tx) = tx_id {
            state.log.read(tx, bounds.clone());
        }
        let result = state.storage.scan(&bounds)?;
        trace!(pairs = result.len(), tx = ?tx_id, "scan");
        Ok(result)
    }

    /// Commit a batch atomically.
    ///
    /// With a transaction id, each write is recorded and the concurrency
    /// log validates the transaction first; a conflicting transaction is
    /// settled (its log entries released) and `ReadWriteConflict` is
    /// returned without touching storage. On success the batch is
    /// applied and every intersecting listener is notified exactly once
    /// before this call returns.
    pub fn commit(&self, writes: &WriteBatch<V>, tx_id: Option<TxId>) -> Result<()> {
        let emits = {
            let mut state = self.state.lock();
            ensure_open(&state)?;

            if let Some(tx) = tx_id {
                for key in writes.keys() {
                    state.log.write(tx, key.clone());
                }
                if let Err(err) = state.log.commit(tx) {
                    state.log.cancel(tx);
                    return Err(err);
                }
            }

            state.storage.commit(writes)?;
            let emits = self.reactivity.compute_emits(writes);
            debug!(
                set = writes.set.len(),
                removed = writes.remove.len(),
                listeners = emits.len(),
                tx = ?tx_id,
                "commit applied"
            );
            emits
        };

        for (callback, bucket) in emits {
            callback(&bucket);
        }
        Ok(())
    }

    /// Cancel a transaction, releasing its concurrency-log entries.
    pub fn cancel(&self, tx_id: TxId) -> Result<()> {
        let mut state = self.state.lock();
        ensure_open(&state)?;
        state.log.cancel(tx_id);
        trace!(tx = %tx_id, "transaction canceled");
        Ok(())
    }

    /// Register a listener for writes intersecting `args`.
    pub fn subscribe(&self, args: &ScanArgs, callback: Callback<V>) -> Subscription {
        self.reactivity.subscribe(args, callback)
    }

    /// Close the engine and its storage backend.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.storage.close()?;
        state.closed = true;
        info!("tuple database closed");
        Ok(())
    }

    /// Number of entries currently held by the concurrency log.
    /// Diagnostic; useful for asserting cleanup in tests.
    pub fn concurrency_log_len(&self) -> usize {
        self.state.lock().log.len()
    }
}

impl<V: Clone + Send + 'static> Default for TupleDatabase<V> {
    fn default() -> Self {
        TupleDatabase::in_memory()
    }
}

fn ensure_open<V>(state: &EngineState<V>) -> Result<()> {
    if state.closed {
        Err(Error::storage("engine is closed"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as TestMutex;
    use tupledb_core::{tuple, Value};

    fn engine() -> TupleDatabase<i64> {
        TupleDatabase::in_memory()
    }

    fn score_bounds() -> ScanArgs {
        ScanArgs {
            gt: Some(tuple!["score"]),
            lte: Some(tuple!["score"].extended([Value::Max])),
            ..Default::default()
        }
    }

    // === Scan and commit ===

    #[test]
    fn test_commit_then_scan() {
        let db = engine();
        db.commit(
            &WriteBatch::new()
                .with_set(tuple!["score", "chet"], 2)
                .with_set(tuple!["score", "meghan"], 1),
            None,
        )
        .unwrap();

        let result = db.scan(&score_bounds(), None).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].key, tuple!["score", "chet"]);
    }

    #[test]
    fn test_scan_with_prefix_args() {
        let db = engine();
        db.commit(
            &WriteBatch::new()
                .with_set(tuple!["game", "g1", "total"], 3)
                .with_set(tuple!["game", "g2", "total"], 4)
                .with_set(tuple!["other"], 0),
            None,
        )
        .unwrap();

        let result = db
            .scan(&ScanArgs::for_prefix(tuple!["game", "g1"]), None)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, 3);
    }

    // === Conflicts ===

    #[test]
    fn test_conflicting_commit_rejected() {
        let db = engine();
        let t1 = TxId::new();
        let t2 = TxId::new();

        db.scan(&score_bounds(), Some(t1)).unwrap();
        db.commit(
            &WriteBatch::new().with_set(tuple!["score", "chet"], 5),
            Some(t2),
        )
        .unwrap();

        let err = db
            .commit(&WriteBatch::new().with_set(tuple!["total"], 3), Some(t1))
            .unwrap_err();
        assert!(err.is_conflict());
        // The failed transaction's entries were released
        db.commit(&WriteBatch::new().with_set(tuple!["unrelated"], 1), None)
            .unwrap();
        assert_eq!(db.concurrency_log_len(), 0);
    }

    #[test]
    fn test_conflicting_commit_leaves_storage_unchanged() {
        let db = engine();
        let t1 = TxId::new();
        let t2 = TxId::new();

        db.scan(&score_bounds(), Some(t1)).unwrap();
        db.commit(
            &WriteBatch::new().with_set(tuple!["score", "chet"], 5),
            Some(t2),
        )
        .unwrap();
        let _ = db.commit(&WriteBatch::new().with_set(tuple!["total"], 3), Some(t1));

        assert!(db.scan(&ScanArgs::point(tuple!["total"]), None).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_releases_reads() {
        let db = engine();
        let t1 = TxId::new();
        let t2 = TxId::new();

        db.scan(&score_bounds(), Some(t1)).unwrap();
        db.cancel(t1).unwrap();

        // t2 can now write into the range t1 had read, and a later
        // commit citing t1 sees nothing stale either.
        db.commit(
            &WriteBatch::new().with_set(tuple!["score", "chet"], 5),
            Some(t2),
        )
        .unwrap();
        assert_eq!(db.concurrency_log_len(), 0);
    }

    // === Reactivity ===

    #[test]
    fn test_commit_notifies_intersecting_listener() {
        let db = engine();
        let received = Arc::new(TestMutex::new(Vec::new()));
        let sink = received.clone();
        let _sub = db.subscribe(
            &score_bounds(),
            Arc::new(move |batch: &WriteBatch<i64>| sink.lock().push(batch.clone())),
        );

        db.commit(
            &WriteBatch::new().with_set(tuple!["score", "chet"], 2),
            None,
        )
        .unwrap();

        let got = received.lock();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].set, vec![(tuple!["score", "chet"], 2)]);
    }

    #[test]
    fn test_callback_may_reenter_engine() {
        let db = Arc::new(engine());
        let reentrant = db.clone();
        let observed = Arc::new(TestMutex::new(None));
        let sink = observed.clone();
        let _sub = db.subscribe(
            &ScanArgs::for_prefix(tuple!["in"]),
            Arc::new(move |_batch: &WriteBatch<i64>| {
                // Reads from inside a notification must not deadlock
                let n = reentrant.scan(&ScanArgs::all(), None).unwrap().len();
                *sink.lock() = Some(n);
            }),
        );

        db.commit(&WriteBatch::new().with_set(tuple!["in", "k"], 1), None)
            .unwrap();
        assert_eq!(*observed.lock(), Some(1));
    }

    #[test]
    fn test_unsubscribed_listener_not_notified() {
        let db = engine();
        let received = Arc::new(TestMutex::new(0_usize));
        let sink = received.clone();
        let sub = db.subscribe(
            &score_bounds(),
            Arc::new(move |_batch: &WriteBatch<i64>| *sink.lock() += 1),
        );
        sub.unsubscribe();

        db.commit(
            &WriteBatch::new().with_set(tuple!["score", "chet"], 2),
            None,
        )
        .unwrap();
        assert_eq!(*received.lock(), 0);
    }

    // === Close ===

    #[test]
    fn test_closed_engine_rejects_operations() {
        let db = engine();
        db.close().unwrap();
        assert!(db.scan(&ScanArgs::all(), None).is_err());
        assert!(db
            .commit(&WriteBatch::new().with_set(tuple!["k"], 1), None)
            .is_err());
        // Closing twice is fine
        db.close().unwrap();
    }
}
