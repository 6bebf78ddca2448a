//! The append-only read/write log
//!
//! Append order is the happens-before order the engine witnessed. A
//! conflict exists for a committing transaction when some *other*
//! transaction's write landed after one of its reads and inside that
//! read's bounds: first-committer-wins over range read sets.
//!
//! Entry lifetimes: a transaction's read entries are removed when it
//! commits or cancels. Write entries must outlive their own
//! transaction's commit (a concurrent reader that started earlier still
//! needs to see them to detect its conflict) and are garbage-collected
//! once no live read predates them.

use tracing::trace;
use tupledb_core::{Error, Result, StorageScanArgs, Tuple, TxId};

/// One record in the concurrency log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A range read by `tx` (bounds as handed to storage)
    Read {
        /// The reading transaction
        tx: TxId,
        /// The bounds the read covered
        bounds: StorageScanArgs,
    },
    /// A single-key write by `tx`
    Write {
        /// The writing transaction
        tx: TxId,
        /// The written key
        key: Tuple,
    },
}

impl LogEntry {
    fn tx(&self) -> TxId {
        match self {
            LogEntry::Read { tx, .. } | LogEntry::Write { tx, .. } => *tx,
        }
    }

    fn is_read(&self) -> bool {
        matches!(self, LogEntry::Read { .. })
    }
}

/// Time-ordered log of reads and writes by live transactions.
#[derive(Debug, Default)]
pub struct ConcurrencyLog {
    entries: Vec<LogEntry>,
}

impl ConcurrencyLog {
    /// An empty log.
    pub fn new() -> Self {
        ConcurrencyLog::default()
    }

    /// Record a range read.
    pub fn read(&mut self, tx: TxId, bounds: StorageScanArgs) {
        self.entries.push(LogEntry::Read { tx, bounds });
    }

    /// Record a single-key write.
    pub fn write(&mut self, tx: TxId, key: Tuple) {
        self.entries.push(LogEntry::Write { tx, key });
    }

    /// Validate and settle a committing transaction.
    ///
    /// Fails with [`Error::ReadWriteConflict`] when another
    /// transaction's write appears after one of `tx`'s reads and inside
    /// that read's bounds. On success, removes `tx`'s read entries and
    /// garbage-collects writes no live read predates. On conflict the
    /// log is left untouched; the engine settles the dead transaction
    /// via [`ConcurrencyLog::cancel`].
    pub fn commit(&mut self, tx: TxId) -> Result<()> {
        let reads: Vec<(usize, &StorageScanArgs)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                LogEntry::Read { tx: reader, bounds } if *reader == tx => Some((i, bounds)),
                _ => None,
            })
            .collect();

        for (j, entry) in self.entries.iter().enumerate() {
            let LogEntry::Write { tx: writer, key } = entry else {
                continue;
            };
            if *writer == tx {
                continue;
            }
            if reads.iter().any(|(i, bounds)| *i < j && bounds.contains(key)) {
                trace!(tx = %tx, key = ?key, "commit rejected");
                return Err(Error::conflict(tx));
            }
        }

        self.entries.retain(|e| !(e.is_read() && e.tx() == tx));
        self.collect_garbage();
        Ok(())
    }

    /// Drop every entry belonging to `tx`, then garbage-collect.
    pub fn cancel(&mut self, tx: TxId) {
        self.entries.retain(|e| e.tx() != tx);
        self.collect_garbage();
    }

    /// Writes before the oldest remaining read can no longer conflict
    /// with anyone; everything before the first read entry is writes, so
    /// the prefix drains wholesale.
    fn collect_garbage(&mut self) {
        match self.entries.iter().position(LogEntry::is_read) {
            Some(first_read) => {
                self.entries.drain(..first_read);
            }
            None => self.entries.clear(),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tupledb_core::{tuple, Value};

    fn score_bounds() -> StorageScanArgs {
        StorageScanArgs {
            gt: Some(tuple!["score"]),
            lte: Some(tuple!["score"].extended([Value::Max])),
            ..Default::default()
        }
    }

    // === Conflict detection ===

    #[test]
    fn test_write_after_read_inside_bounds_conflicts() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t2, tuple!["score", "chet"]);
        log.commit(t2).unwrap();

        log.write(t1, tuple!["total"]);
        let err = log.commit(t1).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_write_outside_bounds_does_not_conflict() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t2, tuple!["settings", "theme"]);
        log.commit(t2).unwrap();

        log.write(t1, tuple!["total"]);
        log.commit(t1).unwrap();
    }

    #[test]
    fn test_write_before_read_does_not_conflict() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        // t2's write precedes t1's read in log order: t1 saw it.
        log.write(t2, tuple!["score", "chet"]);
        log.read(t1, score_bounds());
        log.commit(t2).unwrap();
        log.commit(t1).unwrap();
    }

    #[test]
    fn test_own_writes_do_not_conflict() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t1, tuple!["score", "self"]);
        log.commit(t1).unwrap();
    }

    #[test]
    fn test_disjoint_transactions_both_commit() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(
            t1,
            StorageScanArgs {
                lt: Some(tuple!["m"]),
                ..Default::default()
            },
        );
        log.read(
            t2,
            StorageScanArgs {
                gte: Some(tuple!["m"]),
                ..Default::default()
            },
        );
        log.write(t1, tuple!["z", "t1"]);
        log.commit(t1).unwrap();
        log.write(t2, tuple!["a", "t2"]);
        log.commit(t2).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_conflict_leaves_log_untouched_until_cancel() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t2, tuple!["score", "chet"]);
        log.commit(t2).unwrap();
        log.write(t1, tuple!["total"]);
        let before = log.len();
        assert!(log.commit(t1).is_err());
        assert_eq!(log.len(), before);

        log.cancel(t1);
        assert!(log.is_empty());
    }

    // === Lifecycle and GC ===

    #[test]
    fn test_cancel_removes_all_entries_for_tx() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        log.read(t1, score_bounds());
        log.write(t1, tuple!["k"]);
        log.cancel(t1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_committed_writes_survive_while_older_read_lives() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t2, tuple!["score", "chet"]);
        log.commit(t2).unwrap();

        // t2 is gone but its write must still be visible to t1's commit
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_gc_drops_writes_once_last_read_settles() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();

        log.read(t1, score_bounds());
        log.write(t2, tuple!["elsewhere"]);
        log.commit(t2).unwrap();
        assert_eq!(log.len(), 2);

        log.write(t1, tuple!["total"]);
        log.commit(t1).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_gc_keeps_writes_after_surviving_read() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        let t2 = TxId::new();
        let t3 = TxId::new();

        log.write(t1, tuple!["w1"]);
        log.commit(t1).unwrap();
        // No reads live: t1's write is collected immediately
        assert!(log.is_empty());

        log.read(t2, score_bounds());
        log.write(t3, tuple!["w3"]);
        log.commit(t3).unwrap();
        // t2's read predates t3's write: the write survives
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_commit_of_readonly_transaction() {
        let mut log = ConcurrencyLog::new();
        let t1 = TxId::new();
        log.read(t1, score_bounds());
        log.commit(t1).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_commit_unknown_tx_is_noop_success() {
        let mut log = ConcurrencyLog::new();
        log.commit(TxId::new()).unwrap();
        assert!(log.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Step {
            Read,
            Write,
            Commit,
        }

        fn plan() -> Vec<Step> {
            vec![Step::Read, Step::Write, Step::Commit]
        }

        proptest! {
            // Two transactions over disjoint ranges commit regardless of
            // how their reads, writes, and commits interleave.
            #[test]
            fn prop_disjoint_transactions_always_commit(order in prop::collection::vec(any::<bool>(), 16)) {
                let mut log = ConcurrencyLog::new();
                let t1 = TxId::new();
                let t2 = TxId::new();

                let low = StorageScanArgs { lt: Some(tuple!["m"]), ..Default::default() };
                let high = StorageScanArgs { gte: Some(tuple!["m"]), ..Default::default() };

                let mut s1 = plan().into_iter();
                let mut s2 = plan().into_iter();
                let mut next1 = s1.next();
                let mut next2 = s2.next();

                for first in order {
                    let (tx, step, slot) = match (first, next1, next2) {
                        (true, Some(step), _) => (t1, step, 1),
                        (false, _, Some(step)) => (t2, step, 2),
                        (_, Some(step), _) => (t1, step, 1),
                        (_, _, Some(step)) => (t2, step, 2),
                        _ => break,
                    };
                    match step {
                        Step::Read => log.read(tx, if tx == t1 { low.clone() } else { high.clone() }),
                        Step::Write => log.write(tx, if tx == t1 { tuple!["a", "x"] } else { tuple!["z", "x"] }),
                        Step::Commit => prop_assert!(log.commit(tx).is_ok()),
                    }
                    if slot == 1 { next1 = s1.next(); } else { next2 = s2.next(); }
                }
            }
        }
    }
}
