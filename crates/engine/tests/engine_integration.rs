//! Cross-layer engine tests: storage + concurrency log + reactivity
//! working together through the public engine surface.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use tupledb_core::{tuple, ScanArgs, TxId, Value, WriteBatch};
use tupledb_engine::TupleDatabase;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
});

fn engine() -> TupleDatabase<i64> {
    Lazy::force(&TRACING);
    TupleDatabase::in_memory()
}

fn score_bounds() -> ScanArgs {
    ScanArgs {
        gt: Some(tuple!["score"]),
        lte: Some(tuple!["score"].extended([Value::Max])),
        ..Default::default()
    }
}

#[test]
fn scan_sum_write_total_conflict_flow() {
    let db = engine();
    db.commit(
        &WriteBatch::new()
            .with_set(tuple!["score", "chet"], 2)
            .with_set(tuple!["score", "meghan"], 1),
        None,
    )
    .unwrap();

    // tx1 computes a sum over the score range
    let t1 = TxId::new();
    let scores = db.scan(&score_bounds(), Some(t1)).unwrap();
    let sum: i64 = scores.iter().map(|kv| kv.value).sum();
    assert_eq!(sum, 3);

    // tx2 sneaks a write into that range
    let t2 = TxId::new();
    db.commit(
        &WriteBatch::new().with_set(tuple!["score", "chet"], 5),
        Some(t2),
    )
    .unwrap();

    // tx1's derived write must be rejected
    let err = db
        .commit(&WriteBatch::new().with_set(tuple!["total"], sum), Some(t1))
        .unwrap_err();
    assert!(err.is_conflict());

    // Recompute on fresh state and commit cleanly
    let t3 = TxId::new();
    let sum: i64 = db
        .scan(&score_bounds(), Some(t3))
        .unwrap()
        .iter()
        .map(|kv| kv.value)
        .sum();
    db.commit(&WriteBatch::new().with_set(tuple!["total"], sum), Some(t3))
        .unwrap();

    let total = db.scan(&ScanArgs::point(tuple!["total"]), None).unwrap();
    assert_eq!(total[0].value, 6);
    assert_eq!(db.concurrency_log_len(), 0);
}

#[test]
fn listener_sees_exactly_the_in_bounds_slice_of_each_commit() {
    let db = engine();
    let received: Arc<Mutex<Vec<WriteBatch<i64>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let _sub = db.subscribe(
        &score_bounds(),
        Arc::new(move |batch: &WriteBatch<i64>| sink.lock().push(batch.clone())),
    );

    db.commit(
        &WriteBatch::new()
            .with_set(tuple!["score", "chet"], 2)
            .with_set(tuple!["total"], 2),
        None,
    )
    .unwrap();
    db.commit(&WriteBatch::new().with_remove(tuple!["score", "chet"]), None)
        .unwrap();
    db.commit(&WriteBatch::new().with_set(tuple!["total"], 0), None)
        .unwrap();

    let got = received.lock();
    assert_eq!(got.len(), 2, "the total-only commit is silent");
    assert_eq!(got[0].set, vec![(tuple!["score", "chet"], 2)]);
    assert!(got[0].remove.is_empty());
    assert!(got[1].set.is_empty());
    assert_eq!(got[1].remove, vec![tuple!["score", "chet"]]);
}

#[test]
fn concurrent_clients_on_shared_engine() {
    let db = Arc::new(engine());
    let mut handles = Vec::new();

    for worker in 0..4 {
        let db = db.clone();
        handles.push(std::thread::spawn(move || {
            for round in 0..25 {
                let key = tuple!["worker", worker as i64, round as i64];
                db.commit(&WriteBatch::new().with_set(key, round), None)
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let all = db.scan(&ScanArgs::for_prefix(tuple!["worker"]), None).unwrap();
    assert_eq!(all.len(), 100);
    // Result is sorted by the tuple comparator
    for window in all.windows(2) {
        assert!(window[0].key < window[1].key);
    }
}

#[test]
fn readers_with_disjoint_ranges_commit_under_interleaving() {
    let db = engine();
    let t1 = TxId::new();
    let t2 = TxId::new();

    db.scan(&ScanArgs::for_prefix(tuple!["left"]), Some(t1)).unwrap();
    db.scan(&ScanArgs::for_prefix(tuple!["right"]), Some(t2)).unwrap();

    db.commit(&WriteBatch::new().with_set(tuple!["left", "a"], 1), Some(t1))
        .unwrap();
    db.commit(&WriteBatch::new().with_set(tuple!["right", "b"], 2), Some(t2))
        .unwrap();
    assert_eq!(db.concurrency_log_len(), 0);
}
