//! Listener registry and per-write fan-out
//!
//! The registry is itself a tiny tuple database: listeners are stored in
//! a key-sorted pair vector under the two-element key
//! `[Array(bounds common prefix), String(listener id)]`. Finding the
//! listeners plausibly interested in a written key then reduces to the
//! same range-scan primitive the rest of the system runs on: walk the
//! key's prefixes from longest to empty and scan the registry at each
//! one, instead of testing every listener against every write.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::trace;
use tupledb_core::sorted::{bounds_range, pair_remove, pair_upsert};
use tupledb_core::{ListenerId, ScanArgs, StorageScanArgs, Tuple, Value, WriteBatch};

/// A listener callback, invoked with the subset of a committed batch
/// that falls inside the listener's bounds.
pub type Callback<V> = Arc<dyn Fn(&WriteBatch<V>) + Send + Sync>;

struct ListenerEntry<V> {
    bounds: ScanArgs,
    callback: Callback<V>,
}

type Registry<V> = Vec<(Tuple, ListenerEntry<V>)>;

/// Registry of live subscriptions with per-write fan-out.
pub struct ReactivityTracker<V> {
    listeners: Arc<Mutex<Registry<V>>>,
}

impl<V> Default for ReactivityTracker<V> {
    fn default() -> Self {
        ReactivityTracker::new()
    }
}

impl<V> ReactivityTracker<V> {
    /// An empty registry.
    pub fn new() -> Self {
        ReactivityTracker {
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// True when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl<V: Clone + 'static> ReactivityTracker<V> {
    /// Register a listener for writes intersecting `bounds`. The handle
    /// unsubscribes; dropping it without calling
    /// [`Subscription::unsubscribe`] leaves the listener registered.
    pub fn subscribe(&self, bounds: &ScanArgs, callback: Callback<V>) -> Subscription {
        let id = ListenerId::new();
        let key = registry_key(&bounds.common_prefix(), id);
        let entry = ListenerEntry {
            bounds: bounds.clone(),
            callback,
        };
        pair_upsert(&mut self.listeners.lock(), key.clone(), entry);
        trace!(listener = %id, "listener registered");
        Subscription::new(Arc::downgrade(&self.listeners), key)
    }

    /// Bucket a committed batch per interested listener.
    ///
    /// Each returned pair is one callback together with exactly the
    /// writes that fall inside its bounds, preserving the set/remove
    /// partition. A listener appears at most once per batch.
    pub fn compute_emits(&self, writes: &WriteBatch<V>) -> Vec<(Callback<V>, WriteBatch<V>)> {
        let listeners = self.listeners.lock();
        // Keyed by registry key, so the callback order for a commit is
        // stable for a given registration set.
        let mut buckets: BTreeMap<Tuple, (Callback<V>, WriteBatch<V>)> = BTreeMap::new();

        for (key, value) in &writes.set {
            for (registry_key, entry) in matching_listeners(&listeners, key) {
                buckets
                    .entry(registry_key)
                    .or_insert_with(|| (entry.callback.clone(), WriteBatch::new()))
                    .1
                    .set(key.clone(), value.clone());
            }
        }
        for key in &writes.remove {
            for (registry_key, entry) in matching_listeners(&listeners, key) {
                buckets
                    .entry(registry_key)
                    .or_insert_with(|| (entry.callback.clone(), WriteBatch::new()))
                    .1
                    .remove(key.clone());
            }
        }

        buckets.into_values().collect()
    }

    /// Compute buckets and invoke each callback once.
    pub fn emit(&self, writes: &WriteBatch<V>) {
        for (callback, bucket) in self.compute_emits(writes) {
            callback(&bucket);
        }
    }
}

/// Walk every prefix of `key` from longest to empty and collect the
/// listeners registered at that prefix whose bounds actually contain the
/// key.
fn matching_listeners<'a, V>(
    listeners: &'a Registry<V>,
    key: &Tuple,
) -> Vec<(Tuple, &'a ListenerEntry<V>)> {
    let mut matched = Vec::new();
    for prefix_len in (0..=key.len()).rev() {
        let prefix = Tuple::from(key.values()[..prefix_len].to_vec());
        let probe = Value::Array(prefix.into_values());
        // All registry keys [probe, id]: strict extensions of [probe]
        let args = StorageScanArgs {
            gte: Some(Tuple::from(vec![probe.clone(), Value::Min])),
            lte: Some(Tuple::from(vec![probe, Value::Max])),
            ..Default::default()
        };
        let (start, end) = bounds_range(listeners, |(k, _)| k, &args);
        for (registry_key, entry) in &listeners[start..end] {
            if entry.bounds.contains(key) {
                matched.push((registry_key.clone(), entry));
            }
        }
    }
    matched
}

fn registry_key(common_prefix: &Tuple, id: ListenerId) -> Tuple {
    Tuple::from(vec![
        Value::Array(common_prefix.values().to_vec()),
        Value::from(id.to_string()),
    ])
}

/// Handle returned by subscribe. `unsubscribe` is idempotent and safe to
/// race with an in-flight emit: the listener is removed under the
/// registry lock, so an emit either sees it or does not.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new<V: 'static>(registry: Weak<Mutex<Registry<V>>>, key: Tuple) -> Self {
        Subscription {
            cancel: Mutex::new(Some(Box::new(move || {
                if let Some(listeners) = registry.upgrade() {
                    pair_remove(&mut listeners.lock(), &key);
                }
            }))),
        }
    }

    /// Remove the listener. Calling this a second time is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }

    /// True until `unsubscribe` has run.
    pub fn is_active(&self) -> bool {
        self.cancel.lock().is_some()
    }
}
