//! Retry-on-conflict wrapper
//!
//! [`transactional`] runs a user function inside a fresh transaction
//! and commits it, retrying the whole attempt (new transaction, new
//! reads) when, and only when, the commit is rejected for a
//! read-write conflict. Any other error cancels the transaction and
//! propagates immediately.
//!
//! The wrapper composes: a [`Transaction`] is itself a
//! [`Transactable`], in which case the function runs directly inside
//! it and commit/retry are left to the outer owner.

use tracing::debug;
use tupledb_core::{Error, Result};

use crate::client::TupleClient;
use crate::transaction::Transaction;

/// Default number of commit attempts before giving up.
pub const DEFAULT_RETRIES: usize = 5;

/// Something a transactional function can run against: a client (fresh
/// transaction per attempt, retry on conflict) or an existing
/// transaction (direct call, no commit).
pub trait Transactable<V: Clone + Send + 'static> {
    /// Run `f`, committing and retrying per the implementor's policy.
    fn run_transactional<T>(
        &self,
        retries: usize,
        f: &dyn Fn(&Transaction<V>) -> Result<T>,
    ) -> Result<T>;
}

impl<V: Clone + Send + 'static> Transactable<V> for TupleClient<V> {
    fn run_transactional<T>(
        &self,
        retries: usize,
        f: &dyn Fn(&Transaction<V>) -> Result<T>,
    ) -> Result<T> {
        let attempts = retries.max(1);
        let mut last_conflict = None;
        for attempt in 0..attempts {
            let tx = self.transact();
            let result = match f(&tx) {
                Ok(result) => result,
                Err(err) => {
                    // Release the log entries before surfacing the error
                    let _ = tx.cancel();
                    return Err(err);
                }
            };
            match tx.commit() {
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
}

impl<V: Clone + Send + 'static> Transactable<V> for Transaction<V> {
    /// Transactions compose: the function joins this transaction, and
    /// commit (with its retry policy) stays with whoever started it.
    fn run_transactional<T>(
        &self,
        _retries: usize,
        f: &dyn Fn(&Transaction<V>) -> Result<T>,
    ) -> Result<T> {
        f(self)
    }
}

/// Run `f` transactionally with the default retry budget.
pub fn transactional<V, T, S>(source: &S, f: impl Fn(&Transaction<V>) -> Result<T>) -> Result<T>
where
    V: Clone + Send + 'static,
    S: Transactable<V>,
{
    source.run_transactional(DEFAULT_RETRIES, &f)
}

/// Run `f` transactionally with an explicit retry budget.
pub fn transactional_with_retries<V, T, S>(
    source: &S,
    retries: usize,
    f: impl Fn(&Transaction<V>) -> Result<T>,
) -> Result<T>
where
    V: Clone + Send + 'static,
    S: Transactable<V>,
{
    source.run_transactional(retries, &f)
}
