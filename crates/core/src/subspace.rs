//! Prefix prepend/strip for subspace-scoped views
//!
//! A client or transaction scoped to a subspace carries an immutable
//! prefix tuple P. Callers see keys without P; the engine and storage see
//! keys with P prepended. These helpers rewrite tuples, scan args, write
//! batches, and scan results across that boundary. They are pure
//! functions; all of them preserve sort order because prepending or
//! stripping a shared prefix never reorders tuples.

use crate::bounds::ScanArgs;
use crate::error::{Error, Result};
use crate::tuple::{KeyValuePair, Tuple};
use crate::writes::WriteBatch;

/// `prefix ++ tuple`.
pub fn prepend_prefix(prefix: &Tuple, tuple: &Tuple) -> Tuple {
    prefix.extended(tuple.values().iter().cloned())
}

/// `tuple` with `prefix` stripped; `SubspaceMismatch` when `prefix` does
/// not actually prefix it.
pub fn remove_prefix(prefix: &Tuple, tuple: &Tuple) -> Result<Tuple> {
    tuple.strip_prefix(prefix).ok_or_else(|| Error::SubspaceMismatch {
        prefix: prefix.clone(),
        tuple: tuple.clone(),
    })
}

/// Rewrite scan args from subspace-relative to absolute: P is prepended
/// to each of prefix/gt/gte/lt/lte; with no constraint at all the result
/// is a scan of the whole subspace. `limit` and `reverse` pass through.
pub fn normalize_subspace_scan_args(prefix: &Tuple, args: &ScanArgs) -> ScanArgs {
    if prefix.is_empty() {
        return args.clone();
    }
    let rebase = |bound: &Option<Tuple>| bound.as_ref().map(|t| prepend_prefix(prefix, t));
    ScanArgs {
        // The whole subspace when the caller gave no inner prefix
        prefix: Some(match &args.prefix {
            Some(inner) => prepend_prefix(prefix, inner),
            None => prefix.clone(),
        }),
        gt: rebase(&args.gt),
        gte: rebase(&args.gte),
        lt: rebase(&args.lt),
        lte: rebase(&args.lte),
        limit: args.limit,
        reverse: args.reverse,
    }
}

/// Prepend `prefix` to every key in a batch.
pub fn prepend_prefix_to_writes<V: Clone>(prefix: &Tuple, writes: &WriteBatch<V>) -> WriteBatch<V> {
    WriteBatch {
        set: writes
            .set
            .iter()
            .map(|(k, v)| (prepend_prefix(prefix, k), v.clone()))
            .collect(),
        remove: writes.remove.iter().map(|k| prepend_prefix(prefix, k)).collect(),
    }
}

/// Strip `prefix` from every key in a batch.
pub fn remove_prefix_from_writes<V: Clone>(
    prefix: &Tuple,
    writes: &WriteBatch<V>,
) -> Result<WriteBatch<V>> {
    Ok(WriteBatch {
        set: writes
            .set
            .iter()
            .map(|(k, v)| Ok((remove_prefix(prefix, k)?, v.clone())))
            .collect::<Result<_>>()?,
        remove: writes
            .remove
            .iter()
            .map(|k| remove_prefix(prefix, k))
            .collect::<Result<_>>()?,
    })
}

/// Strip `prefix` from every key in a scan result.
pub fn remove_prefix_from_pairs<V>(
    prefix: &Tuple,
    pairs: Vec<KeyValuePair<V>>,
) -> Result<Vec<KeyValuePair<V>>> {
    pairs
        .into_iter()
        .map(|kv| {
            Ok(KeyValuePair {
                key: remove_prefix(prefix, &kv.key)?,
                value: kv.value,
            })
        })
        .collect()
}
