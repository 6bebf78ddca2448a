//! Binary-search primitives over sorted arrays
//!
//! Every set/remove/get/exists/scan on an in-memory sorted array reduces
//! to one binary search followed by a constant-time splice. The
//! [`SearchResult`] found/closest split is what disambiguates inclusive
//! from exclusive bounds during range scans.

use crate::bounds::StorageScanArgs;
use crate::tuple::{KeyValuePair, Tuple};
use std::cmp::Ordering;

/// Outcome of a binary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// Exact match at this index
    Found(usize),
    /// No match; inserting at this index preserves order
    Closest(usize),
}

impl SearchResult {
    /// The index, whether found or closest.
    pub fn index(&self) -> usize {
        match self {
            SearchResult::Found(i) | SearchResult::Closest(i) => *i,
        }
    }
}

/// Binary search with a caller-supplied probe comparing an item to the
/// target (`Ordering::Less` means the item sorts before the target).
pub fn binary_search_by<T>(items: &[T], probe: impl Fn(&T) -> Ordering) -> SearchResult {
    match items.binary_search_by(|item| probe(item)) {
        Ok(i) => SearchResult::Found(i),
        Err(i) => SearchResult::Closest(i),
    }
}

/// Binary search for `target` in a sorted slice.
pub fn binary_search<T: Ord>(items: &[T], target: &T) -> SearchResult {
    binary_search_by(items, |item| item.cmp(target))
}

/// Insert `item` into a sorted vector, keeping it sorted. Returns false
/// when the item was already present.
pub fn sorted_insert<T: Ord>(items: &mut Vec<T>, item: T) -> bool {
    match binary_search(items, &item) {
        SearchResult::Found(_) => false,
        SearchResult::Closest(i) => {
            items.insert(i, item);
            true
        }
    }
}

/// Remove `item` from a sorted vector. Returns true when it was present.
pub fn sorted_remove<T: Ord>(items: &mut Vec<T>, item: &T) -> bool {
    match binary_search(items, item) {
        SearchResult::Found(i) => {
            items.remove(i);
            true
        }
        SearchResult::Closest(_) => false,
    }
}

/// Membership test on a sorted slice.
pub fn sorted_contains<T: Ord>(items: &[T], item: &T) -> bool {
    matches!(binary_search(items, item), SearchResult::Found(_))
}

/// Upsert into a key-sorted pair vector.
pub fn pair_upsert<V>(pairs: &mut Vec<(Tuple, V)>, key: Tuple, value: V) {
    match binary_search_by(pairs, |(k, _)| k.cmp(&key)) {
        SearchResult::Found(i) => pairs[i].1 = value,
        SearchResult::Closest(i) => pairs.insert(i, (key, value)),
    }
}

/// Remove from a key-sorted pair vector, returning the removed value.
pub fn pair_remove<V>(pairs: &mut Vec<(Tuple, V)>, key: &Tuple) -> Option<V> {
    match binary_search_by(pairs, |(k, _)| k.cmp(key)) {
        SearchResult::Found(i) => Some(pairs.remove(i).1),
        SearchResult::Closest(_) => None,
    }
}

/// Point lookup in a key-sorted pair vector.
pub fn pair_get<'a, V>(pairs: &'a [(Tuple, V)], key: &Tuple) -> Option<&'a V> {
    match binary_search_by(pairs, |(k, _)| k.cmp(key)) {
        SearchResult::Found(i) => Some(&pairs[i].1),
        SearchResult::Closest(_) => None,
    }
}

/// Compute the `[start, end)` range of `items` selected by `args`,
/// taking each present bound into account (gt/gte tighten the start,
/// lt/lte tighten the end).
pub fn bounds_range<T>(
    items: &[T],
    key_of: impl Fn(&T) -> &Tuple,
    args: &StorageScanArgs,
) -> (usize, usize) {
    let mut start = 0;
    if let Some(bound) = &args.gte {
        let i = binary_search_by(items, |item| key_of(item).cmp(bound)).index();
        start = start.max(i);
    }
    if let Some(bound) = &args.gt {
        let i = match binary_search_by(items, |item| key_of(item).cmp(bound)) {
            SearchResult::Found(i) => i + 1,
            SearchResult::Closest(i) => i,
        };
        start = start.max(i);
    }

    let mut end = items.len();
    if let Some(bound) = &args.lte {
        let i = match binary_search_by(items, |item| key_of(item).cmp(bound)) {
            SearchResult::Found(i) => i + 1,
            SearchResult::Closest(i) => i,
        };
        end = end.min(i);
    }
    if let Some(bound) = &args.lt {
        let i = binary_search_by(items, |item| key_of(item).cmp(bound)).index();
        end = end.min(i);
    }

    (start, end.max(start))
}

/// Range scan over a key-sorted pair slice: slice by bounds, then apply
/// `reverse`, then `limit` (in that order).
pub fn scan_pairs<V: Clone>(pairs: &[(Tuple, V)], args: &StorageScanArgs) -> Vec<KeyValuePair<V>> {
    let (start, end) = bounds_range(pairs, |(k, _)| k, args);
    let selected = &pairs[start..end];

    let mut result: Vec<KeyValuePair<V>> = if args.reverse {
        selected
            .iter()
            .rev()
            .map(|(k, v)| KeyValuePair::new(k.clone(), v.clone()))
            .collect()
    } else {
        selected
            .iter()
            .map(|(k, v)| KeyValuePair::new(k.clone(), v.clone()))
            .collect()
    };

    if let Some(limit) = args.limit {
        result.truncate(limit);
    }
    result
}
