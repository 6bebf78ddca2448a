//! Value types and the element comparator
//!
//! This module defines:
//! - Value: the tagged sum type tuple elements are drawn from
//! - The element comparator: a total order with explicit type-tag dispatch
//!
//! ## Type order
//!
//! `MIN < null < object < array < number < string < boolean < MAX`
//!
//! The two sentinels exist only to express range bounds (`MIN` below every
//! real value, `MAX` above every real value); well-behaved writers never
//! store them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single element of a composite tuple key.
///
/// Ordering is total and deliberately explicit (type-tag dispatch, not
/// structural derive) so that it matches the order-preserving byte
/// encoding in [`crate::codec`] bit for bit.
///
/// Numbers are ordered by IEEE-754 *total* ordering (`f64::total_cmp`):
/// `-0.0` sorts before `0.0`, and NaN (never produced by a well-behaved
/// writer) still has a consistent position. This is what
/// keeps `compare(a, b)` and `bytes(encode(a)).cmp(&bytes(encode(b)))`
/// in agreement for every input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Sentinel below every other value; legal only inside range bounds
    Min,
    /// Null
    Null,
    /// Ordered mapping from string keys to values; absent entries are
    /// simply not present
    Object(BTreeMap<String, Value>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Finite 64-bit float
    Number(f64),
    /// UTF-8 string, ordered by Unicode code point
    String(String),
    /// Boolean, `false < true`
    Bool(bool),
    /// Sentinel above every other value; legal only inside range bounds
    Max,
}

impl Value {
    /// Rank of this value's type in the global type order.
    pub fn type_rank(&self) -> u8 {
        match self {
            Value::Min => 0,
            Value::Null => 1,
            Value::Object(_) => 2,
            Value::Array(_) => 3,
            Value::Number(_) => 4,
            Value::String(_) => 5,
            Value::Bool(_) => 6,
            Value::Max => 7,
        }
    }

    /// True for the `MIN`/`MAX` range sentinels.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Min | Value::Max)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.as_slice().cmp(b.as_slice()),
            (Value::Object(a), Value::Object(b)) => cmp_objects(a, b),
            // Same-rank cases left: Min/Min, Null/Null, Max/Max (equal);
            // everything else falls back to the type order.
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// Objects compare by their entries in key-sorted order: key first, then
/// value, with the shorter entry list ordered first when one is a prefix
/// of the other.
fn cmp_objects(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((ka, va)), Some((kb, vb))) => {
                match ka.cmp(kb) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
                match va.cmp(vb) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Object(entries)
    }
}
