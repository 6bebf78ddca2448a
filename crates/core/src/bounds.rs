//! Range expressions over the tuple order
//!
//! [`ScanArgs`] is what callers build: an optional prefix, inclusive or
//! exclusive endpoints, a result cap, and direction. [`StorageScanArgs`]
//! is the normalized form backends see: the prefix has been expanded to
//! sentinel endpoints (`prefix P` ⇒ `gte = P ++ [MIN]`, `lte = P ++
//! [MAX]`), leaving only plain bounds.

use crate::tuple::Tuple;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A range expression: optional prefix, endpoints, limit, direction.
///
/// All fields are optional and combine by intersection; `prefix` is
/// shorthand for a pair of sentinel endpoints and may be tightened
/// further by explicit bounds.
///
/// ```
/// use tupledb_core::{tuple, ScanArgs};
///
/// let args = ScanArgs {
///     gte: Some(tuple!["j"]),
///     lt: Some(tuple!["k"]),
///     limit: Some(10),
///     ..Default::default()
/// };
/// assert!(args.contains(&tuple!["joe", "stevens"]));
/// assert!(!args.contains(&tuple!["zoe", "brown"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanArgs {
    /// Restrict to keys strictly extending this tuple
    pub prefix: Option<Tuple>,
    /// Exclusive lower bound
    pub gt: Option<Tuple>,
    /// Inclusive lower bound
    pub gte: Option<Tuple>,
    /// Exclusive upper bound
    pub lt: Option<Tuple>,
    /// Inclusive upper bound
    pub lte: Option<Tuple>,
    /// Cap on result count, applied after `reverse`
    pub limit: Option<usize>,
    /// Descending order
    pub reverse: bool,
}

impl ScanArgs {
    /// Everything: no bounds, no limit, ascending.
    pub fn all() -> Self {
        ScanArgs::default()
    }

    /// Keys strictly extending `prefix`.
    pub fn for_prefix(prefix: Tuple) -> Self {
        ScanArgs {
            prefix: Some(prefix),
            ..Default::default()
        }
    }

    /// The single-point range containing exactly `key`.
    pub fn point(key: Tuple) -> Self {
        ScanArgs {
            gte: Some(key.clone()),
            lte: Some(key),
            ..Default::default()
        }
    }

    /// True when `key` lies inside these bounds.
    pub fn contains(&self, key: &Tuple) -> bool {
        if let Some(p) = &self.prefix {
            if !key.starts_with(p) || key.len() == p.len() {
                return false;
            }
        }
        if let Some(b) = &self.gt {
            if key <= b {
                return false;
            }
        }
        if let Some(b) = &self.gte {
            if key < b {
                return false;
            }
        }
        if let Some(b) = &self.lt {
            if key >= b {
                return false;
            }
        }
        if let Some(b) = &self.lte {
            if key > b {
                return false;
            }
        }
        true
    }

    /// Expand `prefix` into sentinel endpoints, producing the form the
    /// storage layer consumes. Explicit bounds that are tighter than the
    /// prefix envelope win.
    pub fn normalized(&self) -> StorageScanArgs {
        let mut gte = self.gte.clone();
        let mut lte = self.lte.clone();
        if let Some(p) = &self.prefix {
            let low = p.extended([Value::Min]);
            let high = p.extended([Value::Max]);
            gte = Some(match gte {
                Some(existing) if existing > low => existing,
                _ => low,
            });
            lte = Some(match lte {
                Some(existing) if existing < high => existing,
                _ => high,
            });
        }
        StorageScanArgs {
            gt: self.gt.clone(),
            gte,
            lt: self.lt.clone(),
            lte,
            limit: self.limit,
            reverse: self.reverse,
        }
    }

    /// Longest common tuple prefix of the lower and upper bounds (the
    /// explicit `prefix` when given; empty when unbounded on either
    /// side). This is the registry key the reactivity tracker indexes
    /// listeners under.
    pub fn common_prefix(&self) -> Tuple {
        if let Some(p) = &self.prefix {
            return p.clone();
        }
        let lower = self.gt.as_ref().or(self.gte.as_ref());
        let upper = self.lt.as_ref().or(self.lte.as_ref());
        match (lower, upper) {
            (Some(a), Some(b)) => a
                .values()
                .iter()
                .zip(b.values())
                .take_while(|(x, y)| x == y)
                .map(|(x, _)| x.clone())
                .collect(),
            _ => Tuple::new(),
        }
    }
}

/// Normalized bounds as consumed by storage backends: endpoints, limit,
/// direction, with no prefix field (expanded upstream).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageScanArgs {
    /// Exclusive lower bound
    pub gt: Option<Tuple>,
    /// Inclusive lower bound
    pub gte: Option<Tuple>,
    /// Exclusive upper bound
    pub lt: Option<Tuple>,
    /// Inclusive upper bound
    pub lte: Option<Tuple>,
    /// Cap on result count, applied after `reverse`
    pub limit: Option<usize>,
    /// Descending order
    pub reverse: bool,
}

impl StorageScanArgs {
    /// True when `key` lies inside these bounds.
    pub fn contains(&self, key: &Tuple) -> bool {
        if let Some(b) = &self.gt {
            if key <= b {
                return false;
            }
        }
        if let Some(b) = &self.gte {
            if key < b {
                return false;
            }
        }
        if let Some(b) = &self.lt {
            if key >= b {
                return false;
            }
        }
        if let Some(b) = &self.lte {
            if key > b {
                return false;
            }
        }
        true
    }
}
