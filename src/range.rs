use std::fmt;
use std::ops::Bound;

use crate::key::quoted;

/// A half-open key interval `[start, limit)`.
///
/// A missing bound leaves that side unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryRange {
    pub start: Option<Vec<u8>>,
    pub limit: Option<Vec<u8>>,
}

impl QueryRange {
    /// The range covering every key.
    #[must_use]
    pub const fn unbounded() -> Self {
        QueryRange { start: None, limit: None }
    }

    #[must_use]
    pub fn new(start: Option<Vec<u8>>, limit: Option<Vec<u8>>) -> Self {
        QueryRange { start, limit }
    }

    /// Returns `true` if `key` falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = self.start.as_deref().is_none_or(|start| start <= key);
        let below_limit = self.limit.as_deref().is_none_or(|limit| key < limit);
        above_start && below_limit
    }

    /// Returns the range as standard bounds, usable with `BTreeMap::range`.
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use kv_conformance::QueryRange;
    ///
    /// let map = BTreeMap::from([(b"a".to_vec(), 1), (b"b".to_vec(), 2), (b"c".to_vec(), 3)]);
    /// let range = QueryRange::new(Some(b"b".to_vec()), None);
    /// let hits: Vec<_> = map.range::<[u8], _>(range.as_bounds()).map(|(_, v)| *v).collect();
    /// assert_eq!(hits, [2, 3]);
    /// ```
    #[must_use]
    pub fn as_bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let start = self.start.as_deref().map_or(Bound::Unbounded, Bound::Included);
        let limit = self.limit.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
        (start, limit)
    }
}

impl fmt::Display for QueryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            Some(start) => write!(f, "[{}", quoted(start))?,
            None => f.write_str("[-inf")?,
        }
        match &self.limit {
            Some(limit) => write!(f, ", {})", quoted(limit)),
            None => f.write_str(", +inf)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let range = QueryRange::new(Some(b"b".to_vec()), Some(b"d".to_vec()));
        assert!(!range.contains(b"a"));
        assert!(range.contains(b"b"));
        assert!(range.contains(b"c\xff"));
        assert!(!range.contains(b"d"));
        assert!(QueryRange::unbounded().contains(b""));
    }

    #[test]
    fn display() {
        let range = QueryRange::new(None, Some(b"k\x00".to_vec()));
        assert_eq!(range.to_string(), "[-inf, \"k\\x00\")");
        assert_eq!(QueryRange::unbounded().to_string(), "[-inf, +inf)");
    }
}
