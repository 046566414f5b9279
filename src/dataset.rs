use std::fmt;
use std::slice;
use std::sync::Arc;

use crate::error::DatasetError;
use crate::key::separator;
use crate::range::QueryRange;

/// A single key/value pair of a [`SortedDataset`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// An inexact probe for a dataset position, together with the entry it must
/// resolve to under nearest-match lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InexactKey<'a> {
    /// Sorts after the previous entry's key and at or before `key`.
    pub probe: Vec<u8>,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl InexactKey<'_> {
    /// Returns `true` when the probe differs from the exact key, i.e. it names
    /// a key that is absent from the dataset.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.probe.as_slice() != self.key
    }
}

/// The ground truth for a conformance run: unique keys in strictly
/// increasing byte-lexicographic order, each with a value.
///
/// Cloning is cheap and shares the backing storage; use
/// [`clone_independent`](SortedDataset::clone_independent) before handing a
/// copy to a store that may hold on to or mutate it.
///
/// # Examples
///
/// ```
/// use kv_conformance::SortedDataset;
///
/// let dataset: SortedDataset = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
/// assert_eq!(dataset.len(), 3);
/// assert_eq!(dataset.entry_at(0), (b"a".as_slice(), b"1".as_slice()));
///
/// let probe = dataset.inexact_key_at(1);
/// assert!(b"a".as_slice() < probe.probe.as_slice() && probe.probe.as_slice() < b"b".as_slice());
/// assert_eq!(probe.key, b"b");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SortedDataset {
    entries: Arc<Vec<Entry>>,
}

impl SortedDataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes across all keys and values.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.key.len() + e.value.len()).sum()
    }

    pub fn iter(&self) -> slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the key and value at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn entry_at(&self, i: usize) -> (&[u8], &[u8]) {
        let entry = &self.entries[i];
        (&entry.key, &entry.value)
    }

    /// Returns the key at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn key_at(&self, i: usize) -> &[u8] {
        &self.entries[i].key
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|e| e.key.as_slice())
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&[u8]> {
        self.entries.last().map(|e| e.key.as_slice())
    }

    /// Returns the inexact probe for position `i`.
    ///
    /// The probe sorts strictly after the key at `i - 1` and at or before the
    /// key at `i`. Position 0 always probes with the empty key. The probe
    /// equals the exact key only when nothing fits in between.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn inexact_key_at(&self, i: usize) -> InexactKey<'_> {
        let (key, value) = self.entry_at(i);
        let prev = i.checked_sub(1).map(|p| self.key_at(p));
        InexactKey {
            probe: separator(prev, key),
            key,
            value,
        }
    }

    /// Returns the value stored under exactly `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|i| self.entries[i].value.as_slice())
    }

    /// Returns the position of the first key `>= key`, or `len()` if none.
    #[must_use]
    pub fn search(&self, key: &[u8]) -> usize {
        self.entries.partition_point(|e| e.key.as_slice() < key)
    }

    /// Inserts or replaces `key`, keeping the order.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        let entries = Arc::make_mut(&mut self.entries);
        match entries.binary_search_by(|e| e.key.cmp(&key)) {
            Ok(i) => entries[i].value = value,
            Err(i) => entries.insert(i, Entry { key, value }),
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let i = self.entries.binary_search_by(|e| e.key.as_slice().cmp(key)).ok()?;
        Some(Arc::make_mut(&mut self.entries).remove(i).value)
    }

    /// Returns a deep copy that shares no storage with `self`.
    #[must_use]
    pub fn clone_independent(&self) -> Self {
        SortedDataset {
            entries: Arc::new(self.entries.as_ref().clone()),
        }
    }

    /// Returns the sub-dataset over positions `[start, limit)`.
    ///
    /// # Panics
    ///
    /// Panics if `start > limit` or `limit > self.len()`.
    #[must_use]
    pub fn slice(&self, start: usize, limit: usize) -> Self {
        match self.try_slice(start, limit) {
            Ok(slice) => slice,
            Err(err) => panic!("`SortedDataset::slice()` - {err}"),
        }
    }

    /// Fallible form of [`slice`](SortedDataset::slice).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SliceOutOfBounds`] if `start > limit` or
    /// `limit > self.len()`.
    pub fn try_slice(&self, start: usize, limit: usize) -> Result<Self, DatasetError> {
        if start > limit || limit > self.len() {
            return Err(DatasetError::SliceOutOfBounds {
                start,
                limit,
                len: self.len(),
            });
        }
        Ok(SortedDataset {
            entries: Arc::new(self.entries[start..limit].to_vec()),
        })
    }

    /// Returns the entries whose keys fall inside `range`.
    #[must_use]
    pub fn slice_keys(&self, range: &QueryRange) -> Self {
        let start = range.start.as_deref().map_or(0, |k| self.search(k));
        let limit = range.limit.as_deref().map_or(self.len(), |k| self.search(k));
        self.slice(start, limit.max(start))
    }

    /// Returns the query range selecting exactly positions `[start, limit)`.
    ///
    /// The lower bound is the key at `start`, unbounded when `start == 0`; the
    /// upper bound is the key at `limit`, unbounded when `limit == len()`.
    ///
    /// # Panics
    ///
    /// Panics if `start > limit` or `limit > self.len()`.
    #[must_use]
    pub fn range_for(&self, start: usize, limit: usize) -> QueryRange {
        assert!(
            start <= limit && limit <= self.len(),
            "`SortedDataset::range_for()` - {start}..{limit} out of bounds for length {}",
            self.len()
        );
        QueryRange {
            start: (start > 0).then(|| self.key_at(start).to_vec()),
            limit: (limit < self.len()).then(|| self.key_at(limit).to_vec()),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SortedDataset
where
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    /// Builds a dataset from pairs in any order; a later duplicate key wins.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entries: Vec<Entry> = iter
            .into_iter()
            .map(|(k, v)| Entry {
                key: k.into(),
                value: v.into(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries.dedup_by(|later, kept| {
            if later.key == kept.key {
                std::mem::swap(&mut later.value, &mut kept.value);
                true
            } else {
                false
            }
        });
        SortedDataset {
            entries: Arc::new(entries),
        }
    }
}

impl<'a> IntoIterator for &'a SortedDataset {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for SortedDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedDataset")
            .field("len", &self.len())
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ten() -> SortedDataset {
        (0..10u8).rev().map(|i| (vec![b'k', b'0' + i], vec![i])).collect()
    }

    #[test]
    fn builds_sorted_and_last_duplicate_wins() {
        let dataset: SortedDataset = [("b", "1"), ("a", "x"), ("b", "2"), ("b", "3")].into_iter().collect();
        let pairs: Vec<_> = dataset.iter().map(|e| (e.key.clone(), e.value.clone())).collect();
        assert_eq!(pairs, vec![(b"a".to_vec(), b"x".to_vec()), (b"b".to_vec(), b"3".to_vec())]);
    }

    #[test]
    fn put_and_delete_keep_order() {
        let mut dataset = SortedDataset::new();
        dataset.put("m", "1");
        dataset.put("a", "2");
        dataset.put("z", "3");
        dataset.put("m", "4");
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get(b"m"), Some(b"4".as_slice()));
        assert_eq!(dataset.delete(b"a"), Some(b"2".to_vec()));
        assert_eq!(dataset.delete(b"a"), None);
        assert_eq!(dataset.first_key(), Some(b"m".as_slice()));
        assert_eq!(dataset.size_bytes(), 4);
    }

    #[test]
    fn inexact_keys_fall_between_neighbours() {
        let dataset = ten();
        let first = dataset.inexact_key_at(0);
        assert_eq!(first.probe, b"");
        assert!(first.is_distinct());
        for i in 1..dataset.len() {
            let probe = dataset.inexact_key_at(i);
            assert!(dataset.key_at(i - 1) < probe.probe.as_slice());
            assert!(probe.probe.as_slice() < probe.key);
            assert_eq!(dataset.search(&probe.probe), i);
        }
    }

    #[test]
    fn empty_key_has_no_distinct_probe() {
        let dataset: SortedDataset = [("", "v")].into_iter().collect();
        assert!(!dataset.inexact_key_at(0).is_distinct());

        let tight: SortedDataset = [(b"a".to_vec(), b"1".to_vec()), (b"a\x00".to_vec(), b"2".to_vec())]
            .into_iter()
            .collect();
        assert!(!tight.inexact_key_at(1).is_distinct());
    }

    #[test]
    fn range_for_selects_the_slice() {
        let dataset = ten();
        let range = dataset.range_for(3, 7);
        assert_eq!(range.start.as_deref(), Some(b"k3".as_slice()));
        assert_eq!(range.limit.as_deref(), Some(b"k7".as_slice()));
        let slice = dataset.slice(3, 7);
        assert_eq!(slice.entries(), &dataset.entries()[3..7]);
        assert_eq!(dataset.slice_keys(&range), slice);

        let full = dataset.range_for(0, dataset.len());
        assert_eq!(full, QueryRange::unbounded());
        assert!(dataset.slice(4, 4).is_empty());
    }

    #[test]
    fn slice_keys_handles_inverted_and_missing_bounds() {
        let dataset = ten();
        let inverted = QueryRange::new(Some(b"k7".to_vec()), Some(b"k3".to_vec()));
        assert!(dataset.slice_keys(&inverted).is_empty());
        let tail = QueryRange::new(Some(b"k55".to_vec()), None);
        assert_eq!(dataset.slice_keys(&tail), dataset.slice(6, 10));
    }

    #[test]
    fn try_slice_reports_bounds() {
        let dataset = ten();
        assert_eq!(
            dataset.try_slice(5, 11),
            Err(DatasetError::SliceOutOfBounds {
                start: 5,
                limit: 11,
                len: 10
            })
        );
    }

    #[test]
    #[should_panic(expected = "`SortedDataset::slice()`")]
    fn slice_out_of_bounds_panics() {
        let _ = ten().slice(3, 2);
    }

    #[test]
    fn clone_independent_does_not_share_storage() {
        let dataset = ten();
        let shared = dataset.clone();
        let independent = dataset.clone_independent();
        assert!(Arc::ptr_eq(&dataset.entries, &shared.entries));
        assert!(!Arc::ptr_eq(&dataset.entries, &independent.entries));
        assert_eq!(dataset, independent);

        let mut mutated = dataset.clone();
        mutated.put("k00", "new");
        assert_eq!(dataset.len(), 10);
        assert_eq!(mutated.len(), 11);
    }
}
