//! Canned and generated datasets for the standard matrix.

use std::ops::RangeInclusive;

use crate::dataset::SortedDataset;
use crate::error::DatasetError;
use crate::sampler::Sampler;

/// Length of the value in [`big_value`].
pub const BIG_VALUE_LEN: usize = 200_000;

/// A dataset together with the name its suite entry is reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedDataset {
    pub name: String,
    pub dataset: SortedDataset,
}

impl NamedDataset {
    #[must_use]
    pub fn new(name: impl Into<String>, dataset: SortedDataset) -> Self {
        NamedDataset {
            name: name.into(),
            dataset,
        }
    }
}

#[must_use]
pub fn empty() -> SortedDataset {
    SortedDataset::new()
}

/// A single entry under the empty key.
#[must_use]
pub fn empty_key() -> SortedDataset {
    [("", "v")].into_iter().collect()
}

#[must_use]
pub fn empty_value() -> SortedDataset {
    [("abc", ""), ("abcd", "")].into_iter().collect()
}

#[must_use]
pub fn one_key_value() -> SortedDataset {
    [("abc", "v")].into_iter().collect()
}

#[must_use]
pub fn big_value() -> SortedDataset {
    [(b"big1".to_vec(), vec![b'1'; BIG_VALUE_LEN])].into_iter().collect()
}

/// Keys at the edges of the byte alphabet, including neighbours with no key
/// between them.
#[must_use]
pub fn special_key() -> SortedDataset {
    let entries: [(&[u8], &[u8]); 8] = [
        (b"\x00", b"zero"),
        (b"\x00\x00", b"zero zero"),
        (b"\x01", b"one"),
        (b"\x7f\xff", b"mid"),
        (b"\xff", b"max"),
        (b"\xff\x00", b"max zero"),
        (b"\xff\xfe\xfd", b"v"),
        (b"\xff\xff", b"max max"),
    ];
    entries.into_iter().collect()
}

#[must_use]
pub fn multiple_key_value() -> SortedDataset {
    [
        ("hello", "world"),
        ("akira", "miku"),
        ("aaa", "bbb"),
        ("aaaa", "bbbb"),
        ("aaab", "c"),
        ("ab", "cd"),
        ("b", ""),
        ("ba", "empty before"),
        ("c", "c"),
        ("ca", "ca"),
        ("cac", "cac"),
        ("d", "\u{0}"),
        ("dz", "dz"),
        ("e", "e"),
        ("kv", "store"),
        ("x", "y"),
        ("xx", "yy"),
        ("xxx", "yyy"),
        ("zz", "last"),
    ]
    .into_iter()
    .collect()
}

/// Procedural dataset generator.
///
/// Keys are produced in strictly increasing order: each key either extends
/// the previous one with zero bytes or bumps one of its bytes by
/// `key_increment`, so the spacing between neighbours is controlled by the
/// increment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generator {
    pub total: usize,
    pub key_increment: u8,
    pub key_len: RangeInclusive<usize>,
    pub value_len: RangeInclusive<usize>,
}

impl Generator {
    #[must_use]
    pub fn new(
        total: usize,
        key_increment: u8,
        min_key_len: usize,
        max_key_len: usize,
        min_value_len: usize,
        max_value_len: usize,
    ) -> Self {
        Generator {
            total,
            key_increment,
            key_len: min_key_len..=max_key_len,
            value_len: min_value_len..=max_value_len,
        }
    }

    /// Generates the dataset; the same seed always yields the same bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidParameters`] for a zero increment or an
    /// empty length range, and [`DatasetError::KeySpaceExhausted`] when no
    /// further increasing key fits the maximum key length.
    pub fn generate(&self, seed: u64) -> Result<SortedDataset, DatasetError> {
        self.validate()?;
        let mut sampler = Sampler::new(seed);
        let mut entries = Vec::with_capacity(self.total);
        let mut prev: Option<Vec<u8>> = None;
        for generated in 0..self.total {
            let len = sampler.length(self.key_len.clone());
            let key = match &prev {
                None => vec![0; len],
                Some(prev) => self.next_key(prev, len).ok_or(DatasetError::KeySpaceExhausted {
                    generated,
                    requested: self.total,
                })?,
            };
            let value_len = sampler.length(self.value_len.clone());
            entries.push((key.clone(), sampler.bytes(value_len)));
            prev = Some(key);
        }
        Ok(entries.into_iter().collect())
    }

    fn validate(&self) -> Result<(), DatasetError> {
        if self.key_increment == 0 {
            return Err(DatasetError::InvalidParameters("key increment must be at least 1".into()));
        }
        if self.key_len.is_empty() {
            return Err(DatasetError::InvalidParameters(format!(
                "key length range {:?} is empty",
                self.key_len
            )));
        }
        if self.value_len.is_empty() {
            return Err(DatasetError::InvalidParameters(format!(
                "value length range {:?} is empty",
                self.value_len
            )));
        }
        Ok(())
    }

    /// The next key after `prev`, preferring length `len` and growing up to
    /// the maximum key length when no key of that length fits.
    fn next_key(&self, prev: &[u8], len: usize) -> Option<Vec<u8>> {
        let incr = self.key_increment;
        for len in len..=*self.key_len.end() {
            if len > prev.len() {
                let mut key = prev.to_vec();
                key.resize(len, 0);
                return Some(key);
            }
            if let Some(j) = (0..len).rev().find(|&j| prev[j].checked_add(incr).is_some()) {
                let mut key = prev[..j].to_vec();
                key.push(prev[j] + incr);
                key.resize(len, 0);
                return Some(key);
            }
        }
        None
    }
}

/// The fixed dataset matrix every conformance suite runs against.
///
/// `seed` drives the two generated datasets.
///
/// # Errors
///
/// Propagates [`DatasetError`] from the generator.
pub fn standard_matrix(seed: u64) -> Result<Vec<NamedDataset>, DatasetError> {
    Ok(vec![
        NamedDataset::new("with no key/value (empty)", empty()),
        NamedDataset::new("with empty key", empty_key()),
        NamedDataset::new("with empty value", empty_value()),
        NamedDataset::new("with one key/value", one_key_value()),
        NamedDataset::new("with big value", big_value()),
        NamedDataset::new("with special key", special_key()),
        NamedDataset::new("with multiple key/value", multiple_key_value()),
        NamedDataset::new(
            "with generated key/value 2-incr",
            Generator::new(120, 2, 1, 50, 10, 120).generate(seed)?,
        ),
        NamedDataset::new(
            "with generated key/value 3-incr",
            Generator::new(120, 3, 1, 50, 10, 120).generate(seed.wrapping_add(1))?,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn canned_datasets_are_sorted_and_unique() {
        for named in standard_matrix(42).unwrap() {
            let keys: Vec<_> = named.dataset.iter().map(|e| e.key.clone()).collect();
            assert!(keys.windows(2).all(|w| w[0] < w[1]), "{} is not strictly sorted", named.name);
        }
    }

    #[test]
    fn matrix_shapes() {
        let matrix = standard_matrix(42).unwrap();
        let lens: Vec<_> = matrix.iter().map(|n| n.dataset.len()).collect();
        assert_eq!(lens, vec![0, 1, 2, 1, 1, 8, 19, 120, 120]);
        assert_eq!(matrix[4].dataset.entry_at(0).1.len(), BIG_VALUE_LEN);
    }

    #[test]
    fn special_keys_include_tight_neighbours() {
        let dataset = special_key();
        assert_eq!(dataset.key_at(1), b"\x00\x00");
        assert!(!dataset.inexact_key_at(1).is_distinct());
        assert!(dataset.inexact_key_at(0).is_distinct());
    }

    #[test]
    fn generator_is_reproducible() {
        let generator = Generator::new(120, 2, 1, 50, 10, 120);
        let a = generator.generate(7).unwrap();
        let b = generator.generate(7).unwrap();
        assert_eq!(a.len(), 120);
        assert_eq!(a.entries(), b.entries());
        assert_ne!(a.entries(), generator.generate(8).unwrap().entries());
        for entry in &a {
            assert!((1..=50).contains(&entry.key.len()));
            assert!((10..=120).contains(&entry.value.len()));
        }
    }

    #[test]
    fn generator_rejects_bad_parameters() {
        assert!(matches!(
            Generator::new(3, 0, 1, 2, 0, 0).generate(1),
            Err(DatasetError::InvalidParameters(_))
        ));
        assert!(matches!(
            Generator::new(3, 1, 5, 2, 0, 0).generate(1),
            Err(DatasetError::InvalidParameters(_))
        ));
    }

    #[test]
    fn generator_reports_exhausted_key_space() {
        // One-byte keys stepping by 128: 0x00, 0x80, then nothing.
        assert_eq!(
            Generator::new(3, 128, 1, 1, 0, 0).generate(1),
            Err(DatasetError::KeySpaceExhausted {
                generated: 2,
                requested: 3
            })
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn generated_keys_keep_every_entry(
            seed in any::<u64>(),
            incr in 1u8..=8,
            min_len in 2usize..4,
            extra in 0usize..8,
        ) {
            let dataset = Generator::new(60, incr, min_len, min_len + extra, 0, 4).generate(seed).unwrap();
            prop_assert_eq!(dataset.len(), 60);
        }
    }
}
