//! The iterator oracle.
//!
//! Drives a candidate's range iterator through forward scans, seeks,
//! reverse scans and a random walk, comparing every position with the
//! expected sub-dataset of the range.

use crate::budget::Budget;
use crate::capability::{KvIterator, NewIterator};
use crate::dataset::SortedDataset;
use crate::error::Violation;
use crate::key::{after_last, bytes_after, quoted, quoted_value, successor};
use crate::range::QueryRange;
use crate::sampler::Sampler;

const CHECK: &str = "iterator";

/// Upper bound on the number of random-walk steps per iterator.
const MAX_WALK: usize = 100;

/// Checks that `db` iterates `range` exactly like `expected`.
///
/// `expected` must hold exactly the entries inside `range`.
///
/// # Errors
///
/// Returns [`Violation::Assertion`] describing the first position, action
/// and range where the iterator diverged, or [`Violation::BudgetExceeded`]
/// if `budget` runs out first.
pub fn check_iterator(
    db: &dyn NewIterator,
    range: &QueryRange,
    expected: &SortedDataset,
    sampler: &mut Sampler,
    budget: &mut Budget,
) -> Result<(), Violation> {
    let iter = db.new_iterator(range);
    let mut oracle = Oracle {
        iter,
        range,
        expected,
        budget,
    };
    oracle.no_error("new_iterator()")?;
    let mut twin = db.new_iterator(range);

    oracle.forward()?;
    oracle.seeks(sampler)?;
    if oracle.iter.supports_reverse() {
        oracle.backward(sampler)?;
        oracle.walk(sampler)?;
    }

    oracle.iter.release();
    oracle.no_error("release()")?;

    // The twin was opened before the release and must be unaffected by it.
    let drained = drain(twin.as_mut(), oracle.budget)?;
    twin.release();
    if let Some(err) = twin.error() {
        return Err(Violation::assertion(
            CHECK,
            format!("{range}: second iterator reported {err} after release()"),
        ));
    }
    let diverged = (0..drained.len().max(expected.len())).find(|&i| {
        let got = drained.get(i).map(|(k, v)| (k.as_slice(), v.as_slice()));
        let want = expected.entries().get(i).map(|e| (e.key.as_slice(), e.value.as_slice()));
        got != want
    });
    match diverged {
        Some(i) => Err(Violation::assertion(
            CHECK,
            format!(
                "{range}: second iterator diverged at #{i}, yielding {} of {} entries",
                drained.len(),
                expected.len()
            ),
        )),
        None => Ok(()),
    }
}

fn drain(iter: &mut dyn KvIterator, budget: &mut Budget) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Violation> {
    let mut seen = Vec::new();
    while iter.next() {
        budget.check()?;
        let key = iter.key().unwrap_or_default().to_vec();
        let value = iter.value().unwrap_or_default().to_vec();
        seen.push((key, value));
    }
    Ok(seen)
}

struct Oracle<'a, 'b> {
    iter: Box<dyn KvIterator + 'a>,
    range: &'b QueryRange,
    expected: &'b SortedDataset,
    budget: &'b mut Budget,
}

impl Oracle<'_, '_> {
    fn fail(&self, action: &str, detail: impl AsRef<str>) -> Violation {
        Violation::assertion(CHECK, format!("{}: after {action}: {}", self.range, detail.as_ref()))
    }

    fn no_error(&self, action: &str) -> Result<(), Violation> {
        match self.iter.error() {
            Some(err) => Err(self.fail(action, format!("iterator reported {err}"))),
            None => Ok(()),
        }
    }

    /// Where a seek to `key` must land.
    fn seek_target(&self, key: &[u8]) -> Option<usize> {
        let pos = self.expected.search(key);
        (pos < self.expected.len()).then_some(pos)
    }

    /// Verifies the iterator sits on `pos`, or is exhausted for `None`.
    ///
    /// `moved` is the return value of the positioning call, which must agree
    /// with `valid()`.
    fn expect_at(&mut self, action: &str, moved: bool, pos: Option<usize>) -> Result<(), Violation> {
        self.budget.check()?;
        self.no_error(action)?;
        let valid = self.iter.valid();
        if moved != valid {
            return Err(self.fail(action, format!("returned {moved} but valid() is {valid}")));
        }
        let Some(pos) = pos else {
            if valid {
                let key = self.iter.key().unwrap_or_default();
                return Err(self.fail(action, format!("expected exhaustion, got key {}", quoted(key))));
            }
            return Ok(());
        };

        let (key, value) = self.expected.entry_at(pos);
        if !valid {
            return Err(self.fail(
                action,
                format!("expected key {} at #{pos}, iterator is exhausted", quoted(key)),
            ));
        }
        match (self.iter.key(), self.iter.value()) {
            (Some(got), _) if got != key => Err(self.fail(
                action,
                format!("expected key {} at #{pos}, got {}", quoted(key), quoted(got)),
            )),
            (Some(_), Some(got)) if got != value => Err(self.fail(
                action,
                format!(
                    "expected value {} for key {}, got {}",
                    quoted_value(value),
                    quoted(key),
                    quoted_value(got)
                ),
            )),
            (Some(_), Some(_)) => Ok(()),
            _ => Err(self.fail(action, "valid() is true but key or value is missing")),
        }
    }

    fn forward(&mut self) -> Result<(), Violation> {
        let len = self.expected.len();
        if self.iter.valid() {
            return Err(self.fail("new_iterator()", "fresh iterator is already positioned"));
        }
        for i in 0..len {
            let moved = self.iter.next();
            self.expect_at(&format!("next() #{i}"), moved, Some(i))?;
        }
        let moved = self.iter.next();
        self.expect_at(&format!("next() #{len}"), moved, None)?;
        let moved = self.iter.next();
        self.expect_at("next() past the end", moved, None)
    }

    fn seeks(&mut self, sampler: &mut Sampler) -> Result<(), Violation> {
        let len = self.expected.len();
        let head = (len > 0).then_some(0);

        let moved = self.iter.first();
        self.expect_at("first()", moved, head)?;

        for i in sampler.shuffled(len) {
            let key = self.expected.key_at(i).to_vec();
            let moved = self.iter.seek(&key);
            self.expect_at(&format!("seek({})", quoted(&key)), moved, Some(i))?;

            let probe = self.expected.inexact_key_at(i).probe;
            let moved = self.iter.seek(&probe);
            let target = self.seek_target(&probe);
            self.expect_at(&format!("seek({})", quoted(&probe)), moved, target)?;

            let after = successor(&key);
            let moved = self.iter.seek(&after);
            let target = (i + 1 < len).then_some(i + 1);
            self.expect_at(&format!("seek({})", quoted(&after)), moved, target)?;
        }

        let mut outside = vec![Vec::new(), after_last(self.expected.last_key())];
        if let Some(last) = self.expected.last_key() {
            outside.push(bytes_after(last));
        }
        if let Some(start) = &self.range.start {
            outside.push(start.clone());
        }
        if let Some(limit) = &self.range.limit {
            outside.push(limit.clone());
            outside.push(successor(limit));
        }
        for key in outside {
            let moved = self.iter.seek(&key);
            let target = self.seek_target(&key);
            self.expect_at(&format!("seek({})", quoted(&key)), moved, target)?;
        }
        Ok(())
    }

    fn backward(&mut self, sampler: &mut Sampler) -> Result<(), Violation> {
        let len = self.expected.len();
        let tail = len.checked_sub(1);

        let moved = self.iter.last();
        self.expect_at("last()", moved, tail)?;
        if let Some(tail) = tail {
            for i in (0..tail).rev() {
                let moved = self.iter.prev();
                self.expect_at(&format!("prev() to #{i}"), moved, Some(i))?;
            }
            let moved = self.iter.prev();
            self.expect_at("prev() before the first entry", moved, None)?;
        }

        for i in sampler.shuffled(len).take(MAX_WALK) {
            let key = self.expected.key_at(i).to_vec();
            let moved = self.iter.seek(&key);
            self.expect_at(&format!("seek({})", quoted(&key)), moved, Some(i))?;
            let moved = self.iter.prev();
            self.expect_at(&format!("prev() from {}", quoted(&key)), moved, i.checked_sub(1))?;
        }
        Ok(())
    }

    /// Random next/prev/seek/first/last steps checked against a model cursor.
    fn walk(&mut self, sampler: &mut Sampler) -> Result<(), Violation> {
        let len = self.expected.len();
        if len == 0 {
            return Ok(());
        }
        let mut pos: Option<usize> = None;
        for step in 0..(len * 2).min(MAX_WALK) {
            let action = match pos {
                Some(_) => sampler.index(5),
                // Stepping off either end leaves no model position to move from.
                None => 2 + sampler.index(3),
            };
            let (label, moved, target) = match action {
                0 => {
                    let target = pos.and_then(|p| (p + 1 < len).then_some(p + 1));
                    (format!("walk #{step} next()"), self.iter.next(), target)
                }
                1 => {
                    let target = pos.and_then(|p| p.checked_sub(1));
                    (format!("walk #{step} prev()"), self.iter.prev(), target)
                }
                2 => (format!("walk #{step} first()"), self.iter.first(), Some(0)),
                3 => (format!("walk #{step} last()"), self.iter.last(), Some(len - 1)),
                _ => {
                    let i = sampler.index(len);
                    let probe = self.expected.inexact_key_at(i).probe;
                    let target = self.seek_target(&probe);
                    (
                        format!("walk #{step} seek({})", quoted(&probe)),
                        self.iter.seek(&probe),
                        target,
                    )
                }
            };
            self.expect_at(&label, moved, target)?;
            pos = target;
        }
        Ok(())
    }
}
