//! Point-lookup property checks.
//!
//! Each check walks the dataset in shuffled order, probes the candidate with
//! the exact key and the inexact probe of every position, and reports the
//! first divergence with the inputs that produced it.

use crate::budget::Budget;
use crate::capability::{Find, Get, Has};
use crate::dataset::{InexactKey, SortedDataset};
use crate::error::{StoreError, Violation};
use crate::key::{after_last, quoted, quoted_value};
use crate::sampler::Sampler;

const FIND: &str = "find";
const FIND_AFTER_LAST: &str = "find after last";
const GET: &str = "get";
const HAS: &str = "has";

/// `find` resolves both the exact key and the inexact probe of every
/// position to that position's entry.
///
/// # Errors
///
/// Returns [`Violation::Assertion`] naming the first key or probe that
/// resolved wrongly or failed, or [`Violation::BudgetExceeded`] if `budget`
/// runs out first.
pub fn check_find(
    db: &dyn Find,
    expected: &SortedDataset,
    sampler: &mut Sampler,
    budget: &mut Budget,
) -> Result<(), Violation> {
    for i in sampler.shuffled(expected.len()) {
        budget.check()?;
        let target = expected.inexact_key_at(i);
        find_resolves(db, target.key, "exact", &target)?;
        find_resolves(db, &target.probe, "inexact", &target)?;
    }
    Ok(())
}

fn find_resolves(db: &dyn Find, key: &[u8], kind: &str, target: &InexactKey<'_>) -> Result<(), Violation> {
    let context = || format!("find({kind} key {}) for {}", quoted(key), quoted(target.key));
    match db.find(key) {
        Ok((found, value)) => {
            if found.as_slice() != target.key {
                return Err(Violation::assertion(
                    FIND,
                    format!("{} returned key {}", context(), quoted(&found)),
                ));
            }
            if value.as_slice() != target.value {
                return Err(Violation::assertion(
                    FIND,
                    format!(
                        "{} returned value {}, expected {}",
                        context(),
                        quoted_value(&value),
                        quoted_value(target.value)
                    ),
                ));
            }
            Ok(())
        }
        Err(err) => Err(Violation::assertion(FIND, format!("{} failed: {err}", context()))),
    }
}

/// `find` past the last key must report [`StoreError::NotFound`].
///
/// # Errors
///
/// Returns [`Violation::Assertion`] if the lookup yields a key or fails with
/// any other error.
pub fn check_find_after_last(db: &dyn Find, expected: &SortedDataset) -> Result<(), Violation> {
    let probe = after_last(expected.last_key());
    match db.find(&probe) {
        Err(StoreError::NotFound) => Ok(()),
        Ok((found, _)) => Err(Violation::assertion(
            FIND_AFTER_LAST,
            format!("find({}) yielded key {}", quoted(&probe), quoted(&found)),
        )),
        Err(err) => Err(Violation::assertion(
            FIND_AFTER_LAST,
            format!("find({}) failed with {err}, expected not found", quoted(&probe)),
        )),
    }
}

/// `get` returns the value of every exact key and misses every distinct
/// inexact probe.
///
/// # Errors
///
/// Returns [`Violation::Assertion`] for the first wrong value, unexpected
/// hit or error, or [`Violation::BudgetExceeded`] if `budget` runs out first.
pub fn check_get(
    db: &dyn Get,
    expected: &SortedDataset,
    sampler: &mut Sampler,
    budget: &mut Budget,
) -> Result<(), Violation> {
    for i in sampler.shuffled(expected.len()) {
        budget.check()?;
        let target = expected.inexact_key_at(i);

        match db.get(target.key) {
            Ok(value) if value.as_slice() == target.value => {}
            Ok(value) => {
                return Err(Violation::assertion(
                    GET,
                    format!(
                        "get({}) returned value {}, expected {}",
                        quoted(target.key),
                        quoted_value(&value),
                        quoted_value(target.value)
                    ),
                ));
            }
            Err(err) => {
                return Err(Violation::assertion(GET, format!("get({}) failed: {err}", quoted(target.key))));
            }
        }

        if !target.is_distinct() {
            continue;
        }
        match db.get(&target.probe) {
            Err(StoreError::NotFound) => {}
            Ok(value) => {
                return Err(Violation::assertion(
                    GET,
                    format!(
                        "get({}) for absent key returned value {}",
                        quoted(&target.probe),
                        quoted_value(&value)
                    ),
                ));
            }
            Err(err) => {
                return Err(Violation::assertion(
                    GET,
                    format!("get({}) failed with {err}, expected not found", quoted(&target.probe)),
                ));
            }
        }
    }
    Ok(())
}

/// `has` is true for every exact key and false, without error, for every
/// distinct inexact probe.
///
/// # Errors
///
/// Returns [`Violation::Assertion`] for the first wrong answer or error, or
/// [`Violation::BudgetExceeded`] if `budget` runs out first.
pub fn check_has(
    db: &dyn Has,
    expected: &SortedDataset,
    sampler: &mut Sampler,
    budget: &mut Budget,
) -> Result<(), Violation> {
    for i in sampler.shuffled(expected.len()) {
        budget.check()?;
        let target = expected.inexact_key_at(i);

        match db.has(target.key) {
            Ok(true) => {}
            Ok(false) => {
                return Err(Violation::assertion(HAS, format!("has({}) is false", quoted(target.key))));
            }
            Err(err) => {
                return Err(Violation::assertion(HAS, format!("has({}) failed: {err}", quoted(target.key))));
            }
        }

        if !target.is_distinct() {
            continue;
        }
        match db.has(&target.probe) {
            Ok(false) => {}
            Ok(true) => {
                return Err(Violation::assertion(
                    HAS,
                    format!("has({}) is true for absent key", quoted(&target.probe)),
                ));
            }
            Err(err) => {
                return Err(Violation::assertion(
                    HAS,
                    format!("has({}) failed: {err}", quoted(&target.probe)),
                ));
            }
        }
    }
    Ok(())
}
