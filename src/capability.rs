//! Capabilities a candidate store may expose.
//!
//! A store implements [`Candidate`] and overrides the accessor of every
//! capability it supports. [`Capabilities::probe`] collects the handles once,
//! and checks for missing capabilities are skipped rather than failed.

use std::fmt;

use crate::error::StoreError;
use crate::range::QueryRange;

/// Nearest-match lookup: the first entry whose key is `>= key`.
pub trait Find {
    /// Returns [`StoreError::NotFound`] only when no key `>= key` exists.
    fn find(&self, key: &[u8]) -> Result<(Vec<u8>, Vec<u8>), StoreError>;
}

/// Exact-match lookup.
pub trait Get {
    /// Returns [`StoreError::NotFound`] when `key` is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;
}

/// Existence check.
pub trait Has {
    /// Absence is `Ok(false)`; errors are reserved for genuine faults.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError>;
}

/// Range iteration.
pub trait NewIterator {
    /// Opens an iterator over the entries inside `range`.
    fn new_iterator(&self, range: &QueryRange) -> Box<dyn KvIterator + '_>;
}

/// A positioned cursor over the entries of a [`QueryRange`].
///
/// A fresh iterator is unpositioned: `valid()` is false and the first
/// `next()` moves to the first entry of the range. Every positioning call
/// returns whether the iterator ended up on an entry.
pub trait KvIterator {
    /// The sticky error of the iterator, if any.
    fn error(&self) -> Option<&StoreError>;

    fn valid(&self) -> bool;

    fn first(&mut self) -> bool;

    fn last(&mut self) -> bool;

    /// Moves to the first entry with key `>= key` inside the range.
    fn seek(&mut self, key: &[u8]) -> bool;

    fn next(&mut self) -> bool;

    fn prev(&mut self) -> bool;

    /// The current key; `None` when not valid.
    fn key(&self) -> Option<&[u8]>;

    /// The current value; `None` when not valid.
    fn value(&self) -> Option<&[u8]>;

    /// Releases the resources held by the iterator.
    fn release(&mut self);

    /// Whether `last` and `prev` are implemented.
    fn supports_reverse(&self) -> bool {
        true
    }
}

/// A store under test.
///
/// Every accessor defaults to `None`; a store returns `Some(self)` for each
/// capability it implements.
///
/// ```
/// use kv_conformance::{Candidate, Capabilities, Capability, Has, StoreError};
///
/// struct OnlyHas;
///
/// impl Has for OnlyHas {
///     fn has(&self, _key: &[u8]) -> Result<bool, StoreError> {
///         Ok(false)
///     }
/// }
///
/// impl Candidate for OnlyHas {
///     fn as_has(&self) -> Option<&dyn Has> {
///         Some(self)
///     }
/// }
///
/// let caps = Capabilities::probe(&OnlyHas);
/// assert!(caps.supports(Capability::Has));
/// assert!(!caps.supports(Capability::Find));
/// ```
pub trait Candidate {
    fn as_find(&self) -> Option<&dyn Find> {
        None
    }

    fn as_get(&self) -> Option<&dyn Get> {
        None
    }

    fn as_has(&self) -> Option<&dyn Has> {
        None
    }

    fn as_iterator(&self) -> Option<&dyn NewIterator> {
        None
    }
}

impl<T: Candidate + ?Sized> Candidate for Box<T> {
    fn as_find(&self) -> Option<&dyn Find> {
        (**self).as_find()
    }

    fn as_get(&self) -> Option<&dyn Get> {
        (**self).as_get()
    }

    fn as_has(&self) -> Option<&dyn Has> {
        (**self).as_has()
    }

    fn as_iterator(&self) -> Option<&dyn NewIterator> {
        (**self).as_iterator()
    }
}

/// One capability of the set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Nearest-match lookup ([`Find`]).
    Find,
    /// Exact lookup ([`Get`]).
    Get,
    /// Existence check ([`Has`]).
    Has,
    /// Range iteration ([`NewIterator`]).
    Iterate,
}

impl Capability {
    pub const ALL: [Capability; 4] = [Capability::Find, Capability::Get, Capability::Has, Capability::Iterate];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Capability::Find => "find",
            Capability::Get => "get",
            Capability::Has => "has",
            Capability::Iterate => "iterate",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The capability handles of one candidate, collected once.
#[derive(Clone, Copy, Default)]
pub struct Capabilities<'a> {
    pub find: Option<&'a dyn Find>,
    pub get: Option<&'a dyn Get>,
    pub has: Option<&'a dyn Has>,
    pub iterate: Option<&'a dyn NewIterator>,
}

impl<'a> Capabilities<'a> {
    #[must_use]
    pub fn probe<C: Candidate + ?Sized>(candidate: &'a C) -> Self {
        Capabilities {
            find: candidate.as_find(),
            get: candidate.as_get(),
            has: candidate.as_has(),
            iterate: candidate.as_iterator(),
        }
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Find => self.find.is_some(),
            Capability::Get => self.get.is_some(),
            Capability::Has => self.has.is_some(),
            Capability::Iterate => self.iterate.is_some(),
        }
    }

    #[must_use]
    pub fn supported(&self) -> Vec<Capability> {
        Capability::ALL.into_iter().filter(|&c| self.supports(c)).collect()
    }
}

impl fmt::Debug for Capabilities<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.supported()).finish()
    }
}
