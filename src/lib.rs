//! Conformance testing for ordered key-value stores.
//!
//! This crate certifies that a store behaves like a sorted key-value mapping.
//! It runs a reproducible battery of property checks against a reference
//! [`SortedDataset`], covering whichever capabilities the store exposes:
//!
//! - [`Find`] - nearest-match lookup (first key `>=` the probe)
//! - [`Get`] - exact lookup
//! - [`Has`] - existence check
//! - [`NewIterator`] - range iteration with seeking
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use kv_conformance::{Candidate, Get, SetupError, StoreError, Suite, SuiteConfig};
//!
//! struct Store(BTreeMap<Vec<u8>, Vec<u8>>);
//!
//! impl Get for Store {
//!     fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
//!         self.0.get(key).cloned().ok_or(StoreError::NotFound)
//!     }
//! }
//!
//! impl Candidate for Store {
//!     fn as_get(&self) -> Option<&dyn Get> {
//!         Some(self)
//!     }
//! }
//!
//! let report = Suite::new("btree", |dataset| {
//!     let map = dataset.iter().map(|e| (e.key.clone(), e.value.clone())).collect();
//!     Ok::<_, SetupError>(Store(map))
//! })
//! .config(SuiteConfig::default().with_seed(7))
//! .run()
//! .unwrap();
//!
//! report.assert_passed();
//! ```
//!
//! # Features
//!
//! - **Capability based** - checks for capabilities a store lacks are skipped, never failed
//! - **Reproducible** - every random choice flows from one logged seed
//! - **Boundary coverage** - probes between every pair of adjacent keys and past both ends
//! - **Bounded cost** - randomized sub-range passes sample at most 50 windows under a time budget
//!
//! # Implementation
//!
//! A [`Suite`] walks a fixed matrix of canned and generated datasets (see
//! [`fixtures`]). For each dataset it builds a candidate through the setup
//! closure, probes its [`Capabilities`], runs the point checks in [`checks`]
//! and the iterator [`oracle`], and records every outcome in a
//! [`SuiteReport`].
//!
//! # Budgets
//!
//! Time budgets are cooperative. Checks test the deadline between samples,
//! so a slow case fails with [`Violation::BudgetExceeded`] once its current
//! sample returns. A candidate call that never returns is not timed out and
//! blocks the whole run; stores that can hang should enforce their own
//! timeouts and report them as [`StoreError::Fault`].

// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod budget;
mod config;
mod dataset;
mod error;
mod range;
mod sampler;

pub mod capability;
pub mod checks;
pub mod fixtures;
pub mod key;
pub mod oracle;
pub mod suite;

pub use budget::Budget;
pub use capability::{Candidate, Capabilities, Capability, Find, Get, Has, KvIterator, NewIterator};
pub use config::{SEED_ENV, SuiteConfig};
pub use dataset::{Entry, InexactKey, SortedDataset};
pub use error::{DatasetError, SetupError, StoreError, SuiteError, Violation};
pub use range::QueryRange;
pub use sampler::{Sampler, ShuffledIndices};
pub use suite::{CaseReport, EntryReport, Outcome, Suite, SuiteReport, run_entry};
