use std::time::Duration;

use thiserror::Error;

/// Error reported by a candidate store.
///
/// `NotFound` is the only error the conformance checks ever expect; anything
/// else is a [`StoreError::Fault`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry satisfies the lookup.
    #[error("not found")]
    NotFound,

    /// Any other failure inside the store.
    #[error("store fault: {0}")]
    Fault(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Error raised by setup or teardown collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SetupError(pub String);

impl SetupError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        SetupError(message.into())
    }
}

/// Why a conformance case failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The candidate diverged from the dataset ground truth.
    #[error("{check}: {detail}")]
    Assertion { check: &'static str, detail: String },

    /// The setup collaborator failed; the whole entry is aborted.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The teardown collaborator failed.
    #[error("teardown failed: {0}")]
    Teardown(String),

    /// The case ran out of its wall-clock budget.
    #[error("budget of {budget:?} exceeded after {samples} samples")]
    BudgetExceeded { budget: Duration, samples: usize },

    /// The candidate panicked while being exercised.
    #[error("candidate panicked: {0}")]
    Panicked(String),
}

impl Violation {
    pub(crate) fn assertion(check: &'static str, detail: impl Into<String>) -> Self {
        Violation::Assertion {
            check,
            detail: detail.into(),
        }
    }
}

/// Error building or slicing a [`SortedDataset`](crate::SortedDataset).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// The half-open index range does not fit the dataset.
    #[error("slice {start}..{limit} out of bounds for dataset of length {len}")]
    SliceOutOfBounds { start: usize, limit: usize, len: usize },

    /// Generator parameters are inconsistent.
    #[error("invalid generator parameters: {0}")]
    InvalidParameters(String),

    /// The generator could not produce another strictly increasing key.
    #[error("key space exhausted after {generated} of {requested} keys")]
    KeySpaceExhausted { generated: usize, requested: usize },
}

/// Error preventing a suite from running at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuiteError {
    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    /// The dataset matrix could not be built.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
