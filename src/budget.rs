use std::time::{Duration, Instant};

use crate::error::Violation;

/// A cooperative wall-clock budget for one conformance case.
///
/// Checks call [`check`](Budget::check) between samples; once the deadline
/// has passed the case stops with [`Violation::BudgetExceeded`].
#[derive(Clone, Copy, Debug)]
pub struct Budget {
    limit: Duration,
    started: Instant,
    samples: usize,
}

impl Budget {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Budget {
            limit,
            started: Instant::now(),
            samples: 0,
        }
    }

    /// A budget that never runs out.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(Duration::MAX)
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of samples counted by [`check`](Budget::check) so far.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Counts one sample and fails if the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`Violation::BudgetExceeded`] once more than
    /// [`limit`](Budget::limit) has elapsed since the budget was created.
    pub fn check(&mut self) -> Result<(), Violation> {
        self.samples += 1;
        if self.elapsed() > self.limit {
            return Err(Violation::BudgetExceeded {
                budget: self.limit,
                samples: self.samples,
            });
        }
        Ok(())
    }
}
