//! Suite assembly and execution.
//!
//! A [`Suite`] runs the conformance cases against one candidate per dataset
//! of its matrix and collects the outcomes in a [`SuiteReport`]. Failures are
//! recorded per case; nothing short of an unusable configuration aborts the
//! run.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::budget::Budget;
use crate::capability::{Candidate, Capabilities};
use crate::checks::{check_find, check_find_after_last, check_get, check_has};
use crate::config::SuiteConfig;
use crate::dataset::SortedDataset;
use crate::error::{SetupError, SuiteError, Violation};
use crate::fixtures::{NamedDataset, standard_matrix};
use crate::oracle::check_iterator;
use crate::range::QueryRange;
use crate::sampler::Sampler;

type Setup<'s, C> = Box<dyn FnMut(SortedDataset) -> Result<C, SetupError> + 's>;
type Teardown<'s, C> = Box<dyn FnMut(C) -> Result<(), SetupError> + 's>;

/// A named conformance suite over a dataset matrix.
///
/// # Examples
///
/// ```
/// use kv_conformance::{Candidate, SetupError, Suite, SuiteConfig};
///
/// struct Unsupported;
///
/// impl Candidate for Unsupported {}
///
/// let report = Suite::new("nothing", |_dataset| Ok::<_, SetupError>(Unsupported))
///     .config(SuiteConfig::default().with_seed(1))
///     .run()
///     .unwrap();
/// // Every case is skipped, so nothing fails.
/// report.assert_passed();
/// assert_eq!(report.skipped(), report.cases());
/// ```
pub struct Suite<'s, C> {
    name: String,
    config: SuiteConfig,
    datasets: Option<Vec<NamedDataset>>,
    setup: Setup<'s, C>,
    teardown: Option<Teardown<'s, C>>,
}

impl<'s, C: Candidate> Suite<'s, C> {
    /// Creates a suite whose candidates are built by `setup`.
    ///
    /// `setup` receives an independent copy of each dataset.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: FnMut(SortedDataset) -> Result<C, SetupError> + 's,
    {
        Suite {
            name: name.into(),
            config: SuiteConfig::default(),
            datasets: None,
            setup: Box::new(setup),
            teardown: None,
        }
    }

    /// Releases each candidate after its entry has run.
    #[must_use]
    pub fn teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnMut(C) -> Result<(), SetupError> + 's,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    #[must_use]
    pub fn config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the standard matrix.
    #[must_use]
    pub fn datasets(mut self, datasets: Vec<NamedDataset>) -> Self {
        self.datasets = Some(datasets);
        self
    }

    /// Runs every entry in order.
    ///
    /// Without a configured seed a fresh one is drawn; either way it is
    /// logged and stored in [`SuiteReport::seed`].
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::Dataset`] if the standard matrix cannot be
    /// generated. Failures of the candidate never abort the run; they are
    /// recorded in the report.
    pub fn run(mut self) -> Result<SuiteReport, SuiteError> {
        let mut shared = match self.config.seed {
            Some(seed) => Sampler::new(seed),
            None => Sampler::from_entropy(),
        };
        let seed = shared.seed();
        let _span = info_span!("suite", suite = %self.name, seed).entered();
        info!("running conformance suite");

        let datasets = match self.datasets.take() {
            Some(datasets) => datasets,
            None => standard_matrix(seed)?,
        };
        let mut entries = Vec::with_capacity(datasets.len());
        for named in &datasets {
            let mut forked;
            let sampler = if self.config.seed_per_entry {
                forked = shared.fork();
                &mut forked
            } else {
                &mut shared
            };
            entries.push(self.run_one(named, sampler));
        }

        let report = SuiteReport {
            suite: self.name,
            seed,
            entries,
        };
        info!(
            cases = report.cases(),
            failed = report.failed(),
            skipped = report.skipped(),
            "conformance suite finished"
        );
        Ok(report)
    }

    fn run_one(&mut self, named: &NamedDataset, sampler: &mut Sampler) -> EntryReport {
        let _span = info_span!("entry", dataset = %named.name, len = named.dataset.len()).entered();

        let setup = &mut self.setup;
        let candidate = match catch_unwind(AssertUnwindSafe(|| setup(named.dataset.clone_independent()))) {
            Ok(Ok(candidate)) => candidate,
            Ok(Err(err)) => return EntryReport::aborted(&named.name, "setup", Violation::Setup(err.0)),
            Err(payload) => {
                return EntryReport::aborted(&named.name, "setup", Violation::Panicked(panic_message(&*payload)));
            }
        };

        let mut report = run_entry(&named.name, &named.dataset, &candidate, &self.config, sampler);

        if let Some(teardown) = &mut self.teardown {
            let violation = match catch_unwind(AssertUnwindSafe(|| teardown(candidate))) {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(Violation::Teardown(err.0)),
                Err(payload) => Some(Violation::Panicked(panic_message(&*payload))),
            };
            if let Some(violation) = violation {
                warn!(%violation, "teardown failed");
                report.cases.push(CaseReport {
                    name: "teardown",
                    outcome: Outcome::Failed(violation),
                    elapsed: Duration::ZERO,
                });
            }
        }
        report
    }
}

/// Runs every applicable case against an already built candidate.
///
/// `candidate` must hold exactly the entries of `dataset`.
pub fn run_entry<C: Candidate + ?Sized>(
    name: &str,
    dataset: &SortedDataset,
    candidate: &C,
    config: &SuiteConfig,
    sampler: &mut Sampler,
) -> EntryReport {
    let caps = Capabilities::probe(candidate);
    debug!(capabilities = ?caps, "probed candidate");
    let len = dataset.len();
    let samples = len.min(config.sample_limit);
    let mut cases = Vec::with_capacity(7);

    cases.push(run_case("find all keys with Find", caps.find, config.check_budget, |db, budget| {
        check_find(db, dataset, sampler, budget)
    }));
    cases.push(run_case(
        "error on Find after the last key",
        caps.find,
        config.check_budget,
        |db, _| check_find_after_last(db, dataset),
    ));
    cases.push(run_case("only exact keys with Get", caps.get, config.check_budget, |db, budget| {
        check_get(db, dataset, sampler, budget)
    }));
    cases.push(run_case("only present keys with Has", caps.has, config.check_budget, |db, budget| {
        check_has(db, dataset, sampler, budget)
    }));
    cases.push(run_case(
        "iterate and seek over the full range",
        caps.iterate,
        config.full_scan_budget,
        |db, budget| check_iterator(db, &QueryRange::unbounded(), dataset, sampler, budget),
    ));
    cases.push(run_case(
        "iterate and seek over random index slices",
        caps.iterate,
        config.slice_budget,
        |db, budget| {
            for i in sampler.random_indices(len, samples) {
                let probe = dataset.inexact_key_at(i).probe;
                let slices = [
                    (QueryRange::new(Some(probe.clone()), None), i, len),
                    (QueryRange::new(None, Some(probe)), 0, i),
                ];
                for (range, start, limit) in slices {
                    debug!(start, limit, "random index slice");
                    check_iterator(db, &range, &dataset.slice(start, limit), sampler, budget)?;
                }
            }
            Ok(())
        },
    ));
    cases.push(run_case(
        "iterate and seek over random ranges",
        caps.iterate,
        config.slice_budget,
        |db, budget| {
            for (start, limit) in sampler.random_ranges(len, samples) {
                debug!(start, limit, "random range");
                let range = dataset.range_for(start, limit);
                check_iterator(db, &range, &dataset.slice(start, limit), sampler, budget)?;
            }
            Ok(())
        },
    ));

    EntryReport {
        dataset: name.to_owned(),
        cases,
    }
}

fn run_case<T: ?Sized>(
    name: &'static str,
    handle: Option<&T>,
    limit: Duration,
    body: impl FnOnce(&T, &mut Budget) -> Result<(), Violation>,
) -> CaseReport {
    let Some(db) = handle else {
        debug!(case = name, "skipped, capability missing");
        return CaseReport {
            name,
            outcome: Outcome::Skipped,
            elapsed: Duration::ZERO,
        };
    };

    let mut budget = Budget::new(limit);
    let result = catch_unwind(AssertUnwindSafe(|| body(db, &mut budget)));
    let elapsed = budget.elapsed();
    let outcome = match result {
        Ok(Ok(())) if elapsed > budget.limit() => Outcome::Failed(Violation::BudgetExceeded {
            budget: budget.limit(),
            samples: budget.samples(),
        }),
        Ok(Ok(())) => Outcome::Passed,
        Ok(Err(violation)) => Outcome::Failed(violation),
        Err(payload) => Outcome::Failed(Violation::Panicked(panic_message(&*payload))),
    };

    match &outcome {
        Outcome::Failed(violation) => warn!(case = name, ?elapsed, %violation, "case failed"),
        _ => debug!(case = name, ?elapsed, "case passed"),
    }
    CaseReport { name, outcome, elapsed }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Result of one case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// The candidate lacks the capability the case needs.
    Skipped,
    Failed(Violation),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseReport {
    pub name: &'static str,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Outcomes of all cases run against one dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryReport {
    pub dataset: String,
    pub cases: Vec<CaseReport>,
}

impl EntryReport {
    fn aborted(dataset: &str, stage: &'static str, violation: Violation) -> Self {
        warn!(%violation, "{stage} failed, entry aborted");
        EntryReport {
            dataset: dataset.to_owned(),
            cases: vec![CaseReport {
                name: stage,
                outcome: Outcome::Failed(violation),
                elapsed: Duration::ZERO,
            }],
        }
    }

    /// The case called `name`, if it was recorded.
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &Violation)> + '_ {
        self.cases.iter().filter_map(|c| match &c.outcome {
            Outcome::Failed(violation) => Some((c.name, violation)),
            _ => None,
        })
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Outcomes of a whole suite run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: String,
    /// The root seed; set [`SEED_ENV`](crate::SEED_ENV) to replay it.
    pub seed: u64,
    pub entries: Vec<EntryReport>,
}

impl SuiteReport {
    /// The entry for the dataset called `name`, if it ran.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.dataset == name)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.entries.iter().all(EntryReport::passed)
    }

    #[must_use]
    pub fn cases(&self) -> usize {
        self.entries.iter().map(|e| e.cases.len()).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries.iter().map(|e| e.failures().count()).sum()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|e| &e.cases)
            .filter(|c| c.outcome == Outcome::Skipped)
            .count()
    }

    /// Panics with every failure if any case failed.
    ///
    /// # Panics
    ///
    /// Panics if the run had at least one failure.
    pub fn assert_passed(&self) {
        assert!(self.passed(), "{self}");
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "suite {:?} (seed {}): {} cases, {} failed, {} skipped",
            self.suite,
            self.seed,
            self.cases(),
            self.failed(),
            self.skipped()
        )?;
        for entry in &self.entries {
            for (case, violation) in entry.failures() {
                writeln!(f, "  {} / {case}: {violation}", entry.dataset)?;
            }
        }
        Ok(())
    }
}
