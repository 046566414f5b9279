use std::time::Duration;

use crate::error::SuiteError;

/// Environment variable that pins the seed of a run.
///
/// Every run logs its seed; exporting it here replays the same samples.
pub const SEED_ENV: &str = "KV_CONFORMANCE_SEED";

/// Tunables of a conformance suite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Root seed; a fresh one is drawn and logged when `None`.
    pub seed: Option<u64>,
    /// Give every dataset entry its own sampler forked from the root, instead
    /// of sharing one sampler across the run.
    pub seed_per_entry: bool,
    /// Cap on sampled indices and ranges per randomized iterator case.
    pub sample_limit: usize,
    /// Budget of the point-lookup cases.
    pub check_budget: Duration,
    /// Budget of the full-range iterator case.
    pub full_scan_budget: Duration,
    /// Budget of each randomized sub-range iterator case.
    pub slice_budget: Duration,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        SuiteConfig {
            seed: None,
            seed_per_entry: false,
            sample_limit: 50,
            check_budget: Duration::from_secs(30),
            full_scan_budget: Duration::from_secs(30),
            slice_budget: Duration::from_secs(200),
        }
    }
}

impl SuiteConfig {
    /// The default configuration with the seed taken from [`SEED_ENV`], if
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::InvalidEnv`] if the variable is set but is not a
    /// `u64`.
    pub fn from_env() -> Result<Self, SuiteError> {
        let seed = match std::env::var(SEED_ENV) {
            Ok(raw) => Some(parse_seed(&raw)?),
            Err(_) => None,
        };
        Ok(SuiteConfig {
            seed,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn parse_seed(raw: &str) -> Result<u64, SuiteError> {
    raw.trim().parse().map_err(|_| SuiteError::InvalidEnv {
        var: SEED_ENV,
        value: raw.to_owned(),
    })
}
