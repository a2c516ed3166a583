//! Outcome of a whole property run.

use std::fmt;

use crate::error::PropertyError;

/// Everything a run learned, enough to replay its counterexample
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport<T> {
    /// A counterexample was found, the skip budget ran out, or an
    /// interruption was marked as failure
    pub failed: bool,
    /// The run stopped early on an interrupt signal
    pub interrupted: bool,
    /// Trials executed, the failing one included
    pub num_runs: usize,
    pub num_skips: usize,
    /// Accepted shrink steps
    pub num_shrinks: usize,
    pub seed: u64,
    /// Smallest failing value found
    pub counterexample: Option<T>,
    /// Replay path of the counterexample
    pub counterexample_path: Option<String>,
    /// Failure of the counterexample
    pub error: Option<PropertyError>,
    /// Every failing value met, in order; filled only by verbose runs
    pub failures: Vec<T>,
}

impl<T> RunReport<T> {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            failed: false,
            interrupted: false,
            num_runs: 0,
            num_skips: 0,
            num_shrinks: 0,
            seed,
            counterexample: None,
            counterexample_path: None,
            error: None,
            failures: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        !self.failed
    }

    /// Failure message of the counterexample
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Human readable failure description naming seed and path
    pub fn summary(&self) -> String
    where
        T: fmt::Debug,
    {
        let mut summary = match &self.counterexample {
            Some(counterexample) => format!(
                "Property failed after {} test(s)\n{{ seed: {}, path: \"{}\" }}\nCounterexample: {:?}\nShrunk {} time(s)",
                self.num_runs,
                self.seed,
                self.counterexample_path.as_deref().unwrap_or_default(),
                counterexample,
                self.num_shrinks
            ),
            None if self.interrupted => format!(
                "Property interrupted after {} test(s)\n{{ seed: {} }}",
                self.num_runs, self.seed
            ),
            None if self.failed => format!(
                "Failed to run property, too many pre-condition failures encountered\n{{ seed: {} }}\nRan {} time(s)\nSkipped {} time(s)",
                self.seed, self.num_runs, self.num_skips
            ),
            None => format!(
                "Property passed {} test(s)\n{{ seed: {} }}",
                self.num_runs, self.seed
            ),
        };
        if let Some(error) = &self.error {
            summary.push_str(&format!("\nGot error: {error}"));
        }
        if !self.failures.is_empty() {
            summary.push_str("\nEncountered failures were:");
            for failure in &self.failures {
                summary.push_str(&format!("\n- {failure:?}"));
            }
        }
        summary
    }
}

impl<T: fmt::Debug> fmt::Display for RunReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
