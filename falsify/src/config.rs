//! Run configuration and process-wide defaults.
//!
//! There is no ambient global state: defaults live in a [`ConfigManager`]
//! the caller creates, resets and threads into the runner explicitly.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decorate::EqualValues;
use crate::path::{PathError, ReplayPath};
use crate::property::Hooks;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid number of runs (must be > 0)
    #[error("Invalid number of runs: {0} (must be > 0)")]
    InvalidNumRuns(usize),

    /// Invalid timeout (must be > 0)
    #[error("Invalid timeout (must be > 0)")]
    InvalidTimeout,

    /// Invalid time limit (must be > 0)
    #[error("Invalid {0} (must be > 0)")]
    InvalidTimeLimit(&'static str),

    /// Unparsable replay path
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// A hook is set both synchronously and asynchronously
    #[error("{0} is set both as a synchronous and an asynchronous hook")]
    ConflictingHooks(&'static str),

    /// Asynchronous hooks around a synchronous property
    #[error("asynchronous hooks cannot run around a synchronous property")]
    AsyncHooksOnSyncProperty,
}

/// Settings of one property run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// Seed of the run; a random one is drawn when unset
    pub seed: Option<u64>,
    /// Number of successful trials required
    pub num_runs: usize,
    /// Replay path of a previous failure
    pub path: Option<String>,
    /// Report the first failure without shrinking it
    pub end_on_failure: bool,
    /// Per-trial limit for asynchronous predicates
    pub timeout: Option<Duration>,
    /// Skip every trial started after this much time
    pub skip_all_after_time_limit: Option<Duration>,
    /// Stop the run, abandoning pending predicates, after this much time
    pub interrupt_after_time_limit: Option<Duration>,
    /// Report an interrupted run as failed
    pub mark_interrupt_as_failure: bool,
    /// Never bias generation
    pub unbiased: bool,
    /// Skip budget per required run
    pub max_skips_per_run: usize,
    /// Keep every failing value met while shrinking
    pub verbose: bool,
    /// Discard trials whose input equals an earlier one; they count as skips
    pub skip_equal_values: bool,
    /// Reuse the outcome of an earlier equal input instead of running again.
    /// Takes precedence over `skip_equal_values`.
    pub ignore_equal_values: bool,
    /// Default hooks run around properties that do not set their own
    #[cfg_attr(feature = "serde", serde(skip))]
    pub hooks: Hooks,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            num_runs: 100,
            path: None,
            end_on_failure: false,
            timeout: None,
            skip_all_after_time_limit: None,
            interrupt_after_time_limit: None,
            mark_interrupt_as_failure: false,
            unbiased: false,
            max_skips_per_run: 100,
            verbose: false,
            skip_equal_values: false,
            ignore_equal_values: false,
            hooks: Hooks::none(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn end_on_failure(mut self, end_on_failure: bool) -> Self {
        self.end_on_failure = end_on_failure;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_all_after_time_limit(mut self, limit: Duration) -> Self {
        self.skip_all_after_time_limit = Some(limit);
        self
    }

    pub fn interrupt_after_time_limit(mut self, limit: Duration) -> Self {
        self.interrupt_after_time_limit = Some(limit);
        self
    }

    pub fn mark_interrupt_as_failure(mut self, mark: bool) -> Self {
        self.mark_interrupt_as_failure = mark;
        self
    }

    pub fn unbiased(mut self, unbiased: bool) -> Self {
        self.unbiased = unbiased;
        self
    }

    pub fn max_skips_per_run(mut self, max_skips_per_run: usize) -> Self {
        self.max_skips_per_run = max_skips_per_run;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn skip_equal_values(mut self, skip: bool) -> Self {
        self.skip_equal_values = skip;
        self
    }

    pub fn ignore_equal_values(mut self, ignore: bool) -> Self {
        self.ignore_equal_values = ignore;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Validate the run configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidNumRuns(self.num_runs));
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.skip_all_after_time_limit.is_some_and(|limit| limit.is_zero()) {
            return Err(ConfigError::InvalidTimeLimit("skip_all_after_time_limit"));
        }
        if self.interrupt_after_time_limit.is_some_and(|limit| limit.is_zero()) {
            return Err(ConfigError::InvalidTimeLimit("interrupt_after_time_limit"));
        }
        if self.hooks.before_each.is_some() && self.hooks.async_before_each.is_some() {
            return Err(ConfigError::ConflictingHooks("before_each"));
        }
        if self.hooks.after_each.is_some() && self.hooks.async_after_each.is_some() {
            return Err(ConfigError::ConflictingHooks("after_each"));
        }
        self.replay_path()?;
        Ok(())
    }

    /// Parsed replay path, if one is set
    pub fn replay_path(&self) -> Result<Option<ReplayPath>, ConfigError> {
        match &self.path {
            Some(path) => Ok(Some(path.parse()?)),
            None => Ok(None),
        }
    }

    /// Total number of skips tolerated before the run fails
    pub fn max_skips(&self) -> usize {
        self.num_runs.saturating_mul(self.max_skips_per_run)
    }

    /// Handling of inputs equal to earlier ones, if any
    pub fn equal_values(&self) -> Option<EqualValues> {
        if self.ignore_equal_values {
            Some(EqualValues::Ignore)
        } else if self.skip_equal_values {
            Some(EqualValues::Skip)
        } else {
            None
        }
    }

    /// Create a run configuration from global defaults
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            seed: global.default_seed,
            num_runs: global.default_num_runs,
            path: None,
            end_on_failure: global.end_on_failure,
            timeout: global.timeout,
            skip_all_after_time_limit: global.skip_all_after_time_limit,
            interrupt_after_time_limit: global.interrupt_after_time_limit,
            mark_interrupt_as_failure: global.mark_interrupt_as_failure,
            unbiased: global.unbiased,
            max_skips_per_run: global.max_skips_per_run,
            verbose: global.verbose,
            skip_equal_values: global.skip_equal_values,
            ignore_equal_values: global.ignore_equal_values,
            hooks: global.hooks.clone(),
        }
    }
}

/// Defaults shared by every run created through a [`ConfigManager`].
///
/// Covers every [`RunConfig`] setting except the replay path, which only
/// makes sense for a single property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GlobalConfig {
    /// Default number of runs
    pub default_num_runs: usize,
    /// Default seed for reproducible runs
    pub default_seed: Option<u64>,
    pub end_on_failure: bool,
    pub timeout: Option<Duration>,
    pub skip_all_after_time_limit: Option<Duration>,
    pub interrupt_after_time_limit: Option<Duration>,
    pub mark_interrupt_as_failure: bool,
    pub unbiased: bool,
    pub max_skips_per_run: usize,
    pub verbose: bool,
    pub skip_equal_values: bool,
    pub ignore_equal_values: bool,
    /// Hooks for every property that does not set its own
    #[cfg_attr(feature = "serde", serde(skip))]
    pub hooks: Hooks,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let run = RunConfig::default();
        Self {
            default_num_runs: run.num_runs,
            default_seed: run.seed,
            end_on_failure: run.end_on_failure,
            timeout: run.timeout,
            skip_all_after_time_limit: run.skip_all_after_time_limit,
            interrupt_after_time_limit: run.interrupt_after_time_limit,
            mark_interrupt_as_failure: run.mark_interrupt_as_failure,
            unbiased: run.unbiased,
            max_skips_per_run: run.max_skips_per_run,
            verbose: run.verbose,
            skip_equal_values: run.skip_equal_values,
            ignore_equal_values: run.ignore_equal_values,
            hooks: run.hooks,
        }
    }
}

impl GlobalConfig {
    /// Validate the global configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        RunConfig::from_global(self).validate()
    }
}

/// Explicitly scoped holder of process-wide run defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    global_config: GlobalConfig,
}

impl ConfigManager {
    /// Create a new configuration manager with default global configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new configuration manager with custom global configuration
    pub fn with_global_config(global_config: GlobalConfig) -> Result<Self, ConfigError> {
        global_config.validate()?;
        Ok(Self { global_config })
    }

    /// Get the current global configuration
    pub fn global_config(&self) -> &GlobalConfig {
        &self.global_config
    }

    /// Update the global configuration
    pub fn set_global_config(&mut self, global_config: GlobalConfig) -> Result<(), ConfigError> {
        global_config.validate()?;
        self.global_config = global_config;
        Ok(())
    }

    /// Restore the built-in defaults
    pub fn reset(&mut self) {
        self.global_config = GlobalConfig::default();
    }

    /// Create a run configuration that inherits from global defaults
    pub fn create_run_config(&self) -> RunConfig {
        RunConfig::from_global(&self.global_config)
    }
}
