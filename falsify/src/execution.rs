//! Property run engine for synchronous and asynchronous properties.
//!
//! A run samples inputs until enough trials pass, then greedily shrinks the
//! first failure: the first candidate that fails again replaces the
//! counterexample and enumeration restarts from it. Both drivers share the
//! same state machine and only differ in how a trial is awaited.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::bias::run_id_to_frequency;
use crate::config::{ConfigError, RunConfig};
use crate::decorate::{decorate, skip_deadline};
use crate::error::{PropertyError, RunError};
use crate::generator::Generator;
use crate::path::ReplayPath;
use crate::property::{AsyncProperty, Hooks, Outcome, Property};
use crate::report::RunReport;
use crate::rng::{Random, random_seed};
use crate::shrink::Shrinks;
use crate::value::Value;

/// Generation side of a property, shared by both drivers
trait Sampler<T> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T>;
    fn shrink(&self, value: &Value<T>) -> Shrinks<T>;
}

struct SyncSampler<'a, P>(&'a P);

impl<T, P: Property<T>> Sampler<T> for SyncSampler<'_, P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        Property::generate(self.0, rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        Property::shrink(self.0, value)
    }
}

struct AsyncSampler<'a, P>(&'a P);

impl<T, P: AsyncProperty<T>> Sampler<T> for AsyncSampler<'_, P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        AsyncProperty::generate(self.0, rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        AsyncProperty::shrink(self.0, value)
    }
}

enum Phase<T> {
    Sampling,
    Shrinking {
        candidates: Shrinks<T>,
        next_index: usize,
        pending_index: usize,
    },
    Done,
}

/// Random source of the `generated`-th generated trial.
///
/// One jump per earlier trial: reaching a late run index costs time linear in it.
fn run_random(base: &Random, generated: usize) -> Random {
    (0..=generated).fold(base.clone(), |rng, _| rng.jump())
}

struct RunState<T> {
    num_runs: usize,
    max_skips: usize,
    end_on_failure: bool,
    verbose: bool,
    mark_interrupt_as_failure: bool,
    interrupt_limit: Option<Duration>,
    skip_deadline: Option<Instant>,
    examples: std::vec::IntoIter<T>,
    num_examples: usize,
    rng: Random,
    next_run_index: usize,
    successes: usize,
    replay: Option<(Value<T>, ReplayPath)>,
    replayed: bool,
    phase: Phase<T>,
    pending: Option<Value<T>>,
    pending_path: ReplayPath,
    counterexample: Option<Value<T>>,
    path: ReplayPath,
    report: RunReport<T>,
}

impl<T: Clone + 'static> RunState<T> {
    fn new(
        config: &RunConfig,
        examples: Vec<T>,
        skip_deadline: Option<Instant>,
        sampler: &dyn Sampler<T>,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(random_seed);
        let rng = Random::new(seed);
        let num_examples = examples.len();
        let mut report = RunReport::new(seed);

        let replay = match config.replay_path()? {
            Some(path) => {
                let value = replay_value(&path, &examples, &rng, sampler)?;
                report.num_shrinks = path.depth();
                Some((value, path))
            }
            None => None,
        };

        debug!(seed, num_runs = config.num_runs, path = ?config.path, "starting property run");
        Ok(Self {
            num_runs: config.num_runs,
            max_skips: config.max_skips(),
            end_on_failure: config.end_on_failure,
            verbose: config.verbose,
            mark_interrupt_as_failure: config.mark_interrupt_as_failure,
            interrupt_limit: config.interrupt_after_time_limit,
            skip_deadline,
            examples: examples.into_iter(),
            num_examples,
            rng,
            next_run_index: 0,
            successes: 0,
            replay,
            replayed: false,
            phase: Phase::Sampling,
            pending: None,
            pending_path: ReplayPath::default(),
            counterexample: None,
            path: ReplayPath::default(),
            report,
        })
    }

    /// Input of the next trial, or `None` once the run is over
    fn next_input(&mut self, sampler: &dyn Sampler<T>) -> Option<T> {
        loop {
            match &mut self.phase {
                Phase::Done => return None,
                Phase::Sampling => {
                    if let Some((value, path)) = self.replay.take() {
                        self.replayed = true;
                        return Some(self.stage(value, path));
                    }
                    if self.replayed || self.successes >= self.num_runs {
                        self.phase = Phase::Done;
                        continue;
                    }
                    let index = self.next_run_index;
                    self.next_run_index += 1;
                    let value = match self.examples.next() {
                        Some(example) => Value::bare(example),
                        None => {
                            self.rng = self.rng.jump();
                            let mut rng = self.rng.clone();
                            sampler.generate(&mut rng, Some(index - self.num_examples))
                        }
                    };
                    return Some(self.stage(value, ReplayPath::new(index)));
                }
                Phase::Shrinking {
                    candidates,
                    next_index,
                    pending_index,
                } => match candidates.next() {
                    Some(value) => {
                        *pending_index = *next_index;
                        *next_index += 1;
                        let input = value.get();
                        self.pending = Some(value);
                        return Some(input);
                    }
                    None => self.phase = Phase::Done,
                },
            }
        }
    }

    fn stage(&mut self, value: Value<T>, path: ReplayPath) -> T {
        let input = value.get();
        self.pending = Some(value);
        self.pending_path = path;
        input
    }

    /// Feed back the outcome of the trial returned by `next_input`
    fn record(&mut self, outcome: Outcome, sampler: &dyn Sampler<T>) {
        let Some(value) = self.pending.take() else {
            return;
        };
        let sampling = matches!(self.phase, Phase::Sampling);
        match outcome {
            Outcome::Passed => {
                if sampling {
                    self.successes += 1;
                    self.report.num_runs += 1;
                }
            }
            Outcome::Skipped(signal) => {
                if sampling {
                    self.report.num_skips += 1;
                }
                if signal.interrupt_execution {
                    warn!(num_runs = self.report.num_runs, "property run interrupted");
                    self.report.interrupted = true;
                    self.phase = Phase::Done;
                } else if self.skip_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    debug!(num_runs = self.report.num_runs, "time limit reached, skipping remaining trials");
                    self.phase = Phase::Done;
                } else if sampling && self.report.num_skips > self.max_skips {
                    warn!(
                        num_skips = self.report.num_skips,
                        max_skips = self.max_skips,
                        "too many pre-condition failures"
                    );
                    self.report.failed = true;
                    self.phase = Phase::Done;
                }
            }
            Outcome::Failed(error) => {
                if let Phase::Shrinking { pending_index, .. } = &self.phase {
                    self.path.push(*pending_index);
                    self.report.num_shrinks += 1;
                    trace!(path = %self.path, %error, "shrink step accepted");
                } else {
                    self.report.num_runs += 1;
                    self.path = std::mem::take(&mut self.pending_path);
                    debug!(path = %self.path, %error, "property failed");
                }
                if self.verbose {
                    self.report.failures.push(value.get());
                }
                self.report.error = Some(error);
                self.phase = if sampling && self.end_on_failure {
                    Phase::Done
                } else {
                    Phase::Shrinking {
                        candidates: sampler.shrink(&value),
                        next_index: 0,
                        pending_index: 0,
                    }
                };
                self.counterexample = Some(value);
            }
        }
    }

    fn finish(mut self) -> RunReport<T> {
        match self.counterexample.take() {
            Some(counterexample) => {
                self.report.failed = true;
                self.report.counterexample = Some(counterexample.get());
                self.report.counterexample_path = Some(self.path.to_string());
            }
            // a replayed value that passes was never shrunk by this run
            None => self.report.num_shrinks = 0,
        }
        if self.report.interrupted && self.mark_interrupt_as_failure {
            self.report.failed = true;
            if self.report.error.is_none() {
                self.report.error = self.interrupt_limit.map(|limit| PropertyError::Interrupted { limit });
            }
        }
        debug!(
            failed = self.report.failed,
            num_runs = self.report.num_runs,
            num_skips = self.report.num_skips,
            num_shrinks = self.report.num_shrinks,
            "property run finished"
        );
        self.report
    }
}

/// Regenerate the value a replay path points at, without running the property
fn replay_value<T: 'static>(
    path: &ReplayPath,
    examples: &[T],
    base: &Random,
    sampler: &dyn Sampler<T>,
) -> Result<Value<T>, RunError>
where
    T: Clone,
{
    let mut value = match examples.get(path.run_index) {
        Some(example) => Value::bare(example.clone()),
        None => {
            let generated = path.run_index - examples.len();
            let mut rng = run_random(base, generated);
            sampler.generate(&mut rng, Some(generated))
        }
    };
    for (depth, index) in path.shrinks.iter().enumerate() {
        value = sampler.shrink(&value).nth(*index).ok_or_else(|| RunError::Replay {
            path: path.to_string(),
            reason: format!("no shrink candidate at index {index} (depth {depth})"),
        })?;
    }
    Ok(value)
}

fn run_sync<T, P>(property: &P, config: &RunConfig, examples: Vec<T>) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: Property<T> + ?Sized,
{
    if config.hooks.has_async() {
        return Err(ConfigError::AsyncHooksOnSyncProperty.into());
    }
    let decorated = decorate(property, config);
    let sampler = SyncSampler(&decorated);
    let mut state = RunState::new(config, examples, skip_deadline(&decorated), &sampler)?;
    while let Some(input) = state.next_input(&sampler) {
        let outcome = Property::run_with_hooks(&decorated, input, &config.hooks);
        state.record(outcome, &sampler);
    }
    Ok(state.finish())
}

async fn run_async<T, P>(property: &P, config: &RunConfig, examples: Vec<T>) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: AsyncProperty<T>,
{
    let decorated = decorate(property, config);
    let sampler = AsyncSampler(&decorated);
    let mut state = RunState::new(config, examples, skip_deadline(&decorated), &sampler)?;
    while let Some(input) = state.next_input(&sampler) {
        let outcome = AsyncProperty::run_with_hooks(&decorated, input, &config.hooks).await;
        state.record(outcome, &sampler);
    }
    Ok(state.finish())
}

/// Check a property with the default configuration
pub fn check<T, P>(property: P) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: Property<T>,
{
    check_with_config(property, &RunConfig::default())
}

/// Check a property with a custom configuration
pub fn check_with_config<T, P>(property: P, config: &RunConfig) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: Property<T>,
{
    run_sync(&property, config, Vec::new())
}

/// Check an async property with the default configuration
pub async fn check_async<T, P>(property: P) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: AsyncProperty<T>,
{
    check_async_with_config(property, &RunConfig::default()).await
}

/// Check an async property with a custom configuration
pub async fn check_async_with_config<T, P>(property: P, config: &RunConfig) -> Result<RunReport<T>, RunError>
where
    T: Clone + fmt::Debug + 'static,
    P: AsyncProperty<T>,
{
    run_async(&property, config, Vec::new()).await
}

/// Check a property and panic with its report when it fails
pub fn assert_property<T, P>(property: P, config: &RunConfig)
where
    T: Clone + fmt::Debug + 'static,
    P: Property<T>,
{
    match check_with_config(property, config) {
        Ok(report) if report.failed => panic!("{report}"),
        Ok(_) => {}
        Err(error) => panic!("{error}"),
    }
}

/// Async counterpart of [`assert_property`]
pub async fn assert_async_property<T, P>(property: P, config: &RunConfig)
where
    T: Clone + fmt::Debug + 'static,
    P: AsyncProperty<T>,
{
    match check_async_with_config(property, config).await {
        Ok(report) if report.failed => panic!("{report}"),
        Ok(_) => {}
        Err(error) => panic!("{error}"),
    }
}

/// Draw `num_runs` values exactly as the runs of a check would.
///
/// A replay path in `config` moves the first drawn value to its run index.
pub fn sample<T, G>(generator: &G, config: &RunConfig) -> Result<Vec<T>, RunError>
where
    T: Clone,
    G: Generator<T> + ?Sized,
{
    config.validate()?;
    let seed = config.seed.unwrap_or_else(random_seed);
    let offset = config.replay_path()?.map_or(0, |path| path.run_index);
    let mut rng = run_random(&Random::new(seed), offset);
    let mut values = Vec::with_capacity(config.num_runs);
    for run_id in offset..offset + config.num_runs {
        let bias = (!config.unbiased).then(|| run_id_to_frequency(run_id));
        values.push(generator.generate(&mut rng.clone(), bias).get());
        rng = rng.jump();
    }
    Ok(values)
}

/// Builder for configuring and running property checks
pub struct PropertyTestBuilder<T> {
    config: RunConfig,
    examples: Vec<T>,
}

impl<T: Clone + 'static> PropertyTestBuilder<T> {
    /// Create a new property test builder with default configuration
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    /// Start from an existing configuration
    pub fn with_config(config: RunConfig) -> Self {
        Self {
            config,
            examples: Vec::new(),
        }
    }

    /// Set the random seed for reproducible runs
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the number of successful trials required
    pub fn num_runs(mut self, num_runs: usize) -> Self {
        self.config.num_runs = num_runs;
        self
    }

    /// Replay the counterexample at `path`
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = Some(path.into());
        self
    }

    pub fn end_on_failure(mut self) -> Self {
        self.config.end_on_failure = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn skip_all_after_time_limit(mut self, limit: Duration) -> Self {
        self.config.skip_all_after_time_limit = Some(limit);
        self
    }

    pub fn interrupt_after_time_limit(mut self, limit: Duration) -> Self {
        self.config.interrupt_after_time_limit = Some(limit);
        self
    }

    pub fn mark_interrupt_as_failure(mut self) -> Self {
        self.config.mark_interrupt_as_failure = true;
        self
    }

    pub fn unbiased(mut self) -> Self {
        self.config.unbiased = true;
        self
    }

    pub fn max_skips_per_run(mut self, max_skips_per_run: usize) -> Self {
        self.config.max_skips_per_run = max_skips_per_run;
        self
    }

    /// Keep every failing value met while shrinking
    pub fn verbose(mut self) -> Self {
        self.config.verbose = true;
        self
    }

    pub fn skip_equal_values(mut self) -> Self {
        self.config.skip_equal_values = true;
        self
    }

    pub fn ignore_equal_values(mut self) -> Self {
        self.config.ignore_equal_values = true;
        self
    }

    /// Default hooks for a property that does not set its own
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.config.hooks = hooks;
        self
    }

    /// Inputs tried before any generated one
    pub fn examples(mut self, examples: Vec<T>) -> Self {
        self.examples = examples;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the property with the configured parameters
    pub fn run<P: Property<T>>(self, property: &P) -> Result<RunReport<T>, RunError>
    where
        T: fmt::Debug,
    {
        run_sync(property, &self.config, self.examples)
    }

    /// Run the async property with the configured parameters
    pub async fn run_async<P: AsyncProperty<T>>(self, property: &P) -> Result<RunReport<T>, RunError>
    where
        T: fmt::Debug,
    {
        run_async(property, &self.config, self.examples).await
    }
}

impl<T: Clone + 'static> Default for PropertyTestBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
