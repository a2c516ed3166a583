//! Decorators wrapped around a property by the runner.
//!
//! Each decorator is a no-op when its setting is absent, so the runner always
//! builds the same stack: timeout innermost, then unbiased, skip-after,
//! interrupt-after and equal-value filtering outermost.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_io::Timer;
use futures_lite::future;

use crate::config::RunConfig;
use crate::error::{PreconditionFailure, PropertyError};
use crate::property::{AsyncProperty, Hooks, Outcome, Property};
use crate::rng::Random;
use crate::shrink::Shrinks;
use crate::value::Value;

/// Drops the run id so generation never biases
#[derive(Debug, Clone)]
pub struct UnbiasedProperty<P> {
    inner: P,
    enabled: bool,
}

impl<P> UnbiasedProperty<P> {
    pub fn new(inner: P, enabled: bool) -> Self {
        Self { inner, enabled }
    }

    fn run_id(&self, run_id: Option<usize>) -> Option<usize> {
        if self.enabled { None } else { run_id }
    }
}

impl<T, P: Property<T>> Property<T> for UnbiasedProperty<P> {
    fn is_async(&self) -> bool {
        self.inner.is_async()
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, self.run_id(run_id))
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        self.inner.run_with_hooks(input, hooks)
    }
}

impl<T, P: AsyncProperty<T>> AsyncProperty<T> for UnbiasedProperty<P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, self.run_id(run_id))
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    fn run_with_hooks(&self, input: T, hooks: &Hooks) -> impl Future<Output = Outcome> {
        self.inner.run_with_hooks(input, hooks)
    }
}

/// Turns every trial started after a deadline into a skip.
///
/// With `interrupt` set the skip also stops the run, and an asynchronous
/// predicate still pending at the deadline is abandoned.
#[derive(Debug, Clone)]
pub struct SkipAfterProperty<P> {
    inner: P,
    deadline: Option<Instant>,
    interrupt: bool,
}

impl<P> SkipAfterProperty<P> {
    /// Skip trials once `limit` has elapsed from now
    pub fn new(inner: P, limit: Option<Duration>, interrupt: bool) -> Self {
        Self {
            inner,
            deadline: limit.map(|limit| Instant::now() + limit),
            interrupt,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Instant after which trials are skipped
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn signal(&self) -> Outcome {
        Outcome::Skipped(PreconditionFailure {
            interrupt_execution: self.interrupt,
        })
    }
}

impl<T, P: Property<T>> Property<T> for SkipAfterProperty<P> {
    fn is_async(&self) -> bool {
        self.inner.is_async()
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        if self.expired() {
            return self.signal();
        }
        self.inner.run_with_hooks(input, hooks)
    }
}

impl<T, P: AsyncProperty<T>> AsyncProperty<T> for SkipAfterProperty<P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    async fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        if self.expired() {
            return self.signal();
        }
        match self.deadline {
            Some(deadline) if self.interrupt => {
                future::or(self.inner.run_with_hooks(input, hooks), async {
                    Timer::at(deadline).await;
                    self.signal()
                })
                .await
            }
            _ => self.inner.run_with_hooks(input, hooks).await,
        }
    }
}

/// Fails asynchronous predicates that do not settle within `timeout`.
///
/// Synchronous predicates cannot be preempted and pass through unchanged.
#[derive(Debug, Clone)]
pub struct TimeoutProperty<P> {
    inner: P,
    timeout: Option<Duration>,
}

impl<P> TimeoutProperty<P> {
    pub fn new(inner: P, timeout: Option<Duration>) -> Self {
        Self { inner, timeout }
    }
}

impl<T, P: Property<T>> Property<T> for TimeoutProperty<P> {
    fn is_async(&self) -> bool {
        self.inner.is_async()
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        self.inner.run_with_hooks(input, hooks)
    }
}

impl<T, P: AsyncProperty<T>> AsyncProperty<T> for TimeoutProperty<P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    async fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        let Some(limit) = self.timeout else {
            return self.inner.run_with_hooks(input, hooks).await;
        };
        future::or(self.inner.run_with_hooks(input, hooks), async move {
            Timer::after(limit).await;
            Outcome::Failed(PropertyError::Timeout { limit })
        })
        .await
    }
}

/// What to do with an input equal to one already run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualValues {
    /// Report the outcome of the first run again
    Ignore,
    /// Discard the trial as if a precondition failed
    Skip,
}

enum Seen {
    Untracked,
    New(String),
    Repeated(Outcome),
}

/// Never runs the predicate twice on equal inputs.
///
/// Inputs are compared through their `Debug` rendering. Outcomes are kept for
/// the lifetime of the decorator, which the runner builds once per run.
#[derive(Debug, Clone)]
pub struct IgnoreEqualValuesProperty<P> {
    inner: P,
    mode: Option<EqualValues>,
    seen: RefCell<HashMap<String, Outcome>>,
}

impl<P> IgnoreEqualValuesProperty<P> {
    pub fn new(inner: P, mode: Option<EqualValues>) -> Self {
        Self {
            inner,
            mode,
            seen: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn lookup<T: fmt::Debug>(&self, input: &T) -> Seen {
        let Some(mode) = self.mode else {
            return Seen::Untracked;
        };
        let key = format!("{input:?}");
        match (self.seen.borrow().get(&key), mode) {
            (Some(outcome), EqualValues::Ignore) => Seen::Repeated(outcome.clone()),
            (Some(_), EqualValues::Skip) => Seen::Repeated(Outcome::Skipped(PreconditionFailure::skip())),
            (None, _) => Seen::New(key),
        }
    }

    fn remember(&self, key: String, outcome: &Outcome) {
        self.seen.borrow_mut().insert(key, outcome.clone());
    }
}

impl<T: fmt::Debug, P: Property<T>> Property<T> for IgnoreEqualValuesProperty<P> {
    fn is_async(&self) -> bool {
        self.inner.is_async()
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        match self.lookup(&input) {
            Seen::Untracked => self.inner.run_with_hooks(input, hooks),
            Seen::Repeated(outcome) => outcome,
            Seen::New(key) => {
                let outcome = self.inner.run_with_hooks(input, hooks);
                self.remember(key, &outcome);
                outcome
            }
        }
    }
}

impl<T: fmt::Debug, P: AsyncProperty<T>> AsyncProperty<T> for IgnoreEqualValuesProperty<P> {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.inner.generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.inner.shrink(value)
    }

    async fn run_with_hooks(&self, input: T, hooks: &Hooks) -> Outcome {
        match self.lookup(&input) {
            Seen::Untracked => self.inner.run_with_hooks(input, hooks).await,
            Seen::Repeated(outcome) => outcome,
            Seen::New(key) => {
                let outcome = self.inner.run_with_hooks(input, hooks).await;
                self.remember(key, &outcome);
                outcome
            }
        }
    }
}

/// The full decorator stack the runner applies
pub type Decorated<P> =
    IgnoreEqualValuesProperty<SkipAfterProperty<SkipAfterProperty<UnbiasedProperty<TimeoutProperty<P>>>>>;

/// Wrap `property` according to the run settings
pub fn decorate<P>(property: P, config: &RunConfig) -> Decorated<P> {
    let property = TimeoutProperty::new(property, config.timeout);
    let property = UnbiasedProperty::new(property, config.unbiased);
    let property = SkipAfterProperty::new(property, config.skip_all_after_time_limit, false);
    let property = SkipAfterProperty::new(property, config.interrupt_after_time_limit, true);
    IgnoreEqualValuesProperty::new(property, config.equal_values())
}

/// Instant after which the decorated property skips every trial
pub fn skip_deadline<P>(decorated: &Decorated<P>) -> Option<Instant> {
    decorated.inner().inner().deadline()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::integer;
    use crate::property::{async_property, property};
    use futures_lite::future::block_on;

    #[test]
    fn test_unbiased_drops_run_id() {
        let base = property(integer(-1_000_000_i64, 1_000_000), |_: i64| true);
        let unbiased = UnbiasedProperty::new(&base, true);
        let mut left = Random::new(9);
        let mut right = Random::new(9);
        for run_id in 0..30 {
            assert_eq!(
                Property::generate(&unbiased, &mut left, Some(run_id)).get(),
                base.generate(&mut right, None).get()
            );
        }
        let passthrough = UnbiasedProperty::new(&base, false);
        assert_eq!(
            Property::generate(&passthrough, &mut Random::new(3), Some(7)).get(),
            base.generate(&mut Random::new(3), Some(7)).get()
        );
    }

    #[test]
    fn test_skip_after_expired_deadline() {
        let base = property(integer(0_u8, 10), |_: u8| false);
        let skipping = SkipAfterProperty::new(&base, Some(Duration::ZERO), false);
        assert_eq!(
            Property::run(&skipping, 1),
            Outcome::Skipped(PreconditionFailure::skip())
        );
        let interrupting = SkipAfterProperty::new(&base, Some(Duration::ZERO), true);
        assert_eq!(
            Property::run(&interrupting, 1),
            Outcome::Skipped(PreconditionFailure::interrupt())
        );
        let idle = SkipAfterProperty::new(&base, None, true);
        assert!(Property::run(&idle, 1).is_failed());
    }

    #[test]
    fn test_interrupt_abandons_pending_predicate() {
        let base = async_property(integer(0_u8, 10), |_: u8| async {
            Timer::after(Duration::from_secs(5)).await;
            true
        });
        let interrupting = SkipAfterProperty::new(&base, Some(Duration::from_millis(20)), true);
        let started = Instant::now();
        assert_eq!(
            block_on(AsyncProperty::run(&interrupting, 1)),
            Outcome::Skipped(PreconditionFailure::interrupt())
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_fails_slow_predicates() {
        let base = async_property(integer(0_u64, 10), |delay: u64| async move {
            Timer::after(Duration::from_millis(delay * 100)).await;
        });
        let limited = TimeoutProperty::new(&base, Some(Duration::from_millis(50)));
        assert_eq!(block_on(AsyncProperty::run(&limited, 0)), Outcome::Passed);
        assert_eq!(
            block_on(AsyncProperty::run(&limited, 10)),
            Outcome::Failed(PropertyError::Timeout {
                limit: Duration::from_millis(50)
            })
        );
    }

    #[test]
    fn test_sync_timeout_passes_through() {
        let base = property(integer(0_u8, 10), |x: u8| x < 5);
        let limited = TimeoutProperty::new(&base, Some(Duration::ZERO));
        assert_eq!(Property::run(&limited, 1), Outcome::Passed);
        assert!(Property::run(&limited, 7).is_failed());
    }

    #[test]
    fn test_equal_values_run_the_predicate_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let base = property(integer(0_u8, 10), |x: u8| {
            calls.fetch_add(1, Ordering::SeqCst);
            x < 5
        });

        let ignoring = IgnoreEqualValuesProperty::new(&base, Some(EqualValues::Ignore));
        assert!(Property::run(&ignoring, 7).is_failed());
        assert!(Property::run(&ignoring, 7).is_failed());
        assert_eq!(Property::run(&ignoring, 2), Outcome::Passed);
        assert_eq!(calls.swap(0, Ordering::SeqCst), 2);

        let skipping = IgnoreEqualValuesProperty::new(&base, Some(EqualValues::Skip));
        assert_eq!(Property::run(&skipping, 2), Outcome::Passed);
        assert_eq!(
            Property::run(&skipping, 2),
            Outcome::Skipped(PreconditionFailure::skip())
        );
        assert_eq!(calls.swap(0, Ordering::SeqCst), 1);

        let untracked = IgnoreEqualValuesProperty::new(&base, None);
        let _ = Property::run(&untracked, 2);
        let _ = Property::run(&untracked, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ignore_equal_values_wins_over_skip() {
        let config = RunConfig::default().skip_equal_values(true).ignore_equal_values(true);
        assert_eq!(config.equal_values(), Some(EqualValues::Ignore));
        let config = RunConfig::default().skip_equal_values(true);
        assert_eq!(config.equal_values(), Some(EqualValues::Skip));
        assert_eq!(RunConfig::default().equal_values(), None);
    }

    #[test]
    fn test_decorate_stack_is_transparent_by_default() {
        let base = property(integer(0_u8, 10), |x: u8| x < 5);
        let decorated = decorate(&base, &RunConfig::default());
        assert!(!Property::is_async(&decorated));
        assert_eq!(Property::run(&decorated, 2), Outcome::Passed);
        assert!(Property::run(&decorated, 9).is_failed());
    }
}
