//! Properties: a generator bound to a predicate.
//!
//! A predicate may return `()`, `bool`, an [`Outcome`] or a
//! `Result<(), E>`. Panics are caught and reported as failures; a
//! [`PreconditionFailure`] turns the trial into a skip.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_lite::FutureExt;
use futures_lite::future::{self, BoxedLocal};

use crate::bias::run_id_to_frequency;
use crate::error::{PreconditionFailure, PropertyError};
use crate::generator::Generator;
use crate::rng::Random;
use crate::shrink::Shrinks;
use crate::value::Value;

/// Result of running a predicate once
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(PropertyError),
    /// A precondition did not hold; the trial is discarded
    Skipped(PreconditionFailure),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Conversion of predicate return values into an [`Outcome`]
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Passed
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> Outcome {
        if self {
            Outcome::Passed
        } else {
            Outcome::Failed(PropertyError::ReturnedFalse)
        }
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl<E: fmt::Display + 'static> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Outcome {
        let Err(error) = self else {
            return Outcome::Passed;
        };
        let any: &dyn Any = &error;
        if let Some(precondition) = any.downcast_ref::<PreconditionFailure>() {
            return Outcome::Skipped(*precondition);
        }
        if let Some(error) = any.downcast_ref::<PropertyError>() {
            return match error {
                PropertyError::Precondition(precondition) => Outcome::Skipped(*precondition),
                other => Outcome::Failed(other.clone()),
            };
        }
        if let Some(boxed) = any.downcast_ref::<Box<dyn Error + Send + Sync>>() {
            if let Some(precondition) = boxed.downcast_ref::<PreconditionFailure>() {
                return Outcome::Skipped(*precondition);
            }
        }
        Outcome::Failed(PropertyError::failed(error.to_string()))
    }
}

/// Skip the current trial unless `condition` holds.
///
/// ```
/// use falsify::{PropertyError, pre};
///
/// fn predicate(x: i32) -> Result<(), PropertyError> {
///     pre(x != 0)?;
///     assert_eq!((100 / x) * x + 100 % x, 100);
///     Ok(())
/// }
/// # assert!(predicate(0).is_err());
/// ```
pub fn pre(condition: bool) -> Result<(), PreconditionFailure> {
    if condition {
        Ok(())
    } else {
        Err(PreconditionFailure::skip())
    }
}

/// Synchronous property contract consumed by the runner
pub trait Property<T> {
    /// Whether `run` must be awaited; fixed for the lifetime of the property
    fn is_async(&self) -> bool {
        false
    }

    /// Generate the input of trial `run_id`; `None` disables bias
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T>;

    /// Shrink candidates of a failing input
    fn shrink(&self, value: &Value<T>) -> Shrinks<T>;

    /// Run the predicate once; `defaults` stand in for hooks the property does not set
    fn run_with_hooks(&self, input: T, defaults: &Hooks) -> Outcome;

    /// Run the predicate once without default hooks
    fn run(&self, input: T) -> Outcome {
        self.run_with_hooks(input, &NO_HOOKS)
    }
}

/// Asynchronous property contract consumed by the runner.
///
/// The runner awaits one trial at a time, so returned futures need not be
/// `Send`.
pub trait AsyncProperty<T> {
    fn is_async(&self) -> bool {
        true
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T>;

    fn shrink(&self, value: &Value<T>) -> Shrinks<T>;

    fn run_with_hooks(&self, input: T, defaults: &Hooks) -> impl Future<Output = Outcome>;

    fn run(&self, input: T) -> impl Future<Output = Outcome> {
        self.run_with_hooks(input, &NO_HOOKS)
    }
}

impl<T, P: Property<T> + ?Sized> Property<T> for &P {
    fn is_async(&self) -> bool {
        (**self).is_async()
    }

    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        (**self).generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        (**self).shrink(value)
    }

    fn run_with_hooks(&self, input: T, defaults: &Hooks) -> Outcome {
        (**self).run_with_hooks(input, defaults)
    }
}

impl<T, P: AsyncProperty<T>> AsyncProperty<T> for &P {
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        (**self).generate(rng, run_id)
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        (**self).shrink(value)
    }

    fn run_with_hooks(&self, input: T, defaults: &Hooks) -> impl Future<Output = Outcome> {
        (**self).run_with_hooks(input, defaults)
    }
}

/// Hook run around every predicate execution
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Asynchronous hook, awaited around every predicate execution
pub type AsyncHook = Arc<dyn Fn() -> BoxedLocal<()> + Send + Sync>;

/// Hook of a property; it receives the hook it overrides
type ChainedHook = Arc<dyn Fn(&dyn Fn()) + Send + Sync>;

type AsyncChainedHook = Arc<dyn Fn(AsyncHook) -> BoxedLocal<()> + Send + Sync>;

/// Hooks applied around the predicate of every property in a run.
///
/// A hook set on the property itself takes precedence and receives the
/// overridden default, so it may still call it. Asynchronous properties run
/// `async_before_each` when set and fall back to `before_each` otherwise.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_each: Option<Hook>,
    pub after_each: Option<Hook>,
    pub async_before_each: Option<AsyncHook>,
    pub async_after_each: Option<AsyncHook>,
}

pub(crate) static NO_HOOKS: Hooks = Hooks::none();

impl Hooks {
    pub const fn none() -> Self {
        Self {
            before_each: None,
            after_each: None,
            async_before_each: None,
            async_after_each: None,
        }
    }

    pub fn new() -> Self {
        Self::none()
    }

    pub fn before_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_each = Some(Arc::new(hook));
        self
    }

    pub fn after_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.after_each = Some(Arc::new(hook));
        self
    }

    pub fn async_before_each<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.async_before_each = Some(Arc::new(move || hook().boxed_local()));
        self
    }

    pub fn async_after_each<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.async_after_each = Some(Arc::new(move || hook().boxed_local()));
        self
    }

    /// Whether an asynchronous hook is set
    pub fn has_async(&self) -> bool {
        self.async_before_each.is_some() || self.async_after_each.is_some()
    }

    fn async_before(&self) -> AsyncHook {
        lift(&self.async_before_each, &self.before_each)
    }

    fn async_after(&self) -> AsyncHook {
        lift(&self.async_after_each, &self.after_each)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .field("async_before_each", &self.async_before_each.is_some())
            .field("async_after_each", &self.async_after_each.is_some())
            .finish()
    }
}

/// Hooks compare by identity
impl PartialEq for Hooks {
    fn eq(&self, other: &Self) -> bool {
        fn same<H: ?Sized>(left: &Option<Arc<H>>, right: &Option<Arc<H>>) -> bool {
            match (left, right) {
                (Some(left), Some(right)) => Arc::ptr_eq(left, right),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.before_each, &other.before_each)
            && same(&self.after_each, &other.after_each)
            && same(&self.async_before_each, &other.async_before_each)
            && same(&self.async_after_each, &other.async_after_each)
    }
}

fn noop() -> BoxedLocal<()> {
    future::ready(()).boxed_local()
}

fn lift(async_hook: &Option<AsyncHook>, hook: &Option<Hook>) -> AsyncHook {
    match (async_hook, hook) {
        (Some(async_hook), _) => Arc::clone(async_hook),
        (None, Some(hook)) => {
            let hook = Arc::clone(hook);
            Arc::new(move || {
                hook();
                noop()
            })
        }
        (None, None) => Arc::new(noop),
    }
}

fn catch<R>(f: impl FnOnce() -> R) -> Result<R, PropertyError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(PropertyError::from_panic)
}

fn run_chained(own: &Option<ChainedHook>, default: &Option<Hook>) {
    let default = || {
        if let Some(hook) = default {
            hook();
        }
    };
    match own {
        Some(hook) => hook(&default),
        None => default(),
    }
}

fn chain(previous: Option<ChainedHook>, hook: impl Fn(&dyn Fn()) + Send + Sync + 'static) -> ChainedHook {
    match previous {
        Some(previous) => Arc::new(move |default: &dyn Fn()| hook(&|| previous(default))),
        None => Arc::new(hook),
    }
}

fn run_chained_async(own: &Option<AsyncChainedHook>, default: AsyncHook) -> BoxedLocal<()> {
    match own {
        Some(hook) => hook(default),
        None => default(),
    }
}

fn chain_async<H, Fut>(previous: Option<AsyncChainedHook>, hook: H) -> AsyncChainedHook
where
    H: Fn(AsyncHook) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + 'static,
{
    match previous {
        Some(previous) => Arc::new(move |default: AsyncHook| {
            let previous = Arc::clone(&previous);
            let overridden: AsyncHook = Arc::new(move || previous(Arc::clone(&default)));
            hook(overridden).boxed_local()
        }),
        None => Arc::new(move |default: AsyncHook| hook(default).boxed_local()),
    }
}

/// A failing `after_each` hook fails an otherwise successful trial
fn settle(outcome: Outcome, cleanup: Result<(), PropertyError>) -> Outcome {
    match cleanup {
        Err(error) if !outcome.is_failed() => Outcome::Failed(error),
        _ => outcome,
    }
}

/// Property built from a generator and a synchronous predicate
pub struct FnProperty<T, G, F> {
    generator: G,
    predicate: F,
    before_each: Option<ChainedHook>,
    after_each: Option<ChainedHook>,
    _marker: PhantomData<fn(T)>,
}

impl<T, G, F> FnProperty<T, G, F> {
    /// Run `hook` before every execution of the predicate, in place of any default hook
    pub fn before_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_each = Some(Arc::new(move |_: &dyn Fn()| hook()));
        self
    }

    /// Run `hook` after every execution of the predicate, even a failing one
    pub fn after_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.after_each = Some(Arc::new(move |_: &dyn Fn()| hook()));
        self
    }

    /// Run `hook` before every execution of the predicate.
    ///
    /// `hook` receives the hook it replaces: an earlier `before_each` of this
    /// property, or else the run's default hook.
    pub fn before_each_with(mut self, hook: impl Fn(&dyn Fn()) + Send + Sync + 'static) -> Self {
        self.before_each = Some(chain(self.before_each.take(), hook));
        self
    }

    /// [`after_each`](Self::after_each) counterpart of [`before_each_with`](Self::before_each_with)
    pub fn after_each_with(mut self, hook: impl Fn(&dyn Fn()) + Send + Sync + 'static) -> Self {
        self.after_each = Some(chain(self.after_each.take(), hook));
        self
    }
}

impl<T, G, F, R> Property<T> for FnProperty<T, G, F>
where
    G: Generator<T>,
    F: Fn(T) -> R,
    R: IntoOutcome,
{
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.generator.generate(rng, run_id.map(run_id_to_frequency))
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.generator.shrink(value.value(), value.context())
    }

    fn run_with_hooks(&self, input: T, defaults: &Hooks) -> Outcome {
        let outcome = catch(|| {
            run_chained(&self.before_each, &defaults.before_each);
            (self.predicate)(input).into_outcome()
        })
        .unwrap_or_else(Outcome::Failed);
        settle(outcome, catch(|| run_chained(&self.after_each, &defaults.after_each)))
    }
}

/// Bind `predicate` to the values of `generator`
pub fn property<T, G, F, R>(generator: G, predicate: F) -> FnProperty<T, G, F>
where
    G: Generator<T>,
    F: Fn(T) -> R,
    R: IntoOutcome,
{
    FnProperty {
        generator,
        predicate,
        before_each: None,
        after_each: None,
        _marker: PhantomData,
    }
}

/// Property built from a generator and an asynchronous predicate
pub struct AsyncFnProperty<T, G, F> {
    generator: G,
    predicate: F,
    before_each: Option<AsyncChainedHook>,
    after_each: Option<AsyncChainedHook>,
    _marker: PhantomData<fn(T)>,
}

impl<T, G, F> AsyncFnProperty<T, G, F> {
    pub fn before_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_each = Some(Arc::new(move |_: AsyncHook| {
            hook();
            noop()
        }));
        self
    }

    pub fn after_each(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.after_each = Some(Arc::new(move |_: AsyncHook| {
            hook();
            noop()
        }));
        self
    }

    /// Await `hook` before every execution of the predicate, in place of any default hook
    pub fn async_before_each<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.before_each = Some(Arc::new(move |_: AsyncHook| hook().boxed_local()));
        self
    }

    /// Await `hook` after every execution of the predicate, even a failing one
    pub fn async_after_each<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.after_each = Some(Arc::new(move |_: AsyncHook| hook().boxed_local()));
        self
    }

    /// Await `hook` before every execution; it receives the hook it replaces
    pub fn async_before_each_with<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn(AsyncHook) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.before_each = Some(chain_async(self.before_each.take(), hook));
        self
    }

    /// Await `hook` after every execution; it receives the hook it replaces
    pub fn async_after_each_with<H, Fut>(mut self, hook: H) -> Self
    where
        H: Fn(AsyncHook) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.after_each = Some(chain_async(self.after_each.take(), hook));
        self
    }
}

impl<T, G, F, Fut, R> AsyncProperty<T> for AsyncFnProperty<T, G, F>
where
    G: Generator<T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
    R: IntoOutcome,
{
    fn generate(&self, rng: &mut Random, run_id: Option<usize>) -> Value<T> {
        self.generator.generate(rng, run_id.map(run_id_to_frequency))
    }

    fn shrink(&self, value: &Value<T>) -> Shrinks<T> {
        self.generator.shrink(value.value(), value.context())
    }

    async fn run_with_hooks(&self, input: T, defaults: &Hooks) -> Outcome {
        let trial = async move {
            run_chained_async(&self.before_each, defaults.async_before()).await;
            (self.predicate)(input).await.into_outcome()
        };
        let outcome = match AssertUnwindSafe(trial).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Outcome::Failed(PropertyError::from_panic(payload)),
        };
        let cleanup = async move { run_chained_async(&self.after_each, defaults.async_after()).await };
        let cleanup = AssertUnwindSafe(cleanup)
            .catch_unwind()
            .await
            .map_err(PropertyError::from_panic);
        settle(outcome, cleanup)
    }
}

/// Bind an asynchronous `predicate` to the values of `generator`
pub fn async_property<T, G, F, Fut, R>(generator: G, predicate: F) -> AsyncFnProperty<T, G, F>
where
    G: Generator<T>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
    R: IntoOutcome,
{
    AsyncFnProperty {
        generator,
        predicate,
        before_each: None,
        after_each: None,
        _marker: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::integer;
    use futures_lite::future::block_on;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: &Log, label: &'static str) -> impl Fn() + Send + Sync + 'static {
        let log = Arc::clone(log);
        move || log.lock().unwrap().push(label)
    }

    fn drain(log: &Log) -> Vec<&'static str> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_predicate_return_values() {
        assert_eq!(().into_outcome(), Outcome::Passed);
        assert_eq!(true.into_outcome(), Outcome::Passed);
        assert_eq!(false.into_outcome(), Outcome::Failed(PropertyError::ReturnedFalse));
        assert_eq!(Ok::<(), String>(()).into_outcome(), Outcome::Passed);
        assert_eq!(
            Err::<(), _>("boom".to_string()).into_outcome(),
            Outcome::Failed(PropertyError::failed("boom"))
        );
        assert_eq!(
            Err::<(), _>(PropertyError::Panicked { message: "x".into() }).into_outcome(),
            Outcome::Failed(PropertyError::Panicked { message: "x".into() })
        );
    }

    #[test]
    fn test_preconditions_become_skips() {
        assert_eq!(
            pre(false).into_outcome(),
            Outcome::Skipped(PreconditionFailure::skip())
        );
        let through_property_error: Result<(), PropertyError> = pre(false).map_err(Into::into);
        assert_eq!(
            through_property_error.into_outcome(),
            Outcome::Skipped(PreconditionFailure::skip())
        );
        let boxed: Result<(), Box<dyn Error + Send + Sync>> = Err(Box::new(PreconditionFailure::interrupt()));
        assert_eq!(boxed.into_outcome(), Outcome::Skipped(PreconditionFailure::interrupt()));
        assert_eq!(pre(true).into_outcome(), Outcome::Passed);
    }

    #[test]
    fn test_panics_become_failures() {
        let prop = property(integer(0_i32, 10), |x: i32| {
            if x >= 0 {
                panic!("value was {x}");
            }
        });
        assert_eq!(
            prop.run(3),
            Outcome::Failed(PropertyError::Panicked {
                message: "value was 3".into()
            })
        );
        assert!(!prop.is_async());
    }

    #[test]
    fn test_hooks_wrap_every_run() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let (b, a) = (Arc::clone(&before), Arc::clone(&after));
        let prop = property(integer(0_i32, 10), |x: i32| x < 5)
            .before_each(move || {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .after_each(move || {
                a.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(prop.run(1), Outcome::Passed);
        assert!(prop.run(7).is_failed());
        assert_eq!(before.load(Ordering::SeqCst), 2);
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_hooks_fail_the_trial() {
        let prop = property(integer(0_i32, 10), |_: i32| true).after_each(|| panic!("cleanup failed"));
        assert_eq!(
            prop.run(1),
            Outcome::Failed(PropertyError::Panicked {
                message: "cleanup failed".into()
            })
        );
        let prop = property(integer(0_i32, 10), |_: i32| true).before_each(|| panic!("setup failed"));
        assert!(prop.run(1).is_failed());
    }

    #[test]
    fn test_generation_uses_run_id_bias() {
        let prop = property(integer(-1000_i32, 1000), |_: i32| true);
        let mut biased = Random::new(1);
        let mut direct = Random::new(1);
        let generator = integer(-1000_i32, 1000);
        for run_id in 0..20 {
            assert_eq!(
                prop.generate(&mut biased, Some(run_id)).get(),
                generator
                    .generate(&mut direct, Some(run_id_to_frequency(run_id)))
                    .get()
            );
        }
        let value = prop.generate(&mut biased, None);
        assert!(prop.shrink(&value).all(|v| v.value().abs() < value.value().abs()));
    }

    #[test]
    fn test_async_property_outcomes() {
        let prop = async_property(integer(0_i32, 10), |x: i32| async move {
            pre(x != 3)?;
            if x > 5 {
                return Err(PropertyError::failed(format!("{x} is too large")));
            }
            Ok(())
        });
        assert!(prop.is_async());
        assert_eq!(block_on(prop.run(1)), Outcome::Passed);
        assert_eq!(block_on(prop.run(3)), Outcome::Skipped(PreconditionFailure::skip()));
        assert_eq!(
            block_on(prop.run(8)),
            Outcome::Failed(PropertyError::failed("8 is too large"))
        );
    }

    #[test]
    fn test_async_panics_become_failures() {
        let prop = async_property(integer(0_i32, 10), |x: i32| async move {
            assert!(x < 0, "negative expected");
        });
        match block_on(prop.run(2)) {
            Outcome::Failed(PropertyError::Panicked { message }) => {
                assert!(message.contains("negative expected"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_property_hooks_take_precedence_over_defaults() {
        let log: Log = Arc::default();
        let defaults = Hooks::new()
            .before_each(recorder(&log, "default before"))
            .after_each(recorder(&log, "default after"));

        let plain = property(integer(0_i32, 10), |_: i32| true);
        assert_eq!(plain.run_with_hooks(1, &defaults), Outcome::Passed);
        assert_eq!(drain(&log), ["default before", "default after"]);

        let replacing = property(integer(0_i32, 10), |_: i32| true).before_each(recorder(&log, "own before"));
        assert_eq!(replacing.run_with_hooks(1, &defaults), Outcome::Passed);
        assert_eq!(drain(&log), ["own before", "default after"]);

        let own = recorder(&log, "own after");
        let wrapping = property(integer(0_i32, 10), |_: i32| false).after_each_with(move |previous| {
            own();
            previous();
        });
        assert!(wrapping.run_with_hooks(1, &defaults).is_failed());
        assert_eq!(drain(&log), ["default before", "own after", "default after"]);

        assert_eq!(plain.run(1), Outcome::Passed);
        assert!(drain(&log).is_empty());
    }

    #[test]
    fn test_chained_hooks_wrap_earlier_property_hooks() {
        let log: Log = Arc::default();
        let outer = recorder(&log, "outer");
        let prop = property(integer(0_i32, 10), |_: i32| true)
            .before_each(recorder(&log, "inner"))
            .before_each_with(move |previous| {
                outer();
                previous();
            });
        let defaults = Hooks::new().before_each(recorder(&log, "default"));
        prop.run_with_hooks(1, &defaults);
        assert_eq!(drain(&log), ["outer", "inner"]);
    }

    #[test]
    fn test_async_hooks_are_awaited_around_predicate() {
        let log: Log = Arc::default();
        let (before, after, predicate) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
        let prop = async_property(integer(0_i32, 10), move |_: i32| {
            let log = Arc::clone(&predicate);
            async move { log.lock().unwrap().push("predicate") }
        })
        .async_before_each(move || {
            let log = Arc::clone(&before);
            async move {
                futures_lite::future::yield_now().await;
                log.lock().unwrap().push("before");
            }
        })
        .async_after_each_with(move |previous| {
            let log = Arc::clone(&after);
            async move {
                previous().await;
                log.lock().unwrap().push("after");
            }
        });
        let defaults = Hooks::new().async_after_each({
            let log = Arc::clone(&log);
            move || {
                let log = Arc::clone(&log);
                async move { log.lock().unwrap().push("default after") }
            }
        });
        assert_eq!(block_on(prop.run_with_hooks(4, &defaults)), Outcome::Passed);
        assert_eq!(drain(&log), ["before", "predicate", "default after", "after"]);
    }

    #[test]
    fn test_async_properties_fall_back_to_sync_default_hooks() {
        let log: Log = Arc::default();
        let defaults = Hooks::new().before_each(recorder(&log, "default before"));
        let prop = async_property(integer(0_i32, 10), |_: i32| async { true });
        assert_eq!(block_on(prop.run_with_hooks(2, &defaults)), Outcome::Passed);
        assert_eq!(drain(&log), ["default before"]);
        assert!(!defaults.has_async());
        assert_eq!(defaults.clone(), defaults);
        assert_ne!(Hooks::new().before_each(|| {}), Hooks::new().before_each(|| {}));
    }

    #[test]
    fn test_panicking_async_hooks_fail_the_trial() {
        let prop = async_property(integer(0_i32, 10), |_: i32| async { true }).async_after_each(|| async {
            panic!("teardown failed");
        });
        assert_eq!(
            block_on(prop.run(1)),
            Outcome::Failed(PropertyError::Panicked {
                message: "teardown failed".into()
            })
        );
    }
}
