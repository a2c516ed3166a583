//! Generators derived from other generators: map, filter, chain and the
//! bias/shrink switches.
//!
//! Every combinator holds its source behind an `Arc` so shrink sequences can
//! own what they need and outlive the call that produced them.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::GeneratorError;
use crate::generator::Generator;
use crate::rng::Random;
use crate::shrink::{self, Shrinks};
use crate::value::{Cloner, Context, Value, downcast_context, into_context};

/// Attempts made by [`Filter`] before giving up
pub const DEFAULT_FILTER_ATTEMPTS: usize = 1000;

type Unmapper<S, U> = Arc<dyn Fn(&U) -> Option<S> + Send + Sync>;

/// Shrink state of a mapped value: the source value it came from
struct MapContext<S> {
    source: Value<S>,
}

/// Generator applying a function to the values of another one.
///
/// Shrinking replays the source's shrinks through the mapper. A bare mapped
/// value can only be shrunk when an unmapper recovers its source.
pub struct Map<S, U, G, F> {
    source: Arc<G>,
    mapper: Arc<F>,
    unmapper: Option<Unmapper<S, U>>,
    _marker: PhantomData<fn(S) -> U>,
}

impl<S, U, G, F> Clone for Map<S, U, G, F> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            mapper: Arc::clone(&self.mapper),
            unmapper: self.unmapper.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, U, G, F> Map<S, U, G, F> {
    pub fn new(source: G, mapper: F) -> Self {
        Self {
            source: Arc::new(source),
            mapper: Arc::new(mapper),
            unmapper: None,
            _marker: PhantomData,
        }
    }

    /// Map values and recover sources of bare mapped values with `unmapper`
    pub fn with_unmapper<R>(source: G, mapper: F, unmapper: R) -> Self
    where
        R: Fn(&U) -> Option<S> + Send + Sync + 'static,
    {
        Self {
            unmapper: Some(Arc::new(unmapper)),
            ..Self::new(source, mapper)
        }
    }
}

/// Map `source`; a source that must be cloned yields a mapped value that
/// is rebuilt from a fresh copy of it on every read
fn map_value<S, U, F>(mapper: &Arc<F>, source: Value<S>) -> Value<U>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S) -> U + Send + Sync + 'static,
{
    let mapped = mapper(source.get());
    let cloner = source.must_clone().then(|| {
        let mapper = Arc::clone(mapper);
        let source = source.clone();
        Arc::new(move |_: &U| mapper(source.get())) as Cloner<U>
    });
    let value = Value::new(mapped, Some(into_context(MapContext { source })));
    match cloner {
        Some(cloner) => value.with_cloner(cloner),
        None => value,
    }
}

impl<S, U, G, F> Generator<U> for Map<S, U, G, F>
where
    S: Clone + Send + Sync + 'static,
    U: 'static,
    G: Generator<S> + 'static,
    F: Fn(S) -> U + Send + Sync + 'static,
{
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<U> {
        let source = self.source.generate(rng, bias);
        map_value(&self.mapper, source)
    }

    fn shrink(&self, value: &U, context: Option<&Context>) -> Shrinks<U> {
        let mapper = Arc::clone(&self.mapper);
        let sources = match context {
            Some(context) => {
                let state = downcast_context::<MapContext<S>>(context, "Map");
                self.source
                    .shrink(state.source.value(), state.source.context())
            }
            None => match self.unmap(value) {
                Some(source) => self.source.shrink(&source, None),
                None => return shrink::empty(),
            },
        };
        Box::new(sources.map(move |source| map_value(&mapper, source)))
    }

    fn can_shrink_without_context(&self, value: &U) -> bool {
        self.unmap(value).is_some()
    }
}

impl<S, U, G, F> Map<S, U, G, F>
where
    G: Generator<S>,
{
    /// The source of a bare mapped value, when the source generator accepts it
    fn unmap(&self, value: &U) -> Option<S> {
        let unmapper = self.unmapper.as_ref()?;
        unmapper(value).filter(|source| self.source.can_shrink_without_context(source))
    }
}

/// Generator keeping only values that satisfy a predicate.
///
/// Generation retries up to a fixed number of times and then panics with
/// [`GeneratorError::FilterExhausted`]. Shrinks are narrowed to values that
/// still satisfy the predicate.
pub struct Filter<T, G, P> {
    source: Arc<G>,
    predicate: Arc<P>,
    max_attempts: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, G, P> Clone for Filter<T, G, P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            predicate: Arc::clone(&self.predicate),
            max_attempts: self.max_attempts,
            _marker: PhantomData,
        }
    }
}

impl<T, G, P> Filter<T, G, P> {
    pub fn new(source: G, predicate: P) -> Self {
        Self {
            source: Arc::new(source),
            predicate: Arc::new(predicate),
            max_attempts: DEFAULT_FILTER_ATTEMPTS,
            _marker: PhantomData,
        }
    }

    /// Change how many consecutive rejections are tolerated
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

impl<T, G, P> Generator<T> for Filter<T, G, P>
where
    T: 'static,
    G: Generator<T>,
    P: Fn(&T) -> bool + 'static,
{
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        for _ in 0..self.max_attempts {
            let value = self.source.generate(rng, bias);
            if (self.predicate)(value.value()) {
                return value;
            }
        }
        panic!(
            "{}",
            GeneratorError::FilterExhausted {
                attempts: self.max_attempts
            }
        );
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        let predicate = Arc::clone(&self.predicate);
        Box::new(
            self.source
                .shrink(value, context)
                .filter(move |candidate| predicate(candidate.value())),
        )
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        (self.predicate)(value) && self.source.can_shrink_without_context(value)
    }
}

/// Shrink state of a chained value.
///
/// `snapshot` is the random source as it was before the source value was
/// drawn, so a shrunk source re-derives its dependent value deterministically.
struct ChainContext<T, H> {
    bias: Option<u32>,
    source: Value<T>,
    derived: Arc<H>,
    derived_context: Option<Context>,
    snapshot: Random,
    stopped_for_source: bool,
}

impl<T: Clone, H> Clone for ChainContext<T, H> {
    fn clone(&self) -> Self {
        Self {
            bias: self.bias,
            source: self.source.clone(),
            derived: Arc::clone(&self.derived),
            derived_context: self.derived_context.clone(),
            snapshot: self.snapshot.clone(),
            stopped_for_source: self.stopped_for_source,
        }
    }
}

/// Generator whose output generator depends on a first generated value.
///
/// Shrinking first shrinks the source value and re-derives a dependent value
/// from it. Once the dependent value itself has been shrunk, the source is
/// frozen.
pub struct Chain<T, U, G, H, F> {
    source: Arc<G>,
    chainer: Arc<F>,
    _marker: PhantomData<fn(T) -> (U, H)>,
}

impl<T, U, G, H, F> Clone for Chain<T, U, G, H, F> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            chainer: Arc::clone(&self.chainer),
            _marker: PhantomData,
        }
    }
}

impl<T, U, G, H, F> Chain<T, U, G, H, F> {
    pub fn new(source: G, chainer: F) -> Self {
        Self {
            source: Arc::new(source),
            chainer: Arc::new(chainer),
            _marker: PhantomData,
        }
    }
}

fn chain_value<T, U, H, F>(
    chainer: &F,
    source: Value<T>,
    rng: &mut Random,
    snapshot: Random,
    bias: Option<u32>,
) -> Value<U>
where
    T: Clone + Send + Sync + 'static,
    H: Generator<U> + Send + Sync + 'static,
    F: Fn(T) -> H,
{
    let derived = chainer(source.get());
    let (value, derived_context) = derived.generate(rng, bias).into_parts();
    let context = ChainContext {
        bias,
        source,
        derived: Arc::new(derived),
        derived_context,
        snapshot,
        stopped_for_source: false,
    };
    Value::new(value, Some(into_context(context)))
}

impl<T, U, G, H, F> Generator<U> for Chain<T, U, G, H, F>
where
    T: Clone + Send + Sync + 'static,
    U: 'static,
    G: Generator<T> + 'static,
    H: Generator<U> + Send + Sync + 'static,
    F: Fn(T) -> H + 'static,
{
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<U> {
        let snapshot = rng.clone();
        let source = self.source.generate(rng, bias);
        chain_value(self.chainer.as_ref(), source, rng, snapshot, bias)
    }

    fn shrink(&self, value: &U, context: Option<&Context>) -> Shrinks<U> {
        let Some(context) = context else {
            return shrink::empty();
        };
        let state = downcast_context::<ChainContext<T, H>>(context, "Chain");

        let upstream: Shrinks<U> = if state.stopped_for_source {
            shrink::empty()
        } else {
            let chainer = Arc::clone(&self.chainer);
            let snapshot = state.snapshot.clone();
            let bias = state.bias;
            Box::new(
                self.source
                    .shrink(state.source.value(), state.source.context())
                    .map(move |source| {
                        let mut rng = snapshot.clone();
                        chain_value(chainer.as_ref(), source, &mut rng, snapshot.clone(), bias)
                    }),
            )
        };

        let derived = state.derived.shrink(value, state.derived_context.as_ref());
        let downstream = derived.map(move |candidate| {
            let (value, derived_context) = candidate.into_parts();
            let context = ChainContext {
                derived_context,
                stopped_for_source: true,
                ..(*state).clone()
            };
            Value::new(value, Some(into_context(context)))
        });
        Box::new(upstream.chain(downstream))
    }

    fn can_shrink_without_context(&self, _value: &U) -> bool {
        false
    }
}

/// Generator whose values never shrink
#[derive(Debug, Clone)]
pub struct NoShrink<G> {
    inner: G,
}

impl<G> NoShrink<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<T: 'static, G: Generator<T>> Generator<T> for NoShrink<G> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        self.inner.generate(rng, bias)
    }

    fn shrink(&self, _value: &T, _context: Option<&Context>) -> Shrinks<T> {
        shrink::empty()
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.inner.can_shrink_without_context(value)
    }
}

/// Generator that always samples uniformly
#[derive(Debug, Clone)]
pub struct NoBias<G> {
    inner: G,
}

impl<G> NoBias<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<T, G: Generator<T>> Generator<T> for NoBias<G> {
    fn generate(&self, rng: &mut Random, _bias: Option<u32>) -> Value<T> {
        self.inner.generate(rng, None)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        self.inner.shrink(value, context)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.inner.can_shrink_without_context(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::integer;
    use crate::stream::infinite_stream;

    fn values<T: Clone>(shrinks: Shrinks<T>) -> Vec<T> {
        shrinks.map(|v| v.get()).collect()
    }

    #[test]
    fn test_map_generates_and_shrinks_through_source() {
        let generator = integer(0_i32, 100).map(|x| x * 2);
        let mut rng = Random::new(4);
        for _ in 0..100 {
            let value = generator.generate(&mut rng, Some(2));
            assert_eq!(value.value() % 2, 0);
            let shrinks = values(generator.shrink(value.value(), value.context()));
            assert!(shrinks.iter().all(|v| v % 2 == 0 && v < value.value()));
        }
    }

    #[test]
    fn test_map_without_unmapper_cannot_shrink_bare_values() {
        let generator = integer(0_i32, 100).map(|x| x * 2);
        assert!(!generator.can_shrink_without_context(&8));
        assert_eq!(generator.shrink(&8, None).count(), 0);
    }

    #[test]
    fn test_map_rebuilds_values_of_sources_that_must_be_cloned() {
        let generator = infinite_stream(integer(0_u32, 100)).map(|stream| stream.skip(1));
        let mut rng = Random::new(9);
        let value = generator.generate(&mut rng, None);
        assert!(value.must_clone());
        let mut first = value.get();
        let head: Vec<u32> = first.by_ref().take(3).collect();
        assert_eq!(head.len(), 3);
        let replayed: Vec<u32> = value.get().take(3).collect();
        assert_eq!(replayed, head);

        let plain = integer(0_i32, 100).map(|x| x * 2).generate(&mut rng, None);
        assert!(!plain.must_clone());
    }

    #[test]
    fn test_map_with_unmapper_shrinks_bare_values() {
        let generator = integer(0_i32, 100).map_with_unmapper(
            |x| x.to_string(),
            |s: &String| s.parse::<i32>().ok(),
        );
        assert!(generator.can_shrink_without_context(&"8".to_string()));
        assert!(!generator.can_shrink_without_context(&"abc".to_string()));
        assert!(!generator.can_shrink_without_context(&"101".to_string()));
        assert_eq!(
            values(generator.shrink(&"8".to_string(), None)),
            vec!["0", "4", "6", "7"]
        );
    }

    #[test]
    fn test_filter_generates_and_shrinks_matching_values() {
        let generator = integer(0_i32, 100).filter(|x| x % 2 == 1);
        let mut rng = Random::new(9);
        for _ in 0..100 {
            let value = generator.generate(&mut rng, None);
            assert_eq!(value.value() % 2, 1);
        }
        assert_eq!(values(generator.shrink(&9, None)), vec![5, 7]);
        assert!(!generator.can_shrink_without_context(&10));
    }

    #[test]
    #[should_panic(expected = "filter rejected 5 consecutive values")]
    fn test_filter_gives_up() {
        let generator = integer(0_i32, 10).filter(|_| false).with_max_attempts(5);
        generator.generate(&mut Random::new(1), None);
    }

    #[test]
    fn test_chain_keeps_dependency_while_shrinking() {
        let generator = integer(0_i32, 10).chain(|low| integer(low, 20));
        assert!(!generator.can_shrink_without_context(&5));
        assert_eq!(generator.shrink(&5, None).count(), 0);

        let mut rng = Random::new(21);
        for _ in 0..50 {
            let value = generator.generate(&mut rng, None);
            assert!((0..=20).contains(value.value()));
            for candidate in generator.shrink(value.value(), value.context()).take(30) {
                assert!((0..=20).contains(candidate.value()));
            }
        }
    }

    #[test]
    fn test_chain_shrinks_source_before_derived() {
        let generator = integer(0_usize, 5).chain(|len| integer(0_usize, 100).map(move |x| (len, x)));
        let mut rng = Random::new(3);
        let value = loop {
            let value = generator.generate(&mut rng, None);
            if value.value().0 > 0 && value.value().1 > 0 {
                break value;
            }
        };
        let candidates = values(generator.shrink(value.value(), value.context()));
        let first = candidates[0];
        assert_eq!(first.0, 0);
        let last = *candidates.last().unwrap();
        assert_eq!(last.0, value.value().0);
    }

    #[test]
    fn test_chain_freezes_source_after_derived_shrink() {
        let generator = integer(1_u32, 3).chain(|n| integer(0_u32, 50).map(move |x| (n, x)));
        let mut rng = Random::new(30);
        let value = loop {
            let value = generator.generate(&mut rng, None);
            if value.value().1 > 1 {
                break value;
            }
        };
        let source = value.value().0;
        let derived = generator
            .shrink(value.value(), value.context())
            .find(|c| c.value().0 == source)
            .unwrap();
        for candidate in generator.shrink(derived.value(), derived.context()) {
            assert_eq!(candidate.value().0, source);
        }
    }

    #[test]
    fn test_no_shrink_and_no_bias() {
        let generator = integer(0_i32, 1000).no_shrink();
        assert_eq!(generator.shrink(&500, None).count(), 0);
        assert!(generator.can_shrink_without_context(&500));

        let generator = integer(-1000_i32, 1000).no_bias();
        let mut biased = Random::new(5);
        let mut unbiased = Random::new(5);
        let plain = integer(-1000_i32, 1000);
        for _ in 0..20 {
            assert_eq!(
                generator.generate(&mut biased, Some(2)).get(),
                plain.generate(&mut unbiased, None).get()
            );
        }
    }
}
