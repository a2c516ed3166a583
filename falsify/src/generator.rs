//! The generator contract every combinator is built against.

use std::fmt;
use std::sync::Arc;

use crate::combinators::{Chain, Filter, Map, NoBias, NoShrink};
use crate::rng::Random;
use crate::shrink::Shrinks;
use crate::value::{Context, Value};

/// Produces values of type `T` and knows how to shrink them.
///
/// Generators are stateless: everything a later shrink needs travels in the
/// [`Value`]'s context.
pub trait Generator<T> {
    /// Generate a value.
    ///
    /// When `bias` is set, roughly one call in `bias` favours edge cases.
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T>;

    /// Lazy shrink candidates for `value`, best first.
    ///
    /// `context` is the one attached to `value` when it was produced by this
    /// generator, or `None` to start cold. Every candidate must be strictly
    /// closer to this generator's target than `value`.
    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T>;

    /// Whether `value` is a domain member this generator can shrink without context
    fn can_shrink_without_context(&self, value: &T) -> bool;

    /// Transform generated values
    fn map<U, F>(self, mapper: F) -> Map<T, U, Self, F>
    where
        Self: Sized,
        F: Fn(T) -> U,
    {
        Map::new(self, mapper)
    }

    /// Transform generated values; `unmapper` lets bare mapped values be shrunk
    fn map_with_unmapper<U, F, R>(self, mapper: F, unmapper: R) -> Map<T, U, Self, F>
    where
        Self: Sized,
        F: Fn(T) -> U,
        R: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        Map::with_unmapper(self, mapper, unmapper)
    }

    /// Keep only values satisfying `predicate`
    fn filter<P>(self, predicate: P) -> Filter<T, Self, P>
    where
        Self: Sized,
        P: Fn(&T) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Select the next generator from the generated value
    fn chain<U, H, F>(self, chainer: F) -> Chain<T, U, Self, H, F>
    where
        Self: Sized,
        H: Generator<U>,
        F: Fn(T) -> H,
    {
        Chain::new(self, chainer)
    }

    /// Drop shrinking altogether
    fn no_shrink(self) -> NoShrink<Self>
    where
        Self: Sized,
    {
        NoShrink::new(self)
    }

    /// Ignore any bias factor
    fn no_bias(self) -> NoBias<Self>
    where
        Self: Sized,
    {
        NoBias::new(self)
    }

    /// Erase the generator's type
    fn boxed(self) -> BoxedGenerator<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        BoxedGenerator::new(self)
    }
}

/// Shared, type-erased generator
pub struct BoxedGenerator<T> {
    inner: Arc<dyn Generator<T> + Send + Sync>,
}

impl<T> BoxedGenerator<T> {
    /// Create a new boxed generator
    pub fn new<G: Generator<T> + Send + Sync + 'static>(generator: G) -> Self {
        Self {
            inner: Arc::new(generator),
        }
    }
}

impl<T> Clone for BoxedGenerator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BoxedGenerator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedGenerator")
    }
}

impl<T> Generator<T> for BoxedGenerator<T> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        self.inner.generate(rng, bias)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        self.inner.shrink(value, context)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.inner.can_shrink_without_context(value)
    }

    fn boxed(self) -> BoxedGenerator<T> {
        self
    }
}

impl<T, G: Generator<T> + ?Sized> Generator<T> for Arc<G> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        (**self).generate(rng, bias)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        (**self).shrink(value, context)
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        (**self).can_shrink_without_context(value)
    }
}
