//! Infinite lazy sequences of generated values.
//!
//! Streams are not shrinkable: telling whether a smaller stream still fails
//! would require materializing it, so shrinking always yields nothing.

use std::fmt;
use std::sync::Arc;

use crate::bias::should_bias;
use crate::generator::{BoxedGenerator, Generator};
use crate::rng::Random;
use crate::shrink::{self, Shrinks};
use crate::value::{Context, Value};

/// Endless iterator over values of one generator.
///
/// Each read of the enclosing [`Value`] restarts the stream from its first
/// item, so a predicate consuming it never affects later reruns.
pub struct InfiniteStream<T> {
    generator: BoxedGenerator<T>,
    origin: Random,
    rng: Random,
    bias: Option<u32>,
}

impl<T> InfiniteStream<T> {
    fn new(generator: BoxedGenerator<T>, origin: Random, bias: Option<u32>) -> Self {
        Self {
            generator,
            rng: origin.clone(),
            origin,
            bias,
        }
    }

    /// The same stream, back at its first item
    pub fn restart(&self) -> Self {
        Self::new(self.generator.clone(), self.origin.clone(), self.bias)
    }
}

impl<T> Iterator for InfiniteStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (value, _) = self.generator.generate(&mut self.rng, self.bias).into_parts();
        Some(value)
    }
}

impl<T> Clone for InfiniteStream<T> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            origin: self.origin.clone(),
            rng: self.rng.clone(),
            bias: self.bias,
        }
    }
}

impl<T> fmt::Debug for InfiniteStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InfiniteStream(..)")
    }
}

/// Generator of [`InfiniteStream`]s
#[derive(Debug, Clone)]
pub struct StreamGenerator<T> {
    item: BoxedGenerator<T>,
}

impl<T: 'static> Generator<InfiniteStream<T>> for StreamGenerator<T> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<InfiniteStream<T>> {
        let applied_bias = if should_bias(rng, bias) { bias } else { None };
        let stream = InfiniteStream::new(self.item.clone(), rng.fork(), applied_bias);
        Value::bare(stream).with_cloner(Arc::new(InfiniteStream::restart))
    }

    fn shrink(&self, _value: &InfiniteStream<T>, _context: Option<&Context>) -> Shrinks<InfiniteStream<T>> {
        shrink::empty()
    }

    fn can_shrink_without_context(&self, _value: &InfiniteStream<T>) -> bool {
        false
    }
}

/// Infinite streams of values drawn from `item`
pub fn infinite_stream<T, G>(item: G) -> StreamGenerator<T>
where
    G: Generator<T> + Send + Sync + 'static,
{
    StreamGenerator {
        item: BoxedGenerator::new(item),
    }
}
