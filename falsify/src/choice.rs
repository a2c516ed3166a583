//! Weighted choice between generators.
//!
//! [`FrequencyGenerator`] picks an alternative in proportion to its weight.
//! The first alternative is treated as the simplest one: shrinking tries to
//! switch to it before shrinking inside the selected alternative, and deep
//! recursive structures are steered toward it through a shared
//! [`DepthIdentifier`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GeneratorError;
use crate::generator::{BoxedGenerator, Generator};
use crate::rng::Random;
use crate::shrink::{self, Shrinks};
use crate::value::{Context, Value, downcast_context, into_context};

/// Generation depth shared by every generator holding a clone of it.
///
/// Recursive definitions share one identifier so that the deeper the
/// structure being built, the more likely terminal alternatives become.
#[derive(Debug, Clone, Default)]
pub struct DepthIdentifier {
    depth: Arc<AtomicUsize>,
}

impl DepthIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current depth
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Go `amount` levels deeper until the guard is dropped
    pub fn enter(&self, amount: usize) -> DepthGuard<'_> {
        self.depth.fetch_add(amount, Ordering::SeqCst);
        DepthGuard {
            identifier: self,
            amount,
        }
    }
}

/// Restores the depth of a [`DepthIdentifier`] on drop
#[must_use = "the depth is restored as soon as the guard is dropped"]
pub struct DepthGuard<'a> {
    identifier: &'a DepthIdentifier,
    amount: usize,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.identifier.depth.fetch_sub(self.amount, Ordering::SeqCst);
    }
}

/// One alternative of a [`FrequencyGenerator`]
pub struct Weighted<T> {
    pub generator: BoxedGenerator<T>,
    pub weight: u32,
    /// Value offered when shrinking a bare value of another alternative
    pub fallback: Option<T>,
}

impl<T> Weighted<T> {
    pub fn new<G>(generator: G, weight: u32) -> Self
    where
        G: Generator<T> + Send + Sync + 'static,
    {
        Self {
            generator: BoxedGenerator::new(generator),
            weight,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl<T: Clone> Clone for Weighted<T> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            weight: self.weight,
            fallback: self.fallback.clone(),
        }
    }
}

impl<T> fmt::Debug for Weighted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weighted")
            .field("weight", &self.weight)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Tuning of a [`FrequencyGenerator`]
#[derive(Debug, Clone)]
pub struct FrequencyConstraints {
    /// Offer the first alternative as a shrink of the others.
    ///
    /// Off by default; [`option`] turns it on so `None` is tried first.
    pub with_cross_shrink: bool,
    /// How fast the first alternative gains weight with depth; 0 disables it
    pub depth_factor: f64,
    /// Depth from which only the first alternative is generated
    pub max_depth: Option<usize>,
    pub depth_identifier: Option<DepthIdentifier>,
}

impl Default for FrequencyConstraints {
    fn default() -> Self {
        Self {
            with_cross_shrink: false,
            depth_factor: 0.0,
            max_depth: None,
            depth_identifier: None,
        }
    }
}

struct FrequencyContext {
    selected_index: usize,
    bias: Option<u32>,
    inner_context: Option<Context>,
    /// Random state right after generation, used to derive the first
    /// alternative as a shrink candidate
    fallback_rng: Option<Random>,
}

fn wrap_choice<T>(index: usize, value: Value<T>, fallback_rng: Option<Random>, bias: Option<u32>) -> Value<T> {
    let inner_context = value.context().cloned();
    value.with_context(Some(into_context(FrequencyContext {
        selected_index: index,
        bias,
        inner_context,
        fallback_rng,
    })))
}

/// Generator choosing among weighted alternatives
pub struct FrequencyGenerator<T> {
    alternatives: Vec<Weighted<T>>,
    cumulated_weights: Vec<i64>,
    total_weight: i64,
    with_cross_shrink: bool,
    depth_factor: f64,
    max_depth: Option<usize>,
    depth: DepthIdentifier,
}

impl<T> FrequencyGenerator<T> {
    pub fn new(alternatives: Vec<Weighted<T>>, constraints: FrequencyConstraints) -> Result<Self, GeneratorError> {
        Self::with_label(alternatives, constraints, "frequency")
    }

    fn with_label(
        alternatives: Vec<Weighted<T>>,
        constraints: FrequencyConstraints,
        label: &'static str,
    ) -> Result<Self, GeneratorError> {
        if alternatives.is_empty() {
            return Err(GeneratorError::EmptyChoice { label });
        }
        if !constraints.depth_factor.is_finite() || constraints.depth_factor < 0.0 {
            return Err(GeneratorError::InvalidDepthFactor(constraints.depth_factor));
        }
        let cumulated_weights: Vec<i64> = alternatives
            .iter()
            .scan(0_i64, |total, alternative| {
                *total += i64::from(alternative.weight);
                Some(*total)
            })
            .collect();
        let total_weight = cumulated_weights.last().copied().unwrap_or(0);
        if total_weight <= 0 {
            return Err(GeneratorError::ZeroTotalWeight { label });
        }
        Ok(Self {
            alternatives,
            cumulated_weights,
            total_weight,
            with_cross_shrink: constraints.with_cross_shrink,
            depth_factor: constraints.depth_factor,
            max_depth: constraints.max_depth,
            depth: constraints.depth_identifier.unwrap_or_default(),
        })
    }

    fn must_generate_first(&self) -> bool {
        self.max_depth.is_some_and(|max| max <= self.depth.depth())
    }

    fn must_fallback_to_first(&self, index: usize) -> bool {
        index != 0 && self.with_cross_shrink && self.alternatives[0].weight != 0
    }

    /// Extra weight granted to the first alternative at the current depth,
    /// as a negative lower bound for the selection draw
    fn neg_depth_benefit(&self) -> i64 {
        let first = self.alternatives[0].weight;
        if self.depth_factor <= 0.0 || first == 0 {
            return 0;
        }
        let first = f64::from(first);
        let benefit = (first * (self.depth_factor * self.depth.depth() as f64 + 1.0)).floor() - first;
        -(benefit as i64)
    }
}

impl<T: Clone + 'static> FrequencyGenerator<T> {
    fn generate_for_index(&self, rng: &mut Random, index: usize, bias: Option<u32>) -> Value<T> {
        let _guard = self.depth.enter(1);
        let value = self.alternatives[index].generator.generate(rng, bias);
        let fallback_rng = self.must_fallback_to_first(index).then(|| rng.clone());
        wrap_choice(index, value, fallback_rng, bias)
    }

    fn can_shrink_without_context_index(&self, value: &T) -> Option<usize> {
        if self.must_generate_first() {
            return self.alternatives[0]
                .generator
                .can_shrink_without_context(value)
                .then_some(0);
        }
        let _guard = self.depth.enter(1);
        self.alternatives
            .iter()
            .position(|alternative| alternative.weight != 0 && alternative.generator.can_shrink_without_context(value))
    }

    fn default_shrink_for_first(&self, index: usize) -> Option<Value<T>> {
        if !self.must_fallback_to_first(index) {
            return None;
        }
        let fallback = self.alternatives[0].fallback.clone()?;
        Some(wrap_choice(0, Value::bare(fallback), None, None))
    }
}

impl<T: Clone + 'static> Generator<T> for FrequencyGenerator<T> {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<T> {
        if self.must_generate_first() {
            return self.generate_for_index(rng, 0, bias);
        }
        let selected = rng.next_int(self.neg_depth_benefit(), self.total_weight - 1);
        let index = self.cumulated_weights.partition_point(|cumulated| *cumulated <= selected);
        self.generate_for_index(rng, index, bias)
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        let Some(context) = context else {
            let Some(index) = self.can_shrink_without_context_index(value) else {
                return shrink::empty();
            };
            let first = self.default_shrink_for_first(index);
            let inner = self.alternatives[index].generator.shrink(value, None);
            return Box::new(
                first
                    .into_iter()
                    .chain(inner.map(move |candidate| wrap_choice(index, candidate, None, None))),
            );
        };

        let state = downcast_context::<FrequencyContext>(context, "FrequencyGenerator");
        let (index, bias) = (state.selected_index, state.bias);
        let inner = self.alternatives[index]
            .generator
            .shrink(value, state.inner_context.as_ref())
            .map(move |candidate| wrap_choice(index, candidate, None, bias));
        match &state.fallback_rng {
            Some(rng) => {
                let first = self.generate_for_index(&mut rng.clone(), 0, bias);
                Box::new(std::iter::once(first).chain(inner))
            }
            None => Box::new(inner),
        }
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.can_shrink_without_context_index(value).is_some()
    }
}

impl<T: Clone> Clone for FrequencyGenerator<T> {
    fn clone(&self) -> Self {
        Self {
            alternatives: self.alternatives.clone(),
            cumulated_weights: self.cumulated_weights.clone(),
            total_weight: self.total_weight,
            with_cross_shrink: self.with_cross_shrink,
            depth_factor: self.depth_factor,
            max_depth: self.max_depth,
            depth: self.depth.clone(),
        }
    }
}

impl<T> fmt::Debug for FrequencyGenerator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyGenerator")
            .field("alternatives", &self.alternatives)
            .field("with_cross_shrink", &self.with_cross_shrink)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

fn build<T>(alternatives: Vec<Weighted<T>>, constraints: FrequencyConstraints, label: &'static str) -> FrequencyGenerator<T> {
    match FrequencyGenerator::with_label(alternatives, constraints, label) {
        Ok(generator) => generator,
        Err(error) => panic!("{error}"),
    }
}

/// Pick an alternative in proportion to its weight
///
/// # Panics
///
/// Panics when there is no alternative or when all weights are zero.
pub fn frequency<T>(alternatives: Vec<Weighted<T>>) -> FrequencyGenerator<T> {
    build(alternatives, FrequencyConstraints::default(), "frequency")
}

/// [`frequency`] with explicit constraints
pub fn frequency_with<T>(alternatives: Vec<Weighted<T>>, constraints: FrequencyConstraints) -> FrequencyGenerator<T> {
    build(alternatives, constraints, "frequency")
}

/// Pick one of `generators` uniformly
///
/// # Panics
///
/// Panics when `generators` is empty.
pub fn one_of<T>(generators: Vec<BoxedGenerator<T>>) -> FrequencyGenerator<T> {
    one_of_with(generators, FrequencyConstraints::default())
}

/// [`one_of`] with explicit constraints
pub fn one_of_with<T>(generators: Vec<BoxedGenerator<T>>, constraints: FrequencyConstraints) -> FrequencyGenerator<T> {
    let alternatives = generators
        .into_iter()
        .map(|generator| Weighted {
            generator,
            weight: 1,
            fallback: None,
        })
        .collect();
    build(alternatives, constraints, "one_of")
}

/// Always `None`
struct NoneGenerator;

impl<T: 'static> Generator<Option<T>> for NoneGenerator {
    fn generate(&self, _rng: &mut Random, _bias: Option<u32>) -> Value<Option<T>> {
        Value::bare(None)
    }

    fn shrink(&self, _value: &Option<T>, _context: Option<&Context>) -> Shrinks<Option<T>> {
        shrink::empty()
    }

    fn can_shrink_without_context(&self, value: &Option<T>) -> bool {
        value.is_none()
    }
}

/// Tuning of [`option_with`]
#[derive(Debug, Clone)]
pub struct OptionConstraints {
    /// Weight of `Some` against a weight of 1 for `None`
    pub freq: u32,
    pub depth_factor: f64,
    pub max_depth: Option<usize>,
    pub depth_identifier: Option<DepthIdentifier>,
}

impl Default for OptionConstraints {
    fn default() -> Self {
        Self {
            freq: 5,
            depth_factor: 0.0,
            max_depth: None,
            depth_identifier: None,
        }
    }
}

/// `None` once for every five `Some`; values shrink to `None` first
pub fn option<T, G>(generator: G) -> FrequencyGenerator<Option<T>>
where
    T: Clone + Send + Sync + 'static,
    G: Generator<T> + Send + Sync + 'static,
{
    option_with(generator, OptionConstraints::default())
}

/// [`option`] with explicit constraints
pub fn option_with<T, G>(generator: G, constraints: OptionConstraints) -> FrequencyGenerator<Option<T>>
where
    T: Clone + Send + Sync + 'static,
    G: Generator<T> + Send + Sync + 'static,
{
    let alternatives = vec![
        Weighted::new(NoneGenerator, 1).with_fallback(None),
        Weighted::new(
            generator.map_with_unmapper(Some as fn(T) -> Option<T>, |value: &Option<T>| value.clone()),
            constraints.freq,
        ),
    ];
    let constraints = FrequencyConstraints {
        with_cross_shrink: true,
        depth_factor: constraints.depth_factor,
        max_depth: constraints.max_depth,
        depth_identifier: constraints.depth_identifier,
    };
    build(alternatives, constraints, "option")
}
