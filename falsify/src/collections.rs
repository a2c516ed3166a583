//! Tuple and array generators.

use std::fmt;
use std::sync::Arc;

use crate::bias::{biased_max_length, should_bias};
use crate::choice::DepthIdentifier;
use crate::error::GeneratorError;
use crate::generator::Generator;
use crate::primitives::IntegerGenerator;
use crate::rng::Random;
use crate::shrink::{self, Shrinks};
use crate::value::{Context, Value, downcast_context, into_context};

/// Shrink state of a tuple: one optional context per component
struct TupleContext(Vec<Option<Context>>);

macro_rules! impl_tuple_generator {
    ($arity:expr; $($value:ident : $generator:ident : $idx:tt),+) => {
        impl<$($value, $generator),+> Generator<($($value,)+)> for ($($generator,)+)
        where
            $($value: Clone + 'static, $generator: Generator<$value>,)+
        {
            fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<($($value,)+)> {
                let mut contexts = Vec::with_capacity($arity);
                let value = ($({
                    let (value, context) = self.$idx.generate(rng, bias).into_parts();
                    contexts.push(context);
                    value
                },)+);
                Value::new(value, Some(into_context(TupleContext(contexts))))
            }

            fn shrink(&self, value: &($($value,)+), context: Option<&Context>) -> Shrinks<($($value,)+)> {
                let contexts = match context {
                    Some(context) => downcast_context::<TupleContext>(context, "tuple").0.clone(),
                    None if self.can_shrink_without_context(value) => vec![None; $arity],
                    None => return shrink::empty(),
                };
                let mut shrinks: Shrinks<($($value,)+)> = shrink::empty();
                $(
                    let component = self.$idx.shrink(&value.$idx, contexts[$idx].as_ref());
                    let base = value.clone();
                    let base_contexts = contexts.clone();
                    shrinks = Box::new(shrinks.chain(component.map(move |candidate| {
                        let (item, item_context) = candidate.into_parts();
                        let mut next = base.clone();
                        let mut next_contexts = base_contexts.clone();
                        next.$idx = item;
                        next_contexts[$idx] = item_context;
                        Value::new(next, Some(into_context(TupleContext(next_contexts))))
                    })));
                )+
                shrinks
            }

            fn can_shrink_without_context(&self, value: &($($value,)+)) -> bool {
                true $(&& self.$idx.can_shrink_without_context(&value.$idx))+
            }
        }
    };
}

impl_tuple_generator!(1; A: GA: 0);
impl_tuple_generator!(2; A: GA: 0, B: GB: 1);
impl_tuple_generator!(3; A: GA: 0, B: GB: 1, C: GC: 2);
impl_tuple_generator!(4; A: GA: 0, B: GB: 1, C: GC: 2, D: GD: 3);
impl_tuple_generator!(5; A: GA: 0, B: GB: 1, C: GC: 2, D: GD: 3, E: GE: 4);
impl_tuple_generator!(6; A: GA: 0, B: GB: 1, C: GC: 2, D: GD: 3, E: GE: 4, F: GF: 5);
impl_tuple_generator!(7; A: GA: 0, B: GB: 1, C: GC: 2, D: GD: 3, E: GE: 4, F: GF: 5, H: GH: 6);
impl_tuple_generator!(8; A: GA: 0, B: GB: 1, C: GC: 2, D: GD: 3, E: GE: 4, F: GF: 5, H: GH: 6, I: GI: 7);

/// Longest array ever produced when no explicit maximum is given
pub const MAX_LENGTH_UPPER_BOUND: usize = 0x7fff_ffff;

/// How large generated collections get relative to their minimum length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Size {
    XSmall,
    #[default]
    Small,
    Medium,
    Large,
    XLarge,
    /// Use the declared maximum length directly
    Max,
}

impl Size {
    /// Maximal generated length for a collection of at least `min_length` items
    pub fn max_length_from_min_length(self, min_length: usize) -> usize {
        let length = match self {
            Size::XSmall => min_length + min_length / 10 + 1,
            Size::Small => min_length.saturating_mul(2).saturating_add(10),
            Size::Medium => min_length.saturating_mul(11).saturating_add(100),
            Size::Large => min_length.saturating_mul(101).saturating_add(1000),
            Size::XLarge => min_length.saturating_mul(1001).saturating_add(10_000),
            Size::Max => MAX_LENGTH_UPPER_BOUND,
        };
        length.min(MAX_LENGTH_UPPER_BOUND)
    }
}

/// Constraints of an [`ArrayGenerator`]
#[derive(Debug, Clone, Default)]
pub struct ArrayConstraints {
    pub min_length: usize,
    /// Upper bound accepted for the array; generation is usually shorter
    pub max_length: Option<usize>,
    /// Generation size; defaults to the declared maximum when one is given
    /// and to [`Size::Small`] otherwise
    pub size: Option<Size>,
    /// Depth shared with recursive generators nested in the items
    pub depth_identifier: Option<DepthIdentifier>,
}

/// Shrink state of an array
#[derive(Clone)]
struct ArrayContext {
    shrunk_once: bool,
    length_context: Option<Context>,
    item_contexts: Vec<Option<Context>>,
    start_index: usize,
}

impl ArrayContext {
    fn cold(length: usize) -> Self {
        Self {
            shrunk_once: false,
            length_context: None,
            item_contexts: vec![None; length],
            start_index: 0,
        }
    }
}

/// Items with their contexts, the length context and the index shrinking
/// should resume from
type Candidate<T> = (Vec<Value<T>>, Option<Context>, usize);
type Candidates<T> = Box<dyn Iterator<Item = Candidate<T>>>;

fn defer<T: 'static, F>(build: F) -> Candidates<T>
where
    F: FnOnce() -> Candidates<T> + 'static,
{
    Box::new(std::iter::once(build).flat_map(|build| build()))
}

fn pair_items<T: Clone>(values: &[T], contexts: &[Option<Context>]) -> Vec<Value<T>> {
    values
        .iter()
        .zip(contexts)
        .map(|(value, context)| Value::new(value.clone(), context.clone()))
        .collect()
}

/// Generator for `Vec<T>`.
///
/// Shrinking removes leading items first, then shrinks items one at a time
/// from the front while the rest stay fixed.
pub struct ArrayGenerator<G> {
    item: Arc<G>,
    min_length: usize,
    max_length: usize,
    max_generated_length: usize,
    depth_identifier: Option<DepthIdentifier>,
}

impl<G> Clone for ArrayGenerator<G> {
    fn clone(&self) -> Self {
        Self {
            item: Arc::clone(&self.item),
            min_length: self.min_length,
            max_length: self.max_length,
            max_generated_length: self.max_generated_length,
            depth_identifier: self.depth_identifier.clone(),
        }
    }
}

impl<G: fmt::Debug> fmt::Debug for ArrayGenerator<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayGenerator")
            .field("item", &self.item)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("max_generated_length", &self.max_generated_length)
            .finish()
    }
}

impl<G> ArrayGenerator<G> {
    pub fn new(item: G, constraints: ArrayConstraints) -> Result<Self, GeneratorError> {
        let ArrayConstraints {
            min_length,
            max_length,
            size,
            depth_identifier,
        } = constraints;
        let specified_max = max_length.is_some();
        let max_length = max_length.unwrap_or(MAX_LENGTH_UPPER_BOUND);
        if min_length > max_length {
            return Err(GeneratorError::InvalidLength {
                min: min_length,
                max: max_length,
            });
        }
        let max_generated_length = match size {
            None if specified_max => max_length,
            size => size
                .unwrap_or_default()
                .max_length_from_min_length(min_length)
                .min(max_length),
        };
        Ok(Self {
            item: Arc::new(item),
            min_length,
            max_length,
            max_generated_length,
            depth_identifier,
        })
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Largest length produced by generation
    pub fn max_generated_length(&self) -> usize {
        self.max_generated_length
    }

    fn lengths(&self) -> IntegerGenerator<usize> {
        crate::primitives::integer(self.min_length, self.max_length)
    }

    /// Target length and the bias passed to items
    fn apply_bias(&self, rng: &mut Random, bias: Option<u32>) -> (usize, Option<u32>) {
        let (min, max) = (self.min_length, self.max_generated_length);
        if bias.is_none() {
            return (rng.next_int(min, max), None);
        }
        if min == max {
            return (rng.next_int(min, max), bias);
        }
        if !should_bias(rng, bias) {
            return (rng.next_int(min, max), None);
        }
        if !should_bias(rng, bias) {
            return (rng.next_int(min, max), bias);
        }
        (rng.next_int(min, biased_max_length(min, max)), bias)
    }
}

impl<G> ArrayGenerator<G> {
    fn generate_items<T>(&self, length: usize, rng: &mut Random, bias: Option<u32>) -> Vec<Value<T>>
    where
        T: Clone + 'static,
        G: Generator<T> + 'static,
    {
        let _guard = self
            .depth_identifier
            .as_ref()
            .map(|depth| depth.enter((length as f64).sqrt() as usize));
        (0..length).map(|_| self.item.generate(rng, bias)).collect()
    }
}

fn wrap_items<T>(items: Vec<Value<T>>, shrunk_once: bool, length_context: Option<Context>, start_index: usize) -> Value<Vec<T>> {
    let (values, item_contexts): (Vec<T>, Vec<Option<Context>>) =
        items.into_iter().map(Value::into_parts).unzip();
    let context = ArrayContext {
        shrunk_once,
        length_context,
        item_contexts,
        start_index,
    };
    Value::new(values, Some(into_context(context)))
}

fn shrink_item_by_item<T, G>(item: Arc<G>, value: Vec<T>, contexts: Vec<Option<Context>>, start: usize, end: usize) -> Candidates<T>
where
    T: Clone + 'static,
    G: Generator<T> + 'static,
{
    Box::new((start..end).flat_map(move |index| {
        let value = value.clone();
        let contexts = contexts.clone();
        item.shrink(&value[index], contexts[index].as_ref())
            .map(move |candidate| {
                let mut items = pair_items(&value, &contexts);
                items[index] = candidate;
                (items, None, index)
            })
    }))
}

fn shrink_array<T, G>(
    item: Arc<G>,
    lengths: IntegerGenerator<usize>,
    min_length: usize,
    value: Vec<T>,
    state: ArrayContext,
) -> Candidates<T>
where
    T: Clone + 'static,
    G: Generator<T> + 'static,
{
    let length = value.len();
    if length == 0 {
        return Box::new(std::iter::empty());
    }

    // without a length context, the first length candidate already failed to reproduce
    let skip_first = state.shrunk_once && state.length_context.is_none() && length > min_length + 1;
    let by_length = {
        let value = value.clone();
        let contexts = state.item_contexts.clone();
        lengths
            .shrink(&length, state.length_context.as_ref())
            .skip(usize::from(skip_first))
            .map(move |candidate| {
                let (new_length, length_context) = candidate.into_parts();
                let start = length - new_length;
                (pair_items(&value[start..], &contexts[start..]), length_context, 0)
            })
    };

    let end = if length > min_length { 1 } else { length };
    let by_item = {
        let item = Arc::clone(&item);
        let value = value.clone();
        let contexts = state.item_contexts.clone();
        let start = state.start_index;
        defer(move || shrink_item_by_item(item, value, contexts, start, end))
    };

    let by_tail: Candidates<T> = if length > min_length {
        defer(move || {
            let head = Value::new(value[0].clone(), state.item_contexts[0].clone());
            let rest = ArrayContext {
                item_contexts: state.item_contexts[1..].to_vec(),
                ..ArrayContext::cold(0)
            };
            Box::new(
                shrink_array(item, lengths, min_length, value[1..].to_vec(), rest)
                    .filter(move |(items, _, _)| min_length <= items.len() + 1)
                    .map(move |(items, _, _)| {
                        let mut next = Vec::with_capacity(items.len() + 1);
                        next.push(head.clone());
                        next.extend(items);
                        (next, None, 0)
                    }),
            )
        })
    } else {
        Box::new(std::iter::empty())
    };

    Box::new(by_length.chain(by_item).chain(by_tail))
}

impl<T, G> Generator<Vec<T>> for ArrayGenerator<G>
where
    T: Clone + 'static,
    G: Generator<T> + 'static,
{
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<Vec<T>> {
        let (length, item_bias) = self.apply_bias(rng, bias);
        let items = self.generate_items(length, rng, item_bias);
        wrap_items(items, false, None, 0)
    }

    fn shrink(&self, value: &Vec<T>, context: Option<&Context>) -> Shrinks<Vec<T>> {
        let state = match context {
            Some(context) => ArrayContext::clone(&downcast_context::<ArrayContext>(context, "ArrayGenerator")),
            None if self.can_shrink_without_context(value) => ArrayContext::cold(value.len()),
            None => return shrink::empty(),
        };
        let candidates = shrink_array(
            Arc::clone(&self.item),
            self.lengths(),
            self.min_length,
            value.clone(),
            state,
        );
        Box::new(candidates.map(|(items, length_context, start_index)| {
            wrap_items(items, true, length_context, start_index)
        }))
    }

    fn can_shrink_without_context(&self, value: &Vec<T>) -> bool {
        (self.min_length..=self.max_length).contains(&value.len())
            && value.iter().all(|item| self.item.can_shrink_without_context(item))
    }
}

/// Arrays of up to ten items
pub fn array<G>(item: G) -> ArrayGenerator<G> {
    array_with(item, ArrayConstraints::default())
}

/// Arrays following `constraints`
///
/// # Panics
///
/// Panics when `min_length > max_length`.
pub fn array_with<G>(item: G, constraints: ArrayConstraints) -> ArrayGenerator<G> {
    match ArrayGenerator::new(item, constraints) {
        Ok(generator) => generator,
        Err(error) => panic!("{error}"),
    }
}

/// Arrays with a length in `[min_length, max_length]`
pub fn vec_of<G>(item: G, min_length: usize, max_length: usize) -> ArrayGenerator<G> {
    array_with(
        item,
        ArrayConstraints {
            min_length,
            max_length: Some(max_length),
            ..ArrayConstraints::default()
        },
    )
}
