//! Generators for integers, big integers, booleans and constants.

use std::fmt;

use num_bigint::BigInt;
use num_traits::Signed;

use crate::bias::{big_int_log_like, bias_numeric_range, choose_range, integer_log_like, should_bias};
use crate::error::GeneratorError;
use crate::generator::Generator;
use crate::rng::Random;
use crate::shrink::{self, Halving, Shrinks};
use crate::value::{Context, Value, downcast_context, into_context};

/// Shrink target used when no context is available: zero when in range,
/// otherwise the bound closest to zero
fn default_target<N: Signed + Clone + PartialOrd>(min: &N, max: &N) -> N {
    let zero = N::zero();
    if *min <= zero && zero <= *max {
        zero
    } else if min.is_negative() {
        max.clone()
    } else {
        min.clone()
    }
}

/// A failing value one step away from the last passing one gets a final try
/// at that value before shrinking concedes
fn is_last_chance<N: Signed + Clone + PartialOrd>(current: &N, previous: &N, min: &N, max: &N) -> bool {
    if current.is_positive() {
        *current == previous.clone() + N::one() && current > min
    } else if current.is_negative() {
        *current == previous.clone() - N::one() && current < max
    } else {
        false
    }
}

fn halving_values<N>(halving: Halving<N>) -> Shrinks<N>
where
    N: Signed + Clone + Send + Sync + 'static,
{
    Box::new(halving.map(|(next, previous)| Value::new(next, previous.map(into_context))))
}

/// Shrink an ordered scalar within `[min, max]`.
///
/// The context, when present, is the closest value known to pass.
fn shrink_ordered<N>(current: N, min: &N, max: &N, context: Option<&Context>, owner: &str) -> Shrinks<N>
where
    N: Signed + Clone + PartialOrd + Send + Sync + 'static,
{
    let Some(context) = context else {
        if current < *min || current > *max {
            return shrink::empty();
        }
        return halving_values(Halving::new(current, default_target(min, max), true));
    };
    let previous = N::clone(&downcast_context::<N>(context, owner));
    if !previous.is_zero() && current.signum() != previous.signum() {
        panic!("Invalid context value passed to {owner} (#2)");
    }
    if is_last_chance(&current, &previous, min, max) {
        return shrink::once(Value::bare(previous));
    }
    halving_values(Halving::new(current, previous, false))
}

/// Generator for fixed-width integers in an inclusive range.
///
/// Shrinks toward zero, or toward the bound closest to zero when zero is out
/// of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerGenerator<N> {
    min: N,
    max: N,
}

impl<N: Copy + PartialOrd + fmt::Display> IntegerGenerator<N> {
    /// Create a generator over `[min, max]`
    pub fn new(min: N, max: N) -> Result<Self, GeneratorError> {
        if min > max {
            return Err(GeneratorError::invalid_range(min, max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> N {
        self.min
    }

    pub fn max(&self) -> N {
        self.max
    }
}

fn generate_i128(rng: &mut Random, bias: Option<u32>, min: i128, max: i128) -> i128 {
    if should_bias(rng, bias) {
        let ranges = bias_numeric_range(&min, &max, integer_log_like);
        let range = choose_range(rng, &ranges);
        rng.next_int(range.min, range.max)
    } else {
        rng.next_int(min, max)
    }
}

macro_rules! impl_integer_generator {
    ($($t:ty),*) => {
        $(
            impl IntegerGenerator<$t> {
                /// Generator over every value of the type
                pub fn full_range() -> Self {
                    Self {
                        min: <$t>::MIN,
                        max: <$t>::MAX,
                    }
                }
            }

            impl Generator<$t> for IntegerGenerator<$t> {
                fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<$t> {
                    let value = generate_i128(rng, bias, self.min as i128, self.max as i128);
                    Value::bare(value as $t)
                }

                fn shrink(&self, value: &$t, context: Option<&Context>) -> Shrinks<$t> {
                    let shrinks = shrink_ordered(
                        *value as i128,
                        &(self.min as i128),
                        &(self.max as i128),
                        context,
                        "IntegerGenerator",
                    );
                    Box::new(shrinks.map(|candidate| {
                        let (value, context) = candidate.into_parts();
                        Value::new(value as $t, context)
                    }))
                }

                fn can_shrink_without_context(&self, value: &$t) -> bool {
                    self.min <= *value && *value <= self.max
                }
            }
        )*
    };
}

impl_integer_generator!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Integers in `[min, max]`
///
/// # Panics
///
/// Panics when `min > max`.
pub fn integer<N: Copy + PartialOrd + fmt::Display>(min: N, max: N) -> IntegerGenerator<N> {
    match IntegerGenerator::new(min, max) {
        Ok(generator) => generator,
        Err(error) => panic!("{error}"),
    }
}

/// Generator for arbitrary-precision integers in an inclusive range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigIntGenerator {
    min: BigInt,
    max: BigInt,
}

impl BigIntGenerator {
    pub fn new(min: BigInt, max: BigInt) -> Result<Self, GeneratorError> {
        if min > max {
            return Err(GeneratorError::invalid_range(min, max));
        }
        Ok(Self { min, max })
    }
}

impl Generator<BigInt> for BigIntGenerator {
    fn generate(&self, rng: &mut Random, bias: Option<u32>) -> Value<BigInt> {
        let value = if should_bias(rng, bias) {
            let ranges = bias_numeric_range(&self.min, &self.max, big_int_log_like);
            let range = choose_range(rng, &ranges);
            rng.next_big_int(&range.min, &range.max)
        } else {
            rng.next_big_int(&self.min, &self.max)
        };
        Value::bare(value)
    }

    fn shrink(&self, value: &BigInt, context: Option<&Context>) -> Shrinks<BigInt> {
        shrink_ordered(value.clone(), &self.min, &self.max, context, "BigIntGenerator")
    }

    fn can_shrink_without_context(&self, value: &BigInt) -> bool {
        self.min <= *value && *value <= self.max
    }
}

/// Big integers in `[min, max]`
///
/// # Panics
///
/// Panics when `min > max`.
pub fn big_int(min: impl Into<BigInt>, max: impl Into<BigInt>) -> BigIntGenerator {
    match BigIntGenerator::new(min.into(), max.into()) {
        Ok(generator) => generator,
        Err(error) => panic!("{error}"),
    }
}

/// Generator for boolean values; `true` shrinks to `false`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolGenerator;

impl Generator<bool> for BoolGenerator {
    fn generate(&self, rng: &mut Random, _bias: Option<u32>) -> Value<bool> {
        Value::bare(rng.next_int(0_u8, 1) == 1)
    }

    fn shrink(&self, value: &bool, _context: Option<&Context>) -> Shrinks<bool> {
        if *value {
            shrink::once(Value::bare(false))
        } else {
            shrink::empty()
        }
    }

    fn can_shrink_without_context(&self, _value: &bool) -> bool {
        true
    }
}

pub fn boolean() -> BoolGenerator {
    BoolGenerator
}

/// Generator picking among fixed values; everything shrinks to the first one
#[derive(Debug, Clone)]
pub struct ConstantGenerator<T> {
    values: Vec<T>,
}

impl<T> ConstantGenerator<T> {
    pub fn new(values: Vec<T>) -> Result<Self, GeneratorError> {
        if values.is_empty() {
            return Err(GeneratorError::EmptyChoice {
                label: "constant_from",
            });
        }
        Ok(Self { values })
    }
}

impl<T> Generator<T> for ConstantGenerator<T>
where
    T: Clone + PartialEq + 'static,
{
    fn generate(&self, rng: &mut Random, _bias: Option<u32>) -> Value<T> {
        let index = if self.values.len() == 1 {
            0
        } else {
            rng.next_int(0, self.values.len() - 1)
        };
        Value::new(self.values[index].clone(), Some(into_context(index)))
    }

    fn shrink(&self, value: &T, context: Option<&Context>) -> Shrinks<T> {
        let first = &self.values[0];
        if *value == *first {
            return shrink::empty();
        }
        match context {
            Some(context) if *downcast_context::<usize>(context, "ConstantGenerator") == 0 => {
                return shrink::empty();
            }
            None if !self.values.contains(value) => return shrink::empty(),
            _ => {}
        }
        shrink::once(Value::new(first.clone(), Some(into_context(0_usize))))
    }

    fn can_shrink_without_context(&self, value: &T) -> bool {
        self.values.contains(value)
    }
}

/// Always `value`
pub fn constant<T>(value: T) -> ConstantGenerator<T> {
    ConstantGenerator { values: vec![value] }
}

/// One of `values`, uniformly
///
/// # Panics
///
/// Panics when `values` is empty.
pub fn constant_from<T>(values: impl IntoIterator<Item = T>) -> ConstantGenerator<T> {
    match ConstantGenerator::new(values.into_iter().collect()) {
        Ok(generator) => generator,
        Err(error) => panic!("{error}"),
    }
}
