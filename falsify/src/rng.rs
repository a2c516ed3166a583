//! Deterministic, splittable random source handed to generators.

use std::fmt;

use num_bigint::{BigInt, RandBigInt};
use rand::distributions::uniform::SampleUniform;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GeneratorError;

/// Words skipped by [`Random::jump`]; runs never overlap unless one of them
/// draws more than 2^64 words.
const JUMP_WORDS: u128 = 1 << 64;

/// Stream selector used to derive forked keys without touching the parent stream.
const FORK_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Random source backing every generation call.
///
/// Identical seeds and identical call sequences always produce identical
/// outputs. [`fork`](Random::fork) and [`jump`](Random::jump) are pure: they
/// derive a new source and leave `self` untouched.
#[derive(Clone)]
pub struct Random {
    inner: ChaCha8Rng,
}

impl Random {
    /// Create a source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[min, max]`, or an error when the range is inverted
    pub fn try_next_int<I>(&mut self, min: I, max: I) -> Result<I, GeneratorError>
    where
        I: SampleUniform + PartialOrd + fmt::Display,
    {
        if min > max {
            return Err(GeneratorError::invalid_range(min, max));
        }
        Ok(self.inner.gen_range(min..=max))
    }

    /// Uniform integer in `[min, max]`
    ///
    /// # Panics
    ///
    /// Panics when `min > max`.
    pub fn next_int<I>(&mut self, min: I, max: I) -> I
    where
        I: SampleUniform + PartialOrd + fmt::Display,
    {
        match self.try_next_int(min, max) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    /// Uniform big integer in `[min, max]`, or an error when the range is inverted
    pub fn try_next_big_int(&mut self, min: &BigInt, max: &BigInt) -> Result<BigInt, GeneratorError> {
        if min > max {
            return Err(GeneratorError::invalid_range(min, max));
        }
        let upper = max + 1u32;
        Ok(self.inner.gen_bigint_range(min, &upper))
    }

    /// Uniform big integer in `[min, max]`
    ///
    /// # Panics
    ///
    /// Panics when `min > max`.
    pub fn next_big_int(&mut self, min: &BigInt, max: &BigInt) -> BigInt {
        match self.try_next_big_int(min, max) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    /// Uniform float in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        self.inner.r#gen()
    }

    /// Derive an independent source.
    ///
    /// The child key is read from a sibling stream of the same key at the
    /// current position, so later draws on `self` do not replay the child.
    pub fn fork(&self) -> Random {
        let mut source = self.inner.clone();
        source.set_stream(self.inner.get_stream() ^ FORK_STREAM);
        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        source.fill_bytes(&mut seed);
        Self {
            inner: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Derive the source used by the next trial
    pub fn jump(&self) -> Random {
        let mut next = self.inner.clone();
        next.set_word_pos(self.inner.get_word_pos().wrapping_add(JUMP_WORDS));
        Self { inner: next }
    }
}

impl fmt::Debug for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Random")
            .field("stream", &self.inner.get_stream())
            .field("word_pos", &self.inner.get_word_pos())
            .finish()
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Seed used when a run configuration does not pin one
pub fn random_seed() -> u64 {
    rand::thread_rng().r#gen()
}
