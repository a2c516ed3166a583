//! Edge-weighted sampling for bounded numeric ranges.
//!
//! Generators receive an optional bias factor `f`. A draw of `1` in `[1, f]`
//! switches the call to a biased branch, so roughly one call in `f` favours
//! values near zero and near the bounds. Biased values always stay inside the
//! declared range.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::rng::Random;

/// A sub-range of a numeric domain, both ends inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiasedRange<N> {
    pub min: N,
    pub max: N,
}

/// Whether this call should take its biased branch
pub fn should_bias(rng: &mut Random, bias: Option<u32>) -> bool {
    match bias {
        Some(factor) => rng.next_int(1, factor.max(1)) == 1,
        None => false,
    }
}

/// Bias factor used for the `run_id`-th trial: `2 + floor(log10(run_id + 1))`.
///
/// Early runs are biased most often; later runs spread out.
pub fn run_id_to_frequency(run_id: usize) -> u32 {
    2 + run_id.saturating_add(1).ilog10()
}

/// `floor(log2(value))` for positive values, 0 otherwise
pub fn integer_log_like(value: &i128) -> i128 {
    if *value <= 0 {
        0
    } else {
        i128::from(127 - value.leading_zeros() as u8)
    }
}

/// `floor(log2(value))` for positive big integers, 0 otherwise
pub fn big_int_log_like(value: &BigInt) -> BigInt {
    if !value.is_positive() {
        BigInt::from(0)
    } else {
        BigInt::from(value.bits() - 1)
    }
}

/// Partition `[min, max]` into prioritised sub-ranges.
///
/// The first range is the favoured one:
/// * a single value: that value;
/// * a range spanning zero: around zero, then near `max`, then near `min`;
/// * otherwise: near the bound closest to zero, then near the other bound.
///
/// Each sub-range is `log2` of its distance wide.
pub fn bias_numeric_range<N, L>(min: &N, max: &N, log_like: L) -> Vec<BiasedRange<N>>
where
    N: Clone + Signed + PartialOrd,
    L: Fn(&N) -> N,
{
    if min == max {
        return vec![BiasedRange {
            min: min.clone(),
            max: max.clone(),
        }];
    }
    if min.is_negative() && max.is_positive() {
        let log_min = log_like(&-min.clone());
        let log_max = log_like(max);
        return vec![
            BiasedRange {
                min: -log_min.clone(),
                max: log_max.clone(),
            },
            BiasedRange {
                min: max.clone() - log_max,
                max: max.clone(),
            },
            BiasedRange {
                min: min.clone(),
                max: min.clone() + log_min,
            },
        ];
    }
    let log_gap = log_like(&(max.clone() - min.clone()));
    let close_to_min = BiasedRange {
        min: min.clone(),
        max: min.clone() + log_gap.clone(),
    };
    let close_to_max = BiasedRange {
        min: max.clone() - log_gap,
        max: max.clone(),
    };
    if min.is_negative() {
        vec![close_to_max, close_to_min]
    } else {
        vec![close_to_min, close_to_max]
    }
}

/// Pick one of the prioritised ranges.
///
/// With `n` ranges the first one wins `2(n-1)` times out of `3(n-1)`; the
/// remaining ones share the rest evenly.
pub fn choose_range<'r, N>(rng: &mut Random, ranges: &'r [BiasedRange<N>]) -> &'r BiasedRange<N> {
    if ranges.len() == 1 {
        return &ranges[0];
    }
    let count = ranges.len() as i64;
    let id = rng.next_int(-2 * (count - 1), count - 2);
    if id < 0 {
        &ranges[0]
    } else {
        &ranges[id as usize + 1]
    }
}

/// Short length used by biased collections: `min + floor(log2(max - min))`
pub fn biased_max_length(min: usize, max: usize) -> usize {
    if min >= max {
        return min;
    }
    min + (max - min).ilog2() as usize
}
