//! Lazy shrink sequences and the halving shrinker shared by ordered scalars.

use num_traits::Signed;

use crate::value::Value;

/// Lazy, ordered shrink candidates, best first.
///
/// Consumers may stop pulling at any point. Sequences own everything they
/// need, so they never borrow the generator or the value being shrunk.
pub type Shrinks<T> = Box<dyn Iterator<Item = Value<T>>>;

/// A sequence without candidates
pub fn empty<T: 'static>() -> Shrinks<T> {
    Box::new(std::iter::empty())
}

/// A sequence with exactly one candidate
pub fn once<T: 'static>(value: Value<T>) -> Shrinks<T> {
    Box::new(std::iter::once(value))
}

/// Defer building a sequence until its first candidate is requested
pub fn lazy<T: 'static, F>(build: F) -> Shrinks<T>
where
    F: FnOnce() -> Shrinks<T> + 'static,
{
    Box::new(std::iter::once(build).flat_map(|build| build()))
}

/// Candidates moving `current` toward `target` by halving the remaining gap.
///
/// Each item is `(candidate, previous)` where `previous` is the candidate
/// tried just before it; when the sequence is consumed in order and the
/// candidate fails, `previous` is the closest known passing value and is
/// what the next shrink should narrow toward.
#[derive(Debug, Clone)]
pub struct Halving<N> {
    current: N,
    target: N,
    real_gap: N,
    to_remove: N,
    previous: Option<N>,
}

impl<N: Clone + Signed> Halving<N> {
    /// Shrink toward `target`.
    ///
    /// With `try_target_asap` the target itself comes first and the first
    /// candidate carries no `previous`; otherwise the target is assumed to
    /// already pass and the sequence starts halfway.
    pub fn new(current: N, target: N, try_target_asap: bool) -> Self {
        let real_gap = current.clone() - target.clone();
        let to_remove = if try_target_asap {
            real_gap.clone()
        } else {
            halve(&real_gap)
        };
        let previous = if try_target_asap {
            None
        } else {
            Some(target.clone())
        };
        Self {
            current,
            target,
            real_gap,
            to_remove,
            previous,
        }
    }
}

impl<N: Clone + Signed> Iterator for Halving<N> {
    type Item = (N, Option<N>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.to_remove.is_zero() {
            return None;
        }
        let next = if self.to_remove == self.real_gap {
            self.target.clone()
        } else {
            self.current.clone() - self.to_remove.clone()
        };
        self.to_remove = halve(&self.to_remove);
        let previous = self.previous.replace(next.clone());
        Some((next, previous))
    }
}

/// Halve toward zero
fn halve<N: Clone + Signed>(value: &N) -> N {
    value.clone() / (N::one() + N::one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn candidates(current: i128, target: i128, asap: bool) -> Vec<(i128, Option<i128>)> {
        Halving::new(current, target, asap).collect()
    }

    #[test]
    fn test_cold_shrink_tries_target_first() {
        assert_eq!(
            candidates(87, 0, true),
            vec![
                (0, None),
                (44, Some(0)),
                (66, Some(44)),
                (77, Some(66)),
                (82, Some(77)),
                (85, Some(82)),
                (86, Some(85)),
            ]
        );
    }

    #[test]
    fn test_warm_shrink_skips_target() {
        assert_eq!(
            candidates(66, 44, false),
            vec![(55, Some(44)), (61, Some(55)), (64, Some(61)), (65, Some(64))]
        );
    }

    #[test]
    fn test_negative_values_shrink_upward() {
        assert_eq!(
            candidates(-8, 0, true),
            vec![(0, None), (-4, Some(0)), (-6, Some(-4)), (-7, Some(-6))]
        );
    }

    #[test]
    fn test_no_candidates_at_target() {
        assert!(candidates(0, 0, true).is_empty());
        assert!(candidates(5, 5, false).is_empty());
        assert!(candidates(45, 44, false).is_empty());
    }

    #[test]
    fn test_candidates_are_strictly_closer() {
        for (current, target) in [(1000_i128, 0), (-999, 0), (17, 3), (-20, -10)] {
            for (candidate, _) in Halving::new(current, target, true) {
                assert!((candidate - target).abs() < (current - target).abs());
            }
        }
    }

    #[test]
    fn test_big_int_halving_matches_primitive() {
        let big: Vec<_> = Halving::new(BigInt::from(87), BigInt::from(0), true)
            .map(|(v, _)| v)
            .collect();
        let small: Vec<_> = candidates(87, 0, true)
            .into_iter()
            .map(|(v, _)| BigInt::from(v))
            .collect();
        assert_eq!(big, small);
    }

    #[test]
    fn test_lazy_defers_construction() {
        use std::cell::Cell;
        use std::rc::Rc;

        let built = Rc::new(Cell::new(false));
        let flag = Rc::clone(&built);
        let mut shrinks = lazy(move || {
            flag.set(true);
            once(Value::bare(1))
        });
        assert!(!built.get());
        assert_eq!(shrinks.next().map(|v| *v.value()), Some(1));
        assert!(built.get());
    }
}
