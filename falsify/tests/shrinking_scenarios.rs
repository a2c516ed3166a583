//! End-to-end shrinking scenarios through the public runner API

use falsify::{
    ArrayConstraints, Generator, PropertyError, Random, RunConfig, Size, Weighted, array_with, boolean,
    check_with_config, constant, frequency, integer, option, pre, property, vec_of,
};

fn seeded(seed: u64) -> RunConfig {
    RunConfig::new().seed(seed)
}

#[test]
fn test_integer_failure_shrinks_to_exact_boundary() {
    for seed in 0..20 {
        let report = check_with_config(property(integer(0_i32, 100), |x: i32| x < 50), &seeded(seed)).unwrap();
        assert!(report.failed, "seed {seed}");
        assert_eq!(report.counterexample, Some(50), "seed {seed}");
    }
}

#[test]
fn test_negative_failure_shrinks_toward_zero() {
    for seed in 0..20 {
        let report = check_with_config(property(integer(-10_i32, 10), |x: i32| x > -6), &seeded(seed)).unwrap();
        assert!(report.failed, "seed {seed}");
        assert_eq!(report.counterexample, Some(-6), "seed {seed}");
    }
}

#[test]
fn test_array_length_failure_shrinks_items_too() {
    for seed in 0..10 {
        let report = check_with_config(
            property(vec_of(integer(-1000_i32, 1000), 0, 30), |v: Vec<i32>| v.len() < 3),
            &seeded(seed),
        )
        .unwrap();
        assert_eq!(report.counterexample, Some(vec![0, 0, 0]), "seed {seed}");
    }
}

#[test]
fn test_array_respects_minimum_length_while_shrinking() {
    let constraints = ArrayConstraints {
        min_length: 2,
        size: Some(Size::Medium),
        ..Default::default()
    };
    let report = check_with_config(
        property(array_with(integer(0_u8, 200), constraints), |v: Vec<u8>| v.iter().all(|x| *x < 100)),
        &seeded(3),
    )
    .unwrap();
    assert!(report.failed);
    let counterexample = report.counterexample.unwrap();
    assert_eq!(counterexample.len(), 2);
    assert_eq!(counterexample.iter().filter(|x| **x == 100).count(), 1);
    assert_eq!(counterexample.iter().filter(|x| **x == 0).count(), 1);
}

#[test]
fn test_tuple_components_shrink_independently() {
    let report = check_with_config(
        property((integer(0_i64, 1000), integer(0_i64, 1000)), |(a, b): (i64, i64)| a + b < 300),
        &seeded(11),
    )
    .unwrap();
    let (a, b) = report.counterexample.unwrap();
    assert_eq!(a + b, 300);
}

#[test]
fn test_mapped_values_shrink_through_their_source() {
    let doubled = integer(0_u32, 1000).map(|x| x * 2);
    let report = check_with_config(property(doubled, |x: u32| x < 500), &seeded(2)).unwrap();
    assert_eq!(report.counterexample, Some(500));
}

#[test]
fn test_filtered_values_stay_valid_while_shrinking() {
    let odd = integer(0_u32, 10_000).filter(|x| x % 2 == 1);
    let report = check_with_config(property(odd, |x: u32| x < 1001), &seeded(4)).unwrap();
    let counterexample = report.counterexample.unwrap();
    assert_eq!(counterexample % 2, 1);
    assert!(counterexample >= 1001);
}

#[test]
fn test_chained_values_shrink_source_first() {
    let sized = integer(1_usize, 8).chain(|len| vec_of(integer(0_u8, 9), len, len));
    let report = check_with_config(property(sized, |v: Vec<u8>| v.len() < 4), &seeded(6)).unwrap();
    assert_eq!(report.counterexample, Some(vec![0, 0, 0, 0]));
}

#[test]
fn test_option_shrinks_to_none_or_minimal_some() {
    let report = check_with_config(
        property(option(integer(0_i32, 100)), |v: Option<i32>| v.is_none_or(|x| x < 30)),
        &seeded(12),
    )
    .unwrap();
    assert_eq!(report.counterexample, Some(Some(30)));
}

#[test]
fn test_frequency_distribution_matches_weights() {
    let choice = frequency(vec![
        Weighted::new(constant(None), 1),
        Weighted::new(integer(0_u32, 100).map(Some), 5),
    ]);
    let mut rng = Random::new(2024);
    let nones = (0..6000)
        .filter(|_| choice.generate(&mut rng, None).get().is_none())
        .count();
    assert!((850..=1150).contains(&nones), "{nones} none values");
}

#[test]
fn test_out_of_range_bare_value_cannot_shrink() {
    let generator = integer(0_i32, 10);
    assert!(!generator.can_shrink_without_context(&20));
    assert_eq!(generator.shrink(&20, None).count(), 0);
    assert!(generator.can_shrink_without_context(&7));
    assert!(generator.shrink(&7, None).all(|v| *v.value() < 7));
}

#[test]
fn test_shrinking_the_target_yields_nothing() {
    let generator = integer(-50_i32, 50);
    assert_eq!(generator.shrink(&0, None).count(), 0);
    assert_eq!(boolean().shrink(&false, None).count(), 0);
    assert_eq!(vec_of(integer(0_u8, 5), 0, 5).shrink(&Vec::new(), None).count(), 0);
}

#[test]
fn test_counterexample_is_locally_minimal() {
    let generator = vec_of(integer(0_u16, 500), 0, 12);
    let predicate = |v: &Vec<u16>| v.iter().map(|x| u32::from(*x)).sum::<u32>() < 600;
    let report = check_with_config(property(generator.clone(), |v: Vec<u16>| predicate(&v)), &seeded(21)).unwrap();
    let counterexample = report.counterexample.unwrap();
    assert!(!predicate(&counterexample));
    assert!(
        generator
            .shrink(&counterexample, None)
            .all(|candidate| predicate(candidate.value()))
    );
}

#[test]
fn test_predicate_errors_are_reported() {
    let report = check_with_config(
        property(integer(0_i32, 100), |x: i32| -> Result<(), PropertyError> {
            pre(x != 13)?;
            if x >= 20 {
                return Err(format!("{x} is not below 20").into());
            }
            Ok(())
        }),
        &seeded(1),
    )
    .unwrap();
    assert_eq!(report.counterexample, Some(20));
    assert_eq!(report.error_message().as_deref(), Some("Property failed: 20 is not below 20"));
}

#[test]
fn test_panicking_predicates_are_failures() {
    let report = check_with_config(
        property(integer(0_i32, 100), |x: i32| assert!(x < 10, "too big")),
        &seeded(1),
    )
    .unwrap();
    assert_eq!(report.counterexample, Some(10));
    assert_eq!(
        report.error,
        Some(PropertyError::Panicked {
            message: "too big".to_string()
        })
    );
}

#[test]
#[should_panic(expected = "invalid range")]
fn test_invalid_generator_construction_is_fatal() {
    let _ = integer(10_i32, 2);
}
