//! Basic usage examples demonstrating the core Falsify API
//!
//! Run with `RUST_LOG=falsify=debug` to see run progress.

use falsify::{
    Generator, PropertyError, PropertyTestBuilder, RunConfig, Weighted, check, check_with_config, frequency,
    integer, option, pre, property, vec_of,
};
use tracing_subscriber::EnvFilter;

// Example 1: a passing property over pairs
fn example_1_basic_property() {
    println!("=== Example 1: Basic Property Testing ===");

    let commutative = property((integer(-100_i32, 100), integer(-100_i32, 100)), |(a, b): (i32, i32)| {
        a.wrapping_add(b) == b.wrapping_add(a)
    });

    match check(commutative) {
        Ok(report) => println!("{report}"),
        Err(error) => println!("configuration error: {error}"),
    }
}

// Example 2: a failing property and its minimal counterexample
fn example_2_shrinking() {
    println!("\n=== Example 2: Shrinking ===");

    let sorted = property(vec_of(integer(0_u32, 1000), 0, 20), |mut values: Vec<u32>| {
        let original = values.clone();
        values.sort_unstable();
        values == original
    });

    let report = check_with_config(&sorted, &RunConfig::new().seed(42)).expect("valid configuration");
    println!("{report}");

    // The reported path replays the counterexample without searching again
    if let Some(path) = &report.counterexample_path {
        let replayed = check_with_config(&sorted, &RunConfig::new().seed(42).path(path.clone()))
            .expect("replayable path");
        println!("replayed counterexample: {:?}", replayed.counterexample);
    }
}

// Example 3: preconditions, examples and composed generators
fn example_3_builder() {
    println!("\n=== Example 3: Builder, Preconditions and Examples ===");

    let divisors = frequency(vec![
        Weighted::new(integer(-10_i64, 10), 1),
        Weighted::new(option(integer(1_i64, 1000)).map(|v| v.unwrap_or(1)), 4),
    ]);
    let division = property((integer(-1000_i64, 1000), divisors), |(a, b): (i64, i64)| -> Result<(), PropertyError> {
        pre(b != 0)?;
        if (a / b) * b + a % b == a {
            Ok(())
        } else {
            Err(PropertyError::failed(format!("{a} / {b} does not round trip")))
        }
    });

    let report = PropertyTestBuilder::new()
        .seed(7)
        .num_runs(500)
        .examples(vec![(i64::from(i32::MAX), -1)])
        .run(&division)
        .expect("valid configuration");
    println!("{report}");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    example_1_basic_property();
    example_2_shrinking();
    example_3_builder();
}
