//! # Falsify - Property-Based Testing for Rust
//!
//! Falsify generates pseudo-random inputs of a declared shape, runs a
//! predicate against them and, when the predicate fails, searches for the
//! smallest input that still falsifies it. Every failure is reported with a
//! seed and a path that replay the exact same counterexample.
//!
//! ## Quick Start
//!
//! ```rust
//! use falsify::{RunConfig, check_with_config, integer, property};
//!
//! let report = check_with_config(
//!     property(integer(0_i32, 100), |x: i32| x < 50),
//!     &RunConfig::new().seed(42),
//! )
//! .unwrap();
//!
//! assert!(report.failed);
//! assert_eq!(report.counterexample, Some(50));
//!
//! // The same seed and path replay the counterexample directly.
//! let path = report.counterexample_path.clone().unwrap();
//! let replayed = check_with_config(
//!     property(integer(0_i32, 100), |x: i32| x < 50),
//!     &RunConfig::new().seed(42).path(path),
//! )
//! .unwrap();
//! assert_eq!(replayed.counterexample, Some(50));
//! ```
//!
//! Shrinking survives composition: arrays shrink their length and then each
//! item, mapped values shrink through their source, and weighted choices
//! shrink toward their first alternative.
//!
//! ```rust
//! use falsify::{Generator, RunConfig, check_with_config, integer, property, vec_of};
//!
//! let sizes = vec_of(integer(0_u32, 1000), 0, 20).map(|items| (items.len(), items));
//! let report = check_with_config(
//!     property(sizes, |(len, _): (usize, Vec<u32>)| len < 3),
//!     &RunConfig::new().seed(7),
//! )
//! .unwrap();
//! assert_eq!(report.counterexample, Some((3, vec![0, 0, 0])));
//! ```

pub mod bias;
pub mod choice;
pub mod collections;
pub mod combinators;
pub mod config;
pub mod decorate;
pub mod error;
pub mod execution;
pub mod generator;
pub mod path;
pub mod primitives;
pub mod property;
pub mod recursive;
pub mod report;
pub mod rng;
pub mod shrink;
pub mod stream;
pub mod value;

// Re-export the main public API
pub use choice::{
    DepthIdentifier, FrequencyConstraints, FrequencyGenerator, OptionConstraints, Weighted, frequency,
    frequency_with, one_of, one_of_with, option, option_with,
};
pub use collections::{ArrayConstraints, ArrayGenerator, Size, array, array_with, vec_of};
pub use combinators::{Chain, Filter, Map, NoBias, NoShrink};
pub use config::{ConfigError, ConfigManager, GlobalConfig, RunConfig};
pub use decorate::{EqualValues, IgnoreEqualValuesProperty};
pub use error::{GeneratorError, PreconditionFailure, PropertyError, RunError};
pub use execution::{
    PropertyTestBuilder, assert_async_property, assert_property, check, check_async, check_async_with_config,
    check_with_config, sample,
};
pub use generator::{BoxedGenerator, Generator};
pub use path::{PathError, ReplayPath};
pub use primitives::{
    BigIntGenerator, BoolGenerator, ConstantGenerator, IntegerGenerator, big_int, boolean, constant, constant_from,
    integer,
};
pub use property::{
    AsyncFnProperty, AsyncHook, AsyncProperty, FnProperty, Hook, Hooks, IntoOutcome, Outcome, Property, async_property,
    pre, property,
};
pub use recursive::{Deferred, Memo, Tie, letrec, memo};
pub use report::RunReport;
pub use rng::Random;
pub use shrink::Shrinks;
pub use stream::{InfiniteStream, StreamGenerator, infinite_stream};
pub use value::{Context, Value};
