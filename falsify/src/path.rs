//! Replay paths: the generate/shrink route that led to a counterexample.
//!
//! A path reads `run:shrink:shrink...`. The first segment is the index of
//! the failing trial, counting user examples first. Every following segment
//! is the position, in the shrink sequence of the current counterexample, of
//! the candidate that failed again.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Path parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("replay path is empty")]
    Empty,

    #[error("invalid replay path segment {segment:?}: expected a non-negative integer")]
    InvalidSegment { segment: String },
}

/// Parsed replay path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReplayPath {
    pub run_index: usize,
    pub shrinks: Vec<usize>,
}

impl ReplayPath {
    pub fn new(run_index: usize) -> Self {
        Self {
            run_index,
            shrinks: Vec::new(),
        }
    }

    /// Record that the candidate at `index` replaced the counterexample
    pub fn push(&mut self, index: usize) {
        self.shrinks.push(index);
    }

    pub fn depth(&self) -> usize {
        self.shrinks.len()
    }
}

impl fmt::Display for ReplayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.run_index)?;
        for index in &self.shrinks {
            write!(f, ":{index}")?;
        }
        Ok(())
    }
}

impl FromStr for ReplayPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = trimmed.split(':').map(|segment| {
            segment.parse::<usize>().map_err(|_| PathError::InvalidSegment {
                segment: segment.to_string(),
            })
        });
        let run_index = segments.next().ok_or(PathError::Empty)??;
        let shrinks = segments.collect::<Result<Vec<_>, _>>()?;
        Ok(Self { run_index, shrinks })
    }
}
