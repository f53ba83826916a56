//! Equivalence-class synthesis.
//!
//! Turns sorted boundaries `b1 < b2 < ... < bn` into `n + 1` partitions that
//! cover the whole number line without gaps or overlaps:
//!
//! ```text
//!   (-inf, b1)   [b1, b2)   ...   [b(n-1), bn)   [bn, +inf)
//!   below-range  interior         interior       above-range
//! ```
//!
//! Each partition carries one representative input:
//!
//! - below-range: `b1 - δ`
//! - interior: the floor of the mean of its bounds (see [`MidpointPolicy`])
//! - above-range: `bn + δ`
//!
//! The offset δ defaults to `5`. With [`OffsetPolicy::ClampToGap`] it is capped
//! at the smallest distance between consecutive boundaries.
//!
//! # Example
//!
//! ```rust
//! use eqclass::extract::BoundarySet;
//! use eqclass::number::Number;
//! use eqclass::partition::PartitionSynthesizer;
//!
//! let boundaries = BoundarySet::from_values([Number::Int(18)]);
//! let partitions = PartitionSynthesizer::default().synthesize(&boundaries, "age").unwrap();
//!
//! assert_eq!(partitions.len(), 2);
//! assert_eq!(partitions[0].label, "age < 18");
//! assert_eq!(partitions[0].representative, Number::Int(13));
//! assert_eq!(partitions[1].label, "age >= 18");
//! assert_eq!(partitions[1].representative, Number::Int(23));
//! ```

use std::fmt;

use log::debug;

use crate::extract::BoundarySet;
use crate::number::Number;

/// Reference offset for out-of-range representatives.
pub const DEFAULT_OFFSET: Number = Number::Int(5);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("no boundaries to partition")]
    NoBoundaries,
    #[error("offset must be finite and strictly positive, got {0}")]
    InvalidOffset(Number),
}

/// Coarse classification of a partition. Display only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    BelowRange,
    Interior,
    AboveRange,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::BelowRange => write!(f, "below-range"),
            Category::Interior => write!(f, "interior"),
            Category::AboveRange => write!(f, "above-range"),
        }
    }
}

/// One equivalence class: the half-open interval `[low, high)`.
///
/// A missing `low` means unbounded below, a missing `high` unbounded above.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub label: String,
    pub representative: Number,
    pub category: Category,
    pub low: Option<Number>,
    pub high: Option<Number>,
}

impl Partition {
    /// Whether `value` lies in `[low, high)`.
    pub fn contains(&self, value: Number) -> bool {
        self.low.map_or(true, |low| low <= value) && self.high.map_or(true, |high| value < high)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, sample {})", self.label, self.category, self.representative)
    }
}

/// How far outside the extreme boundaries the out-of-range samples go.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    /// Always use the configured offset.
    #[default]
    Fixed,
    /// Use `min(offset, smallest gap between consecutive boundaries)`.
    ClampToGap,
}

/// How interior representatives are chosen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MidpointPolicy {
    /// `floor((low + high) / 2)`. Integer bounds give an exact integer.
    /// Float bounds give a floored float, or the plain mean when flooring
    /// would fall below `low`.
    #[default]
    FloorMean,
    /// `(low + high) / 2`, as an integer only when it is exact.
    ArithmeticMean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// δ: distance of the out-of-range samples from the extreme boundaries.
    pub offset: Number,
    pub offset_policy: OffsetPolicy,
    pub midpoint: MidpointPolicy,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            offset_policy: OffsetPolicy::Fixed,
            midpoint: MidpointPolicy::FloorMean,
        }
    }
}

impl SynthesisConfig {
    pub fn with_offset(mut self, offset: impl Into<Number>) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn with_offset_policy(mut self, policy: OffsetPolicy) -> Self {
        self.offset_policy = policy;
        self
    }

    pub fn with_midpoint(mut self, policy: MidpointPolicy) -> Self {
        self.midpoint = policy;
        self
    }

    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.offset.is_finite() && self.offset.is_positive() {
            Ok(())
        } else {
            Err(SynthesisError::InvalidOffset(self.offset))
        }
    }
}

/// Builds partitions from boundaries.
#[derive(Debug, Clone, Default)]
pub struct PartitionSynthesizer {
    config: SynthesisConfig,
}

impl PartitionSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Partitions the number line at `boundaries`.
    ///
    /// `variable` names the tested value in labels, e.g. `0 <= age < 3`.
    ///
    /// Returns exactly `boundaries.len() + 1` partitions in ascending order.
    pub fn synthesize(&self, boundaries: &BoundarySet, variable: &str) -> Result<Vec<Partition>, SynthesisError> {
        self.config.validate()?;
        let (Some(first), Some(last)) = (boundaries.min(), boundaries.max()) else {
            return Err(SynthesisError::NoBoundaries);
        };

        let offset = self.effective_offset(boundaries);
        debug!("synthesize(boundaries = {}, offset = {})", boundaries, offset);

        let mut partitions = Vec::with_capacity(boundaries.len() + 1);

        partitions.push(Partition {
            label: format!("{} < {}", variable, first),
            representative: strictly_below(first, first.sub_promoting(offset)),
            category: Category::BelowRange,
            low: None,
            high: Some(first),
        });

        for (low, high) in boundaries.windows() {
            partitions.push(Partition {
                label: format!("{} <= {} < {}", low, variable, high),
                representative: self.midpoint(low, high),
                category: Category::Interior,
                low: Some(low),
                high: Some(high),
            });
        }

        partitions.push(Partition {
            label: format!("{} >= {}", variable, last),
            representative: strictly_above(last, last.add_promoting(offset)),
            category: Category::AboveRange,
            low: Some(last),
            high: None,
        });

        Ok(partitions)
    }

    fn effective_offset(&self, boundaries: &BoundarySet) -> Number {
        match self.config.offset_policy {
            OffsetPolicy::Fixed => self.config.offset,
            OffsetPolicy::ClampToGap => boundaries
                .windows()
                .map(|(low, high)| high.sub_promoting(low))
                .min()
                .map_or(self.config.offset, |gap| gap.min(self.config.offset)),
        }
    }

    /// Interior sample of `[low, high)`, or `low` when rounding pushes the
    /// computed mean out of the interval.
    fn midpoint(&self, low: Number, high: Number) -> Number {
        let candidate = self.raw_midpoint(low, high);
        if low <= candidate && candidate < high {
            candidate
        } else {
            low
        }
    }

    fn raw_midpoint(&self, low: Number, high: Number) -> Number {
        match (self.config.midpoint, low, high) {
            (MidpointPolicy::FloorMean, Number::Int(a), Number::Int(b)) => {
                // i128 keeps the sum exact; the mean lies between two i64 values.
                Number::Int((a as i128 + b as i128).div_euclid(2) as i64)
            }
            (MidpointPolicy::FloorMean, _, _) => {
                let mean = mean_f64(low, high);
                let floored = mean.floor();
                if Number::Float(floored) >= low {
                    Number::Float(floored)
                } else {
                    Number::Float(mean)
                }
            }
            (MidpointPolicy::ArithmeticMean, Number::Int(a), Number::Int(b)) => {
                let sum = a as i128 + b as i128;
                if sum % 2 == 0 {
                    Number::Int((sum / 2) as i64)
                } else {
                    Number::Float(sum as f64 / 2.0)
                }
            }
            (MidpointPolicy::ArithmeticMean, _, _) => Number::Float(mean_f64(low, high)),
        }
    }
}

/// Float promotion can absorb a small offset (`i64::MIN - 5` rounds back to
/// `i64::MIN`); step one relative epsilon past the boundary when it does.
fn strictly_below(boundary: Number, candidate: Number) -> Number {
    if candidate < boundary {
        return candidate;
    }
    let b = boundary.as_f64();
    Number::Float(b - b.abs().max(1.0) * 2.0 * f64::EPSILON)
}

fn strictly_above(boundary: Number, candidate: Number) -> Number {
    if candidate > boundary {
        return candidate;
    }
    let b = boundary.as_f64();
    Number::Float(b + b.abs().max(1.0) * 2.0 * f64::EPSILON)
}

/// Mean computed without overflowing for large magnitudes.
fn mean_f64(low: Number, high: Number) -> f64 {
    let (a, b) = (low.as_f64(), high.as_f64());
    a + (b - a) / 2.0
}
