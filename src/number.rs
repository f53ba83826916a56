//! Numeric scalars shared by every stage of the pipeline.
//!
//! A [`Number`] is either an integer or a float. Both variants live on the same
//! number line: `Int(3) == Float(3.0)` and `Int(2) < Float(2.5)`. This is what
//! lets boundaries collected from source like `x < 3` and `x <= 3.0` collapse
//! into a single boundary.
//!
//! # Arithmetic
//!
//! Integer operations stay integral as long as they fit in `i64`:
//!
//! - the `checked_*` family returns `None` on integer overflow (and on a zero divisor),
//! - the `*_promoting` family falls back to floating point instead.
//!
//! ```rust
//! use eqclass::number::Number;
//!
//! assert_eq!(Number::Int(18).sub_promoting(Number::Int(5)), Number::Int(13));
//! assert_eq!(Number::Int(i64::MAX).checked_add(Number::Int(1)), None);
//! assert!(Number::Int(i64::MAX).add_promoting(Number::Int(1)).is_float());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An integer or floating point scalar.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::Float(_) => None,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, Number::Float(_))
    }

    pub fn is_finite(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(x) => x.is_finite(),
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(x) => x == 0.0,
        }
    }

    /// Strictly greater than zero.
    pub fn is_positive(self) -> bool {
        match self {
            Number::Int(n) => n > 0,
            Number::Float(x) => x > 0.0,
        }
    }

    pub fn checked_add(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() + rhs.as_f64())),
        }
    }

    pub fn checked_sub(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() - rhs.as_f64())),
        }
    }

    pub fn checked_mul(self, rhs: Number) -> Option<Number> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int),
            _ => Some(Number::Float(self.as_f64() * rhs.as_f64())),
        }
    }

    /// True division. Always produces a float.
    pub fn checked_div(self, rhs: Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        Some(Number::Float(self.as_f64() / rhs.as_f64()))
    }

    /// Division rounded toward negative infinity.
    ///
    /// `Int(-7).checked_floor_div(Int(2)) == Some(Int(-4))`.
    pub fn checked_floor_div(self, rhs: Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let q = a.checked_div(b)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    Some(Number::Int(q - 1))
                } else {
                    Some(Number::Int(q))
                }
            }
            _ => Some(Number::Float((self.as_f64() / rhs.as_f64()).floor())),
        }
    }

    /// Remainder whose sign follows the divisor, matching [`Number::checked_floor_div`].
    pub fn checked_rem(self, rhs: Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let r = a.checked_rem(b)?;
                if r != 0 && ((r < 0) != (b < 0)) {
                    Some(Number::Int(r + b))
                } else {
                    Some(Number::Int(r))
                }
            }
            _ => {
                let (a, b) = (self.as_f64(), rhs.as_f64());
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    Some(Number::Float(r + b))
                } else {
                    Some(Number::Float(r))
                }
            }
        }
    }

    pub fn checked_neg(self) -> Option<Number> {
        match self {
            Number::Int(n) => n.checked_neg().map(Number::Int),
            Number::Float(x) => Some(Number::Float(-x)),
        }
    }

    pub fn add_promoting(self, rhs: Number) -> Number {
        self.checked_add(rhs)
            .unwrap_or_else(|| Number::Float(self.as_f64() + rhs.as_f64()))
    }

    pub fn sub_promoting(self, rhs: Number) -> Number {
        self.checked_sub(rhs)
            .unwrap_or_else(|| Number::Float(self.as_f64() - rhs.as_f64()))
    }

    pub fn abs(self) -> Option<Number> {
        match self {
            Number::Int(n) => n.checked_abs().map(Number::Int),
            Number::Float(x) => Some(Number::Float(x.abs())),
        }
    }

    /// Largest integral value not greater than `self`. Floats stay floats.
    pub fn floor(self) -> Number {
        match self {
            Number::Int(n) => Number::Int(n),
            Number::Float(x) => Number::Float(x.floor()),
        }
    }
}

/// Compares an integer against a float without losing precision when the
/// float is integral and within `i64` range.
fn cmp_int_float(a: i64, b: f64) -> Ordering {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if b.is_nan() {
        return (a as f64).total_cmp(&b);
    }
    if b >= LIMIT {
        return Ordering::Less;
    }
    if b < -LIMIT {
        return Ordering::Greater;
    }
    let floor = b.floor();
    match a.cmp(&(floor as i64)) {
        Ordering::Equal if b > floor => Ordering::Less,
        ord => ord,
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b)),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(b, a).reverse(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(n) => write!(f, "{}", n),
            // Integral floats keep a `.0` or an exponent so they read back as floats.
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 => {
                if x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{:e}", x)
                }
            }
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Int(n)
    }
}

impl From<f64> for Number {
    fn from(x: f64) -> Self {
        Number::Float(x)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid number `{0}`")]
pub struct ParseNumberError(String);

impl FromStr for Number {
    type Err = ParseNumberError;

    /// Parses an integer when possible, a finite float otherwise.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Number::Int(n));
        }
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Number::Float(x)),
            _ => Err(ParseNumberError(s.to_string())),
        }
    }
}
