//! Bit-growth metric for exact rationals.
//!
//! Exact simplex trades rounding error for representation growth; the pair
//! of bit lengths below is the complexity proxy the objective/variable
//! channels emit in bits-only mode. Measuring never feeds back into the
//! solver.

use num::BigRational;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bit lengths of a reduced rational's absolute numerator and denominator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FractionalityMetric {
    /// Bits of `|numerator|` (0 for zero).
    pub num_bits: u64,
    /// Bits of the denominator.
    pub den_bits: u64,
}

impl FractionalityMetric {
    /// The value's complexity: numerator bits plus denominator bits.
    #[inline]
    #[must_use]
    pub const fn complexity(self) -> u64 {
        self.num_bits + self.den_bits
    }
}

/// Measure a rational. `BigRational` keeps itself in lowest terms, so the
/// bit lengths are those of the reduced fraction.
#[must_use]
pub fn measure(value: &BigRational) -> FractionalityMetric {
    FractionalityMetric {
        num_bits: value.numer().bits(),
        den_bits: value.denom().bits(),
    }
}

impl fmt::Display for FractionalityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num_bits, self.den_bits)
    }
}

impl FromStr for FractionalityMetric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (n, d) = s.split_once(':').ok_or(())?;
        Ok(Self {
            num_bits: n.parse().map_err(|_| ())?,
            den_bits: d.parse().map_err(|_| ())?,
        })
    }
}
