//! Variable identity and exact bounds.
//!
//! A variable is either a row auxiliary (one per constraint) or a structural
//! column. The tagged [`VariableId`] replaces a flat 1-based index space: it
//! still maps to a dense ordinal (rows first, then columns) for O(1) lookup
//! tables, and the 1-based index only reappears in text output.

use num::BigRational;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a variable: a constraint's auxiliary or a structural column.
///
/// Indices are 0-based. The dense ordinal orders rows before columns.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VariableId {
    /// Auxiliary variable of constraint row `i`.
    Row(usize),
    /// Structural variable of column `j`.
    Column(usize),
}

impl VariableId {
    /// Dense ordinal in `0..m+n`, rows first.
    #[inline]
    #[must_use]
    pub fn ordinal(self, num_rows: usize) -> usize {
        match self {
            Self::Row(i) => i,
            Self::Column(j) => num_rows + j,
        }
    }

    /// Inverse of [`VariableId::ordinal`].
    #[inline]
    #[must_use]
    pub fn from_ordinal(num_rows: usize, ordinal: usize) -> Self {
        if ordinal < num_rows {
            Self::Row(ordinal)
        } else {
            Self::Column(ordinal - num_rows)
        }
    }

    /// 1-based index used by the text channels (rows then columns).
    #[inline]
    #[must_use]
    pub fn display_index(self, num_rows: usize) -> usize {
        self.ordinal(num_rows) + 1
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(i) => write!(f, "r{i}"),
            Self::Column(j) => write!(f, "c{j}"),
        }
    }
}

/// Classification of a variable's bound pair.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BoundKind {
    /// No finite bound on either side.
    Free,
    /// Finite lower bound only.
    Lower,
    /// Finite upper bound only.
    Upper,
    /// Finite, distinct bounds on both sides.
    Range,
    /// Equal finite bounds.
    Fixed,
}

/// Exact rational bounds; `None` means the side is infinite.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bounds {
    lower: Option<BigRational>,
    upper: Option<BigRational>,
}

impl Bounds {
    /// Unbounded on both sides.
    #[must_use]
    pub const fn free() -> Self {
        Self { lower: None, upper: None }
    }

    /// `[lower, +inf)`.
    #[must_use]
    pub const fn lower_only(lower: BigRational) -> Self {
        Self { lower: Some(lower), upper: None }
    }

    /// `(-inf, upper]`.
    #[must_use]
    pub const fn upper_only(upper: BigRational) -> Self {
        Self { lower: None, upper: Some(upper) }
    }

    /// `[lower, upper]`.
    #[must_use]
    pub const fn range(lower: BigRational, upper: BigRational) -> Self {
        Self { lower: Some(lower), upper: Some(upper) }
    }

    /// Both bounds equal to `value`.
    #[must_use]
    pub fn fixed(value: BigRational) -> Self {
        Self { lower: Some(value.clone()), upper: Some(value) }
    }

    /// Lower bound, if finite.
    #[inline]
    #[must_use]
    pub fn lower(&self) -> Option<&BigRational> {
        self.lower.as_ref()
    }

    /// Upper bound, if finite.
    #[inline]
    #[must_use]
    pub fn upper(&self) -> Option<&BigRational> {
        self.upper.as_ref()
    }

    /// Replace the lower bound (`None` = drop to -inf).
    pub fn set_lower(&mut self, lower: Option<BigRational>) {
        self.lower = lower;
    }

    /// Replace the upper bound (`None` = raise to +inf).
    pub fn set_upper(&mut self, upper: Option<BigRational>) {
        self.upper = upper;
    }

    /// Classify the bound pair.
    #[must_use]
    pub fn kind(&self) -> BoundKind {
        match (&self.lower, &self.upper) {
            (None, None) => BoundKind::Free,
            (Some(_), None) => BoundKind::Lower,
            (None, Some(_)) => BoundKind::Upper,
            (Some(l), Some(u)) if l == u => BoundKind::Fixed,
            (Some(_), Some(_)) => BoundKind::Range,
        }
    }

    /// Whether `value` satisfies both bounds.
    #[must_use]
    pub fn contains(&self, value: &BigRational) -> bool {
        self.lower.as_ref().map_or(true, |l| l <= value)
            && self.upper.as_ref().map_or(true, |u| value <= u)
    }

    /// Finite bounds that cross make the variable unsatisfiable.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        matches!((&self.lower, &self.upper), (Some(l), Some(u)) if l > u)
    }
}

impl Default for Bounds {
    /// The LP-format column default: `[0, +inf)`.
    fn default() -> Self {
        Self::lower_only(BigRational::from_integer(0.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigRational;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(n.into())
    }

    #[test]
    fn ordinal_roundtrip() {
        let m = 3;
        for ord in 0..7 {
            let id = VariableId::from_ordinal(m, ord);
            assert_eq!(id.ordinal(m), ord);
        }
        assert_eq!(VariableId::Row(2).display_index(3), 3);
        assert_eq!(VariableId::Column(0).display_index(3), 4);
    }

    #[test]
    fn bound_kinds() {
        assert_eq!(Bounds::free().kind(), BoundKind::Free);
        assert_eq!(Bounds::lower_only(q(1)).kind(), BoundKind::Lower);
        assert_eq!(Bounds::upper_only(q(1)).kind(), BoundKind::Upper);
        assert_eq!(Bounds::range(q(0), q(2)).kind(), BoundKind::Range);
        assert_eq!(Bounds::fixed(q(5)).kind(), BoundKind::Fixed);
        assert!(Bounds::range(q(2), q(0)).is_crossed());
    }

    #[test]
    fn contains_respects_infinite_sides() {
        let b = Bounds::upper_only(q(4));
        assert!(b.contains(&q(-1000)));
        assert!(b.contains(&q(4)));
        assert!(!b.contains(&q(5)));
    }
}
