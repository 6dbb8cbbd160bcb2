//! The per-iteration trace data model.
//!
//! One [`TraceRecord`] per simplex iteration: objective value, basis
//! sequence, basic values, and a status for every variable (rows then
//! columns). A [`Trace`] is the append-only sequence plus the terminal
//! state; record 0 is the initial basis, so a run that is already terminal
//! there yields a single record.

use num::BigRational;
use serde::{Deserialize, Serialize};
use std::fmt;

use sxtrace_model::VariableId;

/// Wire version tag for snapshot compatibility checks.
pub const TRACE_VERSION: u16 = 1;

/// A variable's role at one iteration.
///
/// `Unknown` never comes out of the engine; it is the catch-all that newer
/// producers decode into, and the decoder refuses it rather than guess a
/// bound.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    /// In the basis; its value comes from the basis equations.
    Basic,
    /// Nonbasic at its lower bound.
    NonbasicLower,
    /// Nonbasic at its upper bound.
    NonbasicUpper,
    /// Nonbasic with equal bounds.
    NonbasicFixed,
    /// Catch-all for unrecognised serialized statuses.
    #[serde(other)]
    Unknown,
}

impl StatusCode {
    /// One-letter form used by the status channel.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Basic => 'B',
            Self::NonbasicLower => 'L',
            Self::NonbasicUpper => 'U',
            Self::NonbasicFixed => 'F',
            Self::Unknown => '?',
        }
    }

    /// Inverse of [`StatusCode::letter`]; `None` for unknown letters.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(Self::Basic),
            'L' => Some(Self::NonbasicLower),
            'U' => Some(Self::NonbasicUpper),
            'F' => Some(Self::NonbasicFixed),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// How a traced run ended. Every variant is a valid, decodable state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    /// Optimal basis reached.
    Optimal,
    /// No feasible point exists.
    Infeasible,
    /// The objective is unbounded in the optimization direction.
    Unbounded,
    /// The iteration or time limit stopped the run first.
    IterationLimit,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "optimal",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::IterationLimit => "iteration-limit",
        };
        f.write_str(s)
    }
}

/// Entering-variable selection rule.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PivotRule {
    /// Most negative reduced cost.
    Dantzig,
    /// Smallest eligible index; guarantees finite termination.
    Bland,
    /// Maximal actual objective improvement per pivot.
    BestImprovement,
    /// Uniform over eligible candidates, reproducible via the seed.
    Random {
        /// RNG seed; equal seeds give equal trajectories.
        seed: u64,
    },
}

impl fmt::Display for PivotRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dantzig => f.write_str("dantzig"),
            Self::Bland => f.write_str("bland"),
            Self::BestImprovement => f.write_str("best"),
            Self::Random { seed } => write!(f, "random(seed={seed})"),
        }
    }
}

/// State after one simplex iteration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceRecord {
    /// Iteration index; 0 is the initial basis.
    pub iteration: u64,
    /// Objective value of the model (not the phase-1 surrogate).
    pub objective: BigRational,
    /// Basis sequence; position = basis slot, length = row count.
    pub basis: Vec<VariableId>,
    /// Values of the basic variables, parallel to `basis`.
    pub basic_values: Vec<BigRational>,
    /// One status per variable, rows then columns.
    pub status: Vec<StatusCode>,
}

/// Recorded trajectory of one solve.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trace {
    /// Format version for forward-compat.
    pub version: u16,
    /// Constraint-row count of the traced problem.
    pub num_rows: usize,
    /// Structural-column count of the traced problem.
    pub num_cols: usize,
    /// Records in iteration order. With memory retention off this holds
    /// only the terminal record.
    pub records: Vec<TraceRecord>,
    /// How the run ended.
    pub terminal: TerminalStatus,
}

impl Trace {
    /// Number of retained records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any record was retained.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The terminal record, if any was retained.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&TraceRecord> {
        self.records.last()
    }

    /// Number of pivots performed (terminal iteration index).
    #[must_use]
    pub fn pivots(&self) -> u64 {
        self.last().map_or(0, |r| r.iteration)
    }
}
