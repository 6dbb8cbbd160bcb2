//! Typed errors of the trace boundary.

use thiserror::Error;

/// Recorder contract violations. These signal an engine bug, not bad input,
/// and are never papered over by reordering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    /// A record arrived out of order or duplicated an index.
    #[error("trace record {got} out of sequence (expected {expected})")]
    Sequence {
        /// The index the recorder was waiting for.
        expected: u64,
        /// The index that actually arrived.
        got: u64,
    },

    /// A record's vectors disagree with the problem dimensions.
    #[error("record {iteration}: {what} has length {got}, expected {expected}")]
    Shape {
        /// Iteration carrying the malformed record.
        iteration: u64,
        /// Which vector is off.
        what: &'static str,
        /// Observed length.
        got: usize,
        /// Required length.
        expected: usize,
    },
}

/// Decode-time corruption. Fatal: the decoder never guesses a bound.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The trace retained no record at all.
    #[error("trace has no terminal record to decode")]
    EmptyTrace,

    /// A variable marked basic does not appear in the basis sequence.
    #[error("variable {index} (`{name}`) is marked basic but absent from the basis")]
    MissingFromBasis {
        /// 1-based variable index (rows then columns).
        index: usize,
        /// Variable name.
        name: String,
    },

    /// A nonbasic-fixed variable whose bounds are not equal.
    #[error("variable {index} (`{name}`) is nonbasic-fixed but its bounds differ")]
    FixedBoundMismatch {
        /// 1-based variable index.
        index: usize,
        /// Variable name.
        name: String,
    },

    /// A nonbasic variable recorded at a bound its model side does not have.
    #[error("variable {index} (`{name}`) is nonbasic at an infinite bound")]
    MissingBound {
        /// 1-based variable index.
        index: usize,
        /// Variable name.
        name: String,
    },

    /// A status outside the known vocabulary.
    #[error("variable {index} (`{name}`) carries an unknown status code")]
    UnknownStatus {
        /// 1-based variable index.
        index: usize,
        /// Variable name.
        name: String,
    },

    /// Record vectors disagree with the problem dimensions.
    #[error("terminal record: {what} has length {got}, expected {expected}")]
    Shape {
        /// Which vector is off.
        what: &'static str,
        /// Observed length.
        got: usize,
        /// Required length.
        expected: usize,
    },
}
