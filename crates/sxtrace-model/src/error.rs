//! Typed errors for model loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal model-file parse failure. No trace is attempted after one of these.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read at all.
    #[error("read {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Malformed input at a specific line.
    #[error("line {line}: {msg}")]
    Syntax {
        /// 1-based source line.
        line: usize,
        /// What was wrong.
        msg: String,
    },

    /// A numeric literal that is not an exact decimal/fraction.
    #[error("line {line}: malformed number `{text}`")]
    Number {
        /// 1-based source line.
        line: usize,
        /// The offending literal.
        text: String,
    },

    /// The file parsed but the resulting model is unusable.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Structural defects detected by [`crate::Problem::validate`] or the builders.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two rows share a name.
    #[error("row `{0}` defined twice")]
    DuplicateRow(String),

    /// Two columns share a name.
    #[error("column `{0}` defined twice")]
    DuplicateColumn(String),

    /// A coefficient or bound references a row that was never declared.
    #[error("unknown row `{0}`")]
    UnknownRow(String),

    /// A bound references a column that was never declared.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// Finite bounds that cross (`lower > upper`).
    #[error("crossed bounds on `{name}`: {lower} > {upper}")]
    CrossedBounds {
        /// Variable name.
        name: String,
        /// Rendered lower bound.
        lower: String,
        /// Rendered upper bound.
        upper: String,
    },

    /// A free column whose constraint column is identically zero cannot be
    /// held basic, and the status vocabulary has no nonbasic-free entry.
    #[error("free column `{0}` has an empty constraint column")]
    LooseFreeColumn(String),
}
