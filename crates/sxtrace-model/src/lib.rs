//! Linear-program model types and loaders.
//!
//! This crate is the input boundary of the tracing pipeline:
//!
//! - `variable`: tagged [`VariableId`] (row or column) and exact bounds.
//! - `problem`: the immutable [`Problem`] container (rows, columns, sparse
//!   coefficient matrix, objective) built by the loaders.
//! - `rational`: exact parsing of decimal/exponent/fraction literals; no
//!   float is ever constructed on the way in.
//! - `lp` / `mps`: pragmatic readers for the two accepted text formats.
//! - `scale`: the optional RHS-integralizing row scaling pass.
//!
//! Everything downstream (recorder, engine, decoder) treats a loaded
//! [`Problem`] as immutable for the whole run.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::unwrap_used, clippy::expect_used)]

/// CPLEX-style LP reader.
pub mod lp;
/// Free-format MPS reader.
pub mod mps;
/// Problem container and builder API.
pub mod problem;
/// Exact rational literal parsing.
pub mod rational;
/// RHS-integralizing scaling pass.
pub mod scale;
/// Variable identity and bounds.
pub mod variable;

mod error;

pub use error::{ModelError, ParseError};
pub use problem::{Column, Direction, Problem, ProblemInfo, Row};
pub use variable::{BoundKind, Bounds, VariableId};

use std::path::Path;

/// Accepted model file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    /// CPLEX-style LP text.
    Lp,
    /// Free-format MPS.
    Mps,
}

/// Load a problem from `path` in the given format.
///
/// # Errors
/// [`ParseError`] on unreadable files or malformed input; nothing downstream
/// (no trace, no channel file) is attempted by callers after a load failure.
pub fn load<P: AsRef<Path>>(path: P, format: ModelFormat) -> Result<Problem, ParseError> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_owned(),
        source,
    })?;
    let problem = match format {
        ModelFormat::Lp => lp::parse_str(&src)?,
        ModelFormat::Mps => mps::parse_str(&src)?,
    };
    problem.validate()?;
    Ok(problem)
}
