//! sxtrace-engine — the trace-producing exact simplex.
//!
//! A dense, deliberately simple bounded-variable primal simplex over
//! `BigRational`: every quantity is exact, so the per-iteration records it
//! feeds the recorder are bit-for-bit reproducible and the bit-growth the
//! fractionality metric measures is real, not rounding noise.
//!
//! The engine exists to *produce* traces for pivot-rule study; it recomputes
//! basic values and duals from scratch each iteration instead of chasing
//! update formulas, and keeps `B⁻¹` dense. Model scaling is a separate
//! upstream transform (`sxtrace_model::scale`); the engine sees the problem
//! it is handed.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::unwrap_used, clippy::expect_used)]

/// The simplex loop itself.
pub mod simplex;

pub use simplex::{solve_with_trace, EngineError, EngineOptions, SolveOutcome};
