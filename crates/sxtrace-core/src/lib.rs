//! sxtrace-core — the pivot-trace boundary shared by the engine and the CLI.
//!
//! - `record`: the versioned per-iteration trace data model.
//! - `recorder`: append-only recording with strict sequence enforcement and
//!   optional streaming into the text channels.
//! - `channels`: the four named output channels (info/objective/status/
//!   variable), their writers and round-trip readers.
//! - `fractionality`: the numerator/denominator bit-growth metric.
//! - `decode`: terminal-state reconstruction of a primal solution.
//! - `snapshot`: JSON/CBOR I/O for whole retained traces.
//!
//! The trace has exactly one writer (the engine, through a recorder) and any
//! number of readers afterwards; nothing here locks because the phases never
//! interleave.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::unwrap_used, clippy::expect_used)]

/// Named output channels: selection, writers, readers.
pub mod channels;
/// Terminal-state decoding into a primal solution.
pub mod decode;
/// Numerator/denominator bit-length metric.
pub mod fractionality;
/// Versioned per-iteration trace records.
pub mod record;
/// Append-only trace recording.
pub mod recorder;
/// JSON/CBOR whole-trace I/O.
pub mod snapshot;

mod error;

pub use error::{DecodeError, TraceError};
pub use fractionality::{measure, FractionalityMetric};
pub use record::{PivotRule, StatusCode, TerminalStatus, Trace, TraceRecord, TRACE_VERSION};
pub use recorder::{RecorderConfig, TraceRecorder};
