//! Append-only trace recording.
//!
//! The recorder is the single writer of a run's trace. Records must arrive
//! with iteration indices increasing by exactly 1; anything else is a
//! contract violation from the producing engine and fails hard. When memory
//! retention is off, records stream through the channels and are dropped,
//! except the most recent one, which is always kept so the terminal state
//! can still be decoded before teardown.

use num::BigRational;
use tracing::debug;

use sxtrace_model::{Problem, VariableId};

use crate::channels::{ChannelFailure, ChannelSink};
use crate::error::TraceError;
use crate::record::{StatusCode, TerminalStatus, Trace, TraceRecord, TRACE_VERSION};

/// Recorder behaviour switches.
#[derive(Clone, Copy, Debug)]
pub struct RecorderConfig {
    /// Keep the full record sequence in memory for later decode/rewrite.
    pub retain: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { retain: true }
    }
}

/// Single-writer recorder for one solve.
pub struct TraceRecorder {
    num_rows: usize,
    num_cols: usize,
    expected: u64,
    retain: bool,
    records: Vec<TraceRecord>,
    last: Option<TraceRecord>,
    sink: Option<ChannelSink>,
}

impl TraceRecorder {
    /// Start recording for `problem`. `sink` carries the streaming channels,
    /// if any were selected.
    #[must_use]
    pub fn begin(problem: &Problem, config: RecorderConfig, sink: Option<ChannelSink>) -> Self {
        Self {
            num_rows: problem.num_rows(),
            num_cols: problem.num_cols(),
            expected: 0,
            retain: config.retain,
            records: Vec::new(),
            last: None,
            sink,
        }
    }

    /// Append the state after one iteration.
    ///
    /// # Errors
    /// [`TraceError::Sequence`] on an out-of-order or duplicate index,
    /// [`TraceError::Shape`] when a vector disagrees with the problem
    /// dimensions. The recorder never reorders or overwrites.
    pub fn record(
        &mut self,
        iteration: u64,
        objective: BigRational,
        basis: Vec<VariableId>,
        basic_values: Vec<BigRational>,
        status: Vec<StatusCode>,
    ) -> Result<(), TraceError> {
        if iteration != self.expected {
            return Err(TraceError::Sequence { expected: self.expected, got: iteration });
        }
        let shape = |what: &'static str, got: usize, expected: usize| TraceError::Shape {
            iteration,
            what,
            got,
            expected,
        };
        if basis.len() != self.num_rows {
            return Err(shape("basis", basis.len(), self.num_rows));
        }
        if basic_values.len() != self.num_rows {
            return Err(shape("basic_values", basic_values.len(), self.num_rows));
        }
        let num_vars = self.num_rows + self.num_cols;
        if status.len() != num_vars {
            return Err(shape("status", status.len(), num_vars));
        }

        let record = TraceRecord { iteration, objective, basis, basic_values, status };
        if let Some(sink) = &mut self.sink {
            sink.append(&record);
        }
        if self.retain {
            self.records.push(record.clone());
        }
        self.last = Some(record);
        self.expected += 1;
        Ok(())
    }

    /// Iterations recorded so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.expected
    }

    /// Whether nothing has been recorded yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expected == 0
    }

    /// The most recent record (kept even with retention off).
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&TraceRecord> {
        self.last.as_ref()
    }

    /// Seal the trace with its terminal state, flushing any streaming
    /// channels. Returns the trace and the per-channel failures.
    #[must_use]
    pub fn finish(self, terminal: TerminalStatus) -> (Trace, Vec<ChannelFailure>) {
        debug!(iterations = self.expected, %terminal, "trace sealed");
        let records = if self.retain {
            self.records
        } else {
            self.last.into_iter().collect()
        };
        let trace = Trace {
            version: TRACE_VERSION,
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            records,
            terminal,
        };
        let failures = self.sink.map_or_else(Vec::new, ChannelSink::finish);
        (trace, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigRational;
    use sxtrace_model::rational::int;
    use sxtrace_model::{Bounds, Direction};

    fn toy_problem() -> Problem {
        let mut p = Problem::new("toy", Direction::Minimize);
        let r = p.add_row("r", Bounds::upper_only(int(1)));
        let x = p.add_column("x", Bounds::default(), int(1));
        p.add_coeff(r, x, int(1));
        p
    }

    fn push(rec: &mut TraceRecorder, iteration: u64) -> Result<(), TraceError> {
        rec.record(
            iteration,
            BigRational::from_integer(iteration.into()),
            vec![VariableId::Row(0)],
            vec![int(0)],
            vec![StatusCode::Basic, StatusCode::NonbasicLower],
        )
    }

    #[test]
    fn records_in_sequence() {
        let p = toy_problem();
        let mut rec = TraceRecorder::begin(&p, RecorderConfig::default(), None);
        push(&mut rec, 0).unwrap();
        push(&mut rec, 1).unwrap();
        assert_eq!(rec.len(), 2);
        let (trace, failures) = rec.finish(TerminalStatus::Optimal);
        assert!(failures.is_empty());
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.pivots(), 1);
    }

    #[test]
    fn rejects_gaps_and_duplicates() {
        let p = toy_problem();
        let mut rec = TraceRecorder::begin(&p, RecorderConfig::default(), None);
        push(&mut rec, 0).unwrap();
        assert_eq!(
            push(&mut rec, 0),
            Err(TraceError::Sequence { expected: 1, got: 0 })
        );
        assert_eq!(
            push(&mut rec, 2),
            Err(TraceError::Sequence { expected: 1, got: 2 })
        );
    }

    #[test]
    fn rejects_malformed_shapes() {
        let p = toy_problem();
        let mut rec = TraceRecorder::begin(&p, RecorderConfig::default(), None);
        let err = rec
            .record(0, int(0), vec![], vec![], vec![StatusCode::Basic, StatusCode::Basic])
            .unwrap_err();
        assert!(matches!(err, TraceError::Shape { what: "basis", .. }));
    }

    #[test]
    fn retention_off_keeps_only_the_terminal_record() {
        let p = toy_problem();
        let mut rec = TraceRecorder::begin(&p, RecorderConfig { retain: false }, None);
        push(&mut rec, 0).unwrap();
        push(&mut rec, 1).unwrap();
        push(&mut rec, 2).unwrap();
        assert_eq!(rec.last().map(|r| r.iteration), Some(2));
        let (trace, _) = rec.finish(TerminalStatus::IterationLimit);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.pivots(), 2);
    }
}
