//! The four named output channels.
//!
//! Each channel is opened independently: a destination that cannot be
//! created fails alone and the siblings still get written. Failures are
//! collected per channel rather than aborting the run; partial success is
//! a supported outcome.
//!
//! Line formats (stable; the readers below re-parse them exactly):
//! - **info**: `rows:`/`cols:`/`nonzeros:` counts, then variable names
//!   (rows before columns) between literal `--- START NAMES ---` /
//!   `--- END NAMES ---` markers.
//! - **objective**: one payload per iteration.
//! - **status**: one letter per variable per iteration, space-separated.
//! - **variable**: `<index>=<payload>` pairs parallel to the basis.
//!
//! A payload is the rational in `p/q` form, or `num_bits:den_bits` in
//! bits-only mode.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use num::BigRational;
use tracing::warn;

use sxtrace_model::rational::parse_rational;
use sxtrace_model::{Problem, ProblemInfo};

use crate::fractionality::measure;
use crate::record::{StatusCode, Trace, TraceRecord};

/// Literal start marker of the info-channel names section.
pub const NAMES_START: &str = "--- START NAMES ---";
/// Literal end marker of the info-channel names section.
pub const NAMES_END: &str = "--- END NAMES ---";

/// The channel names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Problem dimensions and variable names.
    Info,
    /// Objective value per iteration.
    Objective,
    /// Status vector per iteration.
    Status,
    /// Basic values per iteration.
    Variable,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Objective => "objective",
            Self::Status => "status",
            Self::Variable => "variable",
        };
        f.write_str(s)
    }
}

/// Which channels to produce; `None` disables a channel (never an error).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelSelection {
    /// Destination of the info channel.
    pub info: Option<PathBuf>,
    /// Destination of the objective channel.
    pub objective: Option<PathBuf>,
    /// Destination of the status channel.
    pub status: Option<PathBuf>,
    /// Destination of the variable channel.
    pub variable: Option<PathBuf>,
}

impl ChannelSelection {
    /// Whether no channel is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_none()
            && self.objective.is_none()
            && self.status.is_none()
            && self.variable.is_none()
    }
}

/// One channel that could not be opened or written.
#[derive(Debug)]
pub struct ChannelFailure {
    /// Which channel failed.
    pub channel: Channel,
    /// Its destination.
    pub path: PathBuf,
    /// What went wrong.
    pub error: anyhow::Error,
}

struct ChannelWriter {
    channel: Channel,
    path: PathBuf,
    writer: BufWriter<File>,
}

fn open_writer(
    channel: Channel,
    path: &Path,
    failures: &mut Vec<ChannelFailure>,
) -> Option<ChannelWriter> {
    match File::create(path) {
        Ok(f) => Some(ChannelWriter {
            channel,
            path: path.to_owned(),
            writer: BufWriter::new(f),
        }),
        Err(e) => {
            warn!(%channel, path = %path.display(), "cannot open channel: {e}");
            failures.push(ChannelFailure {
                channel,
                path: path.to_owned(),
                error: anyhow!(e).context(format!("create {}", path.display())),
            });
            None
        }
    }
}

fn payload(value: &BigRational, bits_only: bool) -> String {
    if bits_only {
        measure(value).to_string()
    } else {
        value.to_string()
    }
}

/// Streaming writer over the per-iteration channels.
///
/// The info channel is written in full when the sink opens; the other three
/// get one line per recorded iteration. A channel that fails mid-stream is
/// closed and reported, and the remaining channels keep going.
pub struct ChannelSink {
    num_rows: usize,
    bits_only: bool,
    objective: Option<ChannelWriter>,
    status: Option<ChannelWriter>,
    variable: Option<ChannelWriter>,
    failures: Vec<ChannelFailure>,
}

impl ChannelSink {
    /// Open the requested channels and emit the info channel.
    #[must_use]
    pub fn open(problem: &Problem, selection: &ChannelSelection, bits_only: bool) -> Self {
        let mut failures = Vec::new();

        if let Some(path) = &selection.info {
            if let Err(error) = write_info(path, problem) {
                warn!(channel = %Channel::Info, path = %path.display(), "cannot write channel: {error:#}");
                failures.push(ChannelFailure {
                    channel: Channel::Info,
                    path: path.clone(),
                    error,
                });
            }
        }

        let objective = selection
            .objective
            .as_deref()
            .and_then(|p| open_writer(Channel::Objective, p, &mut failures));
        let status = selection
            .status
            .as_deref()
            .and_then(|p| open_writer(Channel::Status, p, &mut failures));
        let variable = selection
            .variable
            .as_deref()
            .and_then(|p| open_writer(Channel::Variable, p, &mut failures));

        Self {
            num_rows: problem.num_rows(),
            bits_only,
            objective,
            status,
            variable,
            failures,
        }
    }

    /// Append one record to every open per-iteration channel.
    pub fn append(&mut self, record: &TraceRecord) {
        let bits_only = self.bits_only;

        if self.objective.is_some() {
            let line = payload(&record.objective, bits_only);
            Self::emit(&mut self.objective, &mut self.failures, &line);
        }

        if self.status.is_some() {
            let line = record
                .status
                .iter()
                .map(|s| s.letter().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            Self::emit(&mut self.status, &mut self.failures, &line);
        }

        if self.variable.is_some() {
            let num_rows = self.num_rows;
            let line = record
                .basis
                .iter()
                .zip(&record.basic_values)
                .map(|(id, value)| {
                    format!("{}={}", id.display_index(num_rows), payload(value, bits_only))
                })
                .collect::<Vec<_>>()
                .join(" ");
            Self::emit(&mut self.variable, &mut self.failures, &line);
        }
    }

    fn emit(
        slot: &mut Option<ChannelWriter>,
        failures: &mut Vec<ChannelFailure>,
        line: &str,
    ) {
        if let Some(w) = slot {
            if let Err(e) = writeln!(w.writer, "{line}") {
                warn!(channel = %w.channel, path = %w.path.display(), "channel write failed: {e}");
                failures.push(ChannelFailure {
                    channel: w.channel,
                    path: w.path.clone(),
                    error: anyhow!(e).context(format!("write {}", w.path.display())),
                });
                *slot = None;
            }
        }
    }

    /// Flush everything and return the per-channel failures (empty on full
    /// success).
    #[must_use]
    pub fn finish(mut self) -> Vec<ChannelFailure> {
        for slot in [&mut self.objective, &mut self.status, &mut self.variable] {
            if let Some(w) = slot {
                if let Err(e) = w.writer.flush() {
                    self.failures.push(ChannelFailure {
                        channel: w.channel,
                        path: w.path.clone(),
                        error: anyhow!(e).context(format!("flush {}", w.path.display())),
                    });
                }
            }
        }
        self.failures
    }
}

/// Write a retained trace through the channels in one go.
#[must_use]
pub fn write_trace_channels(
    trace: &Trace,
    problem: &Problem,
    selection: &ChannelSelection,
    bits_only: bool,
) -> Vec<ChannelFailure> {
    let mut sink = ChannelSink::open(problem, selection, bits_only);
    for record in &trace.records {
        sink.append(record);
    }
    sink.finish()
}

fn write_info(path: &Path, problem: &Problem) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    let info = problem.info();
    writeln!(w, "rows: {}", info.rows)?;
    writeln!(w, "cols: {}", info.cols)?;
    writeln!(w, "nonzeros: {}", info.nonzeros)?;
    writeln!(w, "{NAMES_START}")?;
    for name in problem.variable_names() {
        writeln!(w, "{name}")?;
    }
    writeln!(w, "{NAMES_END}")?;
    w.flush().with_context(|| "flush info channel")?;
    Ok(())
}

/* ---------------- Round-trip readers ---------------- */

fn lines_of(path: &Path) -> Result<impl Iterator<Item = std::io::Result<String>>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(f).lines())
}

/// Read an objective channel back (non-bits-only content).
pub fn read_objective_channel<P: AsRef<Path>>(path: P) -> Result<Vec<BigRational>> {
    let path = path.as_ref();
    let mut out = Vec::new();
    for (i, line) in lines_of(path)?.enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let value = parse_rational(&line)
            .ok_or_else(|| anyhow!("line {}: malformed objective `{line}`", i + 1))?;
        out.push(value);
    }
    Ok(out)
}

/// Read a status channel back into per-iteration status vectors.
pub fn read_status_channel<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<StatusCode>>> {
    let path = path.as_ref();
    let mut out = Vec::new();
    for (i, line) in lines_of(path)?.enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let mut row = Vec::new();
        for tok in line.split_whitespace() {
            let mut chars = tok.chars();
            let status = match (chars.next(), chars.next()) {
                (Some(c), None) => StatusCode::from_letter(c),
                _ => None,
            };
            row.push(status.ok_or_else(|| {
                anyhow!("line {}: unknown status letter `{tok}`", i + 1)
            })?);
        }
        out.push(row);
    }
    Ok(out)
}

/// Read a variable channel back into `(1-based index, value)` pairs per
/// iteration (non-bits-only content).
pub fn read_variable_channel<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<Vec<(usize, BigRational)>>> {
    let path = path.as_ref();
    let mut out = Vec::new();
    for (i, line) in lines_of(path)?.enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let mut row = Vec::new();
        for tok in line.split_whitespace() {
            let (index, value) = tok
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: malformed pair `{tok}`", i + 1))?;
            let index: usize = index
                .parse()
                .with_context(|| format!("line {}: bad index in `{tok}`", i + 1))?;
            let value = parse_rational(value)
                .ok_or_else(|| anyhow!("line {}: malformed value `{tok}`", i + 1))?;
            row.push((index, value));
        }
        out.push(row);
    }
    Ok(out)
}

/// Read an info channel back: counts plus the name list.
pub fn read_info_channel<P: AsRef<Path>>(path: P) -> Result<(ProblemInfo, Vec<String>)> {
    let path = path.as_ref();
    let mut lines = lines_of(path)?;
    let mut take_count = |label: &str| -> Result<usize> {
        let line = lines
            .next()
            .ok_or_else(|| anyhow!("info channel truncated before `{label}`"))?
            .with_context(|| format!("read {}", path.display()))?;
        let rest = line
            .strip_prefix(label)
            .ok_or_else(|| anyhow!("expected `{label}`, got `{line}`"))?;
        rest.trim().parse().with_context(|| format!("bad count in `{line}`"))
    };
    let info = ProblemInfo {
        rows: take_count("rows:")?,
        cols: take_count("cols:")?,
        nonzeros: take_count("nonzeros:")?,
    };

    let mut names = Vec::new();
    match lines.next() {
        None => return Ok((info, names)),
        Some(line) => {
            let line = line.with_context(|| format!("read {}", path.display()))?;
            if line != NAMES_START {
                return Err(anyhow!("expected `{NAMES_START}`, got `{line}`"));
            }
        }
    }
    for line in lines {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line == NAMES_END {
            return Ok((info, names));
        }
        names.push(line);
    }
    Err(anyhow!("info channel ended before `{NAMES_END}`"))
}
