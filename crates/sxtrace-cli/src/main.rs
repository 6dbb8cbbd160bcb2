//! `sxtrace` — solve a linear program with exact arithmetic and trace every
//! pivot into up to four channel files.
//!
//! One configurable driver covers every combination of pivot rule, scaling,
//! bits-only output and channel selection; argument validation happens
//! before any file is touched, so an unknown pivot rule never leaves a
//! partial trace behind.

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sxtrace_core::channels::{ChannelSelection, ChannelSink};
use sxtrace_core::decode::decode;
use sxtrace_core::snapshot::write_trace_auto;
use sxtrace_core::{PivotRule, RecorderConfig, TraceRecorder};
use sxtrace_engine::{solve_with_trace, EngineOptions};
use sxtrace_model::scale::scale_to_integral_rhs;
use sxtrace_model::{load, ModelFormat};

#[derive(Parser, Debug)]
#[command(
    name = "sxtrace",
    about = "Solve a linear program exactly and trace feasible solutions.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Linear programming problem file.
    model_file: PathBuf,

    /// Model file is in LP format (the default).
    #[arg(long, conflicts_with = "mps")]
    lp: bool,

    /// Model file is in MPS format.
    #[arg(long)]
    mps: bool,

    /// Pivoting rule to use.
    #[arg(long, value_enum, required_unless_present = "info")]
    pivot: Option<PivotOpt>,

    /// File where to store problem information and variable names.
    #[arg(long)]
    info_file: Option<PathBuf>,

    /// File where to store the trace of objective values.
    #[arg(long)]
    obj_file: Option<PathBuf>,

    /// File where to store the trace of variable status.
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// File where to store the values of basic variables.
    #[arg(long)]
    var_file: Option<PathBuf>,

    /// Print problem info and exit without solving.
    #[arg(long)]
    info: bool,

    /// Emit fractionality bit counts instead of full rationals.
    #[arg(long)]
    bits_only: bool,

    /// Scale the problem to have integral RHS before solving.
    #[arg(long)]
    scale: bool,

    /// Seed for the random pivot rule.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Pivot limit before the run stops with an iteration-limit state.
    #[arg(long)]
    it_lim: Option<u64>,

    /// Wall-clock limit in milliseconds.
    #[arg(long)]
    tm_lim: Option<u64>,

    /// Write the retained trace as a snapshot (.json or .cbor).
    #[arg(long)]
    trace_out: Option<PathBuf>,

    /// Retain the full record sequence in memory (implied by --trace-out).
    #[arg(long)]
    keep_trace: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum PivotOpt {
    /// Most negative reduced cost.
    Dantzig,
    /// Smallest index (anti-cycling).
    Bland,
    /// Best per-pivot objective improvement.
    Best,
    /// Uniform among eligible candidates (seeded).
    Random,
}

impl PivotOpt {
    fn to_rule(self, seed: u64) -> PivotRule {
        match self {
            Self::Dantzig => PivotRule::Dantzig,
            Self::Bland => PivotRule::Bland,
            Self::Best => PivotRule::BestImprovement,
            Self::Random => PivotRule::Random { seed },
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let format = if cli.mps { ModelFormat::Mps } else { ModelFormat::Lp };
    let problem = load(&cli.model_file, format)
        .with_context(|| format!("loading {}", cli.model_file.display()))?;

    if cli.info {
        let info = problem.info();
        println!("rows: {}", info.rows);
        println!("cols: {}", info.cols);
        println!("nonzeros: {}", info.nonzeros);
        return Ok(());
    }

    let Some(pivot) = cli.pivot else {
        // Unreachable behind clap's required_unless_present, kept as a guard.
        bail!("a pivoting rule is required unless --info is given");
    };
    let rule = pivot.to_rule(cli.seed);

    let problem = if cli.scale {
        scale_to_integral_rhs(&problem)
    } else {
        problem
    };

    let selection = ChannelSelection {
        info: cli.info_file.clone(),
        objective: cli.obj_file.clone(),
        status: cli.status_file.clone(),
        variable: cli.var_file.clone(),
    };
    let requested = [&selection.info, &selection.objective, &selection.status, &selection.variable]
        .iter()
        .filter(|c| c.is_some())
        .count();
    let sink = (requested > 0).then(|| ChannelSink::open(&problem, &selection, cli.bits_only));

    let retain = cli.keep_trace || cli.trace_out.is_some();
    let recorder = TraceRecorder::begin(&problem, RecorderConfig { retain }, sink);
    let options = EngineOptions {
        it_lim: cli.it_lim,
        tm_lim: cli.tm_lim.map(Duration::from_millis),
    };

    let outcome = solve_with_trace(&problem, rule, &options, recorder)
        .with_context(|| format!("tracing {}", cli.model_file.display()))?;

    for failure in &outcome.channel_failures {
        warn!(channel = %failure.channel, path = %failure.path.display(), "channel failed: {:#}", failure.error);
    }

    if let Some(path) = &cli.trace_out {
        write_trace_auto(path, &outcome.trace)
            .with_context(|| format!("writing trace snapshot to {}", path.display()))?;
    }

    let solution = decode(&outcome.trace, &problem).context("decoding terminal state")?;
    println!(
        "{}: {} after {} pivots, objective {}",
        cli.model_file.display(),
        solution.terminal,
        outcome.trace.pivots(),
        solution.objective
    );

    if requested > 0 && outcome.channel_failures.len() >= requested {
        bail!("every requested output channel failed");
    }
    Ok(())
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pivot_names_map_to_rules() {
        assert_eq!(PivotOpt::Dantzig.to_rule(0), PivotRule::Dantzig);
        assert_eq!(PivotOpt::Bland.to_rule(0), PivotRule::Bland);
        assert_eq!(PivotOpt::Best.to_rule(0), PivotRule::BestImprovement);
        assert_eq!(PivotOpt::Random.to_rule(9), PivotRule::Random { seed: 9 });
    }

    #[test]
    fn unknown_pivot_rule_fails_argument_parsing() {
        let res = Cli::try_parse_from(["sxtrace", "model.lp", "--pivot", "fastest"]);
        assert!(res.is_err());
    }

    #[test]
    fn pivot_is_required_unless_info() {
        assert!(Cli::try_parse_from(["sxtrace", "model.lp"]).is_err());
        assert!(Cli::try_parse_from(["sxtrace", "model.lp", "--info"]).is_ok());
        assert!(Cli::try_parse_from(["sxtrace", "model.lp", "--pivot", "bland"]).is_ok());
    }

    #[test]
    fn lp_and_mps_flags_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["sxtrace", "m", "--lp", "--mps", "--pivot", "bland"]).is_err());
    }
}
