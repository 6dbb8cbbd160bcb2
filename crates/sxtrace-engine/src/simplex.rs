//! Bounded-variable primal simplex over exact rationals.
//!
//! The working system is `M z = 0` with `M = [I | -A]`: one auxiliary
//! variable per row, then the structural columns, every variable carrying
//! its own bounds. Phase 1 minimises the sum of bound violations with ±1
//! costs on infeasible basics and switches to the true objective the moment
//! the basis is feasible; maximisation is handled by negating costs
//! internally while every recorded objective value is the model's own.
//!
//! Invariants the trace consumers rely on:
//! - record 0 is the initial basis; each pivot or bound flip appends one
//!   record with the next iteration index;
//! - free variables are basic in every recorded state (free columns are
//!   pivoted in during setup, and a variable without finite bounds can
//!   never be chosen by the ratio test).

use std::time::{Duration, Instant};

use num::{BigRational, One, Signed, Zero};
use rand::{rngs::StdRng, Rng as _, SeedableRng};
use thiserror::Error;
use tracing::debug;

use sxtrace_core::channels::ChannelFailure;
use sxtrace_core::{
    PivotRule, StatusCode, TerminalStatus, Trace, TraceError, TraceRecorder,
};
use sxtrace_model::{BoundKind, Bounds, Direction, Problem, VariableId};

/// Limits passed straight through from the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOptions {
    /// Maximum number of pivots before an `IterationLimit` stop.
    pub it_lim: Option<u64>,
    /// Wall-clock budget before an `IterationLimit` stop.
    pub tm_lim: Option<Duration>,
}

/// What a traced solve hands back.
#[derive(Debug)]
pub struct SolveOutcome {
    /// The sealed trace (terminal state included).
    pub trace: Trace,
    /// Per-channel failures from streaming, if channels were attached.
    pub channel_failures: Vec<ChannelFailure>,
}

/// Engine-level failures. Bad *input* is rejected upstream by model
/// validation; these signal contract breaches.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The recorder refused a record (a bug in this engine, surfaced loudly).
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// No usable starting basis exists for the model.
    #[error("cannot build a starting basis: {0}")]
    Basis(String),

    /// A phase-1 direction lost its ratio bound, which cannot happen for a
    /// consistent system.
    #[error("phase-1 ratio test found no blocking bound")]
    LostRatioBound,
}

/// Which bound a nonbasic variable currently sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
    /// Only during setup; cleared by the free-column pivot-in.
    Free,
}

/// An eligible entering move: `dir = +1` increases the variable off its
/// lower bound, `-1` decreases it off its upper bound.
struct Candidate {
    ordinal: usize,
    dir: i8,
    dj: BigRational,
}

/// What blocked the entering step.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Blocking {
    /// The entering variable hit its own opposite bound.
    Flip,
    /// A basic variable hit a bound and leaves the basis.
    Leave { slot: usize, to_lower: bool },
}

struct Simplex<'a> {
    problem: &'a Problem,
    m: usize,
    n: usize,
    /// Internal (minimisation) cost per ordinal; zero on auxiliaries.
    cost: Vec<BigRational>,
    basis: Vec<usize>,
    slot_of: Vec<Option<usize>>,
    side: Vec<Side>,
    nb_value: Vec<BigRational>,
    binv: Vec<Vec<BigRational>>,
    xb: Vec<BigRational>,
}

impl<'a> Simplex<'a> {
    fn new(problem: &'a Problem) -> Result<Self, EngineError> {
        let m = problem.num_rows();
        let n = problem.num_cols();

        let mut cost = vec![BigRational::zero(); m + n];
        for (j, col) in problem.columns().iter().enumerate() {
            cost[m + j] = match problem.direction() {
                Direction::Minimize => col.objective.clone(),
                Direction::Maximize => -col.objective.clone(),
            };
        }

        let mut side = vec![Side::Lower; m + n];
        let mut nb_value = vec![BigRational::zero(); m + n];
        let mut slot_of = vec![None; m + n];
        let basis: Vec<usize> = (0..m).collect();
        for (slot, &ord) in basis.iter().enumerate() {
            slot_of[ord] = Some(slot);
        }
        for j in 0..n {
            let ord = m + j;
            let bounds = problem.bounds(VariableId::Column(j));
            match (bounds.lower(), bounds.upper()) {
                (Some(l), _) => {
                    side[ord] = Side::Lower;
                    nb_value[ord] = l.clone();
                }
                (None, Some(u)) => {
                    side[ord] = Side::Upper;
                    nb_value[ord] = u.clone();
                }
                (None, None) => side[ord] = Side::Free,
            }
        }

        let mut binv = vec![vec![BigRational::zero(); m]; m];
        for (i, row) in binv.iter_mut().enumerate() {
            row[i] = BigRational::one();
        }

        let mut sx = Self {
            problem,
            m,
            n,
            cost,
            basis,
            slot_of,
            side,
            nb_value,
            binv,
            xb: vec![BigRational::zero(); m],
        };
        sx.install_free_columns()?;
        Ok(sx)
    }

    #[inline]
    fn bounds_ord(&self, ordinal: usize) -> &Bounds {
        self.problem
            .bounds(VariableId::from_ordinal(self.m, ordinal))
    }

    #[inline]
    fn name_ord(&self, ordinal: usize) -> &str {
        self.problem
            .variable_name(VariableId::from_ordinal(self.m, ordinal))
    }

    /// `B⁻¹ · M_col(ordinal)` as a dense column.
    fn tableau_column(&self, ordinal: usize) -> Vec<BigRational> {
        let mut w = vec![BigRational::zero(); self.m];
        if ordinal < self.m {
            for i in 0..self.m {
                w[i] = self.binv[i][ordinal].clone();
            }
        } else {
            for (r, a) in self.problem.column_coeffs(ordinal - self.m) {
                for i in 0..self.m {
                    if !self.binv[i][*r].is_zero() {
                        let delta = &self.binv[i][*r] * a;
                        w[i] -= delta;
                    }
                }
            }
        }
        w
    }

    /// Replace the basic in `slot` by `entering` and update `B⁻¹`.
    fn pivot_binv(&mut self, slot: usize, entering: usize, w: &[BigRational]) {
        let piv = w[slot].clone();
        for value in &mut self.binv[slot] {
            *value /= &piv;
        }
        let pivot_row = self.binv[slot].clone();
        for i in 0..self.m {
            if i == slot || w[i].is_zero() {
                continue;
            }
            for k in 0..self.m {
                if !pivot_row[k].is_zero() {
                    let delta = &w[i] * &pivot_row[k];
                    self.binv[i][k] -= delta;
                }
            }
        }

        let leaving = self.basis[slot];
        self.slot_of[leaving] = None;
        self.basis[slot] = entering;
        self.slot_of[entering] = Some(slot);
    }

    /// Free variables must never be nonbasic in a recorded state: pivot each
    /// free column into the starting basis, parking the displaced auxiliary
    /// at one of its finite bounds.
    fn install_free_columns(&mut self) -> Result<(), EngineError> {
        for j in 0..self.n {
            let ord = self.m + j;
            if self.side[ord] != Side::Free {
                continue;
            }
            let w = self.tableau_column(ord);
            let slot = (0..self.m).find(|&p| {
                !w[p].is_zero() && {
                    let b = self.bounds_ord(self.basis[p]);
                    b.lower().is_some() || b.upper().is_some()
                }
            });
            let Some(p) = slot else {
                return Err(EngineError::Basis(format!(
                    "free column `{}` meets only free rows",
                    self.name_ord(ord)
                )));
            };
            let leaving = self.basis[p];
            let bounds = self.bounds_ord(leaving);
            let lower = bounds.lower().cloned();
            let upper = bounds.upper().cloned();
            if let Some(l) = lower {
                self.side[leaving] = Side::Lower;
                self.nb_value[leaving] = l;
            } else if let Some(u) = upper {
                self.side[leaving] = Side::Upper;
                self.nb_value[leaving] = u;
            }
            self.pivot_binv(p, ord, &w);
        }
        Ok(())
    }

    /// Recompute basic values from the nonbasic assignment.
    fn refresh_basic_values(&mut self) {
        let mut rhs = vec![BigRational::zero(); self.m];
        for v in 0..self.m + self.n {
            if self.slot_of[v].is_some() || self.nb_value[v].is_zero() {
                continue;
            }
            let value = self.nb_value[v].clone();
            if v < self.m {
                rhs[v] -= &value;
            } else {
                for (r, a) in self.problem.column_coeffs(v - self.m) {
                    rhs[*r] += a * &value;
                }
            }
        }
        for i in 0..self.m {
            let mut acc = BigRational::zero();
            for (k, r) in rhs.iter().enumerate() {
                if !r.is_zero() {
                    acc += &self.binv[i][k] * r;
                }
            }
            self.xb[i] = acc;
        }
    }

    /// The model's objective value at the current iterate.
    fn objective(&self) -> BigRational {
        let mut obj = self.problem.objective_constant().clone();
        for (j, col) in self.problem.columns().iter().enumerate() {
            if col.objective.is_zero() {
                continue;
            }
            let ord = self.m + j;
            let value = match self.slot_of[ord] {
                Some(slot) => &self.xb[slot],
                None => &self.nb_value[ord],
            };
            obj += &col.objective * value;
        }
        obj
    }

    /// -1 below its lower bound, +1 above its upper bound, 0 feasible.
    fn violation(&self, slot: usize) -> i8 {
        let bounds = self.bounds_ord(self.basis[slot]);
        if let Some(l) = bounds.lower() {
            if &self.xb[slot] < l {
                return -1;
            }
        }
        if let Some(u) = bounds.upper() {
            if &self.xb[slot] > u {
                return 1;
            }
        }
        0
    }

    /// Dual values for the given basic cost vector.
    fn duals(&self, cb: &[BigRational]) -> Vec<BigRational> {
        (0..self.m)
            .map(|k| {
                let mut acc = BigRational::zero();
                for (i, c) in cb.iter().enumerate() {
                    if !c.is_zero() {
                        acc += c * &self.binv[i][k];
                    }
                }
                acc
            })
            .collect()
    }

    /// `d_v = c_v - yᵀ M_col(v)` with phase-appropriate `c_v`.
    fn reduced_cost(&self, v: usize, y: &[BigRational], phase1: bool) -> BigRational {
        let mut d = if phase1 {
            BigRational::zero()
        } else {
            self.cost[v].clone()
        };
        if v < self.m {
            d -= &y[v];
        } else {
            for (r, a) in self.problem.column_coeffs(v - self.m) {
                d += &y[*r] * a;
            }
        }
        d
    }

    /// Eligible entering moves, in ordinal order.
    fn candidates(&self, y: &[BigRational], phase1: bool) -> Vec<Candidate> {
        let mut out = Vec::new();
        for v in 0..self.m + self.n {
            if self.slot_of[v].is_some() {
                continue;
            }
            if self.bounds_ord(v).kind() == BoundKind::Fixed {
                continue;
            }
            let dj = self.reduced_cost(v, y, phase1);
            match self.side[v] {
                Side::Lower if dj.is_negative() => {
                    out.push(Candidate { ordinal: v, dir: 1, dj });
                }
                Side::Upper if dj.is_positive() => {
                    out.push(Candidate { ordinal: v, dir: -1, dj });
                }
                _ => {}
            }
        }
        out
    }

    /// Largest step `theta >= 0` the entering move can take, and what blocks
    /// it. `None` means no bound blocks (an unbounded direction).
    fn ratio_test(
        &self,
        entering: usize,
        dir: i8,
        w: &[BigRational],
        phase1: bool,
    ) -> Option<(BigRational, Blocking)> {
        // (theta, blocking, tie-break key = blocking variable's ordinal)
        let mut best: Option<(BigRational, Blocking, usize)> = None;
        let mut consider = |theta: BigRational, blocking: Blocking, key: usize| {
            debug_assert!(!theta.is_negative());
            let better = match &best {
                None => true,
                Some((t, _, k)) => theta < *t || (theta == *t && key < *k),
            };
            if better {
                best = Some((theta, blocking, key));
            }
        };

        // The entering variable's own opposite bound.
        let eb = self.bounds_ord(entering);
        if let (Some(l), Some(u)) = (eb.lower(), eb.upper()) {
            consider(u - l, Blocking::Flip, entering);
        }

        for slot in 0..self.m {
            if w[slot].is_zero() {
                continue;
            }
            // Basic value changes at rate `delta` per unit of theta.
            let delta = if dir > 0 {
                -w[slot].clone()
            } else {
                w[slot].clone()
            };
            let x = &self.xb[slot];
            let ordinal = self.basis[slot];
            let bounds = self.bounds_ord(ordinal);
            let viol = if phase1 { self.violation(slot) } else { 0 };

            match viol {
                // Below its lower bound: blocks when it climbs back to it.
                -1 => {
                    if delta.is_positive() {
                        if let Some(l) = bounds.lower() {
                            consider((l - x) / &delta, Blocking::Leave { slot, to_lower: true }, ordinal);
                        }
                    }
                }
                // Above its upper bound: blocks when it descends to it.
                1 => {
                    if delta.is_negative() {
                        if let Some(u) = bounds.upper() {
                            consider((u - x) / &delta, Blocking::Leave { slot, to_lower: false }, ordinal);
                        }
                    }
                }
                // Feasible: must stay between its bounds.
                _ => {
                    if delta.is_positive() {
                        if let Some(u) = bounds.upper() {
                            consider((u - x) / &delta, Blocking::Leave { slot, to_lower: false }, ordinal);
                        }
                    } else if let Some(l) = bounds.lower() {
                        consider((l - x) / &delta, Blocking::Leave { slot, to_lower: true }, ordinal);
                    }
                }
            }
        }

        best.map(|(theta, blocking, _)| (theta, blocking))
    }

    /// Apply a chosen entering move.
    fn apply(&mut self, entering: usize, blocking: Blocking) {
        match blocking {
            Blocking::Flip => {
                let bounds = self.bounds_ord(entering);
                match self.side[entering] {
                    Side::Lower => {
                        if let Some(u) = bounds.upper() {
                            self.nb_value[entering] = u.clone();
                        }
                        self.side[entering] = Side::Upper;
                    }
                    _ => {
                        if let Some(l) = bounds.lower() {
                            self.nb_value[entering] = l.clone();
                        }
                        self.side[entering] = Side::Lower;
                    }
                }
            }
            Blocking::Leave { slot, to_lower } => {
                let leaving = self.basis[slot];
                let bounds = self.bounds_ord(leaving);
                if to_lower {
                    if let Some(l) = bounds.lower() {
                        self.nb_value[leaving] = l.clone();
                    }
                    self.side[leaving] = Side::Lower;
                } else {
                    if let Some(u) = bounds.upper() {
                        self.nb_value[leaving] = u.clone();
                    }
                    self.side[leaving] = Side::Upper;
                }
                let w = self.tableau_column(entering);
                self.pivot_binv(slot, entering, &w);
            }
        }
    }

    fn statuses(&self) -> Result<Vec<StatusCode>, EngineError> {
        (0..self.m + self.n)
            .map(|v| {
                if self.slot_of[v].is_some() {
                    return Ok(StatusCode::Basic);
                }
                if self.bounds_ord(v).kind() == BoundKind::Fixed {
                    return Ok(StatusCode::NonbasicFixed);
                }
                match self.side[v] {
                    Side::Lower => Ok(StatusCode::NonbasicLower),
                    Side::Upper => Ok(StatusCode::NonbasicUpper),
                    Side::Free => Err(EngineError::Basis(format!(
                        "variable `{}` left nonbasic-free",
                        self.name_ord(v)
                    ))),
                }
            })
            .collect()
    }

    fn basis_ids(&self) -> Vec<VariableId> {
        self.basis
            .iter()
            .map(|&ord| VariableId::from_ordinal(self.m, ord))
            .collect()
    }
}

/// Run the traced exact simplex to a terminal state.
///
/// The recorder receives one record per iteration (record 0 = initial
/// basis) and is sealed with the terminal state; the caller gets the trace
/// plus any streaming-channel failures.
///
/// # Errors
/// [`EngineError`] on contract breaches (recorder sequence, degenerate
/// starting basis). Terminal outcomes (optimal, infeasible, unbounded,
/// limit reached) are *states* in the trace, not errors.
pub fn solve_with_trace(
    problem: &Problem,
    rule: PivotRule,
    options: &EngineOptions,
    mut recorder: TraceRecorder,
) -> Result<SolveOutcome, EngineError> {
    let mut sx = Simplex::new(problem)?;
    let mut rng = match rule {
        PivotRule::Random { seed } => Some(StdRng::seed_from_u64(seed)),
        _ => None,
    };
    let started = Instant::now();
    let mut iteration: u64 = 0;

    debug!(
        rows = sx.m,
        cols = sx.n,
        %rule,
        "starting traced solve"
    );

    let terminal = loop {
        sx.refresh_basic_values();
        recorder.record(
            iteration,
            sx.objective(),
            sx.basis_ids(),
            sx.xb.clone(),
            sx.statuses()?,
        )?;

        let phase1 = (0..sx.m).any(|slot| sx.violation(slot) != 0);
        let cb: Vec<BigRational> = (0..sx.m)
            .map(|slot| {
                if phase1 {
                    BigRational::from_integer(i64::from(sx.violation(slot)).into())
                } else {
                    sx.cost[sx.basis[slot]].clone()
                }
            })
            .collect();
        let y = sx.duals(&cb);
        let candidates = sx.candidates(&y, phase1);

        if candidates.is_empty() {
            break if phase1 {
                TerminalStatus::Infeasible
            } else {
                TerminalStatus::Optimal
            };
        }
        if options.it_lim.is_some_and(|limit| iteration >= limit) {
            break TerminalStatus::IterationLimit;
        }
        if options.tm_lim.is_some_and(|limit| started.elapsed() >= limit) {
            break TerminalStatus::IterationLimit;
        }

        let chosen = choose_entering(&sx, &candidates, rule, rng.as_mut(), phase1);
        let entering = candidates[chosen].ordinal;
        let dir = candidates[chosen].dir;
        let w = sx.tableau_column(entering);
        match sx.ratio_test(entering, dir, &w, phase1) {
            Some((_, blocking)) => sx.apply(entering, blocking),
            None if phase1 => return Err(EngineError::LostRatioBound),
            None => break TerminalStatus::Unbounded,
        }

        iteration += 1;
        if iteration % 500 == 0 {
            debug!(iteration, "still pivoting");
        }
    };

    let (trace, channel_failures) = recorder.finish(terminal);
    debug!(%terminal, pivots = trace.pivots(), "solve finished");
    Ok(SolveOutcome { trace, channel_failures })
}

/// Entering-variable selection. Candidates arrive in ordinal order, so
/// Bland is the first one and ties elsewhere break toward smaller ordinals.
fn choose_entering(
    sx: &Simplex<'_>,
    candidates: &[Candidate],
    rule: PivotRule,
    rng: Option<&mut StdRng>,
    phase1: bool,
) -> usize {
    match rule {
        PivotRule::Bland => 0,
        PivotRule::Dantzig => {
            let mut best = 0;
            for (i, c) in candidates.iter().enumerate().skip(1) {
                if c.dj.abs() > candidates[best].dj.abs() {
                    best = i;
                }
            }
            best
        }
        PivotRule::Random { .. } => match rng {
            Some(rng) => rng.random_range(0..candidates.len()),
            None => 0,
        },
        PivotRule::BestImprovement => {
            let mut best = 0;
            let mut best_gain: Option<BigRational> = None;
            for (i, c) in candidates.iter().enumerate() {
                let w = sx.tableau_column(c.ordinal);
                match sx.ratio_test(c.ordinal, c.dir, &w, phase1) {
                    // An unbounded direction dominates every finite gain.
                    None => return i,
                    Some((theta, _)) => {
                        let gain = c.dj.abs() * theta;
                        if best_gain.as_ref().map_or(true, |g| gain > *g) {
                            best_gain = Some(gain);
                            best = i;
                        }
                    }
                }
            }
            best
        }
    }
}
