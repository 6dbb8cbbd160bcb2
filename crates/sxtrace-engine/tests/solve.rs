//! End-to-end solves over small models: terminal states, pivot-rule
//! behaviour, and decode consistency of whatever the engine records.

use num::{BigRational, Zero};
use proptest::prelude::*;

use sxtrace_core::decode::decode;
use sxtrace_core::{PivotRule, RecorderConfig, StatusCode, TerminalStatus, Trace, TraceRecorder};
use sxtrace_engine::{solve_with_trace, EngineOptions};
use sxtrace_model::rational::int;
use sxtrace_model::{lp, Bounds, Direction, Problem, VariableId};

fn q(n: i64, d: i64) -> BigRational {
    BigRational::new(n.into(), d.into())
}

fn solve(problem: &Problem, rule: PivotRule, options: &EngineOptions) -> Trace {
    let recorder = TraceRecorder::begin(problem, RecorderConfig::default(), None);
    let outcome = solve_with_trace(problem, rule, options, recorder).unwrap();
    assert!(outcome.channel_failures.is_empty());
    outcome.trace
}

/// `maximize x  s.t.  x + y <= 10, x, y >= 0`.
fn toy() -> Problem {
    let mut p = Problem::new("toy", Direction::Maximize);
    let r = p.add_row("cap", Bounds::upper_only(int(10)));
    let x = p.add_column("x", Bounds::default(), int(1));
    let y = p.add_column("y", Bounds::default(), int(0));
    p.add_coeff(r, x, int(1));
    p.add_coeff(r, y, int(1));
    p
}

#[test]
fn toy_dantzig_reaches_the_documented_terminal_state() {
    let p = toy();
    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Optimal);
    assert_eq!(trace.pivots(), 1);

    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.objective, int(10));
    // Row aux at upper, x basic at 10, y still at its lower bound.
    assert_eq!(sol.values[0].status, StatusCode::NonbasicUpper);
    assert_eq!(sol.values[1].status, StatusCode::Basic);
    assert_eq!(sol.values[1].value, int(10));
    assert_eq!(sol.values[2].status, StatusCode::NonbasicLower);
    assert_eq!(sol.values[2].value, int(0));
}

#[test]
fn every_rule_agrees_on_the_toy_optimum() {
    let p = toy();
    for rule in [
        PivotRule::Dantzig,
        PivotRule::Bland,
        PivotRule::BestImprovement,
        PivotRule::Random { seed: 42 },
    ] {
        let trace = solve(&p, rule, &EngineOptions::default());
        assert_eq!(trace.terminal, TerminalStatus::Optimal, "{rule}");
        let sol = decode(&trace, &p).unwrap();
        assert_eq!(sol.objective, int(10), "{rule}");
    }
}

#[test]
fn already_optimal_model_yields_a_single_record() {
    // minimize x with x >= 0: the initial basis is terminal.
    let mut p = Problem::new("t", Direction::Minimize);
    let r = p.add_row("r", Bounds::lower_only(int(0)));
    let x = p.add_column("x", Bounds::default(), int(1));
    p.add_coeff(r, x, int(1));

    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Optimal);
    assert_eq!(trace.len(), 1);
    assert_eq!(trace.records[0].iteration, 0);

    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.objective, int(0));
    assert_eq!(sol.values[1].value, int(0));
}

#[test]
fn phase_one_lifts_an_infeasible_start() {
    // minimize x + y subject to 2 <= x + y <= 5: the slack basis starts
    // below the row's lower bound.
    let mut p = Problem::new("band", Direction::Minimize);
    let r = p.add_row("band", Bounds::range(int(2), int(5)));
    let x = p.add_column("x", Bounds::default(), int(1));
    let y = p.add_column("y", Bounds::default(), int(1));
    p.add_coeff(r, x, int(1));
    p.add_coeff(r, y, int(1));

    for rule in [PivotRule::Dantzig, PivotRule::Bland, PivotRule::BestImprovement] {
        let trace = solve(&p, rule, &EngineOptions::default());
        assert_eq!(trace.terminal, TerminalStatus::Optimal, "{rule}");
        assert_eq!(decode(&trace, &p).unwrap().objective, int(2), "{rule}");
    }
}

#[test]
fn crossed_row_and_column_bounds_are_infeasible() {
    // x <= 1 as a row, x >= 2 as a column bound.
    let mut p = Problem::new("inf", Direction::Minimize);
    let r = p.add_row("r", Bounds::upper_only(int(1)));
    let x = p.add_column("x", Bounds::lower_only(int(2)), int(0));
    p.add_coeff(r, x, int(1));

    let trace = solve(&p, PivotRule::Bland, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Infeasible);
    // Still a decodable state, not an error.
    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.values[1].value, int(2));
}

#[test]
fn unbounded_direction_is_a_terminal_state() {
    // maximize x + y subject to x - y <= 1.
    let mut p = Problem::new("unb", Direction::Maximize);
    let r = p.add_row("r", Bounds::upper_only(int(1)));
    let x = p.add_column("x", Bounds::default(), int(1));
    let y = p.add_column("y", Bounds::default(), int(1));
    p.add_coeff(r, x, int(1));
    p.add_coeff(r, y, int(-1));

    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Unbounded);
    assert!(decode(&trace, &p).is_ok());
}

#[test]
fn a_bound_flip_is_a_recorded_iteration() {
    // maximize x with x in [0, 5] and a slack row x <= 10: the entering
    // variable hits its own upper bound before the row blocks.
    let mut p = Problem::new("flip", Direction::Maximize);
    let r = p.add_row("r", Bounds::upper_only(int(10)));
    let x = p.add_column("x", Bounds::range(int(0), int(5)), int(1));
    p.add_coeff(r, x, int(1));

    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Optimal);
    assert_eq!(trace.pivots(), 1);

    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.values[1].status, StatusCode::NonbasicUpper);
    assert_eq!(sol.values[1].value, int(5));
    // The basis never changed: the row auxiliary is still basic.
    assert_eq!(trace.records[1].basis, vec![VariableId::Row(0)]);
}

#[test]
fn single_row_single_column_basic_decode() {
    // maximize x subject to x <= 5 (as a row): after the one pivot, x is
    // basic and decodes to its recorded basic value.
    let mut p = Problem::new("one", Direction::Maximize);
    let r = p.add_row("lim", Bounds::upper_only(int(5)));
    let x = p.add_column("x", Bounds::default(), int(1));
    p.add_coeff(r, x, int(1));

    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.pivots(), 1);
    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.values[1].status, StatusCode::Basic);
    assert_eq!(sol.values[1].value, int(5));
    assert_eq!(sol.values[0].status, StatusCode::NonbasicUpper);
}

#[test]
fn fixed_columns_stay_pinned_and_decode_as_fixed() {
    // maximize x + y subject to x + y <= 10, x fixed at 3.
    let mut p = Problem::new("fix", Direction::Maximize);
    let r = p.add_row("cap", Bounds::upper_only(int(10)));
    let x = p.add_column("x", Bounds::fixed(int(3)), int(1));
    let y = p.add_column("y", Bounds::default(), int(1));
    p.add_coeff(r, x, int(1));
    p.add_coeff(r, y, int(1));

    let trace = solve(&p, PivotRule::Bland, &EngineOptions::default());
    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.objective, int(10));
    assert_eq!(sol.values[1].status, StatusCode::NonbasicFixed);
    assert_eq!(sol.values[1].value, int(3));
    assert_eq!(sol.values[2].value, int(7));
}

#[test]
fn free_columns_enter_the_basis_during_setup() {
    // minimize y subject to x + y = 3, y free, x in [0, 10].
    let mut p = Problem::new("free", Direction::Minimize);
    let r = p.add_row("pin", Bounds::fixed(int(3)));
    let x = p.add_column("x", Bounds::range(int(0), int(10)), int(0));
    let y = p.add_column("y", Bounds::free(), int(1));
    p.add_coeff(r, x, int(1));
    p.add_coeff(r, y, int(1));

    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions::default());
    assert_eq!(trace.terminal, TerminalStatus::Optimal);
    // y is basic in every recorded state.
    let ord_y = VariableId::Column(1).ordinal(1);
    for record in &trace.records {
        assert_eq!(record.status[ord_y], StatusCode::Basic);
    }
    let sol = decode(&trace, &p).unwrap();
    assert_eq!(sol.objective, int(-7));
    assert_eq!(sol.values[1].value, int(10));
    assert_eq!(sol.values[2].value, int(-7));
}

const BEALE: &str = "\
Minimize
 obj: - 0.75 x1 + 150 x2 - 0.02 x3 + 6 x4
Subject To
 c1: 0.25 x1 - 60 x2 - 0.04 x3 + 9 x4 <= 0
 c2: 0.5 x1 - 90 x2 - 0.02 x3 + 3 x4 <= 0
 c3: x3 <= 1
End
";

#[test]
fn bland_terminates_on_beales_cycling_example() {
    let p = lp::parse_str(BEALE).unwrap();
    let trace = solve(&p, PivotRule::Bland, &EngineOptions { it_lim: Some(1000), tm_lim: None });
    assert_eq!(trace.terminal, TerminalStatus::Optimal);
    assert!(trace.pivots() < 100, "Bland took {} pivots", trace.pivots());
    assert_eq!(decode(&trace, &p).unwrap().objective, q(-1, 20));
}

#[test]
fn dantzig_on_beale_still_yields_a_decodable_state() {
    // Dantzig has no anti-cycling guarantee; whether it cycles here or not,
    // a capped run must end in a valid, decodable terminal state.
    let p = lp::parse_str(BEALE).unwrap();
    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions { it_lim: Some(30), tm_lim: None });
    assert!(matches!(
        trace.terminal,
        TerminalStatus::Optimal | TerminalStatus::IterationLimit
    ));
    assert!(decode(&trace, &p).is_ok());
}

#[test]
fn random_rule_is_reproducible_per_seed() {
    let p = toy();
    let a = solve(&p, PivotRule::Random { seed: 7 }, &EngineOptions::default());
    let b = solve(&p, PivotRule::Random { seed: 7 }, &EngineOptions::default());
    assert_eq!(a, b);
}

#[test]
fn iteration_limit_stops_with_a_decodable_record() {
    let p = toy();
    let trace = solve(&p, PivotRule::Dantzig, &EngineOptions { it_lim: Some(0), tm_lim: None });
    assert_eq!(trace.terminal, TerminalStatus::IterationLimit);
    assert_eq!(trace.len(), 1);
    let sol = decode(&trace, &p).unwrap();
    // The initial assignment: everything at its starting bound.
    assert_eq!(sol.objective, int(0));
}

#[test]
fn iteration_indices_increase_by_one() {
    let p = lp::parse_str(BEALE).unwrap();
    let trace = solve(&p, PivotRule::Bland, &EngineOptions::default());
    for (i, record) in trace.records.iter().enumerate() {
        assert_eq!(record.iteration, i as u64);
    }
}

/* ---------------- Randomised feasibility property ---------------- */

fn arb_bounds() -> impl Strategy<Value = Bounds> {
    (any::<i8>(), 0u8..6).prop_map(|(lo, span)| {
        let lo = i64::from(lo % 5);
        Bounds::range(int(lo), int(lo + i64::from(span)))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// On every optimally-solved random model, the decoded solution is
    /// primal feasible and the basis equations hold exactly.
    #[test]
    fn bland_optima_are_primal_feasible(
        coeffs in proptest::collection::vec(-3i64..=3, 4),
        obj in proptest::collection::vec(-2i64..=2, 2),
        row_bounds in proptest::collection::vec(arb_bounds(), 2),
        col_bounds in proptest::collection::vec(arb_bounds(), 2),
    ) {
        let mut p = Problem::new("rand", Direction::Minimize);
        for (i, b) in row_bounds.iter().enumerate() {
            p.add_row(format!("r{i}"), b.clone());
        }
        for (j, b) in col_bounds.iter().enumerate() {
            p.add_column(format!("x{j}"), b.clone(), int(obj[j]));
        }
        for (k, &a) in coeffs.iter().enumerate() {
            p.add_coeff(k / 2, k % 2, int(a));
        }

        let trace = solve(&p, PivotRule::Bland, &EngineOptions { it_lim: Some(500), tm_lim: None });
        prop_assert!(trace.terminal != TerminalStatus::IterationLimit, "Bland must terminate");

        if trace.terminal == TerminalStatus::Optimal {
            let sol = decode(&trace, &p).unwrap();
            for value in &sol.values {
                prop_assert!(
                    p.bounds(value.id).contains(&value.value),
                    "{} = {} violates its bounds", value.name, value.value
                );
            }
            // Row auxiliaries must equal A x exactly.
            for i in 0..p.num_rows() {
                let mut lhs = BigRational::zero();
                for j in 0..p.num_cols() {
                    for (r, a) in p.column_coeffs(j) {
                        if *r == i {
                            lhs += a * &sol.values[p.num_rows() + j].value;
                        }
                    }
                }
                prop_assert_eq!(&lhs, &sol.values[i].value, "row {} mismatch", i);
            }
        }
    }
}
