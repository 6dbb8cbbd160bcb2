//! Terminal-state decoding.
//!
//! Reconstructs a primal solution from the trace's last record plus the
//! problem's variable metadata. Pure and deterministic: decoding the same
//! trace twice yields identical solutions, and any mismatch between status
//! and bounds is an error, never a guess.

use num::BigRational;

use sxtrace_model::{Problem, VariableId};

use crate::error::DecodeError;
use crate::record::{StatusCode, TerminalStatus, Trace};

/// One variable's decoded assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionValue {
    /// Which variable.
    pub id: VariableId,
    /// Its name.
    pub name: String,
    /// Status in the terminal record.
    pub status: StatusCode,
    /// Decoded value.
    pub value: BigRational,
}

/// A decoded primal solution, rows then columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    /// How the traced run ended.
    pub terminal: TerminalStatus,
    /// Objective value at the terminal record.
    pub objective: BigRational,
    /// Per-variable assignments in the original row-then-column order.
    pub values: Vec<SolutionValue>,
}

/// Decode the trace's terminal record into a [`Solution`].
///
/// # Errors
/// [`DecodeError`] on an empty trace, shape mismatches, a basic variable
/// missing from the basis, a nonbasic-fixed variable with unequal bounds, a
/// nonbasic variable on an infinite side, or an unknown status code.
pub fn decode(trace: &Trace, problem: &Problem) -> Result<Solution, DecodeError> {
    let record = trace.last().ok_or(DecodeError::EmptyTrace)?;

    let m = problem.num_rows();
    let num_vars = problem.num_variables();
    if record.basis.len() != m {
        return Err(DecodeError::Shape { what: "basis", got: record.basis.len(), expected: m });
    }
    if record.basic_values.len() != m {
        return Err(DecodeError::Shape {
            what: "basic_values",
            got: record.basic_values.len(),
            expected: m,
        });
    }
    if record.status.len() != num_vars {
        return Err(DecodeError::Shape {
            what: "status",
            got: record.status.len(),
            expected: num_vars,
        });
    }

    // Dense ordinal -> basis slot table.
    let mut slot_of = vec![None; num_vars];
    for (slot, id) in record.basis.iter().enumerate() {
        slot_of[id.ordinal(m)] = Some(slot);
    }

    let mut values = Vec::with_capacity(num_vars);
    for id in problem.variable_ids() {
        let ordinal = id.ordinal(m);
        let status = record.status[ordinal];
        let index = ordinal + 1;
        let name = problem.variable_name(id);
        let bounds = problem.bounds(id);
        let missing = || DecodeError::MissingBound { index, name: name.to_owned() };

        let value = match status {
            StatusCode::Basic => match slot_of[ordinal] {
                Some(slot) => record.basic_values[slot].clone(),
                None => {
                    return Err(DecodeError::MissingFromBasis {
                        index,
                        name: name.to_owned(),
                    })
                }
            },
            StatusCode::NonbasicLower => bounds.lower().cloned().ok_or_else(missing)?,
            StatusCode::NonbasicUpper => bounds.upper().cloned().ok_or_else(missing)?,
            StatusCode::NonbasicFixed => {
                match (bounds.lower(), bounds.upper()) {
                    (Some(l), Some(u)) if l == u => l.clone(),
                    _ => {
                        return Err(DecodeError::FixedBoundMismatch {
                            index,
                            name: name.to_owned(),
                        })
                    }
                }
            }
            StatusCode::Unknown => {
                return Err(DecodeError::UnknownStatus { index, name: name.to_owned() })
            }
        };
        values.push(SolutionValue { id, name: name.to_owned(), status, value });
    }

    Ok(Solution {
        terminal: trace.terminal,
        objective: record.objective.clone(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{TraceRecord, TRACE_VERSION};
    use sxtrace_model::rational::int;
    use sxtrace_model::{Bounds, Direction};

    fn toy_problem() -> Problem {
        let mut p = Problem::new("toy", Direction::Maximize);
        let r = p.add_row("cap", Bounds::upper_only(int(10)));
        let x = p.add_column("x", Bounds::default(), int(1));
        let y = p.add_column("y", Bounds::default(), int(0));
        p.add_coeff(r, x, int(1));
        p.add_coeff(r, y, int(1));
        p
    }

    fn terminal_trace(status: Vec<StatusCode>, basis: Vec<VariableId>) -> Trace {
        Trace {
            version: TRACE_VERSION,
            num_rows: 1,
            num_cols: 2,
            records: vec![TraceRecord {
                iteration: 1,
                objective: int(10),
                basis,
                basic_values: vec![int(10)],
                status,
            }],
            terminal: TerminalStatus::Optimal,
        }
    }

    #[test]
    fn decodes_basic_and_bound_statuses() {
        let trace = terminal_trace(
            vec![StatusCode::NonbasicUpper, StatusCode::Basic, StatusCode::NonbasicLower],
            vec![VariableId::Column(0)],
        );
        let sol = decode(&trace, &toy_problem()).unwrap();
        assert_eq!(sol.objective, int(10));
        assert_eq!(sol.values[0].value, int(10)); // row aux at its upper bound
        assert_eq!(sol.values[1].value, int(10)); // x basic
        assert_eq!(sol.values[2].value, int(0)); // y at lower
        assert_eq!(sol.values[1].name, "x");
    }

    #[test]
    fn decode_is_idempotent() {
        let trace = terminal_trace(
            vec![StatusCode::NonbasicUpper, StatusCode::Basic, StatusCode::NonbasicLower],
            vec![VariableId::Column(0)],
        );
        let p = toy_problem();
        assert_eq!(decode(&trace, &p).unwrap(), decode(&trace, &p).unwrap());
    }

    #[test]
    fn basic_but_absent_from_basis_fails() {
        let trace = terminal_trace(
            vec![StatusCode::Basic, StatusCode::Basic, StatusCode::NonbasicLower],
            vec![VariableId::Column(0)],
        );
        assert!(matches!(
            decode(&trace, &toy_problem()),
            Err(DecodeError::MissingFromBasis { index: 1, .. })
        ));
    }

    #[test]
    fn fixed_with_unequal_bounds_fails() {
        let trace = terminal_trace(
            vec![StatusCode::NonbasicUpper, StatusCode::Basic, StatusCode::NonbasicFixed],
            vec![VariableId::Column(0)],
        );
        assert!(matches!(
            decode(&trace, &toy_problem()),
            Err(DecodeError::FixedBoundMismatch { index: 3, .. })
        ));
    }

    #[test]
    fn unknown_status_is_fatal() {
        let trace = terminal_trace(
            vec![StatusCode::NonbasicUpper, StatusCode::Basic, StatusCode::Unknown],
            vec![VariableId::Column(0)],
        );
        assert!(matches!(
            decode(&trace, &toy_problem()),
            Err(DecodeError::UnknownStatus { index: 3, .. })
        ));
    }

    #[test]
    fn empty_trace_fails() {
        let trace = Trace {
            version: TRACE_VERSION,
            num_rows: 1,
            num_cols: 2,
            records: vec![],
            terminal: TerminalStatus::Optimal,
        };
        assert_eq!(decode(&trace, &toy_problem()), Err(DecodeError::EmptyTrace));
    }

    #[test]
    fn nonbasic_on_an_infinite_side_fails() {
        let mut p = toy_problem();
        p.column_mut(1).bounds = Bounds::lower_only(int(0)); // y: no upper bound
        let trace = terminal_trace(
            vec![StatusCode::NonbasicUpper, StatusCode::Basic, StatusCode::NonbasicUpper],
            vec![VariableId::Column(0)],
        );
        assert!(matches!(
            decode(&trace, &p),
            Err(DecodeError::MissingBound { index: 3, .. })
        ));
    }
}
