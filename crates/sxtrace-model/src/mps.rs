//! Free-format MPS reader.
//!
//! Sections: `NAME`, `OBJSENSE`, `ROWS`, `COLUMNS`, `RHS`, `RANGES`,
//! `BOUNDS`, `ENDATA`. The first `N` row is the objective; further `N` rows
//! become free rows. Integrality markers inside `COLUMNS` are skipped; the
//! continuous relaxation is what gets solved. Set-name tokens in `RHS`,
//! `RANGES` and `BOUNDS` are optional; a leading token that names a known
//! row/column is treated as data.

use std::collections::HashMap;

use num::{BigRational, Zero};

use crate::error::{ModelError, ParseError};
use crate::problem::{Direction, Problem};
use crate::rational::parse_rational;
use crate::variable::Bounds;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Name,
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
}

/// Where a row name points: the objective row or a constraint.
#[derive(Clone, Copy)]
enum RowRef {
    Objective,
    Constraint(usize),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RowSense {
    Le,
    Ge,
    Eq,
    Free,
}

struct Reader {
    problem: Problem,
    rows: HashMap<String, RowRef>,
    row_sense: Vec<RowSense>,
    cols: HashMap<String, usize>,
    objective_seen: bool,
}

fn syntax(line: usize, msg: impl Into<String>) -> ParseError {
    ParseError::Syntax { line, msg: msg.into() }
}

fn number(line: usize, text: &str) -> Result<BigRational, ParseError> {
    parse_rational(text).ok_or_else(|| ParseError::Number { line, text: text.to_owned() })
}

impl Reader {
    fn row(&self, line: usize, name: &str) -> Result<RowRef, ParseError> {
        self.rows
            .get(name)
            .copied()
            .ok_or_else(|| syntax(line, ModelError::UnknownRow(name.to_owned()).to_string()))
    }

    fn col(&self, line: usize, name: &str) -> Result<usize, ParseError> {
        self.cols
            .get(name)
            .copied()
            .ok_or_else(|| syntax(line, ModelError::UnknownColumn(name.to_owned()).to_string()))
    }

    fn add_row(&mut self, line: usize, sense: RowSense, name: &str) -> Result<(), ParseError> {
        if self.rows.contains_key(name) {
            return Err(syntax(line, ModelError::DuplicateRow(name.to_owned()).to_string()));
        }
        if sense == RowSense::Free && !self.objective_seen {
            self.objective_seen = true;
            self.rows.insert(name.to_owned(), RowRef::Objective);
            self.problem.set_objective_name(name);
            return Ok(());
        }
        // Default RHS is zero until the RHS section says otherwise.
        let bounds = match sense {
            RowSense::Le => Bounds::upper_only(BigRational::zero()),
            RowSense::Ge => Bounds::lower_only(BigRational::zero()),
            RowSense::Eq => Bounds::fixed(BigRational::zero()),
            RowSense::Free => Bounds::free(),
        };
        let index = self.problem.add_row(name, bounds);
        self.rows.insert(name.to_owned(), RowRef::Constraint(index));
        self.row_sense.push(sense);
        Ok(())
    }

    fn set_rhs(&mut self, line: usize, row: &str, value: BigRational) -> Result<(), ParseError> {
        match self.row(line, row)? {
            RowRef::Objective => {
                // MPS convention: the objective RHS is the negated constant.
                self.problem.set_objective_constant(-value);
            }
            RowRef::Constraint(i) => {
                let bounds = match self.row_sense[i] {
                    RowSense::Le => Bounds::upper_only(value),
                    RowSense::Ge => Bounds::lower_only(value),
                    RowSense::Eq => Bounds::fixed(value),
                    RowSense::Free => Bounds::free(),
                };
                self.problem.row_mut(i).bounds = bounds;
            }
        }
        Ok(())
    }

    fn set_range(&mut self, line: usize, row: &str, range: BigRational) -> Result<(), ParseError> {
        let index = match self.row(line, row)? {
            RowRef::Constraint(i) => i,
            RowRef::Objective => {
                return Err(syntax(line, "RANGES entry on the objective row"))
            }
        };
        let bounds = &self.problem.rows()[index].bounds;
        let magnitude = if range < BigRational::zero() { -range.clone() } else { range.clone() };
        let new = match self.row_sense[index] {
            RowSense::Le => {
                let u = bounds
                    .upper()
                    .cloned()
                    .ok_or_else(|| syntax(line, "RANGES on an unbounded row"))?;
                Bounds::range(u.clone() - magnitude, u)
            }
            RowSense::Ge => {
                let l = bounds
                    .lower()
                    .cloned()
                    .ok_or_else(|| syntax(line, "RANGES on an unbounded row"))?;
                Bounds::range(l.clone(), l + magnitude)
            }
            RowSense::Eq => {
                let b = bounds
                    .lower()
                    .cloned()
                    .ok_or_else(|| syntax(line, "RANGES on an unbounded row"))?;
                if range >= BigRational::zero() {
                    Bounds::range(b.clone(), b + magnitude)
                } else {
                    Bounds::range(b.clone() - magnitude, b)
                }
            }
            RowSense::Free => return Err(syntax(line, "RANGES entry on a free row")),
        };
        self.problem.row_mut(index).bounds = new;
        Ok(())
    }

    fn set_bound(
        &mut self,
        line: usize,
        kind: &str,
        col: &str,
        value: Option<BigRational>,
    ) -> Result<(), ParseError> {
        let j = self.col(line, col)?;
        let need = |v: Option<BigRational>| {
            v.ok_or_else(|| syntax(line, format!("bound `{kind}` needs a value")))
        };
        let bounds = &mut self.problem.column_mut(j).bounds;
        match kind {
            "UP" | "UI" => bounds.set_upper(Some(need(value)?)),
            "LO" | "LI" => bounds.set_lower(Some(need(value)?)),
            "FX" => *bounds = Bounds::fixed(need(value)?),
            "FR" => *bounds = Bounds::free(),
            "MI" => bounds.set_lower(None),
            "PL" => bounds.set_upper(None),
            "BV" => {
                *bounds = Bounds::range(BigRational::zero(), BigRational::from_integer(1.into()));
            }
            other => return Err(syntax(line, format!("unknown bound type `{other}`"))),
        }
        Ok(())
    }
}

/// Parse free-format MPS text into a [`Problem`].
///
/// # Errors
/// [`ParseError`] with the offending 1-based line.
pub fn parse_str(src: &str) -> Result<Problem, ParseError> {
    let mut rd = Reader {
        problem: Problem::new("", Direction::Minimize),
        rows: HashMap::new(),
        row_sense: Vec::new(),
        cols: HashMap::new(),
        objective_seen: false,
    };
    let mut section = Section::None;

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() || raw.starts_with('*') {
            continue;
        }
        let fields: Vec<&str> = raw.split_whitespace().collect();
        let head = fields[0].to_ascii_uppercase();

        // Section headers start in column 1 of the raw line.
        if !raw.starts_with(char::is_whitespace) {
            section = match head.as_str() {
                "NAME" => {
                    if let Some(name) = fields.get(1) {
                        rd.problem.set_name(*name);
                    }
                    Section::Name
                }
                "OBJSENSE" => Section::ObjSense,
                "ROWS" => Section::Rows,
                "COLUMNS" => Section::Columns,
                "RHS" => Section::Rhs,
                "RANGES" => Section::Ranges,
                "BOUNDS" => Section::Bounds,
                "ENDATA" => break,
                other => return Err(syntax(line, format!("unknown section `{other}`"))),
            };
            // OBJSENSE may carry its value on the header line.
            if section == Section::ObjSense {
                if let Some(v) = fields.get(1) {
                    apply_objsense(&mut rd.problem, v);
                }
            }
            continue;
        }

        match section {
            Section::ObjSense => {
                apply_objsense(&mut rd.problem, fields[0]);
            }
            Section::Rows => {
                let sense = match head.as_str() {
                    "L" => RowSense::Le,
                    "G" => RowSense::Ge,
                    "E" => RowSense::Eq,
                    "N" => RowSense::Free,
                    other => return Err(syntax(line, format!("unknown row sense `{other}`"))),
                };
                let name = fields
                    .get(1)
                    .ok_or_else(|| syntax(line, "row line needs a name"))?;
                rd.add_row(line, sense, name)?;
            }
            Section::Columns => {
                // Integrality markers delimit integer columns; the values are
                // read either way, the integrality itself is dropped.
                if fields.iter().any(|f| f.trim_matches('\'') == "MARKER") {
                    continue;
                }
                let col_name = fields[0];
                let j = match rd.cols.get(col_name) {
                    Some(&j) => j,
                    None => {
                        let j = rd.problem.add_column(
                            col_name,
                            Bounds::default(),
                            BigRational::zero(),
                        );
                        rd.cols.insert(col_name.to_owned(), j);
                        j
                    }
                };
                if fields.len() < 3 || fields.len() % 2 == 0 {
                    return Err(syntax(line, "COLUMNS line needs row/value pairs"));
                }
                for pair in fields[1..].chunks(2) {
                    let value = number(line, pair[1])?;
                    match rd.row(line, pair[0])? {
                        RowRef::Objective => rd.problem.column_mut(j).objective = value,
                        RowRef::Constraint(i) => rd.problem.add_coeff(i, j, value),
                    }
                }
            }
            Section::Rhs | Section::Ranges => {
                // The set name is optional; a known row name wins.
                let data = if rd.rows.contains_key(fields[0]) {
                    &fields[..]
                } else {
                    &fields[1..]
                };
                if data.is_empty() || data.len() % 2 != 0 {
                    return Err(syntax(line, "expected row/value pairs"));
                }
                for pair in data.chunks(2) {
                    let value = number(line, pair[1])?;
                    if section == Section::Rhs {
                        rd.set_rhs(line, pair[0], value)?;
                    } else {
                        rd.set_range(line, pair[0], value)?;
                    }
                }
            }
            Section::Bounds => {
                let kind = head.as_str();
                // `<type> [set] <col> [value]`, set name optional.
                let rest = &fields[1..];
                let (col, value) = match rest {
                    [c] => (*c, None),
                    [c, v] if rd.cols.contains_key(*c) => (*c, Some(number(line, v)?)),
                    [_, c] => (*c, None),
                    [_, c, v] => (*c, Some(number(line, v)?)),
                    _ => return Err(syntax(line, "malformed bound line")),
                };
                rd.set_bound(line, kind, col, value)?;
            }
            Section::Name | Section::None => {
                return Err(syntax(line, "data before any section header"))
            }
        }
    }

    if !rd.objective_seen {
        return Err(syntax(0, "no objective (`N`) row"));
    }
    Ok(rd.problem)
}

fn apply_objsense(problem: &mut Problem, token: &str) {
    match token.to_ascii_uppercase().as_str() {
        "MAX" | "MAXIMIZE" => problem.set_direction(Direction::Maximize),
        _ => problem.set_direction(Direction::Minimize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::int;
    use crate::variable::BoundKind;

    const TOY: &str = "\
NAME          toy
ROWS
 N  cost
 L  cap
COLUMNS
    x  cost  1.0  cap  1.0
    y  cap   1.0
RHS
    rhs  cap  10
BOUNDS
ENDATA
";

    #[test]
    fn parses_the_toy_model() {
        let p = parse_str(TOY).unwrap();
        assert_eq!(p.direction(), Direction::Minimize);
        assert_eq!(p.num_rows(), 1);
        assert_eq!(p.num_cols(), 2);
        assert_eq!(p.objective_name(), "cost");
        assert_eq!(p.rows()[0].bounds.upper(), Some(&int(10)));
        assert_eq!(p.columns()[0].objective, int(1));
        assert_eq!(p.num_nonzeros(), 2);
    }

    #[test]
    fn ranges_widen_row_bounds() {
        let src = "\
ROWS
 N obj
 L lim
 G flo
 E pin
COLUMNS
 x obj 1 lim 1
 x flo 1 pin 1
RHS
 r lim 8 flo 2
 r pin 5
RANGES
 r lim 3 flo 4
 r pin -2
ENDATA
";
        let p = parse_str(src).unwrap();
        let lim = &p.rows()[0].bounds;
        assert_eq!((lim.lower(), lim.upper()), (Some(&int(5)), Some(&int(8))));
        let flo = &p.rows()[1].bounds;
        assert_eq!((flo.lower(), flo.upper()), (Some(&int(2)), Some(&int(6))));
        let pin = &p.rows()[2].bounds;
        assert_eq!((pin.lower(), pin.upper()), (Some(&int(3)), Some(&int(5))));
    }

    #[test]
    fn bounds_section_variants() {
        let src = "\
ROWS
 N obj
 G r1
COLUMNS
 a obj 1 r1 1
 b r1 1
 c r1 1
 d r1 1
RHS
 rhs r1 1
BOUNDS
 UP bnd a 4
 MI bnd b
 FX bnd c 2
 FR bnd d
ENDATA
";
        let p = parse_str(src).unwrap();
        assert_eq!(p.columns()[0].bounds.upper(), Some(&int(4)));
        assert_eq!(p.columns()[1].bounds.lower(), None);
        assert_eq!(p.columns()[2].bounds.kind(), BoundKind::Fixed);
        assert_eq!(p.columns()[3].bounds.kind(), BoundKind::Free);
    }

    #[test]
    fn objective_rhs_sets_negated_constant() {
        let src = "\
ROWS
 N obj
 G r1
COLUMNS
 x obj 2 r1 1
RHS
 rhs obj 3 r1 0
ENDATA
";
        let p = parse_str(src).unwrap();
        assert_eq!(p.objective_constant(), &int(-3));
    }

    #[test]
    fn rejects_unknown_rows_and_senses() {
        let src = "\
ROWS
 N obj
COLUMNS
 x ghost 1
ENDATA
";
        assert!(parse_str(src).is_err());
        assert!(parse_str("ROWS\n Q bad\nENDATA\n").is_err());
    }

    #[test]
    fn objsense_switches_direction() {
        let src = "\
OBJSENSE
 MAX
ROWS
 N obj
 L r1
COLUMNS
 x obj 1 r1 1
RHS
 rhs r1 5
ENDATA
";
        assert_eq!(parse_str(src).unwrap().direction(), Direction::Maximize);
    }
}
