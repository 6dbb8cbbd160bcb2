//! CPLEX-style LP reader.
//!
//! Covers the subset the tracing pipeline needs: an objective section with
//! optional label and constant terms, single-sided / equality / double-sided
//! constraints, a bounds section (including `free` and infinite sides), and
//! integrality sections, which are consumed and ignored; the exact simplex
//! always works on the continuous relaxation. `\` starts a comment.

use std::collections::HashMap;

use num::{BigRational, One, Zero};

use crate::error::ParseError;
use crate::problem::{Direction, Problem};
use crate::rational::parse_rational;
use crate::variable::Bounds;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Tok {
    Word(String),
    Num(String),
    Plus,
    Minus,
    Le,
    Ge,
    Eq,
    Colon,
}

fn syntax(line: usize, msg: impl Into<String>) -> ParseError {
    ParseError::Syntax { line, msg: msg.into() }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '#' | '$' | '%' | '&' | '!')
}

fn lex(src: &str) -> Result<Vec<(Tok, usize)>, ParseError> {
    let mut out = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '\\' => {
                // Comment to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '+' => {
                chars.next();
                out.push((Tok::Plus, line));
            }
            '-' => {
                chars.next();
                out.push((Tok::Minus, line));
            }
            ':' => {
                chars.next();
                out.push((Tok::Colon, line));
            }
            '<' | '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                out.push((if c == '<' { Tok::Le } else { Tok::Ge }, line));
            }
            '=' => {
                chars.next();
                match chars.peek() {
                    Some('<') => {
                        chars.next();
                        out.push((Tok::Le, line));
                    }
                    Some('>') => {
                        chars.next();
                        out.push((Tok::Ge, line));
                    }
                    _ => out.push((Tok::Eq, line)),
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut buf = String::new();
                let mut seen_dot = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || (d == '.' && !seen_dot) {
                        seen_dot |= d == '.';
                        buf.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // A lone dot is not a number; treat it as a word character
                // run (it would have been caught by is_word_char otherwise).
                if buf == "." {
                    return Err(syntax(line, "unexpected `.`"));
                }
                // Optional exponent.
                if matches!(chars.peek(), Some(&'e' | &'E')) {
                    let mut probe = chars.clone();
                    probe.next();
                    let mut exp = String::from("e");
                    if matches!(probe.peek(), Some(&'+' | &'-')) {
                        exp.push(*probe.peek().ok_or_else(|| syntax(line, "bad exponent"))?);
                        probe.next();
                    }
                    if matches!(probe.peek(), Some(d) if d.is_ascii_digit()) {
                        chars.next(); // consume 'e'
                        if exp.len() == 2 {
                            chars.next(); // consume sign
                        }
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                exp.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        buf.push_str(&exp);
                    }
                }
                out.push((Tok::Num(buf), line));
            }
            c if is_word_char(c) => {
                let mut buf = String::new();
                while let Some(&d) = chars.peek() {
                    if is_word_char(d) {
                        buf.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push((Tok::Word(buf), line));
            }
            other => return Err(syntax(line, format!("unexpected character `{other}`"))),
        }
    }
    Ok(out)
}

/// Section keywords, lowercase, dots stripped.
fn section_kind(word: &str) -> Option<Section> {
    let w: String = word.to_ascii_lowercase().replace('.', "");
    match w.as_str() {
        "subject" | "such" | "st" => Some(Section::Constraints),
        "bounds" | "bound" => Some(Section::Bounds),
        "general" | "generals" | "gen" | "integer" | "integers" | "int" | "binary"
        | "binaries" | "bin" => Some(Section::Integrality),
        "end" => Some(Section::End),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Constraints,
    Bounds,
    Integrality,
    End,
}

struct Parser {
    toks: Vec<(Tok, usize)>,
    pos: usize,
    problem: Problem,
    col_index: HashMap<String, usize>,
}

/// A parsed bound-side value: finite rational or an infinite side.
enum BoundValue {
    Finite(BigRational),
    Infinite,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.toks
            .get(self.pos.min(self.toks.len().saturating_sub(1)))
            .map_or(0, |(_, l)| *l)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn at_section(&self) -> Option<Section> {
        match self.peek() {
            Some(Tok::Word(w)) => section_kind(w),
            None => Some(Section::End),
            _ => None,
        }
    }

    fn column(&mut self, name: &str) -> usize {
        if let Some(&j) = self.col_index.get(name) {
            return j;
        }
        let j = self
            .problem
            .add_column(name, Bounds::default(), BigRational::zero());
        self.col_index.insert(name.to_owned(), j);
        j
    }

    /// `Word Colon` lookahead.
    fn take_label(&mut self) -> Option<String> {
        if let (Some((Tok::Word(w), _)), Some((Tok::Colon, _))) =
            (self.toks.get(self.pos), self.toks.get(self.pos + 1))
        {
            if section_kind(w).is_none() {
                let name = w.clone();
                self.pos += 2;
                return Some(name);
            }
        }
        None
    }

    /// Accumulated `+`/`-` prefix; returns the overall sign.
    fn take_sign(&mut self) -> BigRational {
        let mut sign = BigRational::one();
        while let Some(t) = self.peek() {
            match t {
                Tok::Plus => {
                    self.pos += 1;
                }
                Tok::Minus => {
                    sign = -sign;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        sign
    }

    fn parse_number(&mut self, text: &str) -> Result<BigRational, ParseError> {
        parse_rational(text).ok_or_else(|| ParseError::Number {
            line: self.line(),
            text: text.to_owned(),
        })
    }

    /// Signed finite-or-infinite value (`3`, `-2.5`, `+inf`, `-infinity`).
    fn parse_bound_value(&mut self) -> Result<(BigRational, BoundValue), ParseError> {
        let sign = self.take_sign();
        match self.next() {
            Some(Tok::Num(text)) => {
                let v = self.parse_number(&text)?;
                Ok((sign, BoundValue::Finite(v)))
            }
            Some(Tok::Word(w))
                if matches!(w.to_ascii_lowercase().as_str(), "inf" | "infinity") =>
            {
                Ok((sign, BoundValue::Infinite))
            }
            _ => Err(syntax(self.line(), "expected a bound value")),
        }
    }

    /// Linear expression; coefficients land in `terms` (by column index),
    /// constants in the returned rational. Stops at a relational operator or
    /// a section keyword.
    fn parse_expr(
        &mut self,
        terms: &mut HashMap<usize, BigRational>,
    ) -> Result<BigRational, ParseError> {
        let mut constant = BigRational::zero();
        loop {
            if self.at_section().is_some()
                || matches!(self.peek(), Some(Tok::Le | Tok::Ge | Tok::Eq) | None)
            {
                return Ok(constant);
            }
            let sign = self.take_sign();
            match self.next() {
                Some(Tok::Num(text)) => {
                    let value = self.parse_number(&text)?;
                    // `coef var` or a bare constant.
                    match self.peek() {
                        Some(Tok::Word(w)) if section_kind(w).is_none() => {
                            let name = w.clone();
                            self.pos += 1;
                            let j = self.column(&name);
                            *terms.entry(j).or_insert_with(BigRational::zero) +=
                                sign * value;
                        }
                        _ => constant += sign * value,
                    }
                }
                Some(Tok::Word(w)) if section_kind(&w).is_none() => {
                    let j = self.column(&w);
                    *terms.entry(j).or_insert_with(BigRational::zero) += sign;
                }
                _ => return Err(syntax(self.line(), "expected a term")),
            }
        }
    }

    fn parse_objective(&mut self) -> Result<(), ParseError> {
        if let Some(label) = self.take_label() {
            self.problem.set_objective_name(label);
        }
        let mut terms = HashMap::new();
        let constant = self.parse_expr(&mut terms)?;
        if matches!(self.peek(), Some(Tok::Le | Tok::Ge | Tok::Eq)) {
            return Err(syntax(self.line(), "relational operator in the objective"));
        }
        self.problem.set_objective_constant(constant);
        for (j, coeff) in terms {
            self.problem.column_mut(j).objective = coeff;
        }
        Ok(())
    }

    /// Leading `value <=`/`>=` lookahead for double-bounded constraints.
    fn try_leading_bound(&mut self) -> Result<Option<(BoundValue, Tok)>, ParseError> {
        let save = self.pos;
        let sign = self.take_sign();
        let value = match self.next() {
            Some(Tok::Num(text)) => {
                let v = self.parse_number(&text)?;
                BoundValue::Finite(v)
            }
            Some(Tok::Word(w))
                if matches!(w.to_ascii_lowercase().as_str(), "inf" | "infinity") =>
            {
                BoundValue::Infinite
            }
            _ => {
                self.pos = save;
                return Ok(None);
            }
        };
        match self.peek() {
            Some(op @ (Tok::Le | Tok::Ge)) => {
                let op = op.clone();
                self.pos += 1;
                let value = match value {
                    BoundValue::Finite(v) => BoundValue::Finite(apply_sign(&sign, v)),
                    BoundValue::Infinite => BoundValue::Infinite,
                };
                Ok(Some((value, op)))
            }
            _ => {
                self.pos = save;
                Ok(None)
            }
        }
    }

    fn parse_constraint(&mut self) -> Result<(), ParseError> {
        let label = self.take_label();
        let leading = self.try_leading_bound()?;

        let mut terms = HashMap::new();
        let constant = self.parse_expr(&mut terms)?;

        let op = match self.next() {
            Some(op @ (Tok::Le | Tok::Ge | Tok::Eq)) => op,
            _ => return Err(syntax(self.line(), "expected `<=`, `>=` or `=`")),
        };
        let (sign, rhs) = self.parse_bound_value()?;
        let rhs = match rhs {
            BoundValue::Finite(v) => BoundValue::Finite(apply_sign(&sign, v)),
            BoundValue::Infinite => BoundValue::Infinite,
        };

        // `lb <= expr <= ub` (or the fully reversed `ub >= expr >= lb`).
        let mut lower = None;
        let mut upper = None;
        let mut fixed = None;
        match (leading, op) {
            (None, Tok::Le) => upper = finite(rhs),
            (None, Tok::Ge) => lower = finite(rhs),
            (None, Tok::Eq) => fixed = finite(rhs),
            (Some((lead, Tok::Le)), Tok::Le) => {
                lower = finite(lead);
                upper = finite(rhs);
            }
            (Some((lead, Tok::Ge)), Tok::Ge) => {
                upper = finite(lead);
                lower = finite(rhs);
            }
            _ => return Err(syntax(self.line(), "mismatched constraint operators")),
        }

        // Constant terms fold into the bound side: `expr + k op b` ⇒ `expr op b - k`.
        let shift = |v: BigRational| v - constant.clone();
        let bounds = if let Some(b) = fixed {
            Bounds::fixed(shift(b))
        } else {
            match (lower.map(&shift), upper.map(&shift)) {
                (Some(l), Some(u)) => Bounds::range(l, u),
                (Some(l), None) => Bounds::lower_only(l),
                (None, Some(u)) => Bounds::upper_only(u),
                (None, None) => Bounds::free(),
            }
        };

        let index = self.problem.num_rows();
        let name = label.unwrap_or_else(|| format!("r{}", index + 1));
        let row = self.problem.add_row(name, bounds);
        for (j, coeff) in terms {
            self.problem.add_coeff(row, j, coeff);
        }
        Ok(())
    }

    fn parse_bounds_entry(&mut self) -> Result<(), ParseError> {
        // Leading-value form: `v <= x [<= v2]` / `v >= x [>= v2]`.
        if let Some((lead, dir)) = self.try_leading_bound()? {
            let name = match self.next() {
                Some(Tok::Word(w)) if section_kind(&w).is_none() => w,
                _ => return Err(syntax(self.line(), "expected a column name")),
            };
            let j = self.column(&name);
            match dir {
                Tok::Le => self.problem.column_mut(j).bounds.set_lower(finite(lead)),
                _ => self.problem.column_mut(j).bounds.set_upper(finite(lead)),
            }
            if matches!(self.peek(), Some(Tok::Le | Tok::Ge)) {
                let second = match self.next() {
                    Some(t) => t,
                    None => return Err(syntax(self.line(), "expected a bound")),
                };
                let (sign, v) = self.parse_bound_value()?;
                let v = signed_finite(sign, v);
                match second {
                    Tok::Le => self.problem.column_mut(j).bounds.set_upper(v),
                    _ => self.problem.column_mut(j).bounds.set_lower(v),
                }
            }
            return Ok(());
        }

        // `x free` / `x <= v` / `x >= v` / `x = v`.
        let name = match self.next() {
            Some(Tok::Word(w)) if section_kind(&w).is_none() => w,
            _ => return Err(syntax(self.line(), "expected a column name")),
        };
        let j = self.column(&name);
        match self.next() {
            Some(Tok::Word(w)) if w.eq_ignore_ascii_case("free") => {
                self.problem.column_mut(j).bounds = Bounds::free();
            }
            Some(Tok::Le) => {
                let (sign, v) = self.parse_bound_value()?;
                self.problem.column_mut(j).bounds.set_upper(signed_finite(sign, v));
            }
            Some(Tok::Ge) => {
                let (sign, v) = self.parse_bound_value()?;
                self.problem.column_mut(j).bounds.set_lower(signed_finite(sign, v));
            }
            Some(Tok::Eq) => {
                let (sign, v) = self.parse_bound_value()?;
                match signed_finite(sign, v) {
                    Some(v) => self.problem.column_mut(j).bounds = Bounds::fixed(v),
                    None => return Err(syntax(self.line(), "fixed bound cannot be infinite")),
                }
            }
            _ => return Err(syntax(self.line(), "expected a bound for the column")),
        }
        Ok(())
    }
}

fn apply_sign(sign: &BigRational, v: BigRational) -> BigRational {
    if sign < &BigRational::zero() {
        -v
    } else {
        v
    }
}

fn finite(v: BoundValue) -> Option<BigRational> {
    match v {
        BoundValue::Finite(v) => Some(v),
        BoundValue::Infinite => None,
    }
}

fn signed_finite(sign: BigRational, v: BoundValue) -> Option<BigRational> {
    finite(v).map(|v| apply_sign(&sign, v))
}

/// Parse LP text into a [`Problem`].
///
/// # Errors
/// [`ParseError`] with a 1-based line on the first malformed construct.
pub fn parse_str(src: &str) -> Result<Problem, ParseError> {
    let toks = lex(src)?;
    let mut ps = Parser {
        toks,
        pos: 0,
        problem: Problem::new("", Direction::Minimize),
        col_index: HashMap::new(),
    };

    // Objective sense.
    let direction = match ps.next() {
        Some(Tok::Word(w)) => match w.to_ascii_lowercase().as_str() {
            "maximize" | "maximise" | "max" | "maximum" => Direction::Maximize,
            "minimize" | "minimise" | "min" | "minimum" => Direction::Minimize,
            other => return Err(syntax(ps.line(), format!("expected objective sense, got `{other}`"))),
        },
        _ => return Err(syntax(1, "expected objective sense")),
    };
    ps.problem.set_direction(direction);
    ps.parse_objective()?;

    // Constraints header: `subject to` / `such that` / `st` / `s.t.`.
    match ps.next() {
        Some(Tok::Word(w)) if section_kind(&w) == Some(Section::Constraints) => {
            let lowered = w.to_ascii_lowercase();
            if lowered == "subject" || lowered == "such" {
                match ps.next() {
                    Some(Tok::Word(t))
                        if t.eq_ignore_ascii_case("to") || t.eq_ignore_ascii_case("that") => {}
                    _ => return Err(syntax(ps.line(), "expected `to`/`that`")),
                }
            }
        }
        _ => return Err(syntax(ps.line(), "expected the constraints section")),
    }

    while ps.at_section().is_none() {
        ps.parse_constraint()?;
    }

    loop {
        match ps.at_section() {
            Some(Section::Bounds) => {
                ps.pos += 1;
                while ps.at_section().is_none() {
                    ps.parse_bounds_entry()?;
                }
            }
            Some(Section::Integrality) => {
                // Names only; the relaxation is solved either way.
                ps.pos += 1;
                while let Some(Tok::Word(w)) = ps.peek() {
                    if section_kind(w).is_some() {
                        break;
                    }
                    ps.pos += 1;
                }
            }
            Some(Section::End) | None => break,
            Some(Section::Constraints) => {
                return Err(syntax(ps.line(), "duplicate constraints section"))
            }
        }
    }

    Ok(ps.problem)
}
