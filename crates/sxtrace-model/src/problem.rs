//! The immutable problem container.
//!
//! A [`Problem`] is built once by a loader and read everywhere else. The
//! coefficient matrix is stored column-major; row auxiliaries are implied
//! (`x_row = A x_cols`), so the engine's working matrix over all variables
//! is `[I | -A]`.

use num::{BigRational, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::variable::{BoundKind, Bounds, VariableId};

/// Optimization direction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    /// Minimize the objective.
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// A constraint row and the bounds of its auxiliary variable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Row {
    /// Row name (generated when the source file had none).
    pub name: String,
    /// Bounds of the auxiliary variable.
    pub bounds: Bounds,
}

/// A structural column.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Bounds of the structural variable.
    pub bounds: Bounds,
    /// Objective coefficient.
    pub objective: BigRational,
}

/// Dimension and sparsity counts reported by `--info` and the info channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProblemInfo {
    /// Constraint rows.
    pub rows: usize,
    /// Structural columns.
    pub cols: usize,
    /// Stored nonzero coefficients.
    pub nonzeros: usize,
}

/// A loaded linear program.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    name: String,
    direction: Direction,
    objective_name: String,
    objective_constant: BigRational,
    rows: Vec<Row>,
    cols: Vec<Column>,
    /// Per column: `(row index, coefficient)`, coefficients nonzero.
    coeffs: Vec<Vec<(usize, BigRational)>>,
}

impl Problem {
    /// Empty problem shell for the loaders and tests.
    #[must_use]
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            objective_name: "obj".to_owned(),
            objective_constant: BigRational::zero(),
            rows: Vec::new(),
            cols: Vec::new(),
            coeffs: Vec::new(),
        }
    }

    /// Problem name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the problem (loaders only).
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Optimization direction.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Change the optimization direction (loaders only).
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Name of the objective row.
    #[inline]
    #[must_use]
    pub fn objective_name(&self) -> &str {
        &self.objective_name
    }

    /// Rename the objective row (loaders only).
    pub fn set_objective_name(&mut self, name: impl Into<String>) {
        self.objective_name = name.into();
    }

    /// Constant term of the objective.
    #[inline]
    #[must_use]
    pub fn objective_constant(&self) -> &BigRational {
        &self.objective_constant
    }

    /// Set the objective constant (loaders only).
    pub fn set_objective_constant(&mut self, value: BigRational) {
        self.objective_constant = value;
    }

    /// Append a constraint row; returns its index.
    pub fn add_row(&mut self, name: impl Into<String>, bounds: Bounds) -> usize {
        self.rows.push(Row { name: name.into(), bounds });
        self.rows.len() - 1
    }

    /// Append a structural column; returns its index.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        bounds: Bounds,
        objective: BigRational,
    ) -> usize {
        self.cols.push(Column { name: name.into(), bounds, objective });
        self.coeffs.push(Vec::new());
        self.cols.len() - 1
    }

    /// Accumulate `value` into entry `(row, col)`. Repeated entries sum;
    /// entries that cancel to zero are removed.
    pub fn add_coeff(&mut self, row: usize, col: usize, value: BigRational) {
        if value.is_zero() {
            return;
        }
        let entries = &mut self.coeffs[col];
        if let Some(slot) = entries.iter_mut().find(|(r, _)| *r == row) {
            slot.1 += value;
            if slot.1.is_zero() {
                entries.retain(|(_, v)| !v.is_zero());
            }
        } else {
            entries.push((row, value));
        }
    }

    /// Mutable access to a row (loaders: RHS/RANGES passes).
    #[must_use]
    pub fn row_mut(&mut self, index: usize) -> &mut Row {
        &mut self.rows[index]
    }

    /// Mutable access to a column (loaders: BOUNDS pass).
    #[must_use]
    pub fn column_mut(&mut self, index: usize) -> &mut Column {
        &mut self.cols[index]
    }

    /// Constraint rows.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Structural columns.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.cols
    }

    /// Number of constraint rows.
    #[inline]
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of structural columns.
    #[inline]
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    /// Total variable count (auxiliaries + structurals).
    #[inline]
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.rows.len() + self.cols.len()
    }

    /// Stored nonzero coefficient count.
    #[must_use]
    pub fn num_nonzeros(&self) -> usize {
        self.coeffs.iter().map(Vec::len).sum()
    }

    /// Sparse coefficients of column `j` as `(row, value)` pairs.
    #[inline]
    #[must_use]
    pub fn column_coeffs(&self, col: usize) -> &[(usize, BigRational)] {
        &self.coeffs[col]
    }

    /// Bounds of any variable.
    #[must_use]
    pub fn bounds(&self, id: VariableId) -> &Bounds {
        match id {
            VariableId::Row(i) => &self.rows[i].bounds,
            VariableId::Column(j) => &self.cols[j].bounds,
        }
    }

    /// Name of any variable.
    #[must_use]
    pub fn variable_name(&self, id: VariableId) -> &str {
        match id {
            VariableId::Row(i) => &self.rows[i].name,
            VariableId::Column(j) => &self.cols[j].name,
        }
    }

    /// All variable ids, rows before columns.
    pub fn variable_ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        let m = self.num_rows();
        let n = self.num_cols();
        (0..m).map(VariableId::Row).chain((0..n).map(VariableId::Column))
    }

    /// All variable names, rows before columns (the info-channel order).
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(|r| r.name.as_str())
            .chain(self.cols.iter().map(|c| c.name.as_str()))
    }

    /// Dimension counts for `--info` and the info channel.
    #[must_use]
    pub fn info(&self) -> ProblemInfo {
        ProblemInfo {
            rows: self.num_rows(),
            cols: self.num_cols(),
            nonzeros: self.num_nonzeros(),
        }
    }

    /// Multiply each row's bounds and coefficients by a positive factor
    /// (the scaling pass; one entry per row).
    pub fn scale_rows(&mut self, factors: &[BigRational]) {
        for (row, factor) in self.rows.iter_mut().zip(factors) {
            let lower = row.bounds.lower().map(|l| l * factor);
            let upper = row.bounds.upper().map(|u| u * factor);
            row.bounds.set_lower(lower);
            row.bounds.set_upper(upper);
        }
        for entries in &mut self.coeffs {
            for (r, value) in entries.iter_mut() {
                *value *= &factors[*r];
            }
        }
    }

    /// Structural sanity of the loaded model.
    ///
    /// # Errors
    /// Crossed finite bounds, or a free column whose constraint column is
    /// empty (unrepresentable as a nonbasic state; see the decoder's status
    /// vocabulary).
    pub fn validate(&self) -> Result<(), ModelError> {
        for id in self.variable_ids() {
            let bounds = self.bounds(id);
            if bounds.is_crossed() {
                return Err(ModelError::CrossedBounds {
                    name: self.variable_name(id).to_owned(),
                    lower: bounds.lower().map(ToString::to_string).unwrap_or_default(),
                    upper: bounds.upper().map(ToString::to_string).unwrap_or_default(),
                });
            }
        }
        for (j, col) in self.cols.iter().enumerate() {
            if col.bounds.kind() == BoundKind::Free && self.coeffs[j].is_empty() {
                return Err(ModelError::LooseFreeColumn(col.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::int;

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
    fn counts_and_order() {
        let p = toy();
        assert_eq!(p.info(), ProblemInfo { rows: 1, cols: 2, nonzeros: 2 });
        let names: Vec<_> = p.variable_names().collect();
        assert_eq!(names, ["cap", "x", "y"]);
        assert_eq!(p.variable_name(VariableId::Column(1)), "y");
    }

    #[test]
    fn duplicate_coeffs_sum_and_cancel() {
        let mut p = toy();
        p.add_coeff(0, 0, int(2));
        assert_eq!(p.column_coeffs(0), &[(0usize, int(3))]);
        p.add_coeff(0, 0, int(-3));
        assert!(p.column_coeffs(0).is_empty());
        assert_eq!(p.num_nonzeros(), 1);
    }

    #[test]
    fn validate_rejects_loose_free_column() {
        let mut p = toy();
        p.add_column("loose", Bounds::free(), int(0));
        assert!(matches!(
            p.validate(),
            Err(ModelError::LooseFreeColumn(name)) if name == "loose"
        ));
    }

    #[test]
    fn validate_rejects_crossed_bounds() {
        let mut p = toy();
        p.column_mut(0).bounds = Bounds::range(int(4), int(1));
        assert!(matches!(p.validate(), Err(ModelError::CrossedBounds { .. })));
    }
}
