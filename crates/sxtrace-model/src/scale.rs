//! RHS-integralizing scaling.
//!
//! Multiplies every constraint row (both bounds and all its coefficients) by
//! the least common multiple of its bound denominators, so that the
//! effective right-hand side is integral before the first pivot. This is a
//! one-time pre-solve transform: the trace and any decoded solution live in
//! the scaled model, and structural variables are unaffected by it.

use num::bigint::BigInt;
use num::{BigRational, Integer, One};

use crate::problem::Problem;

/// Return a copy of `problem` with every row scaled to an integral RHS.
#[must_use]
pub fn scale_to_integral_rhs(problem: &Problem) -> Problem {
    let factors: Vec<BigRational> = problem
        .rows()
        .iter()
        .map(|row| {
            let mut lcm = BigInt::one();
            if let Some(l) = row.bounds.lower() {
                lcm = lcm.lcm(l.denom());
            }
            if let Some(u) = row.bounds.upper() {
                lcm = lcm.lcm(u.denom());
            }
            BigRational::from_integer(lcm)
        })
        .collect();

    let mut scaled = problem.clone();
    scaled.scale_rows(&factors);
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Direction;
    use crate::rational::int;
    use crate::variable::Bounds;
    use num::BigRational;

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn fractional_rhs_becomes_integral() {
        let mut p = Problem::new("t", Direction::Minimize);
        let r0 = p.add_row("half", Bounds::upper_only(q(5, 2)));
        let r1 = p.add_row("third", Bounds::range(q(1, 3), q(7, 6)));
        let x = p.add_column("x", Bounds::default(), int(1));
        p.add_coeff(r0, x, int(1));
        p.add_coeff(r1, x, q(1, 2));

        let s = scale_to_integral_rhs(&p);
        assert_eq!(s.rows()[0].bounds.upper(), Some(&int(5)));
        assert_eq!(s.rows()[1].bounds.lower(), Some(&int(2)));
        assert_eq!(s.rows()[1].bounds.upper(), Some(&int(7)));
        assert_eq!(s.column_coeffs(0), &[(0usize, int(2)), (1usize, int(3))]);
    }

    #[test]
    fn integral_rows_are_untouched() {
        let mut p = Problem::new("t", Direction::Minimize);
        let r = p.add_row("r", Bounds::fixed(int(4)));
        let x = p.add_column("x", Bounds::default(), int(1));
        p.add_coeff(r, x, q(1, 2));
        let s = scale_to_integral_rhs(&p);
        assert_eq!(s, p);
    }
}
