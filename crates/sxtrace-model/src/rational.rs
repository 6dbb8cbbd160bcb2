//! Exact parsing of numeric literals.
//!
//! Model files carry decimals (`2.5`), scientific notation (`1.2e-3`) and,
//! in our own channel files, explicit fractions (`5/2`). All of them parse
//! into [`BigRational`] without ever constructing a float.

use num::bigint::BigInt;
use num::{BigRational, One, Zero};
use num::pow::Pow;

/// Parse a literal into an exact rational.
///
/// Accepted forms: `123`, `-4.75`, `+.5`, `1e6`, `2.5E-3`, `7/3`.
/// Returns `None` on anything else; callers attach line context.
#[must_use]
pub fn parse_rational(text: &str) -> Option<BigRational> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    // Fraction form used by the trace channels.
    if let Some((num, den)) = s.split_once('/') {
        let n: BigInt = num.trim().parse().ok()?;
        let d: BigInt = den.trim().parse().ok()?;
        if d.is_zero() {
            return None;
        }
        return Some(BigRational::new(n, d));
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    if rest.is_empty() {
        return None;
    }

    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(pos) => {
            let exp: i64 = rest[pos + 1..].parse().ok()?;
            // An exponent this large is garbage input, not a model.
            if exp.unsigned_abs() > 10_000 {
                return None;
            }
            (&rest[..pos], exp)
        }
        None => (rest, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let digits: BigInt = format!("{int_part}{frac_part}").parse().ok()?;

    let ten = BigInt::from(10u32);
    let mut value = BigRational::from_integer(digits);
    if !frac_part.is_empty() {
        value /= BigRational::from_integer(ten.clone().pow(frac_part.len() as u32));
    }
    if exponent != 0 {
        let scale = BigRational::from_integer(ten.pow(exponent.unsigned_abs() as u32));
        if exponent > 0 {
            value *= scale;
        } else {
            value /= scale;
        }
    }
    if sign < 0 {
        value = -value;
    }
    Some(value)
}

/// Shorthand for an integer rational.
#[must_use]
pub fn int(value: i64) -> BigRational {
    BigRational::from_integer(value.into())
}

/// The rational one, for places where `One::one()` reads poorly.
#[must_use]
pub fn one() -> BigRational {
    BigRational::one()
}
