//! Fixed-precision decimal arithmetic for the grid dimension math.
//!
//! Values are non-negative and carry at most [`PRECISION`] significant
//! digits. Every quotient and product is rounded half-to-even to that
//! precision before it feeds the next operation, the same way a decimal
//! context with 28 digits behaves. The resolved pixel sizes depend on those
//! intermediate roundings, so binary floating point cannot be used here.

use std::cmp::Ordering;

/// Number of significant digits kept after each operation.
pub const PRECISION: u32 = 28;

/// Rounding applied when a value is reduced to fewer digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round to nearest, ties to the even neighbour.
    HalfEven,
    /// Round towards positive infinity.
    Ceiling,
}

/// A non-negative decimal number `coefficient * 10^exponent`.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    coefficient: u128,
    exponent: i32,
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal {
            coefficient: u128::from(value),
            exponent: 0,
        }
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Decimal::from(u64::from(value))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.coefficient == 0 || other.coefficient == 0 {
            return self.coefficient.cmp(&other.coefficient);
        }

        // Compare the position of the leading digit first, then the digits.
        let self_magnitude = digits(self.coefficient) as i64 + self.exponent as i64;
        let other_magnitude = digits(other.coefficient) as i64 + other.exponent as i64;
        if self_magnitude != other_magnitude {
            return self_magnitude.cmp(&other_magnitude);
        }

        let (mut a, mut b) = (self.coefficient, other.coefficient);
        match self.exponent.cmp(&other.exponent) {
            Ordering::Greater => a *= pow10((self.exponent - other.exponent) as u32).unwrap_or(0),
            Ordering::Less => b *= pow10((other.exponent - self.exponent) as u32).unwrap_or(0),
            Ordering::Equal => {}
        }
        a.cmp(&b)
    }
}

impl Decimal {
    /// Build a decimal, rounding it to [`PRECISION`] digits.
    ///
    /// `inexact` marks a non-zero tail below the last digit of
    /// `coefficient` that was already discarded by the caller.
    fn rounded(coefficient: u128, exponent: i32, inexact: bool) -> Self {
        let excess = digits(coefficient).saturating_sub(PRECISION);
        if excess == 0 {
            debug_assert!(!inexact, "a discarded tail needs at least one dropped digit");
            return Decimal {
                coefficient,
                exponent,
            };
        }

        Decimal {
            coefficient: shift_right(coefficient, excess, inexact, Rounding::HalfEven),
            exponent: exponent + excess as i32,
        }
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.coefficient == 0
    }

    /// Divide, rounding the quotient to [`PRECISION`] digits.
    ///
    /// Returns `None` when dividing by zero.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }

        let mut quotient = self.coefficient / rhs.coefficient;
        let mut remainder = self.coefficient % rhs.coefficient;
        let mut exponent = self.exponent - rhs.exponent;

        // Long division, one digit at a time, until there is a guard digit.
        while remainder != 0 && digits(quotient) <= PRECISION {
            remainder *= 10;
            quotient = quotient * 10 + remainder / rhs.coefficient;
            remainder %= rhs.coefficient;
            exponent -= 1;
        }

        Some(Decimal::rounded(quotient, exponent, remainder != 0))
    }

    /// Multiply, rounding the product to [`PRECISION`] digits.
    ///
    /// Returns `None` if the exact product does not fit in 128 bits.
    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        let coefficient = self.coefficient.checked_mul(rhs.coefficient)?;
        Some(Decimal::rounded(
            coefficient,
            self.exponent + rhs.exponent,
            false,
        ))
    }

    /// Round to an integer with the given rounding mode.
    ///
    /// Returns `None` if the result does not fit in 128 bits.
    pub fn to_integral(self, rounding: Rounding) -> Option<u128> {
        if self.exponent >= 0 {
            return self
                .coefficient
                .checked_mul(pow10(self.exponent as u32)?);
        }

        Some(shift_right(
            self.coefficient,
            self.exponent.unsigned_abs(),
            false,
            rounding,
        ))
    }
}

/// Number of decimal digits in `n`; zero has none.
fn digits(n: u128) -> u32 {
    if n == 0 {
        0
    } else {
        n.ilog10() + 1
    }
}

fn pow10(exponent: u32) -> Option<u128> {
    10u128.checked_pow(exponent)
}

/// Drop the lowest `places` digits of `coefficient` and round what is left.
fn shift_right(coefficient: u128, places: u32, inexact: bool, rounding: Rounding) -> u128 {
    if places == 0 {
        return coefficient;
    }

    let Some(divisor) = pow10(places) else {
        // Every digit is dropped and the value is below half a unit.
        return match rounding {
            Rounding::HalfEven => 0,
            Rounding::Ceiling => u128::from(coefficient != 0 || inexact),
        };
    };

    let kept = coefficient / divisor;
    let rest = coefficient % divisor;
    let round_up = match rounding {
        Rounding::HalfEven => match rest.cmp(&(divisor / 2)) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => inexact || kept % 2 == 1,
        },
        Rounding::Ceiling => rest != 0 || inexact,
    };

    kept + u128::from(round_up)
}
