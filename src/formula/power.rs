// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Fixed-point `(baseN / baseD) ^ (expN / expD)`.
//!
//! Values carry [`MAX_PRECISION`] fractional bits. The logarithm is taken in
//! base 2 (integer part from the bit length, fraction by repeated squaring),
//! scaled by the exponent ratio, and split back into `2^k * 2^f` where only
//! `2^f` with `f < 1` goes through the exponential series. Every truncation
//! rounds the result down.

use uint::construct_uint;

use super::FormulaError;

construct_uint! {
    /// 512-bit unsigned integer for curve intermediates.
    pub struct U512(8);
}

/// Number of fractional bits in the fixed-point representation.
pub const MAX_PRECISION: usize = 127;

/// `1.0` in fixed point (`1 << 127`).
pub const FIXED_1: U512 = U512([0, 1 << 63, 0, 0, 0, 0, 0, 0]);

/// `2.0` in fixed point (`2 << 127`).
pub const FIXED_2: U512 = U512([0, 0, 1, 0, 0, 0, 0, 0]);

/// `ln(2)` in fixed point, truncated.
const LN2: U512 = U512([0xe4f1_d9cc_01f9_7b57, 0x58b9_0bfb_e8e7_bcd5, 0, 0, 0, 0, 0, 0]);

/// `mantissa / 2^127 * 2^exponent`, with `1 <= mantissa / 2^127 < 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Power {
    pub mantissa: U512,
    pub exponent: usize,
}

impl Power {
    /// `value * self`, truncated.
    pub fn scale(&self, value: u128) -> Result<U512, FormulaError> {
        let product = U512::from(value) * self.mantissa;
        if self.exponent <= MAX_PRECISION {
            return Ok(product >> (MAX_PRECISION - self.exponent));
        }
        let shift = self.exponent - MAX_PRECISION;
        if product.bits() + shift >= 512 {
            return Err(FormulaError::Overflow);
        }
        Ok(product << shift)
    }

    /// `value / self`, rounded up.
    pub fn divide_ceil(&self, value: u128) -> U512 {
        if value == 0 {
            return U512::zero();
        }
        // numerator < 2^255 <= denominator once the exponent reaches 128
        if self.exponent >= 128 {
            return U512::one();
        }
        let numerator = U512::from(value) << MAX_PRECISION;
        let denominator = self.mantissa << self.exponent;
        (numerator + denominator - U512::one()) / denominator
    }
}

/// Compute `(base_n / base_d) ^ (exp_n / exp_d)` for a base of at least one.
pub fn power(base_n: u128, base_d: u128, exp_n: u32, exp_d: u32) -> Result<Power, FormulaError> {
    if base_d == 0 || exp_d == 0 {
        return Err(FormulaError::InvalidInput("zero denominator"));
    }
    if base_n < base_d {
        return Err(FormulaError::InvalidInput("base below one"));
    }

    let base = (U512::from(base_n) << MAX_PRECISION) / U512::from(base_d);
    let log = log2(base) * U512::from(exp_n) / U512::from(exp_d);

    let integer = log >> MAX_PRECISION;
    if integer.bits() > 32 {
        return Err(FormulaError::Overflow);
    }
    let fraction = log & (FIXED_1 - U512::one());

    Ok(Power {
        mantissa: exp2_fraction(fraction),
        exponent: integer.as_usize(),
    })
}

/// `log2(x)` for fixed-point `x >= 1`.
fn log2(mut x: U512) -> U512 {
    let mut res = U512::zero();

    if x >= FIXED_2 {
        let count = (x >> MAX_PRECISION).bits() - 1;
        x = x >> count;
        res = U512::from(count) << MAX_PRECISION;
    }

    if x > FIXED_1 {
        for i in (1..=MAX_PRECISION).rev() {
            // 1 < x < 4
            x = (x * x) >> MAX_PRECISION;
            if x >= FIXED_2 {
                x = x >> 1usize;
                res = res + (U512::one() << (i - 1));
            }
        }
    }

    res
}

/// `2^f` for fixed-point `0 <= f < 1`, as `e^(f * ln2)` by Taylor series.
fn exp2_fraction(fraction: U512) -> U512 {
    let z = (fraction * LN2) >> MAX_PRECISION;
    let mut term = FIXED_1;
    let mut sum = FIXED_1;
    let mut n = 1u64;
    loop {
        term = ((term * z) >> MAX_PRECISION) / U512::from(n);
        if term.is_zero() {
            break;
        }
        sum = sum + term;
        n += 1;
    }
    sum
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_constants() {
        assert_eq!(FIXED_1, U512::one() << MAX_PRECISION);
        assert_eq!(FIXED_2, U512::from(2u8) << MAX_PRECISION);
    }

    #[test]
    fn log2_of_powers_of_two_is_exact() {
        assert_eq!(log2(FIXED_1), U512::zero());
        assert_eq!(log2(FIXED_2), FIXED_1);
        assert_eq!(log2(FIXED_1 << 10usize), U512::from(10u8) << MAX_PRECISION);
    }

    #[test]
    fn exp2_of_zero_is_one() {
        assert_eq!(exp2_fraction(U512::zero()), FIXED_1);
    }

    #[test]
    fn power_of_one_is_one() {
        let p = power(5, 5, 123, 456).expect("test: unit base");
        assert_eq!(p.exponent, 0);
        assert_eq!(p.mantissa, FIXED_1);
    }

    #[test]
    fn square_root_of_four() {
        let p = power(4, 1, 1, 2).expect("test: sqrt(4)");
        // 2^1 * 1.0 within a few ulps of the fixed-point one
        assert_eq!(p.exponent, 1);
        let diff = if p.mantissa > FIXED_1 { p.mantissa - FIXED_1 } else { FIXED_1 - p.mantissa };
        assert!(diff < U512::from(1u64 << 20), "mantissa drift too large: {diff}");
    }

    #[test]
    fn scale_and_divide_agree_on_cube() {
        let p = power(3, 1, 3, 1).expect("test: 3^3");
        let scaled = p.scale(1_000_000).expect("test: scale");
        // 27_000_000 rounded down
        assert!(scaled <= U512::from(27_000_000u64));
        assert!(scaled >= U512::from(26_999_999u64));
        // rounding up keeps the quotient on the reserve's side
        let back = p.divide_ceil(27_000_000);
        assert!(back >= U512::from(1_000_000u64) && back <= U512::from(1_000_001u64));
    }

    #[test]
    fn divide_ceil_saturates_for_huge_powers() {
        let p = power(1_000_000, 1, 1_000_000, 1).expect("test: huge power");
        assert!(p.exponent >= 128);
        assert_eq!(p.divide_ceil(500_000), U512::one());
        assert_eq!(p.divide_ceil(0), U512::zero());
    }

    #[test]
    fn rejects_base_below_one() {
        assert!(matches!(power(1, 2, 1, 1), Err(FormulaError::InvalidInput(_))));
        assert!(matches!(power(1, 0, 1, 1), Err(FormulaError::InvalidInput(_))));
    }
}
