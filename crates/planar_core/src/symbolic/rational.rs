//! Exact rational constants used by the symbolic layer.
//!
//! Values are kept normalized (`den > 0`, `gcd(num, den) == 1`) so structural
//! equality is value equality. All arithmetic is checked; callers decide what
//! to do when an `i128` overflows (the simplifier keeps the node unfolded).

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };
    pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };
    pub const HALF: Rational = Rational { num: 1, den: 2 };

    /// Builds `num / den`, returning `None` for a zero denominator or overflow
    /// while normalizing the sign.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let (mut num, mut den) = (num, den);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        if g > 1 {
            let g = g as i128;
            num /= g;
            den /= g;
        }
        Some(Self { num, den })
    }

    pub fn from_integer(value: i128) -> Self {
        Self { num: value, den: 1 }
    }

    /// Parses a decimal literal such as `12`, `0.25`, `.5` or `1.5e-3` exactly.
    pub fn from_decimal_str(text: &str) -> Option<Self> {
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(idx) => (&text[..idx], text[idx + 1..].parse::<i32>().ok()?),
            None => (text, 0),
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let mut num: i128 = 0;
        for digit in int_part.chars().chain(frac_part.chars()) {
            num = num
                .checked_mul(10)?
                .checked_add(digit.to_digit(10)? as i128)?;
        }
        let scale = exponent - frac_part.len() as i32;
        let ten = Rational::from_integer(10);
        let factor = ten.checked_pow(scale)?;
        Rational::from_integer(num).checked_mul(factor)
    }

    pub fn numer(&self) -> i128 {
        self.num
    }

    pub fn denom(&self) -> i128 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_one(&self) -> bool {
        self.num == 1 && self.den == 1
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn is_positive(&self) -> bool {
        self.num > 0
    }

    pub fn as_integer(&self) -> Option<i128> {
        self.is_integer().then_some(self.num)
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn checked_neg(&self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    pub fn abs(&self) -> Option<Self> {
        if self.num < 0 {
            self.checked_neg()
        } else {
            Some(*self)
        }
    }

    pub fn checked_add(&self, rhs: Rational) -> Option<Self> {
        let g = gcd(self.den.unsigned_abs(), rhs.den.unsigned_abs()) as i128;
        let lhs_scale = rhs.den / g;
        let rhs_scale = self.den / g;
        let num = self
            .num
            .checked_mul(lhs_scale)?
            .checked_add(rhs.num.checked_mul(rhs_scale)?)?;
        let den = self.den.checked_mul(lhs_scale)?;
        Rational::new(num, den)
    }

    pub fn checked_sub(&self, rhs: Rational) -> Option<Self> {
        self.checked_add(rhs.checked_neg()?)
    }

    pub fn checked_mul(&self, rhs: Rational) -> Option<Self> {
        // Cross-reduce first to keep intermediates small.
        let g1 = gcd(self.num.unsigned_abs(), rhs.den.unsigned_abs()).max(1) as i128;
        let g2 = gcd(rhs.num.unsigned_abs(), self.den.unsigned_abs()).max(1) as i128;
        let num = (self.num / g1).checked_mul(rhs.num / g2)?;
        let den = (self.den / g2).checked_mul(rhs.den / g1)?;
        Rational::new(num, den)
    }

    pub fn recip(&self) -> Option<Self> {
        Rational::new(self.den, self.num)
    }

    pub fn checked_div(&self, rhs: Rational) -> Option<Self> {
        self.checked_mul(rhs.recip()?)
    }

    pub fn checked_pow(&self, exponent: i32) -> Option<Self> {
        if exponent < 0 {
            return self.recip()?.checked_pow(exponent.checked_neg()?);
        }
        let mut result = Rational::ONE;
        let mut base = *self;
        let mut remaining = exponent as u32;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Some(result)
    }

    /// Exact square root when both numerator and denominator are perfect squares.
    pub fn sqrt_exact(&self) -> Option<Self> {
        if self.num < 0 {
            return None;
        }
        let n = isqrt(self.num as u128)?;
        let d = isqrt(self.den as u128)?;
        Rational::new(n as i128, d as i128)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal)
                .then(self.num.cmp(&other.num))
                .then(self.den.cmp(&other.den)),
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

pub(crate) fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Integer square root, `None` unless `n` is a perfect square.
fn isqrt(n: u128) -> Option<u128> {
    let mut root = (n as f64).sqrt() as u128;
    while root.checked_mul(root).map_or(true, |sq| sq > n) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).map_or(false, |sq| sq <= n) {
        root += 1;
    }
    (root * root == n).then_some(root)
}

/// Splits `n` into `(s, r)` with `n = s² · r`, pulling out square factors found
/// by trial division below `limit`.
pub(crate) fn split_square(mut n: u128, limit: u128) -> (u128, u128) {
    let mut outside = 1u128;
    let mut p = 2u128;
    while p <= limit && p.saturating_mul(p) <= n {
        let square = p * p;
        while n % square == 0 {
            n /= square;
            outside *= p;
        }
        p += 1;
    }
    (outside, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i128, d: i128) -> Rational {
        Rational::new(n, d).unwrap()
    }

    #[test]
    fn test_normalization() {
        assert_eq!(r(2, 4), r(1, 2));
        assert_eq!(r(3, -6), r(-1, 2));
        assert!(Rational::new(1, 0).is_none());
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(Rational::from_decimal_str("0.1"), Some(r(1, 10)));
        assert_eq!(Rational::from_decimal_str("2.50"), Some(r(5, 2)));
        assert_eq!(Rational::from_decimal_str(".5"), Some(r(1, 2)));
        assert_eq!(Rational::from_decimal_str("1e-3"), Some(r(1, 1000)));
        assert_eq!(Rational::from_decimal_str("1.5E2"), Some(r(150, 1)));
        assert_eq!(Rational::from_decimal_str("."), None);
        assert_eq!(Rational::from_decimal_str("1.2.3"), None);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(r(1, 2).checked_add(r(1, 3)), Some(r(5, 6)));
        assert_eq!(r(1, 2).checked_sub(r(1, 3)), Some(r(1, 6)));
        assert_eq!(r(2, 3).checked_mul(r(9, 4)), Some(r(3, 2)));
        assert_eq!(r(2, 3).checked_div(r(4, 9)), Some(r(3, 2)));
        assert_eq!(r(2, 3).checked_pow(-2), Some(r(9, 4)));
        assert_eq!(Rational::ZERO.recip(), None);
        assert_eq!(Rational::from_integer(i128::MAX).checked_add(Rational::ONE), None);
    }

    #[test]
    fn test_ordering_and_roots() {
        assert!(r(1, 3) < r(1, 2));
        assert!(r(-1, 2) < Rational::ZERO);
        assert_eq!(r(9, 4).sqrt_exact(), Some(r(3, 2)));
        assert_eq!(r(2, 1).sqrt_exact(), None);
        assert_eq!(split_square(72, 1000), (6, 2));
    }
}
