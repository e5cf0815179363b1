//! Canonical symbolic expressions.
//!
//! Every `Expr` built through the constructors on this type is kept in a
//! canonical form: sums and products are flattened, numeric constants are
//! folded, like terms and like bases are collected, and operands are sorted.
//! Two expressions that canonicalize to the same tree compare equal, which is
//! what the solver relies on for zero tests and de-duplication.

use super::rational::{gcd, split_square, Rational};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Largest trial divisor used when pulling square factors out of a radicand.
const SQUARE_FACTOR_LIMIT: u128 = 10_000;

/// Largest integer exponent `expand` will multiply out.
const MAX_EXPANDED_POWER: i128 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "exp" => Some(Function::Exp),
            "ln" | "log" => Some(Function::Ln),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
            Function::Ln => "ln",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Number(Rational),
    Symbol(String),
    ImaginaryUnit,
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    pub fn zero() -> Self {
        Expr::Number(Rational::ZERO)
    }

    pub fn one() -> Self {
        Expr::Number(Rational::ONE)
    }

    pub fn integer(value: i128) -> Self {
        Expr::Number(Rational::from_integer(value))
    }

    pub fn number(value: Rational) -> Self {
        Expr::Number(value)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Number(r) if r.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Number(r) if r.is_one())
    }

    pub fn as_number(&self) -> Option<Rational> {
        match self {
            Expr::Number(r) => Some(*r),
            _ => None,
        }
    }

    /// Canonical sum of `terms`.
    pub fn sum(terms: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(terms.len());
        for term in terms {
            match term {
                Expr::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        let mut constant = Rational::ZERO;
        let mut collected: BTreeMap<Expr, Rational> = BTreeMap::new();
        let mut unfolded = Vec::new();

        for term in flat {
            let (coeff, rest) = split_coefficient(&term);
            if rest.is_one() {
                match constant.checked_add(coeff) {
                    Some(c) => constant = c,
                    None => unfolded.push(term),
                }
                continue;
            }
            let entry = collected.entry(rest).or_insert(Rational::ZERO);
            match entry.checked_add(coeff) {
                Some(c) => *entry = c,
                None => unfolded.push(term),
            }
        }

        let mut out: Vec<Expr> = collected
            .into_iter()
            .filter(|(_, c)| !c.is_zero())
            .map(|(rest, c)| scale(rest, c))
            .collect();
        if !constant.is_zero() {
            out.push(Expr::Number(constant));
        }
        out.extend(unfolded);
        out.sort();

        match out.len() {
            0 => Expr::zero(),
            1 => out.pop().unwrap_or_else(Expr::zero),
            _ => Expr::Add(out),
        }
    }

    /// Canonical product of `factors`.
    pub fn product(factors: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor {
                Expr::Mul(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        let mut coeff = Rational::ONE;
        let mut unfolded = Vec::new();
        let mut bases: BTreeMap<Expr, Vec<Expr>> = BTreeMap::new();

        for factor in flat {
            match factor {
                Expr::Number(r) => match coeff.checked_mul(r) {
                    Some(c) => coeff = c,
                    None => unfolded.push(Expr::Number(r)),
                },
                Expr::Pow(base, exponent) => bases.entry(*base).or_default().push(*exponent),
                other => bases.entry(other).or_default().push(Expr::one()),
            }
        }

        if coeff.is_zero() {
            return Expr::zero();
        }

        let mut pieces = Vec::with_capacity(bases.len());
        let mut refold = false;
        for (base, exponents) in bases {
            let piece = Expr::power(base, Expr::sum(exponents));
            if matches!(piece, Expr::Number(_) | Expr::Mul(_)) {
                refold = true;
            }
            if !piece.is_one() {
                pieces.push(piece);
            }
        }

        if refold {
            pieces.push(Expr::Number(coeff));
            pieces.extend(unfolded);
            return Expr::product(pieces);
        }

        pieces.extend(unfolded);
        pieces.sort();

        if pieces.is_empty() {
            return Expr::Number(coeff);
        }
        if coeff.is_one() && pieces.len() == 1 {
            return pieces.pop().unwrap_or_else(Expr::one);
        }
        if !coeff.is_one() && pieces.len() == 1 {
            if let Expr::Add(terms) = &pieces[0] {
                return Expr::sum(
                    terms
                        .iter()
                        .map(|t| Expr::product(vec![Expr::Number(coeff), t.clone()]))
                        .collect(),
                );
            }
        }

        let mut out = Vec::with_capacity(pieces.len() + 1);
        if !coeff.is_one() {
            out.push(Expr::Number(coeff));
        }
        out.extend(pieces);
        Expr::Mul(out)
    }

    /// Canonical `base ^ exponent`.
    pub fn power(base: Expr, exponent: Expr) -> Expr {
        if exponent.is_zero() {
            return Expr::one();
        }
        if exponent.is_one() {
            return base;
        }
        if base.is_one() {
            return Expr::one();
        }

        if let Some(e) = exponent.as_number() {
            match &base {
                Expr::Number(b) => {
                    if let Some(folded) = fold_numeric_power(*b, e) {
                        return folded;
                    }
                }
                Expr::ImaginaryUnit if e.is_integer() => {
                    let k = e.numer().rem_euclid(4);
                    return match k {
                        0 => Expr::one(),
                        1 => Expr::ImaginaryUnit,
                        2 => Expr::integer(-1),
                        _ => Expr::Mul(vec![Expr::integer(-1), Expr::ImaginaryUnit]),
                    };
                }
                Expr::Pow(inner_base, inner_exp) if e.is_integer() => {
                    let combined = Expr::product(vec![(**inner_exp).clone(), Expr::Number(e)]);
                    return Expr::power((**inner_base).clone(), combined);
                }
                Expr::Mul(factors) if e.is_integer() => {
                    return Expr::product(
                        factors
                            .iter()
                            .map(|f| Expr::power(f.clone(), Expr::Number(e)))
                            .collect(),
                    );
                }
                // sqrt(s^2 * r) = s * sqrt(r) for the numeric content s^2 > 0.
                Expr::Mul(_) | Expr::Add(_) if e == Rational::HALF => {
                    if let Some(s) = square_content(&base) {
                        if let Some(scale) = s.checked_mul(s).and_then(|sq| sq.recip()) {
                            let reduced = Expr::product(vec![base.clone(), Expr::Number(scale)]);
                            return Expr::product(vec![
                                Expr::Number(s),
                                Expr::power(reduced, exponent),
                            ]);
                        }
                    }
                }
                _ => {}
            }
        }

        Expr::Pow(Box::new(base), Box::new(exponent))
    }

    pub fn call(function: Function, arg: Expr) -> Expr {
        match (function, &arg) {
            (Function::Sin | Function::Tan, a) if a.is_zero() => Expr::zero(),
            (Function::Cos | Function::Exp, a) if a.is_zero() => Expr::one(),
            (Function::Ln, a) if a.is_one() => Expr::zero(),
            (Function::Ln, Expr::Call(Function::Exp, inner)) => (**inner).clone(),
            (Function::Exp, Expr::Call(Function::Ln, inner)) => (**inner).clone(),
            _ => Expr::Call(function, Box::new(arg)),
        }
    }

    pub fn sqrt(self) -> Expr {
        Expr::power(self, Expr::Number(Rational::HALF))
    }

    pub fn recip(self) -> Expr {
        Expr::power(self, Expr::integer(-1))
    }

    /// Rebuilds the tree bottom-up through the canonical constructors.
    pub fn canonical(&self) -> Expr {
        match self {
            Expr::Number(_) | Expr::Symbol(_) | Expr::ImaginaryUnit => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(Expr::canonical).collect()),
            Expr::Mul(factors) => Expr::product(factors.iter().map(Expr::canonical).collect()),
            Expr::Pow(base, exponent) => Expr::power(base.canonical(), exponent.canonical()),
            Expr::Call(f, arg) => Expr::call(*f, arg.canonical()),
        }
    }

    /// Distributes products over sums and multiplies out small integer powers.
    pub fn expand(&self) -> Expr {
        match self {
            Expr::Number(_) | Expr::Symbol(_) | Expr::ImaginaryUnit => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(Expr::expand).collect()),
            Expr::Mul(factors) => {
                let mut acc = vec![Expr::one()];
                for factor in factors {
                    let expanded = factor.expand();
                    let terms = match expanded {
                        Expr::Add(terms) => terms,
                        other => vec![other],
                    };
                    let mut next = Vec::with_capacity(acc.len() * terms.len());
                    for a in &acc {
                        for t in &terms {
                            next.push(Expr::product(vec![a.clone(), t.clone()]));
                        }
                    }
                    acc = next;
                }
                Expr::sum(acc)
            }
            Expr::Pow(base, exponent) => {
                let base = base.expand();
                let exponent = exponent.expand();
                match (&base, exponent.as_number().and_then(|e| e.as_integer())) {
                    (Expr::Add(_), Some(n)) if (2..=MAX_EXPANDED_POWER).contains(&n) => {
                        Expr::Mul(vec![base.clone(); n as usize]).expand()
                    }
                    _ => Expr::power(base, exponent),
                }
            }
            Expr::Call(f, arg) => Expr::call(*f, arg.expand()),
        }
    }

    /// Canonical form, preferring the expanded rendering when it is no larger.
    pub fn simplify(&self) -> Expr {
        let canonical = self.canonical();
        let expanded = canonical.expand();
        if expanded.size() <= canonical.size() {
            expanded
        } else {
            canonical
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Symbol(_) | Expr::ImaginaryUnit => 1,
            Expr::Add(items) | Expr::Mul(items) => 1 + items.iter().map(Expr::size).sum::<usize>(),
            Expr::Pow(base, exponent) => 1 + base.size() + exponent.size(),
            Expr::Call(_, arg) => 1 + arg.size(),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Number(_) | Expr::ImaginaryUnit => {}
            Expr::Add(items) | Expr::Mul(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, exponent) => {
                base.collect_symbols(out);
                exponent.collect_symbols(out);
            }
            Expr::Call(_, arg) => arg.collect_symbols(out),
        }
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        match self {
            Expr::Symbol(s) => s == name,
            Expr::Number(_) | Expr::ImaginaryUnit => false,
            Expr::Add(items) | Expr::Mul(items) => items.iter().any(|i| i.contains_symbol(name)),
            Expr::Pow(base, exponent) => {
                base.contains_symbol(name) || exponent.contains_symbol(name)
            }
            Expr::Call(_, arg) => arg.contains_symbol(name),
        }
    }

    pub fn contains_any(&self, names: &[String]) -> bool {
        names.iter().any(|n| self.contains_symbol(n))
    }

    pub fn contains_imaginary(&self) -> bool {
        match self {
            Expr::ImaginaryUnit => true,
            Expr::Number(_) | Expr::Symbol(_) => false,
            Expr::Add(items) | Expr::Mul(items) => items.iter().any(Expr::contains_imaginary),
            Expr::Pow(base, exponent) => base.contains_imaginary() || exponent.contains_imaginary(),
            Expr::Call(_, arg) => arg.contains_imaginary(),
        }
    }

    /// True when the tree contains a division by an exact zero.
    pub fn is_undefined(&self) -> bool {
        match self {
            Expr::Pow(base, exponent) => {
                let pole = base.is_zero()
                    && exponent.as_number().map_or(false, |e| e.is_negative());
                pole || base.is_undefined() || exponent.is_undefined()
            }
            Expr::Call(Function::Ln, arg) => arg.is_zero() || arg.is_undefined(),
            Expr::Add(items) | Expr::Mul(items) => items.iter().any(Expr::is_undefined),
            Expr::Call(_, arg) => arg.is_undefined(),
            Expr::Number(_) | Expr::Symbol(_) | Expr::ImaginaryUnit => false,
        }
    }
}

/// Splits a canonical term into its numeric coefficient and the remaining factor.
pub(crate) fn split_coefficient(term: &Expr) -> (Rational, Expr) {
    match term {
        Expr::Number(r) => (*r, Expr::one()),
        Expr::Mul(factors) => match factors.first() {
            Some(Expr::Number(r)) => {
                let rest: Vec<Expr> = factors[1..].to_vec();
                let rest = if rest.len() == 1 {
                    rest.into_iter().next().unwrap_or_else(Expr::one)
                } else {
                    Expr::Mul(rest)
                };
                (*r, rest)
            }
            _ => (Rational::ONE, term.clone()),
        },
        other => (Rational::ONE, other.clone()),
    }
}

fn scale(rest: Expr, coeff: Rational) -> Expr {
    if coeff.is_one() {
        return rest;
    }
    match rest {
        Expr::Mul(factors) => {
            let mut out = Vec::with_capacity(factors.len() + 1);
            out.push(Expr::Number(coeff));
            out.extend(factors);
            Expr::Mul(out)
        }
        other => Expr::Mul(vec![Expr::Number(coeff), other]),
    }
}

/// Largest `s` such that the numeric content of `radicand` over `s^2` is a
/// square-free integer, or `None` when that is `s = 1`.
fn square_content(radicand: &Expr) -> Option<Rational> {
    let coeffs: Vec<Rational> = match radicand {
        Expr::Mul(_) => vec![split_coefficient(radicand).0],
        Expr::Add(terms) => terms.iter().map(|t| split_coefficient(t).0).collect(),
        _ => return None,
    };
    let mut numer = 0u128;
    let mut denom = 1u128;
    for c in &coeffs {
        numer = gcd(numer, c.numer().unsigned_abs());
        let d = c.denom() as u128;
        denom = denom.checked_mul(d / gcd(denom, d))?;
    }
    let (outside, _) = split_square(numer.checked_mul(denom)?, SQUARE_FACTOR_LIMIT);
    let content = Rational::new(i128::try_from(outside).ok()?, i128::try_from(denom).ok()?)?;
    (!content.is_one()).then_some(content)
}

fn fold_numeric_power(base: Rational, exponent: Rational) -> Option<Expr> {
    if let Some(n) = exponent.as_integer() {
        let n = i32::try_from(n).ok()?;
        return base.checked_pow(n).map(Expr::Number);
    }
    if exponent.denom() != 2 {
        return None;
    }
    let n = i32::try_from(exponent.numer()).ok()?;
    let radicand = base.checked_pow(n)?;
    if radicand.is_negative() {
        let magnitude = radicand.abs()?;
        return Some(Expr::product(vec![
            Expr::ImaginaryUnit,
            Expr::power(Expr::Number(magnitude), Expr::Number(Rational::HALF)),
        ]));
    }
    if let Some(root) = radicand.sqrt_exact() {
        return Some(Expr::Number(root));
    }

    // sqrt(p/q) = sqrt(p*q)/q, then pull square factors out of p*q.
    let combined = (radicand.numer() as u128).checked_mul(radicand.denom() as u128)?;
    let (outside, inside) = split_square(combined, SQUARE_FACTOR_LIMIT);
    if outside == 1 && radicand.is_integer() {
        return None;
    }
    let coeff = Rational::new(i128::try_from(outside).ok()?, radicand.denom())?;
    let inside = Rational::from_integer(i128::try_from(inside).ok()?);
    Some(Expr::Mul(vec![
        Expr::Number(coeff),
        Expr::Pow(
            Box::new(Expr::Number(inside)),
            Box::new(Expr::Number(Rational::HALF)),
        ),
    ]))
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::sum(vec![self, rhs])
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sum(vec![self, -rhs])
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::product(vec![self, rhs])
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::product(vec![self, rhs.recip()])
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::product(vec![Expr::Number(Rational::MINUS_ONE), self])
    }
}

impl From<i128> for Expr {
    fn from(value: i128) -> Self {
        Expr::integer(value)
    }
}

// --- Display ---

/// Binding strength used to decide where parentheses are needed.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(_) => 1,
        Expr::Mul(_) => 2,
        Expr::Number(r) if r.is_negative() || !r.is_integer() => 2,
        Expr::Pow(_, exponent) if is_reciprocal_like(exponent) => 2,
        Expr::Pow(_, _) => 3,
        _ => 4,
    }
}

fn is_reciprocal_like(exponent: &Expr) -> bool {
    exponent.as_number().map_or(false, |e| e.is_negative())
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if precedence(expr) < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Writes a product given its numeric coefficient and remaining factors.
fn write_product(f: &mut fmt::Formatter<'_>, coeff: Rational, factors: &[Expr]) -> fmt::Result {
    let mut numerator: Vec<Expr> = Vec::new();
    let mut denominator: Vec<Expr> = Vec::new();
    for factor in factors {
        match factor {
            Expr::Pow(base, exponent) if is_reciprocal_like(exponent) => {
                let flipped = exponent
                    .as_number()
                    .and_then(|e| e.checked_neg())
                    .map(Expr::Number)
                    .unwrap_or_else(|| (**exponent).clone());
                denominator.push(Expr::power((**base).clone(), flipped));
            }
            other => numerator.push(other.clone()),
        }
    }

    let num_coeff = coeff.numer();
    let den_coeff = coeff.denom();
    if num_coeff < 0 {
        write!(f, "-")?;
    }
    let abs_num = num_coeff.unsigned_abs();

    let mut wrote = false;
    if abs_num != 1 || numerator.is_empty() {
        write!(f, "{}", abs_num)?;
        wrote = true;
    }
    for factor in &numerator {
        if wrote {
            write!(f, "*")?;
        }
        write_operand(f, factor, 3)?;
        wrote = true;
    }

    let den_count = denominator.len() + usize::from(den_coeff != 1);
    if den_count == 0 {
        return Ok(());
    }
    write!(f, "/")?;
    if den_count > 1 {
        write!(f, "(")?;
    }
    let mut first = true;
    if den_coeff != 1 {
        write!(f, "{}", den_coeff)?;
        first = false;
    }
    for factor in &denominator {
        if !first {
            write!(f, "*")?;
        }
        write_operand(f, factor, 3)?;
        first = false;
    }
    if den_count > 1 {
        write!(f, ")")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(r) => write!(f, "{}", r),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::ImaginaryUnit => write!(f, "I"),
            Expr::Add(terms) => {
                for (idx, term) in terms.iter().enumerate() {
                    let (coeff, _) = split_coefficient(term);
                    if idx == 0 {
                        write_operand(f, term, 1)?;
                    } else if coeff.is_negative() {
                        write!(f, " - ")?;
                        let positive = coeff
                            .checked_neg()
                            .map(|c| Expr::product(vec![Expr::Number(c), split_coefficient(term).1]));
                        match positive {
                            Some(p) => write_operand(f, &p, 2)?,
                            None => write_operand(f, term, 2)?,
                        }
                    } else {
                        write!(f, " + ")?;
                        write_operand(f, term, 2)?;
                    }
                }
                Ok(())
            }
            Expr::Mul(_) => {
                let (coeff, rest) = split_coefficient(self);
                let factors = match rest {
                    Expr::Mul(factors) => factors,
                    other => vec![other],
                };
                write_product(f, coeff, &factors)
            }
            Expr::Pow(base, exponent) => {
                if let Some(e) = exponent.as_number() {
                    if e == Rational::HALF {
                        return write!(f, "sqrt({})", base);
                    }
                    if e.is_negative() {
                        return write_product(f, Rational::ONE, std::slice::from_ref(self));
                    }
                }
                write_operand(f, base, 4)?;
                write!(f, "^")?;
                write_operand(f, exponent, 4)
            }
            Expr::Call(function, arg) => write!(f, "{}({})", function.name(), arg),
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    fn y() -> Expr {
        Expr::symbol("y")
    }

    #[test]
    fn test_like_terms_collect() {
        let e = x() + x() + y() - x();
        assert_eq!(e, x() + y());
        assert!((x() - x()).is_zero());
    }

    #[test]
    fn test_like_bases_collect() {
        let e = x() * x() * y() / x();
        assert_eq!(e, x() * y());
        assert_eq!(x() * x(), Expr::power(x(), Expr::integer(2)));
    }

    #[test]
    fn test_numeric_coefficient_distributes_over_sum() {
        let e = Expr::integer(2) * (x() + Expr::one());
        assert_eq!(e, Expr::integer(2) * x() + Expr::integer(2));
    }

    #[test]
    fn test_square_roots_fold() {
        assert_eq!(Expr::integer(4).sqrt(), Expr::integer(2));
        assert_eq!(Expr::integer(-4).sqrt(), Expr::integer(2) * Expr::ImaginaryUnit);
        let eight = Expr::integer(8).sqrt();
        assert_eq!(eight, Expr::integer(2) * Expr::integer(2).sqrt());
        assert_eq!(Expr::integer(2).sqrt() * Expr::integer(2).sqrt(), Expr::integer(2));
    }

    #[test]
    fn test_square_content_leaves_radical() {
        assert_eq!((Expr::integer(4) * x()).sqrt(), Expr::integer(2) * x().sqrt());
        assert_eq!(parse("sqrt(4*a)/2").unwrap(), parse("sqrt(a)").unwrap());
        assert_eq!(
            parse("sqrt(16 - 4*y^2)").unwrap(),
            Expr::integer(2) * parse("sqrt(4 - y^2)").unwrap()
        );
        assert_eq!(
            parse("sqrt(x/4)").unwrap(),
            Expr::number(Rational::HALF) * x().sqrt()
        );
        let untouched = (Expr::integer(2) * x()).sqrt();
        assert!(matches!(untouched, Expr::Pow(_, _)));
    }

    #[test]
    fn test_imaginary_powers() {
        let i = Expr::ImaginaryUnit;
        assert_eq!(i.clone() * i.clone(), Expr::integer(-1));
        assert_eq!(
            Expr::power(i.clone(), Expr::integer(3)),
            -Expr::ImaginaryUnit
        );
    }

    #[test]
    fn test_expand_binomial() {
        let e = Expr::power(x() + y(), Expr::integer(2)).expand();
        let expected = parse("x^2 + 2*x*y + y^2").unwrap();
        assert_eq!(e, expected);
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        for text in [
            "x - 2*y",
            "x^2 + 3*x*y - 1",
            "a/(2*b) + sqrt(x)",
            "-x*y + sin(x)",
            "(x + 1)^(3/2)",
            "3/4*x",
        ] {
            let e = parse(text).unwrap();
            let again = parse(&e.to_string()).unwrap();
            assert_eq!(e, again, "round trip failed for {} -> {}", text, e);
        }
    }

    #[test]
    fn test_undefined_detection() {
        let e = Expr::power(Expr::zero(), Expr::integer(-1));
        assert!(e.is_undefined());
        assert!(!x().recip().is_undefined());
    }
}
