//! Polynomial views over canonical expressions.

use super::expr::{Expr, Function};
use super::rational::Rational;
use std::collections::BTreeMap;

/// Coefficients of `expr` as a polynomial in `var`, lowest degree first.
///
/// Returns `None` when `var` appears other than through non-negative integer
/// powers (inside a function, a root, a denominator, an exponent).
pub fn coefficients(expr: &Expr, var: &str) -> Option<Vec<Expr>> {
    let expanded = expr.expand();
    let terms = match expanded {
        Expr::Add(terms) => terms,
        other => vec![other],
    };

    let mut by_degree: BTreeMap<usize, Vec<Expr>> = BTreeMap::new();
    for term in terms {
        let factors = match term {
            Expr::Mul(factors) => factors,
            other => vec![other],
        };
        let mut degree = 0usize;
        let mut rest = Vec::with_capacity(factors.len());
        for factor in factors {
            match &factor {
                Expr::Symbol(name) if name == var => degree += 1,
                Expr::Pow(base, exponent) if matches!(&**base, Expr::Symbol(n) if n == var) => {
                    let n = exponent.as_number()?.as_integer()?;
                    if n < 0 {
                        return None;
                    }
                    degree += usize::try_from(n).ok()?;
                }
                other if other.contains_symbol(var) => return None,
                _ => rest.push(factor),
            }
        }
        by_degree.entry(degree).or_default().push(Expr::product(rest));
    }

    let max_degree = by_degree.keys().next_back().copied().unwrap_or(0);
    let mut coeffs = vec![Expr::zero(); max_degree + 1];
    for (degree, parts) in by_degree {
        coeffs[degree] = Expr::sum(parts);
    }
    while coeffs.len() > 1 && coeffs.last().map_or(false, Expr::is_zero) {
        coeffs.pop();
    }
    Some(coeffs)
}

/// Numerator of `expr` after bringing every term over a common denominator.
///
/// Only integer powers are cleared; the result is expanded.
pub fn numerator(expr: &Expr) -> Expr {
    let expanded = expr.expand();
    match &expanded {
        Expr::Add(terms) => {
            let mut denominators: BTreeMap<Expr, Rational> = BTreeMap::new();
            for term in terms {
                for (base, power) in denominator_factors(term) {
                    let entry = denominators.entry(base).or_insert(Rational::ZERO);
                    if power > *entry {
                        *entry = power;
                    }
                }
            }
            if denominators.is_empty() {
                return expanded;
            }
            let multiplier: Vec<Expr> = denominators
                .into_iter()
                .map(|(base, power)| Expr::power(base, Expr::Number(power)))
                .collect();
            let scaled: Vec<Expr> = terms
                .iter()
                .map(|term| {
                    let mut parts = multiplier.clone();
                    parts.push(term.clone());
                    Expr::product(parts)
                })
                .collect();
            Expr::sum(scaled).expand()
        }
        Expr::Mul(factors) => Expr::product(
            factors
                .iter()
                .filter(|f| denominator_factors(f).is_empty())
                .cloned()
                .collect(),
        ),
        Expr::Pow(_, exponent) if is_negative_integer(exponent) => Expr::one(),
        _ => expanded,
    }
}

fn is_negative_integer(exponent: &Expr) -> bool {
    exponent
        .as_number()
        .map_or(false, |e| e.is_integer() && e.is_negative())
}

/// `(base, k)` pairs for every `base^(-k)` factor of a term.
fn denominator_factors(term: &Expr) -> Vec<(Expr, Rational)> {
    let factors: &[Expr] = match term {
        Expr::Mul(factors) => factors,
        other => std::slice::from_ref(other),
    };
    factors
        .iter()
        .filter_map(|factor| match factor {
            Expr::Pow(base, exponent) if is_negative_integer(exponent) => exponent
                .as_number()
                .and_then(|e| e.checked_neg())
                .map(|k| ((**base).clone(), k)),
            _ => None,
        })
        .collect()
}

/// Nesting limit for re-splitting numerators of nested sums.
const MAX_SPLIT_DEPTH: usize = 16;

/// Splits an equation `expr = 0` into factors that can vanish independently.
///
/// Numeric constants, factors free of every name in `unknowns`, pure
/// denominators and `exp(..)` factors are dropped since none of them can be
/// zero for generic parameter values. Common monomials in the unknowns are
/// pulled out of sums.
pub fn zero_factors(expr: &Expr, unknowns: &[String]) -> Vec<Expr> {
    let mut out = Vec::new();
    collect_zero_factors(expr, unknowns, 0, &mut out);
    out.sort();
    out.dedup();
    out
}

fn collect_zero_factors(expr: &Expr, unknowns: &[String], depth: usize, out: &mut Vec<Expr>) {
    if !expr.contains_any(unknowns) {
        return;
    }
    if depth > MAX_SPLIT_DEPTH {
        out.push(expr.clone());
        return;
    }
    let depth = depth + 1;
    match expr {
        Expr::Mul(factors) => {
            for factor in factors {
                collect_zero_factors(factor, unknowns, depth, out);
            }
        }
        Expr::Pow(base, exponent) => match exponent.as_number() {
            Some(e) if e.is_positive() => collect_zero_factors(base, unknowns, depth, out),
            Some(_) => {}
            None => out.push(expr.clone()),
        },
        Expr::Call(Function::Exp, _) => {}
        // ln(u) = 0 exactly when u = 1.
        Expr::Call(Function::Ln, arg) => {
            collect_zero_factors(&((**arg).clone() - Expr::one()), unknowns, depth, out)
        }
        Expr::Add(_) => {
            let num = numerator(expr);
            if &num != expr {
                collect_zero_factors(&num, unknowns, depth, out);
                return;
            }
            match pull_common_monomial(expr, unknowns) {
                Some((monomial, rest)) => {
                    for var in monomial {
                        out.push(Expr::Symbol(var));
                    }
                    collect_zero_factors(&rest, unknowns, depth, out);
                }
                None => out.push(expr.clone()),
            }
        }
        _ => out.push(expr.clone()),
    }
}

/// For a sum whose every term carries `v^k` (k >= 1) of some unknown `v`,
/// returns the unknowns pulled out and the remaining quotient.
fn pull_common_monomial(expr: &Expr, unknowns: &[String]) -> Option<(Vec<String>, Expr)> {
    let Expr::Add(terms) = expr else {
        return None;
    };
    let mut pulled = Vec::new();
    let mut divisor = Vec::new();
    for var in unknowns {
        let min_degree = terms.iter().map(|t| monomial_degree(t, var)).min().unwrap_or(0);
        if min_degree > 0 {
            pulled.push(var.clone());
            divisor.push(Expr::power(
                Expr::Symbol(var.clone()),
                Expr::integer(-(min_degree as i128)),
            ));
        }
    }
    if pulled.is_empty() {
        return None;
    }
    let quotient = Expr::sum(
        terms
            .iter()
            .map(|t| {
                let mut parts = divisor.clone();
                parts.push(t.clone());
                Expr::product(parts)
            })
            .collect(),
    );
    Some((pulled, quotient))
}

/// Degree of `var` as a direct factor of a term (0 when absent or non-integral).
fn monomial_degree(term: &Expr, var: &str) -> u32 {
    let factors: &[Expr] = match term {
        Expr::Mul(factors) => factors,
        other => std::slice::from_ref(other),
    };
    factors
        .iter()
        .map(|factor| match factor {
            Expr::Symbol(name) if name == var => 1,
            Expr::Pow(base, exponent) if matches!(&**base, Expr::Symbol(n) if n == var) => exponent
                .as_number()
                .and_then(|e| e.as_integer())
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            _ => 0,
        })
        .sum()
}
