//! Exact solver for systems of polynomial (after clearing denominators)
//! equations with symbolic parameters.
//!
//! The strategy is elimination by cases: pick the equation with the fewest
//! unknowns (then the lowest degree), split it into factors that vanish
//! independently, solve one unknown out of each factor in closed form,
//! substitute into the rest and recurse. A leading coefficient that depends on
//! other unknowns opens a separate case where it vanishes. If a pivot leads
//! outside the solvable class the next one is tried. Every candidate is
//! checked against the original equations.

use super::expr::Expr;
use super::poly::{coefficients, numerator, zero_factors};
use super::rational::{gcd, Rational};
use crate::error::{PlanarError, Result};
use crate::settings::SolverSettings;
use std::collections::{BTreeMap, HashMap};

/// Absolute residual below which a closed numeric residual counts as zero.
const NUMERIC_ZERO: f64 = 1e-9;

/// Nesting limit for elimination and case splits.
const MAX_CASE_DEPTH: usize = 64;

type Assignment = BTreeMap<String, Expr>;

/// Solves `equations[i] = 0` for `unknowns`.
///
/// Returns one coordinate vector per real solution, ordered like `unknowns`.
/// Unknowns left undetermined (continua of solutions) appear as their own
/// symbol. Solutions are simplified, verified and de-duplicated.
pub fn solve_system(
    equations: &[Expr],
    unknowns: &[String],
    settings: &SolverSettings,
) -> Result<Vec<Vec<Expr>>> {
    let assignments = solve_recursive(equations.to_vec(), unknowns.to_vec(), settings, 0)?;

    let mut solutions: Vec<Vec<Expr>> = Vec::new();
    for assignment in assignments {
        let coordinates: Vec<Expr> = unknowns
            .iter()
            .map(|var| {
                assignment
                    .get(var)
                    .cloned()
                    .unwrap_or_else(|| Expr::Symbol(var.clone()))
                    .simplify()
            })
            .collect();

        if coordinates.iter().any(Expr::contains_imaginary) {
            log::info!("Discarding non-real solution {}.", format_point(&coordinates));
            continue;
        }
        if !verify(equations, unknowns, &coordinates) {
            log::info!("Discarding spurious solution {}.", format_point(&coordinates));
            continue;
        }
        solutions.push(coordinates);
    }

    solutions.sort();
    solutions.dedup();
    Ok(solutions)
}

fn format_point(coordinates: &[Expr]) -> String {
    let parts: Vec<String> = coordinates.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}

/// Substitutes a candidate back into every equation.
///
/// When the equations involve only the unknowns, closed candidates are
/// checked numerically against the unsimplified equations so that
/// removable-looking poles (`0 * 1/0`) are still caught. Equations with
/// parameters are checked symbolically.
fn verify(equations: &[Expr], unknowns: &[String], coordinates: &[Expr]) -> bool {
    if coordinates.iter().any(Expr::is_undefined) {
        return false;
    }

    let closed_equations = equations
        .iter()
        .all(|eq| eq.free_symbols().iter().all(|s| unknowns.contains(s)));
    if closed_equations && coordinates.iter().all(|c| c.free_symbols().is_empty()) {
        let mut bindings = HashMap::new();
        for (var, coordinate) in unknowns.iter().zip(coordinates) {
            match coordinate.evaluate(&HashMap::new()) {
                Ok(value) => bindings.insert(var.clone(), value),
                Err(_) => return false,
            };
        }
        return equations.iter().all(|eq| {
            eq.evaluate(&bindings)
                .map_or(false, |value| value.norm() <= NUMERIC_ZERO)
        });
    }

    let bindings: Assignment = unknowns
        .iter()
        .cloned()
        .zip(coordinates.iter().cloned())
        .collect();
    equations.iter().all(|eq| {
        let residual = eq.substitute(&bindings);
        if residual.is_undefined() {
            return false;
        }
        let reduced = numerator(&residual);
        // Residuals that still carry parameters are not provably nonzero.
        reduced.is_zero() || !reduced.free_symbols().is_empty() || is_numerically_zero(&reduced)
    })
}

fn solve_recursive(
    equations: Vec<Expr>,
    unknowns: Vec<String>,
    settings: &SolverSettings,
    depth: usize,
) -> Result<Vec<Assignment>> {
    if depth > MAX_CASE_DEPTH {
        return Err(PlanarError::Unsupported(format!(
            "Case split nesting exceeded {} levels.",
            MAX_CASE_DEPTH
        )));
    }

    let mut pending = Vec::with_capacity(equations.len());
    for eq in equations {
        let reduced = numerator(&eq);
        if reduced.is_zero() {
            continue;
        }
        if !reduced.contains_any(&unknowns) {
            if is_numerically_zero(&reduced) {
                continue;
            }
            // A nonzero constraint on parameters alone has no generic solution.
            return Ok(Vec::new());
        }
        pending.push(reduced);
    }

    if pending.is_empty() {
        return Ok(vec![Assignment::new()]);
    }

    let mut first_error = None;
    for pivot_index in pivot_order(&pending, &unknowns) {
        match solve_with_pivot(pivot_index, &pending, &unknowns, settings, depth) {
            Ok(out) => return Ok(out),
            Err(PlanarError::Unsupported(reason)) => {
                log::debug!("Pivot {} = 0 failed: {}", pending[pivot_index], reason);
                if first_error.is_none() {
                    first_error = Some(PlanarError::Unsupported(reason));
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(first_error.unwrap_or_else(|| {
        PlanarError::Unsupported("No equation could be used for elimination.".to_string())
    }))
}

/// Pivot candidates: fewest unknowns first, then lowest degree in any of them.
fn pivot_order(pending: &[Expr], unknowns: &[String]) -> Vec<usize> {
    let rank = |eq: &Expr| {
        let present: Vec<&String> = unknowns.iter().filter(|u| eq.contains_symbol(u)).collect();
        let degree = present
            .iter()
            .filter_map(|u| coefficients(eq, u))
            .map(|c| c.len().saturating_sub(1))
            .min()
            .unwrap_or(usize::MAX);
        (present.len(), degree)
    };
    let mut order: Vec<usize> = (0..pending.len()).collect();
    order.sort_by_key(|&i| rank(&pending[i]));
    order
}

fn solve_with_pivot(
    pivot_index: usize,
    pending: &[Expr],
    unknowns: &[String],
    settings: &SolverSettings,
    depth: usize,
) -> Result<Vec<Assignment>> {
    let pivot = &pending[pivot_index];
    let others: Vec<Expr> = pending
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pivot_index)
        .map(|(_, eq)| eq.clone())
        .collect();
    let factors = zero_factors(pivot, unknowns);
    if factors.len() > 1 {
        log::debug!("Splitting {} = 0 into {} cases.", pivot, factors.len());
    }

    let mut out = Vec::new();
    for factor in factors {
        let (var, coeffs) = choose_variable(&factor, unknowns).ok_or_else(|| {
            PlanarError::Unsupported(format!(
                "Cannot solve {} = 0 for any of {:?} in closed form.",
                factor, unknowns
            ))
        })?;

        // The roots divide by the leading coefficient; its zeros are a case of their own.
        if let Some((lead, lower)) = coeffs.split_last() {
            if lead.contains_any(unknowns) {
                log::debug!("Splitting off the case {} = 0.", lead);
                let mut degenerate = vec![lead.clone(), polynomial(lower, &var)];
                degenerate.extend(others.iter().cloned());
                out.extend(solve_recursive(degenerate, unknowns.to_vec(), settings, depth + 1)?);
            }
        }

        let roots = univariate_roots(&coeffs, &factor, &var, settings)?;
        let remaining: Vec<String> = unknowns.iter().filter(|u| **u != var).cloned().collect();
        for root in roots {
            let root = root.simplify();
            let substituted: Vec<Expr> = others
                .iter()
                .map(|eq| eq.substitute_one(&var, &root))
                .collect();
            for mut assignment in solve_recursive(substituted, remaining.clone(), settings, depth + 1)? {
                let value = root.substitute(&assignment).simplify();
                assignment.insert(var.clone(), value);
                out.push(assignment);
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// `sum coeffs[k] * var^k`.
fn polynomial(coeffs: &[Expr], var: &str) -> Expr {
    Expr::sum(
        coeffs
            .iter()
            .enumerate()
            .map(|(k, c)| c.clone() * Expr::power(Expr::symbol(var), Expr::integer(k as i128)))
            .collect(),
    )
}

fn is_numerically_zero(expr: &Expr) -> bool {
    if !expr.free_symbols().is_empty() {
        return false;
    }
    expr.evaluate(&HashMap::new())
        .map_or(false, |v| v.norm() <= NUMERIC_ZERO)
}

/// Picks the unknown to eliminate from `factor`: lowest degree first, then a
/// leading coefficient free of the other unknowns, then declaration order.
fn choose_variable(factor: &Expr, unknowns: &[String]) -> Option<(String, Vec<Expr>)> {
    unknowns
        .iter()
        .filter(|var| factor.contains_symbol(var))
        .filter_map(|var| {
            let coeffs = coefficients(factor, var)?;
            let degree = coeffs.len().saturating_sub(1);
            if degree == 0 {
                return None;
            }
            let lead_depends = coeffs.last().map_or(false, |c| c.contains_any(unknowns));
            Some(((degree, lead_depends), var.clone(), coeffs))
        })
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, var, coeffs)| (var, coeffs))
}

/// Real roots of `sum coeffs[k] * var^k = 0`.
fn univariate_roots(
    coeffs: &[Expr],
    factor: &Expr,
    var: &str,
    settings: &SolverSettings,
) -> Result<Vec<Expr>> {
    // Strip roots at the origin.
    let leading_zeros = coeffs.iter().take_while(|c| c.is_zero()).count();
    let mut roots = Vec::new();
    if leading_zeros > 0 {
        roots.push(Expr::zero());
    }
    let reduced = &coeffs[leading_zeros..];

    match reduced.len() {
        0 | 1 => {}
        2 => roots.push(linear_root(&reduced[0], &reduced[1])),
        3 => roots.extend(quadratic_roots(&reduced[0], &reduced[1], &reduced[2])),
        _ => {
            let numeric: Option<Vec<Rational>> = reduced.iter().map(Expr::as_number).collect();
            let numeric = numeric.ok_or_else(|| {
                PlanarError::Unsupported(format!(
                    "Degree {} equation in '{}' with symbolic coefficients: {} = 0.",
                    reduced.len() - 1,
                    var,
                    factor
                ))
            })?;
            let (found, rest) = rational_roots(numeric, settings.max_rational_root_bound)?;
            roots.extend(found.into_iter().map(Expr::Number));
            let rest: Vec<Expr> = rest.into_iter().map(Expr::Number).collect();
            match rest.len() {
                0 | 1 => {}
                2 => roots.push(linear_root(&rest[0], &rest[1])),
                3 => roots.extend(quadratic_roots(&rest[0], &rest[1], &rest[2])),
                n => {
                    return Err(PlanarError::Unsupported(format!(
                        "Degree {} factor without rational roots in '{}': {} = 0.",
                        n - 1,
                        var,
                        factor
                    )))
                }
            }
        }
    }
    Ok(roots)
}

fn linear_root(c0: &Expr, c1: &Expr) -> Expr {
    -(c0.clone() / c1.clone())
}

fn quadratic_roots(c: &Expr, b: &Expr, a: &Expr) -> Vec<Expr> {
    let discriminant =
        (b.clone() * b.clone() - Expr::integer(4) * a.clone() * c.clone()).simplify();
    let two_a = Expr::integer(2) * a.clone();
    if let Some(d) = discriminant.as_number() {
        if d.is_negative() {
            log::info!(
                "Discarding complex roots of {}*v^2 + {}*v + {} (discriminant {}).",
                a,
                b,
                c,
                d
            );
            return Vec::new();
        }
        if d.is_zero() {
            return vec![-(b.clone() / two_a)];
        }
    }
    let root = discriminant.sqrt();
    vec![
        (-b.clone() + root.clone()) / two_a.clone(),
        (-b.clone() - root) / two_a,
    ]
}

/// Rational roots by the rational root theorem, deflating after each hit.
/// Returns the roots found and the remaining cofactor (lowest degree first).
fn rational_roots(mut coeffs: Vec<Rational>, bound: i128) -> Result<(Vec<Rational>, Vec<Rational>)> {
    let overflow = || PlanarError::Unsupported("Coefficient overflow in root search.".to_string());
    let mut found = Vec::new();

    'search: while coeffs.len() > 3 {
        let integers = integer_coefficients(&coeffs).ok_or_else(overflow)?;
        let constant = integers[0];
        let leading = integers[integers.len() - 1];
        if constant == 0 {
            found.push(Rational::ZERO);
            coeffs.remove(0);
            continue;
        }
        let (Some(ps), Some(qs)) = (divisors(constant, bound), divisors(leading, bound)) else {
            return Err(PlanarError::Unsupported(format!(
                "Rational root search bound {} exceeded.",
                bound
            )));
        };
        for &p in &ps {
            for &q in &qs {
                for signed in [p, -p] {
                    let Some(candidate) = Rational::new(signed, q) else {
                        continue;
                    };
                    if let Some(quotient) = deflate(&coeffs, candidate) {
                        found.push(candidate);
                        coeffs = quotient;
                        continue 'search;
                    }
                }
            }
        }
        break;
    }
    Ok((found, coeffs))
}

/// Scales rational coefficients to coprime integers.
fn integer_coefficients(coeffs: &[Rational]) -> Option<Vec<i128>> {
    let mut lcm: i128 = 1;
    for c in coeffs {
        let g = gcd(lcm.unsigned_abs(), c.denom().unsigned_abs()) as i128;
        lcm = (lcm / g).checked_mul(c.denom())?;
    }
    let scale = Rational::from_integer(lcm);
    coeffs
        .iter()
        .map(|c| c.checked_mul(scale).and_then(|v| v.as_integer()))
        .collect()
}

fn divisors(n: i128, bound: i128) -> Option<Vec<i128>> {
    let n = n.checked_abs()?;
    if n > bound {
        return None;
    }
    let mut out = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            out.push(d);
            if d != n / d {
                out.push(n / d);
            }
        }
        d += 1;
    }
    out.sort_unstable();
    Some(out)
}

/// Divides by `(v - root)` when `root` is an exact zero.
fn deflate(coeffs: &[Rational], root: Rational) -> Option<Vec<Rational>> {
    let n = coeffs.len() - 1;
    let mut quotient = vec![Rational::ZERO; n];
    quotient[n - 1] = coeffs[n];
    for k in (1..n).rev() {
        quotient[k - 1] = coeffs[k].checked_add(root.checked_mul(quotient[k])?)?;
    }
    let remainder = coeffs[0].checked_add(root.checked_mul(quotient[0])?)?;
    remainder.is_zero().then_some(quotient)
}
