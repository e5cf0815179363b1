use crate::equilibrium::EquilibriumPoint;
use crate::error::{PlanarError, Result};
use crate::symbolic::{Expr, Rational};
use crate::system::NonlinearSystem;
use nalgebra::linalg::SVD;
use nalgebra::{Complex, DMatrix};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

impl From<ComplexNumber> for Complex64 {
    fn from(value: ComplexNumber) -> Self {
        Complex64::new(value.re, value.im)
    }
}

/// Numeric eigenpair with a unit-norm eigenvector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    pub value: ComplexNumber,
    pub vector: Vec<ComplexNumber>,
    /// Algebraic multiplicity of `value`.
    pub multiplicity: usize,
}

impl EigenPair {
    /// Unit-norm eigenvector with components below `tolerance` zeroed, for
    /// direction indicators.
    pub fn scaled(&self, tolerance: f64) -> Vec<ComplexNumber> {
        let vector: Vec<Complex64> = self.vector.iter().map(|c| Complex64::from(*c)).collect();
        let norm = vector.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        vector
            .into_iter()
            .map(|c| if norm > 0.0 { c / norm } else { c })
            .map(|c| ComplexNumber::from(clean_component(c, tolerance)))
            .collect()
    }
}

/// Exact eigenvalue with its eigenvector basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicEigenPair {
    pub value: Expr,
    pub multiplicity: usize,
    pub vectors: Vec<Vec<Expr>>,
}

/// Square matrix of exact partial derivatives, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicJacobian {
    pub dim: usize,
    pub entries: Vec<Expr>,
}

impl SymbolicJacobian {
    /// `J[i][j] = d f_i / d x_j` as expressions in the state variables.
    pub fn of(system: &NonlinearSystem) -> Self {
        let dim = system.dimension();
        let mut entries = Vec::with_capacity(dim * dim);
        for eq in system.equations() {
            for var in system.variables() {
                entries.push(eq.diff(var).simplify());
            }
        }
        Self { dim, entries }
    }

    pub fn entry(&self, row: usize, col: usize) -> &Expr {
        &self.entries[row * self.dim + col]
    }

    /// Evaluates every entry at a concrete equilibrium.
    pub fn at(&self, variables: &[String], point: &EquilibriumPoint) -> Result<Self> {
        let coordinates = match point {
            EquilibriumPoint::Concrete { coordinates } => coordinates,
            EquilibriumPoint::Parametrized { free_symbols, .. } => {
                return Err(PlanarError::InvalidParameter(format!(
                    "cannot linearize at a parametrized equilibrium (free symbols {:?}).",
                    free_symbols
                )))
            }
        };
        if coordinates.len() != variables.len() {
            return Err(PlanarError::shape(
                "equilibrium point",
                format!("{} coordinates", variables.len()),
                format!("{} coordinates", coordinates.len()),
            ));
        }
        let bindings: BTreeMap<String, Expr> = variables
            .iter()
            .cloned()
            .zip(coordinates.iter().cloned())
            .collect();
        let entries = self
            .entries
            .iter()
            .map(|e| e.substitute(&bindings).simplify())
            .collect();
        Ok(Self {
            dim: self.dim,
            entries,
        })
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.entries.iter().flat_map(Expr::free_symbols).collect()
    }

    pub fn to_numeric(&self, tolerance: f64) -> Result<DMatrix<f64>> {
        let values = self
            .entries
            .iter()
            .map(|e| e.to_f64(tolerance))
            .collect::<Result<Vec<_>>>()?;
        Ok(DMatrix::from_row_slice(self.dim, self.dim, &values))
    }
}

/// Exact Jacobian of `system` at `point`.
pub fn jacobian(system: &NonlinearSystem, point: &EquilibriumPoint) -> Result<SymbolicJacobian> {
    SymbolicJacobian::of(system).at(system.variables(), point)
}

fn check_square(matrix: &DMatrix<f64>) -> Result<()> {
    if matrix.nrows() == 0 || matrix.nrows() != matrix.ncols() {
        return Err(PlanarError::shape(
            "Jacobian",
            "a non-empty square matrix",
            format!("{}x{}", matrix.nrows(), matrix.ncols()),
        ));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(PlanarError::InvalidParameter(
            "Jacobian has non-finite entries.".to_string(),
        ));
    }
    Ok(())
}

/// Eigenvalues only, in the order the Schur decomposition yields them.
pub fn eigenvalues(matrix: &DMatrix<f64>) -> Result<Vec<Complex64>> {
    check_square(matrix)?;
    Ok(matrix.complex_eigenvalues().iter().copied().collect())
}

/// One eigenpair per eigenvalue (repeated values appear repeatedly).
///
/// Eigenvectors are null directions of `J - λI` from a complex SVD,
/// normalized to unit length with the largest component real and positive.
/// Copies of a semisimple repeated eigenvalue get independent vectors.
pub fn eigendecompose(matrix: &DMatrix<f64>, tolerance: f64) -> Result<Vec<EigenPair>> {
    let values = eigenvalues(matrix)?;
    let dim = matrix.nrows();
    let complex_matrix = matrix.map(|v| Complex::new(v, 0.0));

    let mut pairs = Vec::with_capacity(dim);
    for (idx, &lambda) in values.iter().enumerate() {
        let mut shifted = complex_matrix.clone();
        for i in 0..dim {
            shifted[(i, i)] -= lambda;
        }

        let SVD {
            v_t,
            singular_values,
            ..
        } = SVD::new(shifted, true, true);
        let v_t = v_t.ok_or_else(|| {
            PlanarError::LinearAlgebra(format!(
                "Failed to compute eigenvector for eigenvalue index {}.",
                idx
            ))
        })?;

        let cluster = tolerance.max(f64::EPSILON.sqrt()) * (1.0 + lambda.norm());
        let members: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, other)| (**other - lambda).norm() <= cluster)
            .map(|(j, _)| j)
            .collect();
        let multiplicity = members.len();

        // Copies of a repeated eigenvalue take successive null directions
        // while the null space lasts, smallest singular value first.
        let mut order: Vec<usize> = (0..singular_values.len()).collect();
        order.sort_by(|&a, &b| {
            singular_values[a]
                .partial_cmp(&singular_values[b])
                .unwrap_or(Ordering::Equal)
        });
        let largest = singular_values.iter().copied().fold(0.0, f64::max);
        let null_dim = order
            .iter()
            .take_while(|&&k| singular_values[k] <= cluster * (1.0 + largest))
            .count()
            .max(1);
        let rank = members.iter().position(|&j| j == idx).unwrap_or(0);
        let row = v_t.row(order[rank % null_dim]);
        let mut vector: Vec<Complex<f64>> = row.iter().map(|c| c.conj()).collect();
        normalize_complex_vector(&mut vector);

        pairs.push(EigenPair {
            value: ComplexNumber::from(lambda),
            vector: vector.into_iter().map(ComplexNumber::from).collect(),
            multiplicity,
        });
    }
    Ok(pairs)
}

fn normalize_complex_vector(vec: &mut [Complex<f64>]) {
    let norm = vec.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }
    // Fix the arbitrary phase so real eigenvalues get real eigenvectors.
    let pivot = vec
        .iter()
        .copied()
        .fold(Complex::new(0.0, 0.0), |best, c| if c.norm() > best.norm() { c } else { best });
    let phase = pivot / pivot.norm();
    for entry in vec.iter_mut() {
        *entry /= phase * norm;
    }
}

fn clean_component(value: Complex64, tolerance: f64) -> Complex64 {
    let re = if value.re.abs() < tolerance { 0.0 } else { value.re };
    let im = if value.im.abs() < tolerance { 0.0 } else { value.im };
    Complex64::new(re, im)
}

/// Zeroes every real or imaginary component with magnitude below `tolerance`.
pub fn clean(eigenvalues: &[Complex64], tolerance: f64) -> Vec<Complex64> {
    eigenvalues
        .iter()
        .map(|v| clean_component(*v, tolerance))
        .collect()
}

/// Exact eigenpairs of a 1x1 or 2x2 Jacobian.
pub fn eigendecompose_symbolic(jacobian: &SymbolicJacobian) -> Result<Vec<SymbolicEigenPair>> {
    match jacobian.dim {
        1 => Ok(vec![SymbolicEigenPair {
            value: jacobian.entry(0, 0).clone(),
            multiplicity: 1,
            vectors: vec![vec![Expr::one()]],
        }]),
        2 => Ok(planar_eigenpairs(
            jacobian.entry(0, 0),
            jacobian.entry(0, 1),
            jacobian.entry(1, 0),
            jacobian.entry(1, 1),
        )),
        n => Err(PlanarError::Unsupported(format!(
            "exact eigen-decomposition of a {}x{} Jacobian.",
            n, n
        ))),
    }
}

fn pair(value: Expr, multiplicity: usize, vectors: Vec<Vec<Expr>>) -> SymbolicEigenPair {
    SymbolicEigenPair {
        value: value.simplify(),
        multiplicity,
        vectors: vectors
            .into_iter()
            .map(|v| v.iter().map(Expr::simplify).collect())
            .collect(),
    }
}

/// Eigenpairs of `[[a, b], [c, d]]`.
fn planar_eigenpairs(a: &Expr, b: &Expr, c: &Expr, d: &Expr) -> Vec<SymbolicEigenPair> {
    let unit_x = vec![Expr::one(), Expr::zero()];
    let unit_y = vec![Expr::zero(), Expr::one()];
    let repeated = (a.clone() - d.clone()).simplify().is_zero();

    // Triangular: eigenvalues sit on the diagonal.
    if b.is_zero() && c.is_zero() {
        if repeated {
            return vec![pair(a.clone(), 2, vec![unit_x, unit_y])];
        }
        return vec![pair(a.clone(), 1, vec![unit_x]), pair(d.clone(), 1, vec![unit_y])];
    }
    if c.is_zero() {
        if repeated {
            return vec![pair(a.clone(), 2, vec![unit_x])];
        }
        let v = vec![b.clone(), d.clone() - a.clone()];
        return vec![pair(a.clone(), 1, vec![unit_x]), pair(d.clone(), 1, vec![v])];
    }
    if b.is_zero() {
        if repeated {
            return vec![pair(a.clone(), 2, vec![unit_y])];
        }
        let v = vec![a.clone() - d.clone(), c.clone()];
        return vec![pair(a.clone(), 1, vec![v]), pair(d.clone(), 1, vec![unit_y])];
    }

    // (J - λI) v = 0 is solved by v = [b, λ - a] whenever b != 0.
    let vector_for = |lambda: &Expr| vec![b.clone(), lambda.clone() - a.clone()];
    let trace = a.clone() + d.clone();
    let discriminant = ((a.clone() - d.clone()) * (a.clone() - d.clone())
        + Expr::integer(4) * b.clone() * c.clone())
    .simplify();
    let half = Expr::number(Rational::HALF);
    if discriminant.is_zero() {
        let lambda = (half * trace).simplify();
        let v = vector_for(&lambda);
        return vec![pair(lambda, 2, vec![v])];
    }
    let root = discriminant.sqrt();
    let plus = (half.clone() * (trace.clone() + root.clone())).simplify();
    let minus = (half * (trace - root)).simplify();
    let v_plus = vector_for(&plus);
    let v_minus = vector_for(&minus);
    vec![pair(plus, 1, vec![v_plus]), pair(minus, 1, vec![v_minus])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse;
    use std::collections::HashMap;

    fn p(text: &str) -> Expr {
        parse(text).unwrap()
    }

    fn assert_is_eigenpair(matrix: &DMatrix<f64>, pair: &EigenPair) {
        let lambda = Complex64::from(pair.value);
        let v: Vec<Complex64> = pair.vector.iter().map(|c| Complex64::from(*c)).collect();
        for i in 0..matrix.nrows() {
            let mut lhs = Complex64::new(0.0, 0.0);
            for j in 0..matrix.ncols() {
                lhs += v[j] * matrix[(i, j)];
            }
            assert!((lhs - lambda * v[i]).norm() < 1e-9, "A v != λ v for {:?}", pair);
        }
        let norm: f64 = v.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_real_eigenpairs() {
        let m = DMatrix::from_row_slice(2, 2, &[0.1, 0.4, 0.4, -0.1]);
        let pairs = eigendecompose(&m, 1e-10).unwrap();
        assert_eq!(pairs.len(), 2);
        for pair in &pairs {
            assert_is_eigenpair(&m, pair);
            assert_eq!(pair.multiplicity, 1);
            assert!(pair.vector.iter().all(|c| c.im.abs() < 1e-12));
        }
    }

    #[test]
    fn test_complex_eigenpairs() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, -2.0, 2.0, 0.0]);
        let pairs = eigendecompose(&m, 1e-10).unwrap();
        for pair in &pairs {
            assert_is_eigenpair(&m, pair);
            assert!((pair.value.im.abs() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_repeated_eigenvalue_multiplicity() {
        let m = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 0.0, -1.0]);
        let pairs = eigendecompose(&m, 1e-10).unwrap();
        assert!(pairs.iter().all(|p| p.multiplicity == 2));
        assert_is_eigenpair(&m, &pairs[0]);
    }

    #[test]
    fn test_repeated_eigenvalue_has_independent_vectors() {
        for scale in [1.0, -2.5] {
            let m = DMatrix::from_row_slice(2, 2, &[scale, 0.0, 0.0, scale]);
            let pairs = eigendecompose(&m, 1e-10).unwrap();
            assert_eq!(pairs.len(), 2);
            for pair in &pairs {
                assert_eq!(pair.multiplicity, 2);
                assert_is_eigenpair(&m, pair);
            }
            let u: Vec<Complex64> = pairs[0].vector.iter().map(|c| Complex64::from(*c)).collect();
            let v: Vec<Complex64> = pairs[1].vector.iter().map(|c| Complex64::from(*c)).collect();
            let det = u[0] * v[1] - u[1] * v[0];
            assert!(det.norm() > 0.5, "vectors {:?} and {:?} are parallel", u, v);
        }
    }

    #[test]
    fn test_non_square_rejected() {
        let m = DMatrix::from_row_slice(2, 3, &[0.0; 6]);
        assert!(matches!(eigenvalues(&m), Err(PlanarError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_clean() {
        let values = [Complex64::new(1e-12, 2.0), Complex64::new(-3.0, -1e-11)];
        let cleaned = clean(&values, 1e-10);
        assert_eq!(cleaned, vec![Complex64::new(0.0, 2.0), Complex64::new(-3.0, 0.0)]);
    }

    #[test]
    fn test_scaled_vector() {
        let pair = EigenPair {
            value: ComplexNumber { re: 1.0, im: 0.0 },
            vector: vec![ComplexNumber { re: 3.0, im: 0.0 }, ComplexNumber { re: 4.0, im: 1e-14 }],
            multiplicity: 1,
        };
        let scaled = pair.scaled(1e-10);
        assert!((scaled[0].re - 0.6).abs() < 1e-12);
        assert!((scaled[1].re - 0.8).abs() < 1e-12);
        assert_eq!(scaled[1].im, 0.0);
    }

    #[test]
    fn test_symbolic_jacobian_at_point() {
        let system = NonlinearSystem::planar("x*(3 - x - 2*y)", "y*(2 - x - y)", &[]).unwrap();
        let point = EquilibriumPoint::from_coordinates(vec![Expr::integer(1), Expr::integer(1)]);
        let j = jacobian(&system, &point).unwrap();
        assert_eq!(j.entries, vec![p("-1"), p("-2"), p("-1"), p("-1")]);
        let numeric = j.to_numeric(1e-10).unwrap();
        assert_eq!(numeric, DMatrix::from_row_slice(2, 2, &[-1.0, -2.0, -1.0, -1.0]));
    }

    #[test]
    fn test_parametrized_point_rejected() {
        let system = NonlinearSystem::planar("a*x - y", "x + y - 1", &["a"]).unwrap();
        let point = EquilibriumPoint::from_coordinates(vec![p("1/(a + 1)"), p("a/(a + 1)")]);
        assert!(matches!(
            jacobian(&system, &point),
            Err(PlanarError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_symbolic_eigenpairs_satisfy_definition() {
        let j = SymbolicJacobian {
            dim: 2,
            entries: vec![p("-1"), p("-2"), p("-1"), p("-1")],
        };
        let pairs = eigendecompose_symbolic(&j).unwrap();
        assert_eq!(pairs.len(), 2);
        let values: Vec<Expr> = pairs.iter().map(|p| p.value.clone()).collect();
        assert!(values.contains(&p("-1 + sqrt(2)")));
        assert!(values.contains(&p("-1 - sqrt(2)")));
        for pair in &pairs {
            let v = &pair.vectors[0];
            for row in 0..2 {
                let lhs = j.entry(row, 0).clone() * v[0].clone() + j.entry(row, 1).clone() * v[1].clone()
                    - pair.value.clone() * v[row].clone();
                assert!(lhs.expand().is_zero(), "row {} residual {}", row, lhs.expand());
            }
        }
    }

    #[test]
    fn test_symbolic_eigenpairs_parametric_and_complex() {
        let j = SymbolicJacobian {
            dim: 2,
            entries: vec![p("mu"), p("-2"), p("2"), p("2")],
        };
        let pairs = eigendecompose_symbolic(&j).unwrap();
        assert_eq!(pairs.len(), 2);
        let mut bindings = HashMap::new();
        bindings.insert("mu".to_string(), Complex64::new(2.0, 0.0));
        let values: Vec<Complex64> = pairs.iter().map(|p| p.value.evaluate(&bindings).unwrap()).collect();
        for v in values {
            assert!((v.re - 2.0).abs() < 1e-12);
            assert!((v.im.abs() - 2.0).abs() < 1e-12);
        }

        let diagonal = SymbolicJacobian {
            dim: 2,
            entries: vec![p("a"), p("0"), p("0"), p("a")],
        };
        let pairs = eigendecompose_symbolic(&diagonal).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].multiplicity, 2);
        assert_eq!(pairs[0].vectors.len(), 2);

        let big = SymbolicJacobian {
            dim: 3,
            entries: vec![Expr::zero(); 9],
        };
        assert!(matches!(eigendecompose_symbolic(&big), Err(PlanarError::Unsupported(_))));
    }
}
