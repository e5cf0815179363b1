use crate::equation_engine::{Compiler, EquationSystem};
use crate::error::{PlanarError, Result};
use crate::symbolic::{parse, Expr, Rational};
use crate::traits::VectorField;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `x' = A x + B`, with `B` optional.
///
/// Construction is the only place shapes are checked; every other operation
/// assumes a square `A` and a matching `B`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    a: DMatrix<f64>,
    b: Option<DVector<f64>>,
}

impl LinearSystem {
    pub fn new(a: DMatrix<f64>, b: Option<DVector<f64>>) -> Result<Self> {
        if a.nrows() == 0 || a.nrows() != a.ncols() {
            return Err(PlanarError::shape(
                "matrix A",
                "a non-empty square matrix",
                format!("{}x{}", a.nrows(), a.ncols()),
            ));
        }
        if let Some(b) = &b {
            if b.len() != a.nrows() {
                return Err(PlanarError::shape(
                    "vector B",
                    format!("length {}", a.nrows()),
                    format!("length {}", b.len()),
                ));
            }
            if b.iter().any(|v| !v.is_finite()) {
                return Err(PlanarError::InvalidParameter(
                    "vector B has non-finite entries.".to_string(),
                ));
            }
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(PlanarError::InvalidParameter(
                "matrix A has non-finite entries.".to_string(),
            ));
        }
        Ok(Self { a, b })
    }

    /// Builds a system from a row-major `dim x dim` slice, as the bridge sends it.
    pub fn from_row_slice(dim: usize, a: &[f64], b: Option<&[f64]>) -> Result<Self> {
        if a.len() != dim * dim {
            return Err(PlanarError::shape(
                "matrix A",
                format!("{} entries", dim * dim),
                format!("{} entries", a.len()),
            ));
        }
        let matrix = DMatrix::from_row_slice(dim, dim, a);
        let offset = b.map(DVector::from_column_slice);
        Self::new(matrix, offset)
    }

    pub fn dimension(&self) -> usize {
        self.a.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn offset(&self) -> Option<&DVector<f64>> {
        self.b.as_ref()
    }

    /// The Jacobian of an affine field is `A` everywhere.
    pub fn jacobian(&self) -> DMatrix<f64> {
        self.a.clone()
    }
}

impl VectorField<f64> for LinearSystem {
    fn dimension(&self) -> usize {
        self.a.nrows()
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) {
        let x = DVector::from_column_slice(x);
        let mut rates = &self.a * x;
        if let Some(b) = &self.b {
            rates += b;
        }
        out.copy_from_slice(rates.as_slice());
    }
}

/// `x_i' = f_i(x)` given as exact expressions over named state variables and
/// free parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearSystem {
    equations: Vec<Expr>,
    variables: Vec<String>,
    parameters: Vec<String>,
}

impl NonlinearSystem {
    /// Parses and validates a system. Every identifier in the equations must
    /// be a declared state variable or parameter.
    pub fn parse(equations: &[&str], variables: &[&str], parameters: &[&str]) -> Result<Self> {
        let equations = equations
            .iter()
            .map(|text| parse(text))
            .collect::<Result<Vec<_>>>()?;
        let variables = variables.iter().map(|v| v.to_string()).collect();
        let parameters = parameters.iter().map(|p| p.to_string()).collect();
        Self::new(equations, variables, parameters)
    }

    /// Planar system `x' = f(x, y)`, `y' = g(x, y)`.
    pub fn planar(f: &str, g: &str, parameters: &[&str]) -> Result<Self> {
        Self::parse(&[f, g], &["x", "y"], parameters)
    }

    pub fn new(equations: Vec<Expr>, variables: Vec<String>, parameters: Vec<String>) -> Result<Self> {
        if variables.is_empty() {
            return Err(PlanarError::InvalidParameter(
                "at least one state variable is required.".to_string(),
            ));
        }
        if equations.len() != variables.len() {
            return Err(PlanarError::shape(
                "nonlinear system",
                format!("{} equations", variables.len()),
                format!("{} equations", equations.len()),
            ));
        }

        let mut declared = BTreeSet::new();
        for name in variables.iter().chain(parameters.iter()) {
            if !is_identifier(name) {
                return Err(PlanarError::Parse(format!("'{}' is not a valid identifier.", name)));
            }
            if !declared.insert(name.clone()) {
                return Err(PlanarError::InvalidParameter(format!(
                    "'{}' is declared more than once.",
                    name
                )));
            }
        }
        for eq in &equations {
            if let Some(unknown) = eq.free_symbols().difference(&declared).next() {
                return Err(PlanarError::Parse(format!(
                    "Unknown identifier '{}' in '{}'.",
                    unknown, eq
                )));
            }
        }

        Ok(Self {
            equations,
            variables,
            parameters,
        })
    }

    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    pub fn equations(&self) -> &[Expr] {
        &self.equations
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Binds parameters to numbers, producing one concrete member of the
    /// family. Values are converted to exact decimals.
    pub fn with_parameter_values(&self, values: &[(&str, f64)]) -> Result<Self> {
        let mut bindings = BTreeMap::new();
        for (name, value) in values {
            if !self.parameters.iter().any(|p| p == name) {
                return Err(PlanarError::InvalidParameter(format!(
                    "'{}' is not a parameter of this system.",
                    name
                )));
            }
            bindings.insert(name.to_string(), exact_value(*value)?);
        }
        let equations = self.equations.iter().map(|eq| eq.substitute(&bindings)).collect();
        let parameters = self
            .parameters
            .iter()
            .filter(|p| !bindings.contains_key(*p))
            .cloned()
            .collect();
        Ok(Self {
            equations,
            variables: self.variables.clone(),
            parameters,
        })
    }

    /// Compiles the rate expressions to bytecode with parameters in declared order.
    pub fn compile(&self, parameter_values: &[f64]) -> Result<EquationSystem<f64>> {
        if parameter_values.len() != self.parameters.len() {
            return Err(PlanarError::shape(
                "parameter values",
                self.parameters.len(),
                parameter_values.len(),
            ));
        }
        let compiler = Compiler::new(&self.variables, &self.parameters);
        let equations = self
            .equations
            .iter()
            .map(|eq| compiler.compile(eq))
            .collect::<Result<Vec<_>>>()?;
        Ok(EquationSystem::new(equations, parameter_values.to_vec()))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "I" && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Exact rational for a finite `f64`, via its shortest decimal rendering.
fn exact_value(value: f64) -> Result<Expr> {
    if !value.is_finite() {
        return Err(PlanarError::InvalidParameter(format!(
            "parameter value {} is not finite.",
            value
        )));
    }
    let text = format!("{}", value.abs());
    let magnitude = Rational::from_decimal_str(&text).ok_or_else(|| {
        PlanarError::InvalidParameter(format!("parameter value {} is out of range.", value))
    })?;
    let rational = if value < 0.0 {
        magnitude.checked_neg().ok_or_else(|| {
            PlanarError::InvalidParameter(format!("parameter value {} is out of range.", value))
        })?
    } else {
        magnitude
    };
    Ok(Expr::number(rational))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_shape_validation() {
        let non_square = DMatrix::from_row_slice(2, 3, &[1.0; 6]);
        assert!(matches!(
            LinearSystem::new(non_square, None),
            Err(PlanarError::ShapeMismatch { .. })
        ));
        let a = DMatrix::identity(2, 2);
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            LinearSystem::new(a.clone(), Some(b)),
            Err(PlanarError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            LinearSystem::from_row_slice(2, &[1.0, 0.0, 0.0], None),
            Err(PlanarError::ShapeMismatch { .. })
        ));
        assert!(LinearSystem::new(a, None).is_ok());
    }

    #[test]
    fn test_linear_field() {
        let system = LinearSystem::from_row_slice(2, &[1.0, 2.0, 3.0, 4.0], Some(&[1.0, -1.0])).unwrap();
        let mut out = [0.0; 2];
        system.apply(&[1.0, 1.0], &mut out);
        assert_eq!(out, [4.0, 6.0]);
        assert_eq!(system.jacobian(), *system.matrix());
    }

    #[test]
    fn test_nonlinear_validation() {
        assert!(NonlinearSystem::planar("x*(3 - x - 2*y)", "y*(2 - x - y)", &[]).is_ok());
        assert!(matches!(
            NonlinearSystem::planar("x + z", "y", &[]),
            Err(PlanarError::Parse(_))
        ));
        assert!(matches!(
            NonlinearSystem::parse(&["x"], &["x", "y"], &[]),
            Err(PlanarError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            NonlinearSystem::planar("x", "y", &["x"]),
            Err(PlanarError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_parameter_binding() {
        let system = NonlinearSystem::planar("a*x - y", "x + b*y", &["a", "b"]).unwrap();
        let bound = system.with_parameter_values(&[("a", -0.5)]).unwrap();
        assert_eq!(bound.parameters(), &["b".to_string()]);
        assert_eq!(bound.equations()[0], parse("-x/2 - y").unwrap());
        assert!(system.with_parameter_values(&[("c", 1.0)]).is_err());
        assert!(system.with_parameter_values(&[("a", f64::NAN)]).is_err());
    }

    #[test]
    fn test_compile_and_residual() {
        let system = NonlinearSystem::planar("a*x - y", "x^2 - y", &["a"]).unwrap();
        let compiled = system.compile(&[1.0]).unwrap();
        assert_eq!(compiled.residual_norm(&[1.0, 1.0]), 0.0);
        assert!(system.compile(&[]).is_err());
    }
}
