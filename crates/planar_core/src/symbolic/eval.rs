use super::expr::{Expr, Function};
use crate::error::{PlanarError, Result};
use num_complex::Complex64;
use std::collections::HashMap;

impl Expr {
    /// Evaluates the expression in complex floating point.
    ///
    /// Symbols must be bound in `bindings`; an unbound symbol or a
    /// non-finite intermediate value is an `Evaluation` error.
    pub fn evaluate(&self, bindings: &HashMap<String, Complex64>) -> Result<Complex64> {
        let value = match self {
            Expr::Number(r) => Complex64::new(r.to_f64(), 0.0),
            Expr::ImaginaryUnit => Complex64::new(0.0, 1.0),
            Expr::Symbol(name) => *bindings
                .get(name)
                .ok_or_else(|| PlanarError::Evaluation(format!("Unbound symbol '{}'.", name)))?,
            Expr::Add(terms) => {
                let mut acc = Complex64::new(0.0, 0.0);
                for term in terms {
                    acc += term.evaluate(bindings)?;
                }
                acc
            }
            Expr::Mul(factors) => {
                let mut acc = Complex64::new(1.0, 0.0);
                for factor in factors {
                    acc *= factor.evaluate(bindings)?;
                }
                acc
            }
            Expr::Pow(base, exponent) => {
                let b = base.evaluate(bindings)?;
                match exponent.as_number() {
                    Some(e) if e.is_integer() && e.numer().abs() <= i32::MAX as i128 => {
                        if b == Complex64::new(0.0, 0.0) && e.is_negative() {
                            return Err(PlanarError::Evaluation(format!(
                                "Division by zero in '{}'.",
                                self
                            )));
                        }
                        b.powi(e.numer() as i32)
                    }
                    Some(e) if e.numer() == 1 && e.denom() == 2 => b.sqrt(),
                    _ => {
                        let e = exponent.evaluate(bindings)?;
                        if b.im == 0.0 && e.im == 0.0 && b.re >= 0.0 {
                            Complex64::new(b.re.powf(e.re), 0.0)
                        } else {
                            b.powc(e)
                        }
                    }
                }
            }
            Expr::Call(function, arg) => {
                let a = arg.evaluate(bindings)?;
                match function {
                    Function::Sin => a.sin(),
                    Function::Cos => a.cos(),
                    Function::Tan => a.tan(),
                    Function::Exp => a.exp(),
                    Function::Ln => a.ln(),
                }
            }
        };

        if !value.re.is_finite() || !value.im.is_finite() {
            return Err(PlanarError::Evaluation(format!(
                "Non-finite value while evaluating '{}'.",
                self
            )));
        }
        Ok(value)
    }

    /// Evaluates to a real number, rejecting imaginary parts above `tolerance`.
    pub fn evaluate_real(&self, bindings: &HashMap<String, f64>, tolerance: f64) -> Result<f64> {
        let complex_bindings: HashMap<String, Complex64> = bindings
            .iter()
            .map(|(k, v)| (k.clone(), Complex64::new(*v, 0.0)))
            .collect();
        let value = self.evaluate(&complex_bindings)?;
        if value.im.abs() > tolerance {
            return Err(PlanarError::Evaluation(format!(
                "'{}' evaluates to a non-real value {}.",
                self, value
            )));
        }
        Ok(value.re)
    }

    /// Real value of a closed expression (no free symbols).
    pub fn to_f64(&self, tolerance: f64) -> Result<f64> {
        self.evaluate_real(&HashMap::new(), tolerance)
    }
}
