use num_complex::Complex64;
use thiserror::Error;

/// Errors raised by the analysis engine.
///
/// Structural problems (`ShapeMismatch`, `InvalidParameter`) abort an
/// operation before any computation. Singular matrices, empty solution sets and
/// parametrized equilibria are not errors; they flow through the result types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanarError {
    #[error("Shape mismatch in {context}: expected {expected}, got {found}.")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Classification matched no branch of the taxonomy. Indicates a defect in
    /// tolerance handling or an eigenvalue pair outside the planar taxonomy.
    #[error("Unreachable classification state for cleaned eigenvalues {eigenvalues:?}.")]
    UnreachableState { eigenvalues: Vec<Complex64> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),
}

impl PlanarError {
    pub(crate) fn shape(context: &'static str, expected: impl ToString, found: impl ToString) -> Self {
        PlanarError::ShapeMismatch {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlanarError>;
