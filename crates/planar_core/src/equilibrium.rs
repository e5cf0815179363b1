use crate::error::{PlanarError, Result};
use crate::settings::SolverSettings;
use crate::symbolic::{solve::solve_system, Expr};
use crate::system::{LinearSystem, NonlinearSystem};
use crate::traits::VectorField;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An exact equilibrium of a nonlinear system.
///
/// `Parametrized` points still hold free symbols (parameters, or state
/// variables left undetermined on a continuum) and denote a family of
/// points; they must not be linearized numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EquilibriumPoint {
    Concrete {
        coordinates: Vec<Expr>,
    },
    Parametrized {
        coordinates: Vec<Expr>,
        free_symbols: Vec<String>,
    },
}

impl EquilibriumPoint {
    /// Tags coordinates by whether any free symbol remains.
    pub fn from_coordinates(coordinates: Vec<Expr>) -> Self {
        let free: BTreeSet<String> = coordinates.iter().flat_map(Expr::free_symbols).collect();
        if free.is_empty() {
            EquilibriumPoint::Concrete { coordinates }
        } else {
            EquilibriumPoint::Parametrized {
                coordinates,
                free_symbols: free.into_iter().collect(),
            }
        }
    }

    pub fn coordinates(&self) -> &[Expr] {
        match self {
            EquilibriumPoint::Concrete { coordinates }
            | EquilibriumPoint::Parametrized { coordinates, .. } => coordinates,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, EquilibriumPoint::Concrete { .. })
    }

    pub fn free_symbols(&self) -> &[String] {
        match self {
            EquilibriumPoint::Concrete { .. } => &[],
            EquilibriumPoint::Parametrized { free_symbols, .. } => free_symbols,
        }
    }

    /// Real coordinates of a concrete point.
    pub fn numeric_coordinates(&self, tolerance: f64) -> Result<Vec<f64>> {
        match self {
            EquilibriumPoint::Concrete { coordinates } => {
                coordinates.iter().map(|c| c.to_f64(tolerance)).collect()
            }
            EquilibriumPoint::Parametrized { free_symbols, .. } => {
                Err(PlanarError::InvalidParameter(format!(
                    "equilibrium depends on free symbols {:?}.",
                    free_symbols
                )))
            }
        }
    }
}

/// All real equilibria of `system`, parameters treated as free symbols.
///
/// An empty vector means no equilibrium exists. Equations outside the
/// solvable class are reported as `Unsupported`.
pub fn solve_nonlinear(system: &NonlinearSystem, settings: &SolverSettings) -> Result<Vec<EquilibriumPoint>> {
    let solutions = solve_system(system.equations(), system.variables(), settings)?;
    log::debug!("Found {} equilibria.", solutions.len());
    Ok(solutions
        .into_iter()
        .map(EquilibriumPoint::from_coordinates)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uniqueness {
    Unique,
    /// `A` is singular; the state is the minimum-norm least-squares point.
    NonUnique,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearEquilibrium {
    pub state: Vec<f64>,
    pub residual_norm: f64,
    pub uniqueness: Uniqueness,
}

/// Equilibrium of `x' = A x + B`.
///
/// Without `B` the origin is returned. With `B` and a nonsingular `A` the
/// state is `-A⁻¹B`; when `A` is rank-deficient at `tolerance` the
/// Moore-Penrose pseudo-inverse gives `A⁺(-B)`, flagged `NonUnique`.
pub fn solve_linear(system: &LinearSystem, tolerance: f64) -> Result<LinearEquilibrium> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(PlanarError::InvalidParameter(format!(
            "tolerance must be finite and non-negative, got {}.",
            tolerance
        )));
    }
    let dim = system.dimension();
    let a = system.matrix();
    let svd = a.clone().svd(true, true);
    let singular = svd.rank(tolerance) < dim;

    let (state, uniqueness) = match system.offset() {
        None => (
            DVector::zeros(dim),
            if singular {
                Uniqueness::NonUnique
            } else {
                Uniqueness::Unique
            },
        ),
        Some(b) => {
            let rhs = -b;
            if singular {
                log::warn!("Matrix A is singular; using the pseudo-inverse for the equilibrium.");
                let pinv = svd
                    .pseudo_inverse(tolerance)
                    .map_err(|e| PlanarError::LinearAlgebra(e.to_string()))?;
                (pinv * rhs, Uniqueness::NonUnique)
            } else {
                let solved = a
                    .clone()
                    .lu()
                    .solve(&rhs)
                    .ok_or_else(|| PlanarError::LinearAlgebra("LU solve failed.".to_string()))?;
                (solved, Uniqueness::Unique)
            }
        }
    };

    let state: Vec<f64> = state.iter().copied().collect();
    let residual_norm = system.residual_norm(&state);
    Ok(LinearEquilibrium {
        state,
        residual_norm,
        uniqueness,
    })
}
