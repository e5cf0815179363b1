use crate::classification::{classify, Classification};
use crate::equilibrium::{solve_linear, EquilibriumPoint, LinearEquilibrium};
use crate::error::{PlanarError, Result};
use crate::linearization::{
    eigendecompose, eigendecompose_symbolic, ComplexNumber, EigenPair, SymbolicEigenPair,
    SymbolicJacobian,
};
use crate::settings::AnalysisSettings;
use crate::system::{LinearSystem, NonlinearSystem};
use crate::traits::VectorField;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Linearization of a nonlinear system at one concrete equilibrium.
///
/// The numeric Jacobian and eigenpairs are `None` while the exact Jacobian
/// still depends on unbound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub equilibrium: EquilibriumPoint,
    pub jacobian: SymbolicJacobian,
    /// Row-major.
    pub jacobian_numeric: Option<Vec<f64>>,
    pub eigenpairs_symbolic: Vec<SymbolicEigenPair>,
    pub eigenpairs_numeric: Option<Vec<EigenPair>>,
    /// `|F(x*)|`, available when the system has no parameters.
    pub residual_norm: Option<f64>,
}

impl AnalysisRecord {
    pub fn classify(&self, settings: &AnalysisSettings) -> Result<Classification> {
        settings.validate()?;
        let pairs = self.eigenpairs_numeric.as_ref().ok_or_else(|| {
            PlanarError::InvalidParameter(format!(
                "Jacobian depends on unbound symbols {:?}; bind parameter values first.",
                self.jacobian.free_symbols()
            ))
        })?;
        let values: Vec<Complex64> = pairs.iter().map(|p| Complex64::from(p.value)).collect();
        classify(&values, settings.tolerance)
    }
}

fn row_major(matrix: &DMatrix<f64>) -> Vec<f64> {
    (0..matrix.nrows())
        .flat_map(|i| (0..matrix.ncols()).map(move |j| matrix[(i, j)]))
        .collect()
}

/// Linearizes `system` at every analyzable equilibrium.
///
/// Parametrized points and points without finite real coordinates are
/// skipped with a notice; the remaining records keep the input order.
pub fn analyze(
    equilibria: &[EquilibriumPoint],
    system: &NonlinearSystem,
    settings: &AnalysisSettings,
) -> Result<Vec<AnalysisRecord>> {
    settings.validate()?;
    let tolerance = settings.tolerance;
    let general = SymbolicJacobian::of(system);
    let residual_field = if system.parameters().is_empty() {
        Some(system.compile(&[])?)
    } else {
        None
    };

    let mut records = Vec::with_capacity(equilibria.len());
    for point in equilibria {
        if !point.is_concrete() {
            log::info!(
                "Skipping parametrized equilibrium (free symbols {:?}).",
                point.free_symbols()
            );
            continue;
        }
        let coordinates = match point.numeric_coordinates(tolerance) {
            Ok(values) if values.iter().all(|v| v.is_finite()) => values,
            _ => {
                log::info!("Skipping equilibrium with non-real coordinates {:?}.", point.coordinates());
                continue;
            }
        };

        let jacobian = general.at(system.variables(), point)?;
        let eigenpairs_symbolic = match eigendecompose_symbolic(&jacobian) {
            Ok(pairs) => pairs,
            Err(PlanarError::Unsupported(reason)) => {
                log::info!("No exact eigenpairs: {}", reason);
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let (jacobian_numeric, eigenpairs_numeric) = if jacobian.free_symbols().is_empty() {
            let matrix = jacobian.to_numeric(tolerance)?;
            let pairs = eigendecompose(&matrix, tolerance)?;
            (Some(row_major(&matrix)), Some(pairs))
        } else {
            (None, None)
        };

        let residual_norm = residual_field
            .as_ref()
            .map(|field| field.residual_norm(&coordinates));

        records.push(AnalysisRecord {
            equilibrium: point.clone(),
            jacobian,
            jacobian_numeric,
            eigenpairs_symbolic,
            eigenpairs_numeric,
            residual_norm,
        });
    }
    log::debug!("Analyzed {} of {} equilibria.", records.len(), equilibria.len());
    Ok(records)
}

/// Full analysis of `x' = A x + B`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearAnalysis {
    pub equilibrium: LinearEquilibrium,
    /// Row-major; equal to `A`.
    pub jacobian: Vec<f64>,
    pub eigenpairs: Vec<EigenPair>,
    pub scaled_vectors: Vec<Vec<ComplexNumber>>,
    /// Present for planar systems only.
    pub classification: Option<Classification>,
}

pub fn analyze_linear(system: &LinearSystem, settings: &AnalysisSettings) -> Result<LinearAnalysis> {
    settings.validate()?;
    let tolerance = settings.tolerance;
    let equilibrium = solve_linear(system, tolerance)?;
    let jacobian = system.jacobian();
    let eigenpairs = eigendecompose(&jacobian, tolerance)?;
    let scaled_vectors = eigenpairs.iter().map(|p| p.scaled(tolerance)).collect();
    let classification = if system.dimension() == 2 {
        let values: Vec<Complex64> = eigenpairs.iter().map(|p| Complex64::from(p.value)).collect();
        Some(classify(&values, tolerance)?)
    } else {
        None
    };
    Ok(LinearAnalysis {
        equilibrium,
        jacobian: row_major(&jacobian),
        eigenpairs,
        scaled_vectors,
        classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::{solve_nonlinear, Uniqueness};
    use crate::settings::SolverSettings;
    use crate::symbolic::Expr;

    fn point(x: i128, y: i128) -> EquilibriumPoint {
        EquilibriumPoint::from_coordinates(vec![Expr::integer(x), Expr::integer(y)])
    }

    #[test]
    fn test_linear_saddle_at_origin() {
        let system = LinearSystem::from_row_slice(2, &[0.1, 0.4, 0.4, -0.1], None).unwrap();
        let analysis = analyze_linear(&system, &AnalysisSettings::default()).unwrap();
        assert_eq!(analysis.equilibrium.state, vec![0.0, 0.0]);
        assert_eq!(analysis.equilibrium.uniqueness, Uniqueness::Unique);
        assert_eq!(analysis.jacobian, vec![0.1, 0.4, 0.4, -0.1]);
        assert_eq!(analysis.classification, Some(Classification::Saddle));
        assert_eq!(analysis.eigenpairs.len(), 2);
        for scaled in &analysis.scaled_vectors {
            let norm: f64 = scaled.iter().map(|c| c.re * c.re + c.im * c.im).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_non_planar_has_no_label() {
        let system = LinearSystem::from_row_slice(1, &[-2.0], Some(&[4.0])).unwrap();
        let analysis = analyze_linear(&system, &AnalysisSettings::default()).unwrap();
        assert!((analysis.equilibrium.state[0] - 2.0).abs() < 1e-12);
        assert!(analysis.classification.is_none());
    }

    #[test]
    fn test_competing_species() {
        let system = NonlinearSystem::planar("x*(3 - x - 2*y)", "y*(2 - x - y)", &[]).unwrap();
        let settings = AnalysisSettings::default();
        let equilibria = solve_nonlinear(&system, &SolverSettings::default()).unwrap();
        let records = analyze(&equilibria, &system, &settings).unwrap();
        assert_eq!(records.len(), 4);

        let label_at = |target: &EquilibriumPoint| {
            records
                .iter()
                .find(|r| &r.equilibrium == target)
                .map(|r| r.classify(&settings).unwrap())
        };
        assert_eq!(label_at(&point(0, 0)), Some(Classification::UnstableNode));
        assert_eq!(label_at(&point(3, 0)), Some(Classification::StableNode));
        assert_eq!(label_at(&point(0, 2)), Some(Classification::StableNode));
        assert_eq!(label_at(&point(1, 1)), Some(Classification::Saddle));
        for record in &records {
            assert_eq!(record.residual_norm, Some(0.0));
            assert_eq!(record.eigenpairs_symbolic.iter().map(|p| p.multiplicity).sum::<usize>(), 2);
        }
    }

    #[test]
    fn test_parametrized_points_are_skipped() {
        let system = NonlinearSystem::planar("a*x - y", "x + y - 1", &["a"]).unwrap();
        let equilibria = solve_nonlinear(&system, &SolverSettings::default()).unwrap();
        assert_eq!(equilibria.len(), 1);
        let records = analyze(&equilibria, &system, &AnalysisSettings::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parameter_dependent_jacobian() {
        let system = NonlinearSystem::planar("a*x", "y", &["a"]).unwrap();
        let settings = AnalysisSettings::default();
        let records = analyze(&[point(0, 0)], &system, &settings).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.jacobian_numeric.is_none());
        assert!(record.eigenpairs_numeric.is_none());
        assert!(record.residual_norm.is_none());
        assert_eq!(record.eigenpairs_symbolic.len(), 2);
        assert!(matches!(
            record.classify(&settings),
            Err(PlanarError::InvalidParameter(_))
        ));

        let bound = system.with_parameter_values(&[("a", -2.0)]).unwrap();
        let records = analyze(&[point(0, 0)], &bound, &settings).unwrap();
        assert_eq!(records[0].jacobian_numeric, Some(vec![-2.0, 0.0, 0.0, 1.0]));
        assert_eq!(records[0].classify(&settings).unwrap(), Classification::Saddle);
    }

    #[test]
    fn test_bad_tolerance_rejected() {
        let system = LinearSystem::from_row_slice(2, &[1.0, 0.0, 0.0, 1.0], None).unwrap();
        let settings = AnalysisSettings {
            tolerance: f64::NAN,
        };
        assert!(matches!(
            analyze_linear(&system, &settings),
            Err(PlanarError::InvalidParameter(_))
        ));
    }
}
