use crate::error::{PlanarError, Result};
use serde::{Deserialize, Serialize};

/// Numeric tolerance shared by eigenvalue cleanup, rank tests and
/// classification. Always passed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub tolerance: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { tolerance: 1e-10 }
    }
}

impl AnalysisSettings {
    pub fn new(tolerance: f64) -> Result<Self> {
        let settings = Self { tolerance };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PlanarError::InvalidParameter(format!(
                "tolerance must be finite and non-negative, got {}.",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Limits for the exact equilibrium solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Largest |constant| or |leading| integer coefficient for which the
    /// rational-root search enumerates divisors.
    pub max_rational_root_bound: i128,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_rational_root_bound: 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_validation() {
        assert!(AnalysisSettings::default().validate().is_ok());
        assert!(AnalysisSettings::new(0.0).is_ok());
        assert!(matches!(
            AnalysisSettings::new(-1e-3),
            Err(PlanarError::InvalidParameter(_))
        ));
        assert!(AnalysisSettings::new(f64::NAN).is_err());
    }
}
