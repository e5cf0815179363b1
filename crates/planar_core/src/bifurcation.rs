use crate::classification::{classify, Classification};
use crate::error::{PlanarError, Result};
use crate::family::LinearFamily;
use crate::linearization::eigenvalues;
use crate::settings::AnalysisSettings;
use crate::system::LinearSystem;
use serde::{Deserialize, Serialize};

/// Evenly spaced sweep over `[min, max]`, endpoints included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SweepRequest {
    pub fn samples(&self) -> Result<Vec<f64>> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PlanarError::InvalidParameter(format!(
                "sweep bounds must be finite, got [{}, {}].",
                self.min, self.max
            )));
        }
        if self.count == 0 {
            return Err(PlanarError::InvalidParameter(
                "the number of parameter values must be a positive integer.".to_string(),
            ));
        }
        if self.count == 1 {
            return Ok(vec![self.min]);
        }
        let step = (self.max - self.min) / (self.count - 1) as f64;
        Ok((0..self.count)
            .map(|i| {
                if i == self.count - 1 {
                    self.max
                } else {
                    self.min + step * i as f64
                }
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BifurcationSample {
    pub parameter: f64,
    pub classification: Classification,
}

/// Consecutive samples whose labels differ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub before: f64,
    pub after: f64,
    pub from: Classification,
    pub to: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BifurcationResult {
    pub samples: Vec<BifurcationSample>,
}

impl BifurcationResult {
    /// Labels in order of first appearance.
    pub fn distinct_classes(&self) -> Vec<Classification> {
        let mut out: Vec<Classification> = Vec::new();
        for sample in &self.samples {
            if !out.contains(&sample.classification) {
                out.push(sample.classification);
            }
        }
        out
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.samples
            .windows(2)
            .filter(|w| w[0].classification != w[1].classification)
            .map(|w| Transition {
                before: w[0].parameter,
                after: w[1].parameter,
                from: w[0].classification,
                to: w[1].classification,
            })
            .collect()
    }
}

fn validate_samples(samples: &[f64], settings: &AnalysisSettings) -> Result<()> {
    settings.validate()?;
    if samples.is_empty() {
        return Err(PlanarError::InvalidParameter(
            "bifurcation scan needs at least one parameter value.".to_string(),
        ));
    }
    if let Some(bad) = samples.iter().find(|v| !v.is_finite()) {
        return Err(PlanarError::InvalidParameter(format!(
            "parameter value {} is not finite.",
            bad
        )));
    }
    Ok(())
}

fn classify_sample<F>(parameter: f64, system_of: &F, tolerance: f64) -> Result<BifurcationSample>
where
    F: Fn(f64) -> Result<LinearSystem>,
{
    let system = system_of(parameter)?;
    let values = eigenvalues(system.matrix())?;
    let classification = classify(&values, tolerance)?;
    Ok(BifurcationSample {
        parameter,
        classification,
    })
}

/// Classifies `system_of(μ)` for every sample, in input order.
///
/// Only eigenvalues are inspected. The first failing sample aborts the scan.
pub fn scan<F>(samples: &[f64], system_of: F, settings: &AnalysisSettings) -> Result<BifurcationResult>
where
    F: Fn(f64) -> Result<LinearSystem>,
{
    validate_samples(samples, settings)?;
    let samples = samples
        .iter()
        .map(|&mu| classify_sample(mu, &system_of, settings.tolerance))
        .collect::<Result<Vec<_>>>()?;
    Ok(BifurcationResult { samples })
}

/// Same result as [`scan`], with samples computed on the rayon pool.
#[cfg(feature = "parallel")]
pub fn scan_parallel<F>(
    samples: &[f64],
    system_of: F,
    settings: &AnalysisSettings,
) -> Result<BifurcationResult>
where
    F: Fn(f64) -> Result<LinearSystem> + Sync,
{
    use rayon::prelude::*;

    validate_samples(samples, settings)?;
    let tolerance = settings.tolerance;
    let samples = samples
        .par_iter()
        .map(|&mu| classify_sample(mu, &system_of, tolerance))
        .collect::<Result<Vec<_>>>()?;
    Ok(BifurcationResult { samples })
}

/// Sweeps a parametrized family over a request.
pub fn scan_family(
    family: &LinearFamily,
    request: &SweepRequest,
    settings: &AnalysisSettings,
) -> Result<BifurcationResult> {
    let samples = request.samples()?;
    scan(&samples, |mu| family.system_at(mu), settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_samples() {
        let request = SweepRequest {
            min: -1.0,
            max: 1.0,
            count: 5,
        };
        assert_eq!(request.samples().unwrap(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        let single = SweepRequest { count: 1, ..request };
        assert_eq!(single.samples().unwrap(), vec![-1.0]);
        let empty = SweepRequest { count: 0, ..request };
        assert!(matches!(empty.samples(), Err(PlanarError::InvalidParameter(_))));
        let infinite = SweepRequest {
            max: f64::INFINITY,
            ..request
        };
        assert!(infinite.samples().is_err());
    }

    #[test]
    fn test_default_family_scan() {
        // trace = mu + 2, det = 2 mu + 4, discriminant = (mu + 2)(mu - 6).
        let family = LinearFamily::default_planar();
        let samples = [-5.0, -3.0, -1.0, 1.0, 7.0];
        let result = scan(&samples, |mu| family.system_at(mu), &AnalysisSettings::default()).unwrap();
        let labels: Vec<Classification> = result.samples.iter().map(|s| s.classification).collect();
        assert_eq!(
            labels,
            vec![
                Classification::Saddle,
                Classification::Saddle,
                Classification::UnstableFocus,
                Classification::UnstableFocus,
                Classification::UnstableNode,
            ]
        );
        let params: Vec<f64> = result.samples.iter().map(|s| s.parameter).collect();
        assert_eq!(params, samples.to_vec());
        assert_eq!(
            result.distinct_classes(),
            vec![
                Classification::Saddle,
                Classification::UnstableFocus,
                Classification::UnstableNode
            ]
        );
        let transitions = result.transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].before, -3.0);
        assert_eq!(transitions[0].after, -1.0);
        assert_eq!(transitions[1].to, Classification::UnstableNode);
    }

    #[test]
    fn test_center_and_degenerate() {
        let settings = AnalysisSettings::default();
        let center = LinearSystem::from_row_slice(2, &[0.0, -2.0, 2.0, 0.0], None).unwrap();
        let result = scan(&[0.0], |_| Ok(center.clone()), &settings).unwrap();
        assert_eq!(result.samples[0].classification, Classification::Center);
        let zero = LinearSystem::from_row_slice(2, &[0.0; 4], None).unwrap();
        let result = scan(&[0.0], |_| Ok(zero.clone()), &settings).unwrap();
        assert_eq!(result.samples[0].classification, Classification::DegenerateNode);
    }

    #[test]
    fn test_scan_rejects_bad_input() {
        let family = LinearFamily::default_planar();
        let settings = AnalysisSettings::default();
        assert!(matches!(
            scan(&[], |mu| family.system_at(mu), &settings),
            Err(PlanarError::InvalidParameter(_))
        ));
        assert!(matches!(
            scan(&[0.0, f64::NAN], |mu| family.system_at(mu), &settings),
            Err(PlanarError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unreachable_state_aborts_scan() {
        // One zero and one negative eigenvalue.
        let system = LinearSystem::from_row_slice(2, &[0.0, 0.0, 0.0, -1.0], None).unwrap();
        let result = scan(&[0.0, 1.0], |_| Ok(system.clone()), &AnalysisSettings::default());
        assert!(matches!(result, Err(PlanarError::UnreachableState { .. })));
    }

    #[test]
    fn test_scan_family_and_non_planar() {
        let family = LinearFamily::default_planar();
        let request = SweepRequest {
            min: 1.0,
            max: 3.0,
            count: 3,
        };
        let result = scan_family(&family, &request, &AnalysisSettings::default()).unwrap();
        assert_eq!(result.samples.len(), 3);

        let cube = LinearSystem::from_row_slice(1, &[1.0], None).unwrap();
        let result = scan(&[0.0], |_| Ok(cube.clone()), &AnalysisSettings::default());
        assert!(matches!(result, Err(PlanarError::ShapeMismatch { .. })));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let family = LinearFamily::default_planar();
        let samples = SweepRequest {
            min: -6.0,
            max: 6.0,
            count: 41,
        }
        .samples()
        .unwrap();
        let settings = AnalysisSettings::default();
        let sequential = scan(&samples, |mu| family.system_at(mu), &settings).unwrap();
        let parallel = scan_parallel(&samples, |mu| family.system_at(mu), &settings).unwrap();
        assert_eq!(sequential, parallel);
    }
}
