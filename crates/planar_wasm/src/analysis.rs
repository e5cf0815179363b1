//! Single-system analysis bindings.

use crate::system::{build_family, build_linear_system, js_error, settings_from, to_js};
use anyhow::{bail, Result};
use planar_core::analysis::{analyze_linear, LinearAnalysis};
use wasm_bindgen::prelude::*;

pub(crate) fn linear_analysis(
    a: &[f64],
    b: &[f64],
    dim: usize,
    tolerance: f64,
) -> Result<LinearAnalysis> {
    let settings = settings_from(tolerance)?;
    let system = build_linear_system(a, b, dim)?;
    Ok(analyze_linear(&system, &settings)?)
}

pub(crate) fn family_analysis_at(
    entries_a: &[String],
    entries_b: &[String],
    parameter: &str,
    value: f64,
    tolerance: f64,
) -> Result<LinearAnalysis> {
    if !value.is_finite() {
        bail!("Parameter value must be finite.");
    }
    let settings = settings_from(tolerance)?;
    let family = build_family(entries_a, entries_b, parameter)?;
    let system = family.system_at(value)?;
    Ok(analyze_linear(&system, &settings)?)
}

/// Equilibrium, eigenpairs and classification of `x' = A x + B`.
///
/// `a` is row-major; pass an empty `b` for a homogeneous system.
#[wasm_bindgen]
pub fn analyze_linear_system(
    a: Vec<f64>,
    b: Vec<f64>,
    dim: u32,
    tolerance: f64,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let analysis = linear_analysis(&a, &b, dim as usize, tolerance).map_err(js_error)?;
    to_js(&analysis)
}

/// Analyzes one member of a parameter family.
#[wasm_bindgen]
pub fn analyze_family_at(
    entries_a: Vec<String>,
    entries_b: Vec<String>,
    parameter: String,
    value: f64,
    tolerance: f64,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let analysis = family_analysis_at(&entries_a, &entries_b, &parameter, value, tolerance)
        .map_err(js_error)?;
    to_js(&analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_core::classification::Classification;

    #[test]
    fn linear_analysis_classifies_saddle() {
        let analysis = linear_analysis(&[0.1, 0.4, 0.4, -0.1], &[], 2, 1e-10).expect("analysis");
        assert_eq!(analysis.classification, Some(Classification::Saddle));
        assert_eq!(analysis.equilibrium.state, vec![0.0, 0.0]);
    }

    #[test]
    fn family_analysis_uses_default_family() {
        let analysis = family_analysis_at(&[], &[], "mu", 1.0, 1e-10).expect("analysis");
        assert_eq!(analysis.classification, Some(Classification::UnstableFocus));
        assert_eq!(analysis.jacobian, vec![1.0, -2.0, 2.0, 2.0]);
    }

    #[test]
    fn family_analysis_rejects_non_finite_value() {
        let err = family_analysis_at(&[], &[], "mu", f64::NAN, 1e-10).unwrap_err();
        assert!(format!("{err}").contains("finite"));
    }
}
