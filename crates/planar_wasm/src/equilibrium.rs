//! Exact equilibria of nonlinear systems.

use crate::system::{js_error, settings_from, to_js};
use anyhow::Result;
use planar_core::analysis::{analyze, AnalysisRecord};
use planar_core::classification::Classification;
use planar_core::equilibrium::{solve_nonlinear, EquilibriumPoint};
use planar_core::error::PlanarError;
use planar_core::settings::SolverSettings;
use planar_core::system::NonlinearSystem;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
pub(crate) struct RecordPayload {
    record: AnalysisRecord,
    classification: Option<Classification>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EquilibriaPayload {
    equilibria: Vec<EquilibriumPoint>,
    records: Vec<RecordPayload>,
}

pub(crate) fn equilibria_of(
    equations: &[String],
    variables: &[String],
    parameters: &[String],
    tolerance: f64,
) -> Result<EquilibriaPayload> {
    let settings = settings_from(tolerance)?;
    let equations: Vec<&str> = equations.iter().map(String::as_str).collect();
    let variables: Vec<&str> = if variables.is_empty() {
        vec!["x", "y"]
    } else {
        variables.iter().map(String::as_str).collect()
    };
    let parameters: Vec<&str> = parameters.iter().map(String::as_str).collect();

    let system = NonlinearSystem::parse(&equations, &variables, &parameters)?;
    let equilibria = solve_nonlinear(&system, &SolverSettings::default())?;
    let records = analyze(&equilibria, &system, &settings)?
        .into_iter()
        .map(|record| -> Result<RecordPayload> {
            let classification = if system.dimension() == 2 && record.eigenpairs_numeric.is_some() {
                match record.classify(&settings) {
                    Ok(label) => Some(label),
                    Err(PlanarError::UnreachableState { .. }) => None,
                    Err(err) => return Err(err.into()),
                }
            } else {
                None
            };
            Ok(RecordPayload {
                record,
                classification,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(EquilibriaPayload {
        equilibria,
        records,
    })
}

/// Solves `F = 0` exactly and analyzes every concrete equilibrium.
///
/// Empty `variables` means `x, y`.
#[wasm_bindgen]
pub fn find_equilibria(
    equations: Vec<String>,
    variables: Vec<String>,
    parameters: Vec<String>,
    tolerance: f64,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let payload =
        equilibria_of(&equations, &variables, &parameters, tolerance).map_err(js_error)?;
    to_js(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn competing_species_has_one_saddle() {
        let payload = equilibria_of(
            &strings(&["x*(3 - x - 2*y)", "y*(2 - x - y)"]),
            &[],
            &[],
            1e-10,
        )
        .expect("equilibria");
        assert_eq!(payload.equilibria.len(), 4);
        assert_eq!(payload.records.len(), 4);
        let saddles = payload
            .records
            .iter()
            .filter(|r| r.classification == Some(Classification::Saddle))
            .count();
        assert_eq!(saddles, 1);
    }

    #[test]
    fn parametrized_equilibria_are_listed_but_not_analyzed() {
        let payload = equilibria_of(
            &strings(&["a*x - y", "x + y - 1"]),
            &[],
            &strings(&["a"]),
            1e-10,
        )
        .expect("equilibria");
        assert_eq!(payload.equilibria.len(), 1);
        assert!(payload.records.is_empty());
    }

    #[test]
    fn parse_errors_surface() {
        assert!(equilibria_of(&strings(&["x +", "y"]), &[], &[], 1e-10).is_err());
    }
}
