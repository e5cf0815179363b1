//! Parameter sweep binding.

use crate::system::{build_family, js_error, settings_from, to_js};
use anyhow::{bail, Result};
use planar_core::bifurcation::{scan_family, BifurcationSample, SweepRequest, Transition};
use planar_core::classification::Classification;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Serialize)]
pub(crate) struct ClassSummary {
    classification: Classification,
    description: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScanPayload {
    samples: Vec<BifurcationSample>,
    distinct: Vec<ClassSummary>,
    transitions: Vec<Transition>,
}

pub(crate) fn bifurcation_scan(
    entries_a: &[String],
    entries_b: &[String],
    parameter: &str,
    min: f64,
    max: f64,
    count: u32,
    tolerance: f64,
) -> Result<ScanPayload> {
    if !min.is_finite() || !max.is_finite() {
        bail!("Sweep bounds must be finite.");
    }
    if count == 0 {
        bail!("Number of parameter values must be positive.");
    }
    let settings = settings_from(tolerance)?;
    let family = build_family(entries_a, entries_b, parameter)?;
    let request = SweepRequest {
        min,
        max,
        count: count as usize,
    };
    let result = scan_family(&family, &request, &settings)?;
    let distinct = result
        .distinct_classes()
        .into_iter()
        .map(|classification| ClassSummary {
            classification,
            description: classification.describe(),
        })
        .collect();
    Ok(ScanPayload {
        transitions: result.transitions(),
        distinct,
        samples: result.samples,
    })
}

/// Classifies the family at `count` evenly spaced values in `[min, max]`.
#[wasm_bindgen]
pub fn run_bifurcation_scan(
    entries_a: Vec<String>,
    entries_b: Vec<String>,
    parameter: String,
    min: f64,
    max: f64,
    count: u32,
    tolerance: f64,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let payload = bifurcation_scan(
        &entries_a, &entries_b, &parameter, min, max, count, tolerance,
    )
    .map_err(js_error)?;
    to_js(&payload)
}
