//! Input conversion and error plumbing shared by the bindings.

use anyhow::{bail, Context, Result};
use planar_core::family::LinearFamily;
use planar_core::settings::AnalysisSettings;
use planar_core::system::LinearSystem;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

pub(crate) fn settings_from(tolerance: f64) -> Result<AnalysisSettings> {
    AnalysisSettings::new(tolerance).context("Invalid tolerance")
}

/// `b` empty means a homogeneous system.
pub(crate) fn build_linear_system(a: &[f64], b: &[f64], dim: usize) -> Result<LinearSystem> {
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    let offset = if b.is_empty() { None } else { Some(b) };
    LinearSystem::from_row_slice(dim, a, offset).context("Invalid linear system")
}

/// Family from expression entries; no `A` entries selects `[[mu, -2], [2, 2]]`.
pub(crate) fn build_family(
    entries_a: &[String],
    entries_b: &[String],
    parameter: &str,
) -> Result<LinearFamily> {
    if entries_a.is_empty() {
        return Ok(LinearFamily::default_planar());
    }
    let dim = (entries_a.len() as f64).sqrt().round() as usize;
    if dim * dim != entries_a.len() {
        bail!(
            "Matrix A needs a square number of entries, got {}.",
            entries_a.len()
        );
    }
    let a: Vec<&str> = entries_a.iter().map(String::as_str).collect();
    let b: Vec<&str> = entries_b.iter().map(String::as_str).collect();
    let offset = if b.is_empty() { None } else { Some(b.as_slice()) };
    LinearFamily::parse(dim, &a, offset, parameter).context("Invalid parameter family")
}

pub(crate) fn js_error(err: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{:#}", err)).into()
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
