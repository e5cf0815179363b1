//! WASM bindings for `planar_core`.
//!
//! Each binding validates its arguments, runs the core computation and hands
//! the result back as a serialized JS value.

mod analysis;
mod bifurcation;
mod equilibrium;
mod system;

pub use analysis::{analyze_family_at, analyze_linear_system};
pub use bifurcation::run_bifurcation_scan;
pub use equilibrium::find_equilibria;
