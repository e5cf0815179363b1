use crate::error::{PlanarError, Result};
use crate::linearization::clean;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Qualitative type of a planar equilibrium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    StableNode,
    UnstableNode,
    Saddle,
    Center,
    StableFocus,
    UnstableFocus,
    DegenerateNode,
    Unclassified,
}

impl Classification {
    pub fn describe(&self) -> &'static str {
        match self {
            Classification::StableNode => "Stable node (real negative eigenvalues)",
            Classification::UnstableNode => "Unstable node (real positive eigenvalues)",
            Classification::Saddle => "Saddle point (real eigenvalues of opposite signs)",
            Classification::Center => "Center (purely imaginary eigenvalues)",
            Classification::StableFocus => {
                "Stable focus (complex eigenvalues with negative real part)"
            }
            Classification::UnstableFocus => {
                "Unstable focus (complex eigenvalues with positive real part)"
            }
            Classification::DegenerateNode => "Degenerate node (zero eigenvalues)",
            Classification::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Shape of a cleaned spectrum, derived once before the decision procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumKind {
    /// At least one eigenvalue has a nonzero imaginary part; carries the
    /// signs of the real parts.
    Complex(Ordering, Ordering),
    /// All eigenvalues are real; carries their signs.
    Real(Ordering, Ordering),
}

impl SpectrumKind {
    pub fn of(pair: [Complex64; 2]) -> Self {
        let sign = |v: f64| v.partial_cmp(&0.0).unwrap_or(Ordering::Equal);
        let (s0, s1) = (sign(pair[0].re), sign(pair[1].re));
        if pair[0].im != 0.0 || pair[1].im != 0.0 {
            SpectrumKind::Complex(s0, s1)
        } else {
            SpectrumKind::Real(s0, s1)
        }
    }
}

/// Maps a planar eigenvalue pair onto the taxonomy.
///
/// Eigenvalues are cleaned at `tolerance` first. The complex branch is
/// checked before the real one. A spectrum that matches no branch (e.g. a
/// complex pair with real parts of mixed sign) is an `UnreachableState`.
pub fn classify(eigenvalues: &[Complex64], tolerance: f64) -> Result<Classification> {
    if eigenvalues.len() != 2 {
        return Err(PlanarError::shape(
            "classification",
            "2 eigenvalues",
            format!("{} eigenvalues", eigenvalues.len()),
        ));
    }
    let cleaned = clean(eigenvalues, tolerance);
    let pair = [cleaned[0], cleaned[1]];

    use Ordering::{Equal as Zero, Greater as Pos, Less as Neg};
    let label = match SpectrumKind::of(pair) {
        SpectrumKind::Complex(Zero, Zero) => Classification::Center,
        SpectrumKind::Complex(Neg, Neg) => Classification::StableFocus,
        SpectrumKind::Complex(Pos, Pos) => Classification::UnstableFocus,
        SpectrumKind::Real(Pos, Pos) => Classification::UnstableNode,
        SpectrumKind::Real(Neg, Neg) => Classification::StableNode,
        SpectrumKind::Real(Pos, Neg) | SpectrumKind::Real(Neg, Pos) => Classification::Saddle,
        SpectrumKind::Real(Zero, Zero) => Classification::DegenerateNode,
        _ => Classification::Unclassified,
    };

    if label == Classification::Unclassified {
        return Err(PlanarError::UnreachableState {
            eigenvalues: cleaned,
        });
    }
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn label(values: &[Complex64]) -> Result<Classification> {
        classify(values, 1e-10)
    }

    #[test]
    fn test_real_branch() {
        assert_eq!(label(&[c(-1.0, 0.0), c(-2.0, 0.0)]).unwrap(), Classification::StableNode);
        assert_eq!(label(&[c(1.0, 0.0), c(3.0, 0.0)]).unwrap(), Classification::UnstableNode);
        assert_eq!(label(&[c(1.0, 0.0), c(-1.0, 0.0)]).unwrap(), Classification::Saddle);
        assert_eq!(label(&[c(0.0, 0.0), c(0.0, 0.0)]).unwrap(), Classification::DegenerateNode);
    }

    #[test]
    fn test_repeated_real_eigenvalues_are_nodes() {
        assert_eq!(label(&[c(-2.0, 0.0), c(-2.0, 0.0)]).unwrap(), Classification::StableNode);
        assert_eq!(label(&[c(2.0, 0.0), c(2.0, 0.0)]).unwrap(), Classification::UnstableNode);
    }

    #[test]
    fn test_complex_branch() {
        assert_eq!(label(&[c(0.0, 2.0), c(0.0, -2.0)]).unwrap(), Classification::Center);
        assert_eq!(label(&[c(-0.5, 1.0), c(-0.5, -1.0)]).unwrap(), Classification::StableFocus);
        assert_eq!(label(&[c(0.5, 1.0), c(0.5, -1.0)]).unwrap(), Classification::UnstableFocus);
    }

    #[test]
    fn test_tolerance_cleanup() {
        let tiny = label(&[c(1e-12, 0.0), c(-1e-12, 0.0)]).unwrap();
        assert_eq!(tiny, Classification::DegenerateNode);
        // Imaginary noise does not push a real pair into the complex branch.
        let noisy = label(&[c(-1.0, 1e-13), c(-2.0, -1e-13)]).unwrap();
        assert_eq!(noisy, Classification::StableNode);
        // Real-part noise on a purely imaginary pair still gives a center.
        let center = label(&[c(1e-11, 2.0), c(-1e-11, -2.0)]).unwrap();
        assert_eq!(center, Classification::Center);
    }

    #[test]
    fn test_unreachable_and_shape() {
        // Zero and nonzero real eigenvalue: no branch applies.
        let err = label(&[c(0.0, 0.0), c(-1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, PlanarError::UnreachableState { .. }));
        let err = label(&[c(1.0, 1.0), c(-1.0, -1.0)]).unwrap_err();
        assert!(matches!(err, PlanarError::UnreachableState { .. }));
        assert!(matches!(
            label(&[c(1.0, 0.0)]),
            Err(PlanarError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let values = [c(0.3, 0.0), c(-0.7, 0.0)];
        let first = label(&values).unwrap();
        let second = label(&values).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), first.describe());
    }
}
