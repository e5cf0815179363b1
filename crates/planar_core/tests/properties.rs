//! Property-based tests for planar_core using proptest.
//!
//! Covers: linear equilibria, sweep ordering, classification stability.

use num_complex::Complex64;
use planar_core::bifurcation::scan;
use planar_core::classification::classify;
use planar_core::equilibrium::{solve_linear, Uniqueness};
use planar_core::settings::AnalysisSettings;
use planar_core::system::LinearSystem;
use planar_core::traits::VectorField;
use proptest::prelude::*;

fn nonzero() -> impl Strategy<Value = f64> {
    prop_oneof![-50.0..-1e-3f64, 1e-3..50.0f64]
}

proptest! {
    /// A diagonally dominant A is nonsingular and A x + B vanishes at the
    /// computed equilibrium.
    #[test]
    fn linear_equilibrium_zeroes_the_field(
        d0 in 3.0..6.0f64,
        d1 in 3.0..6.0f64,
        o0 in -1.0..1.0f64,
        o1 in -1.0..1.0f64,
        b0 in -10.0..10.0f64,
        b1 in -10.0..10.0f64,
    ) {
        let system = LinearSystem::from_row_slice(2, &[d0, o0, o1, -d1], Some(&[b0, b1])).unwrap();
        let eq = solve_linear(&system, 1e-10).unwrap();
        prop_assert_eq!(eq.uniqueness, Uniqueness::Unique);
        prop_assert!(eq.residual_norm < 1e-9, "residual {}", eq.residual_norm);
        prop_assert!(system.residual_norm(&eq.state) < 1e-9);
    }

    /// One sample per input value, in input order.
    #[test]
    fn scan_preserves_length_and_order(samples in prop::collection::vec(-10.0..10.0f64, 1..30)) {
        // Eigenvalues -1 ± iμ: never outside the taxonomy.
        let family = |mu: f64| LinearSystem::from_row_slice(2, &[-1.0, mu, -mu, -1.0], None);
        let result = scan(&samples, family, &AnalysisSettings::default()).unwrap();
        prop_assert_eq!(result.samples.len(), samples.len());
        for (sample, mu) in result.samples.iter().zip(&samples) {
            prop_assert_eq!(sample.parameter, *mu);
        }
    }

    /// Repeated classification agrees with itself and with a one-sample scan.
    #[test]
    fn classify_is_stable(l0 in nonzero(), l1 in nonzero()) {
        let values = [Complex64::new(l0, 0.0), Complex64::new(l1, 0.0)];
        let first = classify(&values, 1e-10).unwrap();
        let second = classify(&values, 1e-10).unwrap();
        prop_assert_eq!(first, second);

        let diagonal = LinearSystem::from_row_slice(2, &[l0, 0.0, 0.0, l1], None).unwrap();
        let result = scan(&[0.0], |_| Ok(diagonal.clone()), &AnalysisSettings::default()).unwrap();
        prop_assert_eq!(result.samples[0].classification, first);
    }
}
