//! Property-based tests using proptest.
//!
//! These check invariants over random titration parameters and curves
//! rather than the fixed reference datasets.

use grantit::chemistry::{landmarks, point_at, simulate};
use grantit::domain::{Branch, BranchModel, Chemistry, Curve, SchwarzConstants, TitrationParameters};
use grantit::math::{derivative, second_derivative};
use grantit::transform::transform_bank;
use proptest::prelude::*;

fn chemistry_strategy() -> impl Strategy<Value = Chemistry> {
    prop::sample::select(Chemistry::ALL.to_vec())
}

// --- Property Test 1: grid shape ---

proptest! {
    /// Every chemistry yields `floor(Vmax/step) + 1` strictly increasing
    /// volumes and finite responses for any valid dosing.
    #[test]
    fn simulation_grid_matches_the_dosing(
        chemistry in chemistry_strategy(),
        ca in 0.001_f64..1.0,
        v0 in 5.0_f64..100.0,
        ct in 0.001_f64..1.0,
        steps in 2_usize..200,
        step in 0.05_f64..2.0,
    ) {
        let mut params = TitrationParameters::preset(chemistry);
        params.analyte_concentration = ca;
        params.analyte_volume_ml = v0;
        params.titrant_concentration = ct;
        params.step_ml = step;
        params.max_volume_ml = step * steps as f64;

        let sim = simulate(&params, chemistry).unwrap();
        prop_assert_eq!(sim.records.len(), params.step_count());
        prop_assert_eq!(sim.records.len(), steps + 1);
        prop_assert!(sim.records.windows(2).all(|w| w[1].volume_ml > w[0].volume_ml));
        prop_assert!(sim.records.iter().all(|r| r.response.is_finite()));
        prop_assert!(sim.records.iter().all(|r| (r.total_volume_ml - v0 - r.volume_ml).abs() < 1e-9));
    }
}

// --- Property Test 2: acid curves rise, base curves fall ---

proptest! {
    /// Adding strong base never lowers the pH of an acid (and vice versa).
    #[test]
    fn bounded_curves_are_monotone_on_the_grid(
        chemistry in chemistry_strategy(),
        ct in 0.05_f64..0.2,
    ) {
        let mut params = TitrationParameters::preset(chemistry);
        params.titrant_concentration = ct;
        let curve = simulate(&params, chemistry).unwrap().curve().unwrap();
        let r = curve.responses();
        let rising = !matches!(chemistry, Chemistry::StrongBase | Chemistry::WeakBase);
        for w in r.windows(2) {
            if rising {
                prop_assert!(w[1] >= w[0] - 1e-9, "{:?} fell: {} -> {}", chemistry, w[0], w[1]);
            } else {
                prop_assert!(w[1] <= w[0] + 1e-9, "{:?} rose: {} -> {}", chemistry, w[0], w[1]);
            }
        }
    }
}

// --- Property Test 3: amphiprotic first equivalence ---

proptest! {
    /// The diprotic first equivalence reads ½(pKa1 + pKa2) whatever the
    /// concentrations and analyte volume.
    #[test]
    fn diprotic_first_equivalence_ignores_concentration(
        ca in 0.001_f64..1.0,
        v0 in 5.0_f64..100.0,
        ct in 0.001_f64..1.0,
        model in prop::sample::select(vec![BranchModel::Classic, BranchModel::Bounded]),
    ) {
        let mut params = TitrationParameters::preset(Chemistry::Diprotic);
        params.analyte_concentration = ca;
        params.analyte_volume_ml = v0;
        params.titrant_concentration = ct;

        let v1 = landmarks(&params, Chemistry::Diprotic).first_equivalence_ml;
        let rec = point_at(&params, Chemistry::Diprotic, model, v1).unwrap();
        prop_assert_eq!(rec.branch, Branch::FirstEquivalence);
        prop_assert!((rec.response - 4.5).abs() < 1e-12, "{}", rec.response);
    }
}

// --- Property Test 4: derivatives keep the domain ---

proptest! {
    /// Derivatives preserve the volume axis, and the second derivative is
    /// the derivative applied twice.
    #[test]
    fn derivatives_preserve_the_domain(
        gaps in prop::collection::vec(0.05_f64..2.0, 2..60),
        coeffs in (-5.0_f64..5.0, -5.0_f64..5.0, -1.0_f64..1.0),
    ) {
        let mut volumes = Vec::with_capacity(gaps.len() + 1);
        let mut v = 0.0;
        volumes.push(v);
        for g in &gaps {
            v += g;
            volumes.push(v);
        }
        let (a, b, c) = coeffs;
        let responses: Vec<f64> = volumes.iter().map(|v| a + b * v + c * v * v).collect();
        let curve = Curve::new(volumes.clone(), responses).unwrap();

        let d1 = derivative(&curve).unwrap();
        prop_assert_eq!(d1.volumes(), curve.volumes());
        let d2 = second_derivative(&curve).unwrap();
        let twice = derivative(&d1).unwrap();
        prop_assert_eq!(d2.responses(), twice.responses());

        // The interior formula is exact for quadratics.
        for i in 1..volumes.len() - 1 {
            let exact = b + 2.0 * c * volumes[i];
            prop_assert!((d1.responses()[i] - exact).abs() < 1e-4 * exact.abs().max(1.0));
        }
    }
}

// --- Property Test 5: transforms keep the domain ---

proptest! {
    /// Every bank transform returns one finite value per input point, and
    /// each saturated value is accompanied by a range warning.
    #[test]
    fn transform_bank_preserves_length(
        chemistry in chemistry_strategy(),
        initial_volume in 0.0_f64..100.0,
        k in -3.0_f64..3.0,
    ) {
        let params = TitrationParameters::preset(chemistry);
        let curve = simulate(&params, chemistry).unwrap().curve().unwrap();
        let constants = SchwarzConstants { exponent_offset: k, divisor: 1.0 };
        let bank = transform_bank(&curve, initial_volume, constants).unwrap();
        prop_assert_eq!(bank.len(), 12);
        for t in &bank {
            prop_assert_eq!(t.curve.volumes(), curve.volumes());
            prop_assert!(t.curve.responses().iter().all(|g| g.is_finite()));
            let saturated = t.curve.responses().iter().filter(|g| g.abs() == f64::MAX).count();
            prop_assert_eq!(saturated, t.warnings.len());
        }
    }
}
