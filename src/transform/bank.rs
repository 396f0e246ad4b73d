//! Batch evaluation: every variant at once, or one Schwarz variant over a
//! range of exponent offsets.

use rayon::prelude::*;

use crate::domain::{Analyte, Curve, GranIndex, SchwarzConstants, TransformSpec};
use crate::error::TitrationError;

use super::table::{Transformed, transform};

/// Exponent offsets of the classic k-sweep.
pub const DEFAULT_SWEEP_KS: [f64; 5] = [0.99, 0.9, 1.0, 1.1, 1.11];

/// The 8 Gran variants followed by the 4 Schwarz variants.
pub fn all_specs(initial_volume_ml: f64, constants: SchwarzConstants) -> Result<Vec<TransformSpec>, TitrationError> {
    let mut specs = Vec::with_capacity(12);
    for analyte in Analyte::ALL {
        for index in [GranIndex::G1, GranIndex::G2] {
            specs.push(TransformSpec::gran(analyte, index, initial_volume_ml)?);
        }
    }
    for analyte in Analyte::ALL {
        specs.push(TransformSpec::schwarz(analyte, initial_volume_ml, constants)?);
    }
    Ok(specs)
}

/// Evaluate every variant of [`all_specs`] in parallel. Output order matches
/// `all_specs`.
pub fn transform_bank(
    curve: &Curve,
    initial_volume_ml: f64,
    constants: SchwarzConstants,
) -> Result<Vec<Transformed>, TitrationError> {
    let specs = all_specs(initial_volume_ml, constants)?;
    tracing::debug!(variants = specs.len(), points = curve.len(), "evaluating transform bank");
    specs.par_iter().map(|spec| transform(curve, spec)).collect()
}

/// One Schwarz variant evaluated for each exponent offset in `ks`, in order.
pub fn schwarz_sweep(
    curve: &Curve,
    analyte: Analyte,
    initial_volume_ml: f64,
    ks: &[f64],
    divisor: f64,
) -> Result<Vec<Transformed>, TitrationError> {
    let specs = ks
        .iter()
        .map(|&k| {
            TransformSpec::schwarz(
                analyte,
                initial_volume_ml,
                SchwarzConstants {
                    exponent_offset: k,
                    divisor,
                },
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    specs.par_iter().map(|spec| transform(curve, spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransformFamily;

    fn curve() -> Curve {
        let v: Vec<f64> = (0..=10).map(f64::from).collect();
        let r = v.iter().map(|x| 2.0 + 0.5 * x).collect();
        Curve::new(v, r).unwrap()
    }

    #[test]
    fn bank_has_twelve_variants_in_order() {
        let out = transform_bank(&curve(), 25.0, SchwarzConstants::default()).unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(out[0].spec.label(), "strong-acid G1");
        assert_eq!(out[7].spec.label(), "weak-base G2");
        assert!(out[8..].iter().all(|t| t.spec.family() == TransformFamily::Schwarz));

        let sequential: Vec<_> = all_specs(25.0, SchwarzConstants::default())
            .unwrap()
            .iter()
            .map(|s| transform(&curve(), s).unwrap())
            .collect();
        assert_eq!(out, sequential);
    }

    #[test]
    fn sweep_scales_by_powers_of_ten() {
        let out = schwarz_sweep(&curve(), Analyte::StrongAcid, 25.0, &[1.0, 2.0], 1.0).unwrap();
        assert_eq!(out.len(), 2);
        for (a, b) in out[0].curve.responses().iter().zip(out[1].curve.responses()) {
            assert!((b / a - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn sweep_rejects_bad_divisor() {
        assert!(schwarz_sweep(&curve(), Analyte::WeakAcid, 25.0, &DEFAULT_SWEEP_KS, 0.0).is_err());
    }
}
