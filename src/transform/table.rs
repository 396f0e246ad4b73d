//! Declarative transform table and the pointwise engine.
//!
//! Every Gran/Schwarz variant is `prefactor(v) · 10^(k ± r) / s`:
//!
//! - `prefactor` is `v` or `v + V` (V = initial analyte volume)
//! - the exponent sign depends on whether the variant tracks `[H+]` or `[OH-]`
//! - Gran variants use `k = 0`, `s = 1`
//!
//! Only the `(offset, sign)` pair differs between variants, so the table
//! stores just that.

use serde::{Deserialize, Serialize};

use crate::domain::{Analyte, Curve, GranIndex, RangeWarning, TransformFamily, TransformSpec};
use crate::error::TitrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeOffset {
    /// `v`
    Bare,
    /// `v + V`
    Initial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExponentSign {
    /// `10^(k - r)`
    Negative,
    /// `10^(k + r)`
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formula {
    pub offset: VolumeOffset,
    pub sign: ExponentSign,
}

const fn formula(offset: VolumeOffset, sign: ExponentSign) -> Formula {
    Formula { offset, sign }
}

use self::ExponentSign::{Negative, Positive};
use self::VolumeOffset::{Bare, Initial};

pub static GRAN_TABLE: [(Analyte, GranIndex, Formula); 8] = [
    (Analyte::StrongAcid, GranIndex::G1, formula(Initial, Negative)),
    (Analyte::StrongAcid, GranIndex::G2, formula(Initial, Positive)),
    (Analyte::StrongBase, GranIndex::G1, formula(Initial, Positive)),
    (Analyte::StrongBase, GranIndex::G2, formula(Initial, Negative)),
    (Analyte::WeakAcid, GranIndex::G1, formula(Bare, Negative)),
    (Analyte::WeakAcid, GranIndex::G2, formula(Initial, Positive)),
    (Analyte::WeakBase, GranIndex::G1, formula(Bare, Positive)),
    (Analyte::WeakBase, GranIndex::G2, formula(Initial, Negative)),
];

/// Schwarz variants exist for G1 only.
pub static SCHWARZ_TABLE: [(Analyte, Formula); 4] = [
    (Analyte::StrongAcid, formula(Initial, Negative)),
    (Analyte::StrongBase, formula(Initial, Positive)),
    (Analyte::WeakAcid, formula(Bare, Negative)),
    (Analyte::WeakBase, formula(Bare, Positive)),
];

/// Look up the formula of a `(family, analyte, index)` triple.
pub fn lookup(family: TransformFamily, analyte: Analyte, index: GranIndex) -> Result<Formula, TitrationError> {
    let found = match family {
        TransformFamily::Gran => GRAN_TABLE
            .iter()
            .find(|(a, i, _)| *a == analyte && *i == index)
            .map(|(_, _, f)| *f),
        TransformFamily::Schwarz if index == GranIndex::G1 => SCHWARZ_TABLE
            .iter()
            .find(|(a, _)| *a == analyte)
            .map(|(_, f)| *f),
        TransformFamily::Schwarz => None,
    };
    found.ok_or_else(|| {
        TitrationError::parameter(format!(
            "no {family:?} {} transform for {}",
            index.display_name(),
            analyte.display_name()
        ))
    })
}

/// A transformed curve and the points that had to be saturated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformed {
    pub spec: TransformSpec,
    pub curve: Curve,
    pub warnings: Vec<RangeWarning>,
}

/// Apply `spec` to every point of `curve`.
///
/// Values that overflow `f64` are saturated to `±f64::MAX` and reported as
/// [`RangeWarning`]s; the volume domain is unchanged.
pub fn transform(curve: &Curve, spec: &TransformSpec) -> Result<Transformed, TitrationError> {
    let formula = lookup(spec.family(), spec.analyte(), spec.index())?;
    let (k, divisor) = match spec.family() {
        TransformFamily::Gran => (0.0, 1.0),
        TransformFamily::Schwarz => (spec.constants().exponent_offset, spec.constants().divisor),
    };

    let mut values = Vec::with_capacity(curve.len());
    let mut warnings = Vec::new();

    for (index, (v, r)) in curve.points().enumerate() {
        if !r.is_finite() {
            return Err(TitrationError::domain(format!("response at v = {v} mL is not finite")));
        }
        let prefactor = match formula.offset {
            VolumeOffset::Bare => v,
            VolumeOffset::Initial => v + spec.initial_volume_ml(),
        } / divisor;
        let exponent = match formula.sign {
            ExponentSign::Negative => k - r,
            ExponentSign::Positive => k + r,
        };

        let value = if prefactor == 0.0 { 0.0 } else { prefactor * 10f64.powf(exponent) };
        if value.is_finite() {
            values.push(value);
        } else {
            let saturated = f64::MAX.copysign(prefactor);
            warnings.push(RangeWarning {
                index,
                volume_ml: v,
                exponent,
                value: saturated,
            });
            values.push(saturated);
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            transform = %spec.label(),
            count = warnings.len(),
            "transform overflowed; values saturated"
        );
    }

    Ok(Transformed {
        spec: *spec,
        curve: curve.with_responses(values)?,
        warnings,
    })
}

/// Human-readable formula, e.g. `(v+V)·10^(k-r)/s`.
pub fn formula_text(spec: &TransformSpec) -> String {
    let Ok(formula) = lookup(spec.family(), spec.analyte(), spec.index()) else {
        return "undefined".to_string();
    };
    let prefactor = match formula.offset {
        VolumeOffset::Bare => "v",
        VolumeOffset::Initial => "(v+V)",
    };
    let sign = match formula.sign {
        ExponentSign::Negative => "-",
        ExponentSign::Positive => "+",
    };
    match spec.family() {
        TransformFamily::Gran => format!("{prefactor}·10^({sign}r)"),
        TransformFamily::Schwarz => format!("{prefactor}·10^(k{sign}r)/s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchwarzConstants;

    fn flat(r: f64) -> Curve {
        Curve::new(vec![0.0, 1.0, 2.0], vec![r; 3]).unwrap()
    }

    #[test]
    fn table_covers_every_defined_variant() {
        for analyte in Analyte::ALL {
            for index in [GranIndex::G1, GranIndex::G2] {
                assert!(lookup(TransformFamily::Gran, analyte, index).is_ok());
            }
            assert!(lookup(TransformFamily::Schwarz, analyte, GranIndex::G1).is_ok());
            assert!(lookup(TransformFamily::Schwarz, analyte, GranIndex::G2).is_err());
        }
    }

    #[test]
    fn gran_values_match_the_closed_forms() {
        let curve = flat(3.0);
        let sa_g1 = TransformSpec::gran(Analyte::StrongAcid, GranIndex::G1, 25.0).unwrap();
        let out = transform(&curve, &sa_g1).unwrap();
        assert!((out.curve.responses()[1] - 26.0e-3).abs() < 1e-15);

        let wb_g1 = TransformSpec::gran(Analyte::WeakBase, GranIndex::G1, 25.0).unwrap();
        let out = transform(&curve, &wb_g1).unwrap();
        assert_eq!(out.curve.responses()[0], 0.0);
        assert!((out.curve.responses()[2] - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn schwarz_applies_offset_and_divisor() {
        let constants = SchwarzConstants {
            exponent_offset: 1.0,
            divisor: 4.0,
        };
        let spec = TransformSpec::schwarz(Analyte::StrongBase, 25.0, constants).unwrap();
        let out = transform(&flat(2.0), &spec).unwrap();
        // (1 + 25) * 10^(1 + 2) / 4
        assert!((out.curve.responses()[1] - 6500.0).abs() < 1e-9);
    }

    #[test]
    fn overflow_saturates_with_warning() {
        let spec = TransformSpec::gran(Analyte::StrongBase, GranIndex::G1, 25.0).unwrap();
        let out = transform(&flat(400.0), &spec).unwrap();
        assert_eq!(out.warnings.len(), 3);
        assert!(out.curve.responses().iter().all(|&v| v == f64::MAX));
        assert_eq!(out.warnings[0].index, 0);
    }

    #[test]
    fn zero_prefactor_never_overflows() {
        let spec = TransformSpec::gran(Analyte::WeakBase, GranIndex::G1, 25.0).unwrap();
        let out = transform(&flat(400.0), &spec).unwrap();
        assert_eq!(out.curve.responses()[0], 0.0);
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn formula_text_names_the_variant() {
        let spec = TransformSpec::gran(Analyte::WeakAcid, GranIndex::G1, 25.0).unwrap();
        assert_eq!(formula_text(&spec), "v·10^(-r)");
        let spec = TransformSpec::schwarz(Analyte::StrongAcid, 25.0, SchwarzConstants::default()).unwrap();
        assert_eq!(formula_text(&spec), "(v+V)·10^(k-r)/s");
    }
}
