//! Curve validation.
//!
//! Runs before anything consumes a raw `(volume, response)` sequence:
//! - structural problems (too few rows, non-finite values, volumes that do not
//!   strictly increase) are fatal: `ok = false`
//! - responses outside the typical range of the response kind are reported but
//!   do not block downstream use

use crate::domain::{MIN_CURVE_POINTS, ResponseKind, Sample, ValidationReport, ValidationWarning};

/// Validate raw samples for use as a curve of `kind`.
pub fn validate(samples: &[Sample], kind: ResponseKind) -> ValidationReport {
    let volumes: Vec<f64> = samples.iter().map(|s| s.volume).collect();
    let responses: Vec<f64> = samples.iter().map(|s| s.response).collect();

    let mut warnings = Vec::new();
    if let Some(problem) = structural_problem(&volumes, &responses) {
        warnings.push(problem);
    }
    if let Some(range) = range_warning(&responses, kind) {
        warnings.push(range);
    }

    let ok = !warnings.iter().any(ValidationWarning::is_fatal);
    if !ok {
        tracing::warn!(n = samples.len(), "curve failed validation");
    }
    ValidationReport { ok, warnings }
}

/// First fatal problem of a `(volumes, responses)` pair, if any.
///
/// Shared with [`crate::domain::Curve::new`] so the constructor and the
/// validator can never disagree.
pub(crate) fn structural_problem(volumes: &[f64], responses: &[f64]) -> Option<ValidationWarning> {
    let n = volumes.len().min(responses.len());
    if n < MIN_CURVE_POINTS {
        return Some(ValidationWarning::TooFewPoints { n });
    }

    for i in 0..n {
        if !(volumes[i].is_finite() && responses[i].is_finite()) {
            return Some(ValidationWarning::NonFinite { index: i });
        }
    }

    for i in 1..n {
        if volumes[i] <= volumes[i - 1] {
            return Some(ValidationWarning::NonMonotonic {
                index: i,
                previous_ml: volumes[i - 1],
                volume_ml: volumes[i],
            });
        }
    }

    None
}

fn range_warning(responses: &[f64], kind: ResponseKind) -> Option<ValidationWarning> {
    let (lo, hi) = kind.typical_bounds();
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &r in responses.iter().filter(|r| r.is_finite()) {
        min = min.min(r);
        max = max.max(r);
        if r < lo || r > hi {
            count += 1;
        }
    }

    (count > 0).then_some(ValidationWarning::ResponseOutOfRange { kind, count, min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(rows: &[(f64, f64)]) -> Vec<Sample> {
        rows.iter().map(|&(v, r)| Sample::new(v, r)).collect()
    }

    #[test]
    fn clean_ph_curve_is_ok_without_warnings() {
        let report = validate(&samples(&[(0.0, 1.0), (1.0, 1.1), (2.0, 1.2)]), ResponseKind::Ph);
        assert!(report.ok);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn non_monotonic_volumes_fail() {
        let report = validate(&samples(&[(0.0, 1.0), (2.0, 1.1), (1.0, 1.2)]), ResponseKind::Ph);
        assert!(!report.ok);
        assert_eq!(
            report.warnings[0],
            ValidationWarning::NonMonotonic {
                index: 2,
                previous_ml: 2.0,
                volume_ml: 1.0
            }
        );
    }

    #[test]
    fn repeated_volume_fails() {
        let report = validate(&samples(&[(0.0, 1.0), (1.0, 1.1), (1.0, 1.2)]), ResponseKind::Ph);
        assert!(!report.ok);
    }

    #[test]
    fn out_of_range_ph_is_only_a_warning() {
        let report = validate(&samples(&[(0.0, -0.5), (1.0, 7.0), (2.0, 14.5)]), ResponseKind::Ph);
        assert!(report.ok);
        assert_eq!(report.warnings.len(), 1);
        match &report.warnings[0] {
            ValidationWarning::ResponseOutOfRange { count, min, max, .. } => {
                assert_eq!(*count, 2);
                assert_eq!(*min, -0.5);
                assert_eq!(*max, 14.5);
            }
            other => panic!("unexpected warning: {other:?}"),
        }
    }

    #[test]
    fn potential_uses_millivolt_bounds() {
        let rows = samples(&[(0.0, -350.0), (1.0, 120.0), (2.0, 480.0)]);
        assert!(validate(&rows, ResponseKind::Potential).warnings.is_empty());
        // The same data read as pH is out of range.
        assert!(!validate(&rows, ResponseKind::Ph).warnings.is_empty());

        let rows = samples(&[(0.0, -2500.0), (1.0, 0.0)]);
        let report = validate(&rows, ResponseKind::Potential);
        assert!(report.ok);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn single_row_and_nan_are_fatal() {
        assert!(!validate(&samples(&[(0.0, 1.0)]), ResponseKind::Ph).ok);
        assert!(!validate(&samples(&[(0.0, 1.0), (1.0, f64::NAN)]), ResponseKind::Ph).ok);
    }
}
