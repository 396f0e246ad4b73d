//! Discrete derivatives of a curve.
//!
//! Interior points use the second-order central difference for non-uniform
//! spacing:
//!
//! ```text
//! f'(x_i) ≈ (h_l²·f(x_{i+1}) − h_r²·f(x_{i−1}) + (h_r² − h_l²)·f(x_i))
//!           / (h_l·h_r·(h_l + h_r))
//! ```
//!
//! with `h_l = x_i − x_{i−1}` and `h_r = x_{i+1} − x_i`. Both ends use
//! first-order one-sided differences, so the output always has the input's
//! length and volume domain.

use serde::{Deserialize, Serialize};

use crate::domain::Curve;
use crate::error::TitrationError;

/// First derivative `dr/dv` of `curve`.
pub fn derivative(curve: &Curve) -> Result<Curve, TitrationError> {
    let x = curve.volumes();
    let f = curve.responses();
    let n = x.len();

    let mut out = Vec::with_capacity(n);
    out.push((f[1] - f[0]) / (x[1] - x[0]));
    for i in 1..n.saturating_sub(1) {
        let hl = x[i] - x[i - 1];
        let hr = x[i + 1] - x[i];
        let num = hl * hl * f[i + 1] - hr * hr * f[i - 1] + (hr * hr - hl * hl) * f[i];
        out.push(num / (hl * hr * (hl + hr)));
    }
    out.push((f[n - 1] - f[n - 2]) / (x[n - 1] - x[n - 2]));

    if let Some(i) = out.iter().position(|d| !d.is_finite()) {
        return Err(TitrationError::domain(format!(
            "derivative is not finite at v = {} mL",
            x[i]
        )));
    }
    curve.with_responses(out)
}

/// Second derivative: the derivative applied twice.
pub fn second_derivative(curve: &Curve) -> Result<Curve, TitrationError> {
    derivative(&derivative(curve)?)
}

/// Shape landmarks read off the derivative curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivativeSummary {
    /// Volume with the largest `|dr/dv|`.
    pub steepest_volume_ml: f64,
    /// Signed first derivative at that volume.
    pub steepest_slope: f64,
    /// Zero crossing of the second derivative nearest the steepest point,
    /// linearly interpolated between the bracketing samples.
    pub inflection_volume_ml: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeSet {
    pub first: Curve,
    pub second: Curve,
    pub summary: DerivativeSummary,
}

/// First and second derivatives plus a summary of their shape.
pub fn analyze(curve: &Curve) -> Result<DerivativeSet, TitrationError> {
    let first = derivative(curve)?;
    let second = derivative(&first)?;
    let summary = summarize(&first, &second);
    Ok(DerivativeSet { first, second, summary })
}

fn summarize(first: &Curve, second: &Curve) -> DerivativeSummary {
    let v = first.volumes();
    let d1 = first.responses();
    let d2 = second.responses();

    let steepest = d1
        .iter()
        .enumerate()
        .fold(0, |best, (i, d)| if d.abs() > d1[best].abs() { i } else { best });

    let inflection_volume_ml = d2
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] * w[1] < 0.0 || (w[0] == 0.0 && w[1] != 0.0))
        .min_by_key(|(i, _)| i.abs_diff(steepest))
        .map(|(i, w)| {
            let t = w[0] / (w[0] - w[1]);
            v[i] + t * (v[i + 1] - v[i])
        });

    DerivativeSummary {
        steepest_volume_ml: v[steepest],
        steepest_slope: d1[steepest],
        inflection_volume_ml,
    }
}
