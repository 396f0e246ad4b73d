//! Linear extrapolation of a transformed curve.
//!
//! Over the region where a Gran function is linear, its zero crossing is the
//! equivalence volume. The window is chosen by the user; nothing here tries
//! to find it automatically.

use crate::domain::{Curve, LinearFit, VolumeWindow};
use crate::error::TitrationError;
use crate::math::fit_straight_line;

/// Least-squares line through the points of `curve` inside `window`.
pub fn fit_line(curve: &Curve, window: VolumeWindow) -> Result<LinearFit, TitrationError> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = curve.points().filter(|&(v, _)| window.contains(v)).unzip();
    if xs.len() < 2 {
        return Err(TitrationError::parameter(format!(
            "window {}:{} mL holds {} point(s); need at least 2",
            window.start_ml,
            window.end_ml,
            xs.len()
        )));
    }

    let (intercept, slope, r_squared) = fit_straight_line(&xs, &ys)
        .ok_or_else(|| TitrationError::domain("line fit is ill-conditioned"))?;

    let fit = LinearFit {
        slope,
        intercept,
        r_squared,
        n: xs.len(),
    };
    tracing::debug!(n = fit.n, slope, intercept, r_squared, "fitted extrapolation line");
    Ok(fit)
}
