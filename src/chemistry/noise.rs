//! Seeded measurement noise for synthesized curves.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Curve;
use crate::error::TitrationError;

/// Add zero-mean Gaussian noise with standard deviation `sigma` to every
/// response of `curve`. Volumes are untouched.
///
/// The same `seed` always yields the same noisy curve. `sigma == 0` returns
/// an identical copy.
pub fn add_measurement_noise(curve: &Curve, sigma: f64, seed: u64) -> Result<Curve, TitrationError> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(TitrationError::parameter(format!(
            "noise sigma must be non-negative and finite, got {sigma}"
        )));
    }
    if sigma == 0.0 {
        return Ok(curve.clone());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| TitrationError::parameter(format!("noise distribution error: {e}")))?;

    let noisy = curve
        .responses()
        .iter()
        .map(|r| r + normal.sample(&mut rng))
        .collect();
    curve.with_responses(noisy)
}
