//! Least squares for straight-line extrapolation.
//!
//! The Gran extrapolation fits `y = a + b·v` over a user-chosen window of a
//! transformed curve. The design matrix is always `n × 2`, so SVD is cheap
//! and tolerates the near-collinear columns we get from narrow windows.
//! (Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Loosen the singular-value cutoff step by step before giving up.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Intercept/slope of the least-squares line through `(xs, ys)` and its R².
///
/// Returns `None` for fewer than two points, mismatched lengths or a
/// degenerate (single-abscissa) design.
pub fn fit_straight_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    let n = xs.len();
    if n < 2 || ys.len() != n || xs.iter().all(|&v| v == xs[0]) {
        return None;
    }

    let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { xs[i] });
    let y = DVector::from_column_slice(ys);
    let beta = solve_least_squares(&x, &y)?;
    let (intercept, slope) = (beta[0], beta[1]);

    let mean = ys.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };

    Some((intercept, slope, r_squared))
}
