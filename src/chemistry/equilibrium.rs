//! Closed-form equilibrium relations used by the branch rules.
//!
//! Every helper checks its `sqrt`/`log10` argument and returns a
//! [`TitrationError::Domain`] instead of producing NaN or ±inf.

use crate::error::TitrationError;

/// Ion product of water at 25 °C.
pub const KW: f64 = 1e-14;

/// `pKw`.
pub const PKW: f64 = 14.0;

/// pH of a neutral solution.
pub const NEUTRAL_PH: f64 = 7.0;

/// Ratio substituted when the parent species of a buffer is numerically zero.
pub const SENTINEL_RATIO: f64 = 1e12;

/// `10^(-pK)`.
pub fn k_from_pk(pk: f64) -> f64 {
    10f64.powf(-pk)
}

pub fn checked_sqrt(x: f64, what: &str) -> Result<f64, TitrationError> {
    if !x.is_finite() || x < 0.0 {
        return Err(TitrationError::domain(format!("sqrt of {x} while computing {what}")));
    }
    Ok(x.sqrt())
}

pub fn checked_log10(x: f64, what: &str) -> Result<f64, TitrationError> {
    if !x.is_finite() || x <= 0.0 {
        return Err(TitrationError::domain(format!("log10 of {x} while computing {what}")));
    }
    Ok(x.log10())
}

/// `pH = -log10[H+]`.
pub fn ph_from_hydronium(h: f64) -> Result<f64, TitrationError> {
    Ok(-checked_log10(h, "[H+]")?)
}

/// `pH = pKw - pOH` with `pOH = -log10[OH-]`.
pub fn ph_from_hydroxide(oh: f64) -> Result<f64, TitrationError> {
    Ok(PKW + checked_log10(oh, "[OH-]")?)
}

/// Positive root of `x² + K·x − K·C = 0` (monoprotic dissociation `x²/(C−x) = K`).
pub fn dissociation_root(k: f64, c: f64) -> Result<f64, TitrationError> {
    let disc = k * k + 4.0 * k * c;
    // (-k + √disc) / 2, rearranged to avoid cancellation when K·C << K².
    let root = 2.0 * k * c / (k + checked_sqrt(disc, "dissociation discriminant")?);
    if root <= 0.0 {
        return Err(TitrationError::domain(format!(
            "dissociation root {root} is not positive (K={k}, C={c})"
        )));
    }
    Ok(root)
}

/// Henderson–Hasselbalch: `pK + log10(conjugate / parent)`.
pub fn henderson_hasselbalch(pk: f64, conjugate: f64, parent: f64) -> Result<f64, TitrationError> {
    let ratio = if parent > 0.0 { conjugate / parent } else { SENTINEL_RATIO };
    Ok(pk + checked_log10(ratio, "buffer ratio")?)
}

/// Hydrolysis concentration `sqrt(K' · C)` with `K' = Kw / K`.
pub fn hydrolysis(k: f64, c_salt: f64) -> Result<f64, TitrationError> {
    let k_complement = KW / k;
    checked_sqrt(k_complement * c_salt, "hydrolysis")
}
