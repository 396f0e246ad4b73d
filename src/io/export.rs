//! Curve exports.
//!
//! - two-column text (`{volume:.2} {response:.4}`), readable by the text loader
//! - tabular CSV of simulation records, readable by the CSV loader
//! - two-column text in scientific notation for transformed curves, whose
//!   values span many decades

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Curve, TitrationRecord};
use crate::error::AppError;

/// CSV header of simulation exports.
pub const RECORDS_CSV_HEADER: [&str; 4] = ["V_added_mL", "pH", "total_volume_mL", "note"];

/// Render a curve as `{volume:.2} {response:.4}` lines.
pub fn format_curve_text(curve: &Curve) -> String {
    let mut out = String::with_capacity(curve.len() * 16);
    for (v, r) in curve.points() {
        out.push_str(&format!("{v:.2} {r:.4}\n"));
    }
    out
}

/// Render a transformed curve as `{volume:.2} {value:.6e}` lines.
pub fn format_transform_text(curve: &Curve) -> String {
    let mut out = String::with_capacity(curve.len() * 24);
    for (v, g) in curve.points() {
        out.push_str(&format!("{v:.2} {g:.6e}\n"));
    }
    out
}

pub fn write_curve_text(path: &Path, curve: &Curve) -> Result<(), AppError> {
    write_text(path, &format_curve_text(curve))
}

pub fn write_transform_text(path: &Path, curve: &Curve) -> Result<(), AppError> {
    write_text(path, &format_transform_text(curve))
}

/// Write simulation records with their branch labels.
///
/// Values are rounded to 3/4/3 decimals (volume, pH, total volume).
pub fn write_records_csv(path: &Path, records: &[TitrationRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(RECORDS_CSV_HEADER)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        writer
            .write_record([
                format!("{:.3}", r.volume_ml),
                format!("{:.4}", r.response),
                format!("{:.3}", r.total_volume_ml),
                r.branch.label().to_string(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    tracing::info!(path = %path.display(), rows = records.len(), "wrote records CSV");
    Ok(())
}

fn write_text(path: &Path, content: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export '{}': {e}", path.display())))?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write export '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), "wrote curve text");
    Ok(())
}
