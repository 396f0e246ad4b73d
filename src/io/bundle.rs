//! Read/write series bundle JSON files.
//!
//! A bundle is the renderer-facing output of a run: the raw curve, each
//! transform and its derivatives as labelled series on one volume axis. The
//! schema is defined by `domain::SeriesBundle`; curves are re-validated on
//! read.

use std::fs::File;
use std::path::Path;

use crate::domain::SeriesBundle;
use crate::error::AppError;

/// Write a bundle JSON file.
pub fn write_bundle_json(path: &Path, bundle: &SeriesBundle) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create bundle JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, bundle)
        .map_err(|e| AppError::new(2, format!("Failed to write bundle JSON: {e}")))?;
    tracing::info!(path = %path.display(), series = bundle.series.len(), "wrote series bundle");
    Ok(())
}

/// Read a bundle JSON file.
pub fn read_bundle_json(path: &Path) -> Result<SeriesBundle, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open bundle JSON '{}': {e}", path.display())))?;
    let bundle: SeriesBundle =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid bundle JSON: {e}")))?;
    if bundle.series.is_empty() {
        return Err(AppError::new(3, format!("Bundle '{}' has no series.", path.display())));
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Curve;

    #[test]
    fn bundle_survives_a_file_round_trip() {
        let mut bundle = SeriesBundle::new(Some("titration.dat".to_string()));
        bundle.push("raw", "pH", Curve::new(vec![0.0, 1.0], vec![3.0, 3.5]).unwrap());
        bundle.push("strong-acid G1", "G", Curve::new(vec![0.0, 1.0], vec![2.5, 2.4]).unwrap());

        let path = std::env::temp_dir().join(format!("grantit-bundle-{}.json", std::process::id()));
        write_bundle_json(&path, &bundle).unwrap();
        let back = read_bundle_json(&path).unwrap();
        assert_eq!(back, bundle);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn tampered_curve_is_rejected() {
        let path = std::env::temp_dir().join(format!("grantit-bundle-bad-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"tool":"grantit","created_at":"2024-01-01T00:00:00Z","x_label":"V (mL)",
               "series":[{"label":"raw","y_label":"pH","curve":{"volume_ml":[1.0,0.0],"response":[1.0,2.0]}}]}"#,
        )
        .unwrap();
        assert_eq!(read_bundle_json(&path).unwrap_err().exit_code(), 2);
        std::fs::remove_file(&path).ok();
    }
}
