//! Method files: the saved parameter form.
//!
//! Unless a path is given explicitly, the method file lives next to the data
//! file as `method.json`.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::domain::MethodFile;
use crate::error::AppError;

pub const DEFAULT_METHOD_FILE: &str = "method.json";

/// `method.json` in the directory of `data_file` (or the working directory).
pub fn default_method_path(data_file: Option<&Path>) -> PathBuf {
    data_file
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(DEFAULT_METHOD_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_METHOD_FILE))
}

pub fn write_method_json(path: &Path, method: &MethodFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create method file '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, method)
        .map_err(|e| AppError::new(2, format!("Failed to write method file: {e}")))?;
    tracing::info!(path = %path.display(), "saved method");
    Ok(())
}

pub fn read_method_json(path: &Path) -> Result<MethodFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open method file '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid method file: {e}")))
}
