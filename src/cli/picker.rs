//! Interactive data-file picker.
//!
//! Used when `transform`, `analyze` or `plot` run without `-f`. Lists the
//! titration data files (`.dat`, `.txt`, `.csv`) below the search root and
//! accepts either a list number or an explicit path.
//!
//! The search root is `$GRANTIT_DATA_DIR` (usually set in `.env`), falling
//! back to the current directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Environment variable naming the picker's search root.
pub const DATA_DIR_ENV: &str = "GRANTIT_DATA_DIR";

/// Extensions accepted as titration data.
pub const DATA_EXTENSIONS: [&str; 3] = ["dat", "txt", "csv"];

/// Default directory recursion depth for finding data files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a data file.
pub fn prompt_for_data_path() -> Result<PathBuf, AppError> {
    let root = data_root();
    let files = discover_data_files(&root);
    if files.is_empty() {
        return Err(AppError::new(
            2,
            format!(
                "No .dat/.txt/.csv files found under {}. Provide one with `-f <file>`.",
                root.display()
            ),
        ));
    }

    println!("Found {} data file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(2, "No input received. Provide a data file with `-f <file>`."));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_data_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_data_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate that `path` is an existing data file with a known extension.
pub fn validate_data_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("Data file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if !has_data_extension(path) {
        return Err(AppError::new(
            2,
            format!("Expected a .dat, .txt or .csv file (got: {})", path.display()),
        ));
    }
    Ok(path.to_path_buf())
}

/// Search root from the environment, or `.`.
pub fn data_root() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Discover data files under `root` (deterministic order).
pub fn discover_data_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_data_files(root, 0, DEFAULT_SEARCH_DEPTH, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_data_files(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_data_files(&path, depth + 1, max_depth, out);
            }
        } else if file_type.is_file() && has_data_extension(&path) {
            out.push(path);
        }
    }
}

fn has_data_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DATA_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grantit_picker_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn discovers_only_data_files() {
        let dir = scratch_dir("discover");
        fs::create_dir_all(dir.join("runs")).unwrap();
        fs::create_dir_all(dir.join("target")).unwrap();
        for name in ["a.dat", "b.TXT", "runs/c.csv", "notes.md", "target/skip.csv"] {
            fs::write(dir.join(name), "0 1\n").unwrap();
        }

        let found: Vec<String> = discover_data_files(&dir)
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().display().to_string())
            .collect();
        assert_eq!(found, ["a.dat", "b.TXT", "runs/c.csv"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn validate_rejects_missing_dirs_and_other_extensions() {
        let dir = scratch_dir("validate");
        let good = dir.join("curve.dat");
        let bad = dir.join("curve.json");
        fs::write(&good, "0 1\n").unwrap();
        fs::write(&bad, "{}").unwrap();

        assert_eq!(validate_data_path(&good).unwrap(), good);
        assert_eq!(validate_data_path(&bad).unwrap_err().exit_code(), 2);
        assert!(validate_data_path(&dir).is_err());
        assert!(validate_data_path(&dir.join("missing.dat")).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
