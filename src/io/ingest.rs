//! Titration data ingest.
//!
//! Two layouts are accepted:
//!
//! - **text** (`.dat`, `.txt`, anything not `.csv`): whitespace-separated
//!   `<volume> <response>` per line, no header; blank lines and `#` comments
//!   are skipped
//! - **csv**: a header row plus records; the volume and response columns are
//!   found by name (`V_added_mL`, `volume`, ... / `pH`, `response`, ...) and
//!   default to the first two columns
//!
//! Unparseable rows are skipped and reported, never silently dropped. The
//! surviving samples go through the curve validator before a [`Curve`] is
//! built.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{Curve, ResponseKind, Sample, ValidationReport};
use crate::error::AppError;
use crate::validate::validate;

/// Recognised header names for the volume column (lowercased).
const VOLUME_HEADERS: [&str; 5] = ["v_added_ml", "volume_ml", "volume", "v_ml", "v"];

/// Recognised header names for the response column (lowercased).
const RESPONSE_HEADERS: [&str; 5] = ["ph", "response", "potential_mv", "potential", "e_mv"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Text,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Self {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            == Some(true);
        if is_csv { InputFormat::Csv } else { InputFormat::Text }
    }
}

/// Parsed rows before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    pub samples: Vec<Sample>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Ingest output: a validated curve plus everything learned on the way.
#[derive(Debug, Clone)]
pub struct LoadedCurve {
    pub path: PathBuf,
    pub format: InputFormat,
    pub curve: Curve,
    pub report: ValidationReport,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parse the whitespace two-column layout.
pub fn parse_text(content: &str) -> ParsedRows {
    let mut out = ParsedRows::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim().trim_start_matches('\u{feff}');
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        out.rows_read += 1;

        let mut fields = text.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(v), Some(r)) => match parse_pair(v, r) {
                Ok(sample) => out.samples.push(sample),
                Err(message) => out.row_errors.push(RowError { line, message }),
            },
            _ => out.row_errors.push(RowError {
                line,
                message: format!("expected '<volume> <response>', got '{text}'"),
            }),
        }
    }

    out
}

/// Parse the tabular CSV layout.
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedRows, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "CSV needs at least two columns (volume, response).",
        ));
    }

    let header_map = build_header_map(&headers);
    let volume_col = find_column(&header_map, &VOLUME_HEADERS).unwrap_or(0);
    let response_col = find_column(&header_map, &RESPONSE_HEADERS)
        .unwrap_or(if volume_col == 1 { 0 } else { 1 });

    let mut out = ParsedRows::default();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        out.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match (record.get(volume_col), record.get(response_col)) {
            (Some(v), Some(r)) => match parse_pair(v, r) {
                Ok(sample) => out.samples.push(sample),
                Err(message) => out.row_errors.push(RowError { line, message }),
            },
            _ => out.row_errors.push(RowError {
                line,
                message: format!("row has {} field(s); need columns {volume_col} and {response_col}", record.len()),
            }),
        }
    }

    Ok(out)
}

/// Read, parse and validate a data file as a curve of `kind`.
pub fn load_curve(path: &Path, kind: ResponseKind) -> Result<LoadedCurve, AppError> {
    let format = InputFormat::from_path(path);
    let parsed = match format {
        InputFormat::Csv => {
            let file = File::open(path)
                .map_err(|e| AppError::new(2, format!("Failed to open data file '{}': {e}", path.display())))?;
            parse_csv(file)?
        }
        InputFormat::Text => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| AppError::new(2, format!("Failed to read data file '{}': {e}", path.display())))?;
            parse_text(&content)
        }
    };

    for err in &parsed.row_errors {
        tracing::warn!(line = err.line, "skipped row: {}", err.message);
    }
    if parsed.samples.is_empty() {
        return Err(AppError::new(
            3,
            format!("No usable rows in '{}'.", path.display()),
        ));
    }

    let report = validate(&parsed.samples, kind);
    if !report.ok {
        return Err(AppError::new(
            2,
            format!(
                "Unusable curve in '{}': {}",
                path.display(),
                report.messages().join("; ")
            ),
        ));
    }
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }

    let curve = Curve::from_samples(&parsed.samples)?;
    tracing::info!(
        path = %path.display(),
        points = curve.len(),
        skipped = parsed.row_errors.len(),
        "loaded titration curve"
    );

    Ok(LoadedCurve {
        path: path.to_path_buf(),
        format,
        curve,
        report,
        row_errors: parsed.row_errors,
        rows_read: parsed.rows_read,
    })
}

fn parse_pair(volume: &str, response: &str) -> Result<Sample, String> {
    let v = volume
        .parse::<f64>()
        .map_err(|_| format!("invalid volume '{volume}'"))?;
    let r = response
        .parse::<f64>()
        .map_err(|_| format!("invalid response '{response}'"))?;
    Ok(Sample::new(v, r))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| header_map.get(*name).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_comments_and_reports_bad_rows() {
        let parsed = parse_text("# V pH\n0.00 1.0000\n\n1.00 1.0435\n1.5 abc\n2.00\n2.00 1.0911\n");
        assert_eq!(parsed.samples.len(), 3);
        assert_eq!(parsed.rows_read, 5);
        assert_eq!(parsed.row_errors.len(), 2);
        assert_eq!(parsed.row_errors[0].line, 5);
        assert!(parsed.row_errors[0].message.contains("invalid response"));
        assert_eq!(parsed.row_errors[1].line, 6);
    }

    #[test]
    fn csv_finds_columns_by_name() {
        let data = "note,pH,V_added_mL\nexcess H+,1.0,0.0\nexcess H+,1.04,1.0\n";
        let parsed = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(parsed.samples, vec![Sample::new(0.0, 1.0), Sample::new(1.0, 1.04)]);
    }

    #[test]
    fn csv_defaults_to_first_two_columns() {
        let data = "a,b,c\n0,7.0,x\n1,7.5,y\nbad,1,z\n";
        let parsed = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(parsed.samples.len(), 2);
        assert_eq!(parsed.row_errors.len(), 1);
        assert_eq!(parsed.row_errors[0].line, 4);
    }

    #[test]
    fn csv_with_bom_header() {
        let data = "\u{feff}V_added_mL,pH\n0,3\n1,4\n";
        let parsed = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(parsed.samples[1], Sample::new(1.0, 4.0));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(InputFormat::from_path(Path::new("run.CSV")), InputFormat::Csv);
        assert_eq!(InputFormat::from_path(Path::new("run.dat")), InputFormat::Text);
        assert_eq!(InputFormat::from_path(Path::new("run")), InputFormat::Text);
    }

    #[test]
    fn load_rejects_unordered_and_empty_files() {
        let dir = std::env::temp_dir().join(format!("grantit-ingest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let unordered = dir.join("unordered.dat");
        std::fs::write(&unordered, "0 1\n2 2\n1 3\n").unwrap();
        assert_eq!(load_curve(&unordered, ResponseKind::Ph).unwrap_err().exit_code(), 2);

        let empty = dir.join("empty.dat");
        std::fs::write(&empty, "# nothing\n").unwrap();
        assert_eq!(load_curve(&empty, ResponseKind::Ph).unwrap_err().exit_code(), 3);

        let good = dir.join("good.txt");
        std::fs::write(&good, "0 1.0\n1 1.1\n2 1.2\n").unwrap();
        let loaded = load_curve(&good, ResponseKind::Ph).unwrap();
        assert_eq!(loaded.curve.len(), 3);
        assert!(loaded.report.warnings.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
