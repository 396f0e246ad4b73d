//! On-disk JSON schemas: series bundles and method files.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{
    Analyte, BranchModel, Chemistry, Curve, ResponseKind, SchwarzConstants, Strength, TitrationParameters,
    TitrationType,
};
use crate::error::TitrationError;

/// Tool name written into every file.
pub const TOOL_NAME: &str = "grantit";

/// One labelled series for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    /// Unit/axis label of the y values (e.g. `pH`, `G1`, `dG1/dv`).
    pub y_label: String,
    pub curve: Curve,
}

/// Portable collection of series sharing a volume axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBundle {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub x_label: String,
    pub series: Vec<Series>,
}

impl SeriesBundle {
    pub fn new(source: Option<String>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            created_at: Utc::now(),
            source,
            x_label: "V (mL)".to_string(),
            series: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, y_label: impl Into<String>, curve: Curve) {
        self.series.push(Series {
            label: label.into(),
            y_label: y_label.into(),
            curve,
        });
    }
}

/// Saved parameter-form selection.
///
/// Stores what the operator chose (type, strength, volumes, data file) so a
/// later `transform`/`simulate` run can reuse it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub titration_type: TitrationType,
    pub strength: Strength,
    #[serde(default)]
    pub diprotic: bool,
    pub response_kind: ResponseKind,
    pub parameters: TitrationParameters,
    #[serde(default)]
    pub model: BranchModel,
    #[serde(default)]
    pub schwarz: SchwarzConstants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

impl MethodFile {
    pub fn new(
        chemistry: Chemistry,
        response_kind: ResponseKind,
        parameters: TitrationParameters,
        model: BranchModel,
        schwarz: SchwarzConstants,
        data_file: Option<PathBuf>,
    ) -> Self {
        let (titration_type, strength) = chemistry.analyte().selection();
        Self {
            tool: TOOL_NAME.to_string(),
            created_at: Utc::now(),
            titration_type,
            strength,
            diprotic: chemistry == Chemistry::Diprotic,
            response_kind,
            parameters,
            model,
            schwarz,
            data_file,
        }
    }

    pub fn analyte(&self) -> Result<Analyte, TitrationError> {
        Analyte::from_selection(self.titration_type, self.strength)
    }

    pub fn chemistry(&self) -> Result<Chemistry, TitrationError> {
        Chemistry::from_selection(self.titration_type, self.strength, self.diprotic)
    }
}
