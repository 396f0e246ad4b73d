//! Resolved run configurations, built from CLI arguments by `app`.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::types::{
    BranchModel, Chemistry, ResponseKind, SchwarzConstants, TitrationParameters, TransformSpec, VolumeWindow,
};

/// Which curve of a transform to show or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeOrder {
    /// The transform itself.
    #[default]
    None,
    First,
    Second,
}

impl DerivativeOrder {
    pub fn next(self) -> Self {
        match self {
            DerivativeOrder::None => DerivativeOrder::First,
            DerivativeOrder::First => DerivativeOrder::Second,
            DerivativeOrder::Second => DerivativeOrder::None,
        }
    }

    /// Prefix for axis labels, e.g. `d/dv`.
    pub fn prefix(self) -> &'static str {
        match self {
            DerivativeOrder::None => "",
            DerivativeOrder::First => "d/dv ",
            DerivativeOrder::Second => "d²/dv² ",
        }
    }
}

/// Step applied to the Schwarz exponent offset by the viewer's `+`/`-` keys.
pub const K_STEP: f64 = 0.01;

/// Terminal plot settings shared by all commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotConfig {
    pub enabled: bool,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub chemistry: Chemistry,
    pub parameters: TitrationParameters,
    pub model: BranchModel,
    /// Standard deviation of added measurement noise (0 disables it).
    pub noise_sigma: f64,
    pub seed: u64,
    pub export_text: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
    pub save_method: Option<PathBuf>,
    pub plot: PlotConfig,
}

#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub data_file: PathBuf,
    pub kind: ResponseKind,
    pub spec: TransformSpec,
    pub derivative: DerivativeOrder,
    pub fit_window: Option<VolumeWindow>,
    /// Extra exponent offsets to evaluate (Schwarz only).
    pub sweep_ks: Vec<f64>,
    pub export: Option<PathBuf>,
    pub plot: PlotConfig,
}

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub data_file: PathBuf,
    pub kind: ResponseKind,
    pub initial_volume_ml: f64,
    pub constants: SchwarzConstants,
    pub fit_window: Option<VolumeWindow>,
    pub bundle: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PlotFileConfig {
    pub source: PlotSource,
    /// Only plot bundle series whose label contains this text.
    pub filter: Option<String>,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone)]
pub enum PlotSource {
    Data { path: PathBuf, kind: ResponseKind },
    Bundle(PathBuf),
}

/// Where the interactive viewer gets its raw curve from.
#[derive(Debug, Clone)]
pub enum ViewerSource {
    File { path: PathBuf, kind: ResponseKind },
    Simulated {
        chemistry: Chemistry,
        parameters: TitrationParameters,
        model: BranchModel,
    },
}

#[derive(Debug, Clone)]
pub struct TuiConfig {
    pub source: ViewerSource,
    pub initial_volume_ml: f64,
    pub constants: SchwarzConstants,
    pub fit_window: Option<VolumeWindow>,
    /// Target of the `e` (export) key.
    pub bundle_path: PathBuf,
}
