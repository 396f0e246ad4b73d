//! Command-line parsing for the titration simulator and Gran toolkit.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! chemistry and transform code; `app` turns these structs into run configs.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{
    BranchModel, Chemistry, DerivativeOrder, GranIndex, ResponseKind, Strength, TitrationType, TransformFamily,
    VolumeWindow,
};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "grantit",
    version,
    about = "Acid-base titration simulator with Gran/Schwarz linearization"
)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate a titration curve and print its regions, plot and exports.
    Simulate(SimulateArgs),
    /// Apply one Gran or Schwarz transform to a data file.
    Transform(TransformArgs),
    /// Validate a data file and run the whole transform bank with derivatives.
    Analyze(AnalyzeArgs),
    /// Plot a data file or a saved series bundle.
    Plot(PlotArgs),
    /// Launch the interactive viewer.
    Tui(TuiArgs),
    /// Write a method file from form-style flags.
    Method(MethodArgs),
}

/// Chemistry selection and parameter overrides.
///
/// Resolution order: `--method` file, then `--chemistry`, then
/// `--type`/`--strength` (plus `--diprotic`), then strong acid. The
/// preset parameters of the resolved chemistry are then overridden by any
/// explicit flag.
#[derive(Debug, Args, Clone, Default)]
pub struct ChemistryArgs {
    /// Chemistry preset.
    #[arg(short = 'c', long, value_enum, conflicts_with_all = ["titration_type", "method"])]
    pub chemistry: Option<Chemistry>,

    /// Titration type as in the parameter form.
    #[arg(long = "type", value_enum, requires = "strength")]
    pub titration_type: Option<TitrationType>,

    /// Titration strength as in the parameter form.
    #[arg(long, value_enum, requires = "titration_type")]
    pub strength: Option<Strength>,

    /// Treat a weak acid as diprotic.
    #[arg(long)]
    pub diprotic: bool,

    /// Read chemistry and parameters from a method file.
    #[arg(long, value_name = "JSON")]
    pub method: Option<PathBuf>,

    /// Analyte concentration (mol/L).
    #[arg(long)]
    pub analyte_conc: Option<f64>,

    /// Analyte initial volume (mL).
    #[arg(long)]
    pub analyte_volume: Option<f64>,

    /// Titrant concentration (mol/L).
    #[arg(long)]
    pub titrant_conc: Option<f64>,

    /// pKa (pKa1 for the diprotic acid).
    #[arg(long)]
    pub pka: Option<f64>,

    /// pKb of a weak base.
    #[arg(long)]
    pub pkb: Option<f64>,

    /// Second pKa of the diprotic acid.
    #[arg(long)]
    pub pka2: Option<f64>,

    /// Maximum titrant volume (mL).
    #[arg(long)]
    pub max_volume: Option<f64>,

    /// Titrant volume step (mL).
    #[arg(long)]
    pub step: Option<f64>,

    /// Branch model near equivalence points.
    #[arg(long, value_enum)]
    pub model: Option<BranchModel>,
}

/// Terminal plot flags shared by several commands.
#[derive(Debug, Args, Clone)]
pub struct TermPlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Schwarz constants.
#[derive(Debug, Args, Clone)]
pub struct SchwarzArgs {
    /// Schwarz exponent offset `k` in `10^(k ± r)`.
    #[arg(short = 'k', long = "exponent-offset", default_value_t = 1.0, allow_negative_numbers = true)]
    pub exponent_offset: f64,

    /// Schwarz divisor.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub divisor: f64,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub chemistry: ChemistryArgs,

    /// Standard deviation of Gaussian noise added to the responses.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Print every record as a table.
    #[arg(long)]
    pub table: bool,

    /// Write the curve as two-column text (`V pH`).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Write the records (with region notes) as CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    /// Save the resolved parameters as a method file.
    #[arg(long = "save-method")]
    pub save_method: Option<PathBuf>,

    #[command(flatten)]
    pub plot: TermPlotArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct TransformArgs {
    /// Data file (`.dat`/`.txt` two columns, or `.csv`). Prompts when omitted.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// What the response column measures.
    #[arg(long, value_enum, default_value_t = ResponseKind::Ph)]
    pub kind: ResponseKind,

    /// Transform family.
    #[arg(long, value_enum, default_value_t = TransformFamily::Gran)]
    pub family: TransformFamily,

    /// Titration type of the analyte.
    #[arg(long = "type", value_enum)]
    pub titration_type: Option<TitrationType>,

    /// Titration strength of the analyte.
    #[arg(long, value_enum)]
    pub strength: Option<Strength>,

    /// Gran function index.
    #[arg(long, value_enum, default_value_t = GranIndex::G1)]
    pub index: GranIndex,

    /// Initial analyte volume V (mL). Defaults to the method file's value, or 25.
    #[arg(long)]
    pub initial_volume: Option<f64>,

    /// Take type, strength, volume and data file from a method file.
    #[arg(long, value_name = "JSON")]
    pub method: Option<PathBuf>,

    #[command(flatten)]
    pub schwarz: SchwarzArgs,

    /// Show (and export) a derivative instead of the transform.
    #[arg(long, value_enum, default_value_t = DerivativeOrder::None)]
    pub derivative: DerivativeOrder,

    /// Fit a line over `START:END` (mL) and extrapolate the equivalence volume.
    #[arg(long, value_name = "START:END")]
    pub fit_window: Option<VolumeWindow>,

    /// Extra Schwarz exponent offsets to compare, comma separated.
    #[arg(long = "sweep-k", value_delimiter = ',', allow_negative_numbers = true)]
    pub sweep_k: Vec<f64>,

    /// Also run the default k sweep (0.99, 0.9, 1.0, 1.1, 1.11).
    #[arg(long)]
    pub sweep: bool,

    /// Write the shown curve as two-column text.
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[command(flatten)]
    pub plot: TermPlotArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Data file. Prompts when omitted.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ResponseKind::Ph)]
    pub kind: ResponseKind,

    /// Initial analyte volume V (mL).
    #[arg(long, default_value_t = 25.0)]
    pub initial_volume: f64,

    #[command(flatten)]
    pub schwarz: SchwarzArgs,

    /// Fit window `START:END` (mL) applied to every transform.
    #[arg(long, value_name = "START:END")]
    pub fit_window: Option<VolumeWindow>,

    /// Write every series (raw, transforms, derivatives) to a JSON bundle.
    #[arg(long)]
    pub bundle: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// Data file to plot. Prompts when neither this nor `--bundle` is given.
    #[arg(short = 'f', long, conflicts_with = "bundle")]
    pub file: Option<PathBuf>,

    /// Series bundle written by `analyze --bundle` or the viewer.
    #[arg(long, value_name = "JSON")]
    pub bundle: Option<PathBuf>,

    /// Only plot bundle series whose label contains this text.
    #[arg(long, requires = "bundle")]
    pub filter: Option<String>,

    #[arg(long, value_enum, default_value_t = ResponseKind::Ph)]
    pub kind: ResponseKind,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    /// Data file to view. Without it a titration is simulated.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ResponseKind::Ph)]
    pub kind: ResponseKind,

    #[command(flatten)]
    pub chemistry: ChemistryArgs,

    /// Initial analyte volume V (mL). Defaults to the simulated analyte volume, or 25.
    #[arg(long)]
    pub initial_volume: Option<f64>,

    #[command(flatten)]
    pub schwarz: SchwarzArgs,

    #[arg(long, value_name = "START:END")]
    pub fit_window: Option<VolumeWindow>,

    /// Where the `e` key writes the series bundle.
    #[arg(long, default_value = "grantit_bundle.json")]
    pub bundle: PathBuf,
}

#[derive(Debug, Parser, Clone)]
pub struct MethodArgs {
    #[command(flatten)]
    pub chemistry: ChemistryArgs,

    #[arg(long, value_enum, default_value_t = ResponseKind::Ph)]
    pub kind: ResponseKind,

    #[command(flatten)]
    pub schwarz: SchwarzArgs,

    /// Data file the method refers to.
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Output path. Defaults to `method.json` next to the data file.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}
