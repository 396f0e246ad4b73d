//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments into run configs
//! - runs the shared pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::picker::{prompt_for_data_path, validate_data_path};
use crate::cli::{
    AnalyzeArgs, ChemistryArgs, Cli, Command, MethodArgs, PlotArgs, SchwarzArgs, SimulateArgs, TermPlotArgs,
    TransformArgs, TuiArgs,
};
use crate::domain::{
    AnalyzeConfig, BranchModel, Chemistry, MethodFile, PlotConfig, PlotFileConfig, PlotSource, ResponseKind,
    SchwarzConstants, SimulateConfig, TitrationParameters, TransformConfig, TransformSpec, TuiConfig, ViewerSource,
};
use crate::error::AppError;
use crate::transform::DEFAULT_SWEEP_KS;

pub mod pipeline;

/// Initial analyte volume assumed when neither a flag nor a method file gives one.
pub const DEFAULT_INITIAL_VOLUME_ML: f64 = 25.0;

const SUBCOMMANDS: [&str; 7] = ["simulate", "transform", "analyze", "plot", "tui", "method", "help"];

/// Entry point for the `grantit` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may set RUST_LOG and GRANTIT_DATA_DIR.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Simulate(args) => handle_simulate(args),
        Command::Transform(args) => handle_transform(args),
        Command::Analyze(args) => handle_analyze(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
        Command::Method(args) => handle_method(args),
    }
}

/// Log to stderr. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("grantit={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(&args)?;
    let run = pipeline::run_simulation(&config)?;
    let sim = &run.simulation;

    println!("{}", crate::report::format_simulation_summary(sim));
    if args.table {
        println!("{}", crate::report::format_records_table(&sim.records));
    }

    if config.plot.enabled {
        let mut markers = vec![sim.landmarks.first_equivalence_ml];
        markers.extend(sim.landmarks.second_equivalence_ml);
        let plot = crate::plot::render_curve_plot(&run.curve, "pH", &markers, config.plot.width, config.plot.height);
        println!("{plot}");
    }

    if let Some(path) = &config.export_text {
        crate::io::write_curve_text(path, &run.curve)?;
        println!("Wrote curve: {}", path.display());
    }
    if let Some(path) = &config.export_csv {
        crate::io::write_records_csv(path, &sim.records)?;
        println!("Wrote records: {}", path.display());
    }
    if let Some(path) = &config.save_method {
        let method = MethodFile::new(
            config.chemistry,
            ResponseKind::Ph,
            config.parameters.clone(),
            config.model,
            SchwarzConstants::default(),
            config.export_text.clone(),
        );
        crate::io::write_method_json(path, &method)?;
        println!("Wrote method file: {}", path.display());
    }
    Ok(())
}

fn handle_transform(args: TransformArgs) -> Result<(), AppError> {
    let method = args.method.as_deref().map(crate::io::read_method_json).transpose()?;
    let data_file = resolve_data_file(args.file.clone().or_else(|| method.as_ref().and_then(|m| m.data_file.clone())))?;
    let config = transform_config_from_args(&args, method.as_ref(), data_file)?;
    let run = pipeline::run_transform(&config)?;

    println!("{}", crate::report::format_load_summary(&run.loaded));
    println!("{}", crate::report::format_transform_summary(&run));

    if config.plot.enabled {
        let y_label = format!("{}{}", config.derivative.prefix(), config.spec.index().display_name());
        let markers: Vec<f64> = run.fit.and_then(|f| f.x_intercept()).into_iter().collect();
        let plot = crate::plot::render_curve_plot(&run.shown, &y_label, &markers, config.plot.width, config.plot.height);
        println!("{plot}");
    }

    if let Some(path) = &config.export {
        crate::io::write_transform_text(path, &run.shown)?;
        println!("Wrote transform: {}", path.display());
    }
    Ok(())
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let data_file = resolve_data_file(args.file.clone())?;
    let config = analyze_config_from_args(&args, data_file);
    let run = pipeline::run_analysis(&config)?;

    println!("{}", crate::report::format_load_summary(&run.loaded));
    println!("{}", crate::report::format_bank_table(&run.entries));

    if let Some(path) = &config.bundle {
        let source = Some(run.loaded.path.display().to_string());
        let bundle = pipeline::build_bundle(source, &run.loaded.curve, config.kind, &run.entries);
        crate::io::write_bundle_json(path, &bundle)?;
        println!("Wrote bundle ({} series): {}", bundle.series.len(), path.display());
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let config = plot_config_from_args(&args)?;

    let plot = match &config.source {
        PlotSource::Data { path, kind } => {
            let loaded = crate::io::load_curve(path, *kind)?;
            crate::plot::render_curve_plot(&loaded.curve, kind.axis_label(), &[], config.width, config.height)
        }
        PlotSource::Bundle(path) => {
            let bundle = crate::io::read_bundle_json(path)?;
            if let Some(filter) = &config.filter {
                if !bundle.series.iter().any(|s| s.label.contains(filter.as_str())) {
                    return Err(AppError::new(2, format!("No series in the bundle matches '{filter}'")));
                }
            }
            crate::plot::render_bundle_plot(&bundle, config.filter.as_deref(), config.width, config.height)
        }
    };

    println!("{plot}");
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let config = tui_config_from_args(&args)?;
    crate::tui::run(config)
}

fn handle_method(args: MethodArgs) -> Result<(), AppError> {
    let resolved = resolve_chemistry(&args.chemistry)?;
    let method = MethodFile::new(
        resolved.chemistry,
        args.kind,
        resolved.parameters,
        resolved.model,
        schwarz_constants(&args.schwarz),
        args.data_file.clone(),
    );
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| crate::io::default_method_path(args.data_file.as_deref()));
    crate::io::write_method_json(&path, &method)?;
    println!("Wrote method file: {}", path.display());
    Ok(())
}

/// Chemistry, parameters and branch model after applying presets, method
/// file and overrides.
#[derive(Debug, Clone)]
pub struct ResolvedChemistry {
    pub chemistry: Chemistry,
    pub parameters: TitrationParameters,
    pub model: BranchModel,
}

pub fn resolve_chemistry(args: &ChemistryArgs) -> Result<ResolvedChemistry, AppError> {
    let (chemistry, mut parameters, mut model) = match &args.method {
        Some(path) => {
            let method = crate::io::read_method_json(path)?;
            (method.chemistry()?, method.parameters.clone(), method.model)
        }
        None => {
            let chemistry = match (args.chemistry, args.titration_type, args.strength) {
                (Some(chemistry), _, _) => chemistry,
                (None, Some(titration_type), Some(strength)) => {
                    Chemistry::from_selection(titration_type, strength, args.diprotic)?
                }
                _ if args.diprotic => Chemistry::Diprotic,
                _ => Chemistry::StrongAcid,
            };
            (chemistry, TitrationParameters::preset(chemistry), BranchModel::default())
        }
    };

    let overrides = [
        (&mut parameters.analyte_concentration, args.analyte_conc),
        (&mut parameters.analyte_volume_ml, args.analyte_volume),
        (&mut parameters.titrant_concentration, args.titrant_conc),
        (&mut parameters.max_volume_ml, args.max_volume),
        (&mut parameters.step_ml, args.step),
    ];
    for (slot, value) in overrides {
        if let Some(value) = value {
            *slot = value;
        }
    }
    parameters.pka = args.pka.or(parameters.pka);
    parameters.pkb = args.pkb.or(parameters.pkb);
    parameters.pka2 = args.pka2.or(parameters.pka2);
    if let Some(m) = args.model {
        model = m;
    }

    parameters.validate_for(chemistry)?;
    Ok(ResolvedChemistry {
        chemistry,
        parameters,
        model,
    })
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> Result<SimulateConfig, AppError> {
    if !args.noise.is_finite() || args.noise < 0.0 {
        return Err(AppError::new(
            2,
            format!("noise must be a non-negative number, got {}", args.noise),
        ));
    }
    let resolved = resolve_chemistry(&args.chemistry)?;
    Ok(SimulateConfig {
        chemistry: resolved.chemistry,
        parameters: resolved.parameters,
        model: resolved.model,
        noise_sigma: args.noise,
        seed: args.seed,
        export_text: args.export.clone(),
        export_csv: args.export_csv.clone(),
        save_method: args.save_method.clone(),
        plot: plot_settings(&args.plot),
    })
}

/// Build a transform config. Type, strength and V fall back to `method`.
pub fn transform_config_from_args(
    args: &TransformArgs,
    method: Option<&MethodFile>,
    data_file: PathBuf,
) -> Result<TransformConfig, AppError> {
    let titration_type = args.titration_type.or(method.map(|m| m.titration_type));
    let strength = args.strength.or(method.map(|m| m.strength));
    let (Some(titration_type), Some(strength)) = (titration_type, strength) else {
        return Err(AppError::new(
            2,
            "Choose the analyte with --type and --strength (or pass --method).",
        ));
    };
    let initial_volume_ml = args
        .initial_volume
        .or(method.map(|m| m.parameters.analyte_volume_ml))
        .unwrap_or(DEFAULT_INITIAL_VOLUME_ML);

    let spec = TransformSpec::from_selection(
        args.family,
        titration_type,
        strength,
        args.index,
        initial_volume_ml,
        schwarz_constants(&args.schwarz),
    )?;

    let mut sweep_ks = args.sweep_k.clone();
    if args.sweep {
        sweep_ks.extend(DEFAULT_SWEEP_KS);
    }

    Ok(TransformConfig {
        data_file,
        kind: args.kind,
        spec,
        derivative: args.derivative,
        fit_window: args.fit_window,
        sweep_ks,
        export: args.export.clone(),
        plot: plot_settings(&args.plot),
    })
}

pub fn analyze_config_from_args(args: &AnalyzeArgs, data_file: PathBuf) -> AnalyzeConfig {
    AnalyzeConfig {
        data_file,
        kind: args.kind,
        initial_volume_ml: args.initial_volume,
        constants: schwarz_constants(&args.schwarz),
        fit_window: args.fit_window,
        bundle: args.bundle.clone(),
    }
}

pub fn plot_config_from_args(args: &PlotArgs) -> Result<PlotFileConfig, AppError> {
    let source = match (&args.bundle, &args.file) {
        (Some(bundle), _) => PlotSource::Bundle(bundle.clone()),
        (None, file) => PlotSource::Data {
            path: resolve_data_file(file.clone())?,
            kind: args.kind,
        },
    };
    Ok(PlotFileConfig {
        source,
        filter: args.filter.clone(),
        width: args.width,
        height: args.height,
    })
}

/// A file source wins; otherwise the chemistry flags pick a simulation.
pub fn tui_config_from_args(args: &TuiArgs) -> Result<TuiConfig, AppError> {
    let (source, simulated_volume) = match &args.file {
        Some(path) => (
            ViewerSource::File {
                path: validate_data_path(path)?,
                kind: args.kind,
            },
            None,
        ),
        None => {
            let resolved = resolve_chemistry(&args.chemistry)?;
            let volume = resolved.parameters.analyte_volume_ml;
            (
                ViewerSource::Simulated {
                    chemistry: resolved.chemistry,
                    parameters: resolved.parameters,
                    model: resolved.model,
                },
                Some(volume),
            )
        }
    };

    Ok(TuiConfig {
        source,
        initial_volume_ml: args
            .initial_volume
            .or(simulated_volume)
            .unwrap_or(DEFAULT_INITIAL_VOLUME_ML),
        constants: schwarz_constants(&args.schwarz),
        fit_window: args.fit_window,
        bundle_path: args.bundle.clone(),
    })
}

fn schwarz_constants(args: &SchwarzArgs) -> SchwarzConstants {
    SchwarzConstants {
        exponent_offset: args.exponent_offset,
        divisor: args.divisor,
    }
}

fn plot_settings(args: &TermPlotArgs) -> PlotConfig {
    PlotConfig {
        enabled: !args.no_plot,
        width: args.width,
        height: args.height,
    }
}

/// Validate an explicit path, or fall back to the interactive picker.
fn resolve_data_file(path: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match path {
        Some(path) => validate_data_path(&path),
        None => prompt_for_data_path(),
    }
}

/// Rewrite argv so bare `grantit` (or flags only) opens the viewer.
///
/// Rules:
/// - `grantit`                     -> `grantit tui`
/// - `grantit -c weak-acid`        -> `grantit tui -c weak-acid`
/// - `grantit --help/--version/-h` -> unchanged
/// - any argv naming a subcommand  -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let rest = argv.get(1..).unwrap_or(&[]);
    let wants_help_or_version = rest
        .iter()
        .any(|a| matches!(a.as_str(), "-h" | "--help" | "-V" | "--version"));
    let has_subcommand = rest.iter().any(|a| SUBCOMMANDS.contains(&a.as_str()));
    if wants_help_or_version || has_subcommand {
        return argv;
    }

    let at = argv.len().min(1);
    argv.insert(at, "tui".to_string());
    argv
}
