//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> validate -> transform(s) -> derivatives -> optional extrapolation
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use crate::chemistry::{Simulation, add_measurement_noise, simulate_with};
use crate::domain::{
    AnalyzeConfig, Curve, DerivativeOrder, LinearFit, ResponseKind, SchwarzConstants, SeriesBundle,
    SimulateConfig, TransformConfig, TransformFamily, VolumeWindow,
};
use crate::error::{AppError, TitrationError};
use crate::io::ingest::{LoadedCurve, load_curve};
use crate::math::{DerivativeSet, analyze};
use crate::transform::{Transformed, fit_line, schwarz_sweep, transform, transform_bank};

/// Outputs of a `simulate` run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub simulation: Simulation,
    /// The simulated curve, with measurement noise when requested.
    pub curve: Curve,
}

pub fn run_simulation(config: &SimulateConfig) -> Result<SimulationRun, AppError> {
    let simulation = simulate_with(&config.parameters, config.chemistry, config.model)?;
    let mut curve = simulation.curve()?;
    if config.noise_sigma > 0.0 {
        curve = add_measurement_noise(&curve, config.noise_sigma, config.seed)?;
    }
    tracing::info!(
        chemistry = config.chemistry.display_name(),
        points = curve.len(),
        noise = config.noise_sigma,
        "simulation complete"
    );
    Ok(SimulationRun { simulation, curve })
}

/// Outputs of a single-transform run.
#[derive(Debug, Clone)]
pub struct TransformRun {
    pub loaded: LoadedCurve,
    pub transformed: Transformed,
    pub derivatives: Option<DerivativeSet>,
    /// The curve selected by the derivative order.
    pub shown: Curve,
    pub sweep: Vec<Transformed>,
    pub fit: Option<LinearFit>,
}

pub fn run_transform(config: &TransformConfig) -> Result<TransformRun, AppError> {
    let loaded = load_curve(&config.data_file, config.kind)?;
    let transformed = transform(&loaded.curve, &config.spec)?;

    let derivatives = match config.derivative {
        DerivativeOrder::None => None,
        DerivativeOrder::First | DerivativeOrder::Second => Some(analyze(&transformed.curve)?),
    };
    let shown = select_order(&transformed.curve, derivatives.as_ref(), config.derivative);

    let sweep = if config.spec.family() == TransformFamily::Schwarz && !config.sweep_ks.is_empty() {
        schwarz_sweep(
            &loaded.curve,
            config.spec.analyte(),
            config.spec.initial_volume_ml(),
            &config.sweep_ks,
            config.spec.constants().divisor,
        )?
    } else {
        Vec::new()
    };

    let fit = config
        .fit_window
        .map(|window| fit_line(&transformed.curve, window))
        .transpose()?;

    Ok(TransformRun {
        loaded,
        transformed,
        derivatives,
        shown,
        sweep,
        fit,
    })
}

/// One row of the transform bank with its derivative analysis.
#[derive(Debug, Clone)]
pub struct BankEntry {
    pub transformed: Transformed,
    pub derivatives: Option<DerivativeSet>,
    pub fit: Option<LinearFit>,
    /// Why derivatives or the fit are missing, if they are.
    pub note: Option<String>,
}

impl BankEntry {
    pub fn curve(&self, order: DerivativeOrder) -> Curve {
        select_order(&self.transformed.curve, self.derivatives.as_ref(), order)
    }
}

/// Evaluate the whole transform bank on `curve` and analyze each entry.
///
/// A failing derivative or line fit only marks its entry; the bank itself
/// fails only if a transform does.
pub fn analyze_bank(
    curve: &Curve,
    initial_volume_ml: f64,
    constants: SchwarzConstants,
    window: Option<VolumeWindow>,
) -> Result<Vec<BankEntry>, TitrationError> {
    let bank = transform_bank(curve, initial_volume_ml, constants)?;

    let entries = bank
        .into_iter()
        .map(|transformed| {
            let mut notes = Vec::new();
            let derivatives = match analyze(&transformed.curve) {
                Ok(set) => Some(set),
                Err(err) => {
                    notes.push(format!("derivatives unavailable: {err}"));
                    None
                }
            };
            let fit = match window.map(|w| fit_line(&transformed.curve, w)) {
                Some(Ok(fit)) => Some(fit),
                Some(Err(err)) => {
                    notes.push(format!("fit unavailable: {err}"));
                    None
                }
                None => None,
            };
            BankEntry {
                transformed,
                derivatives,
                fit,
                note: (!notes.is_empty()).then(|| notes.join("; ")),
            }
        })
        .collect();

    Ok(entries)
}

/// Outputs of an `analyze` run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub loaded: LoadedCurve,
    pub entries: Vec<BankEntry>,
}

pub fn run_analysis(config: &AnalyzeConfig) -> Result<AnalysisRun, AppError> {
    let loaded = load_curve(&config.data_file, config.kind)?;
    let entries = analyze_bank(
        &loaded.curve,
        config.initial_volume_ml,
        config.constants,
        config.fit_window,
    )?;
    Ok(AnalysisRun { loaded, entries })
}

/// Bundle the raw curve and every bank entry (plus derivatives) for renderers.
pub fn build_bundle(source: Option<String>, raw: &Curve, kind: ResponseKind, entries: &[BankEntry]) -> SeriesBundle {
    let mut bundle = SeriesBundle::new(source);
    bundle.push("raw", kind.axis_label(), raw.clone());
    for entry in entries {
        let label = entry.transformed.spec.label();
        bundle.push(label.clone(), "G", entry.transformed.curve.clone());
        if let Some(set) = &entry.derivatives {
            bundle.push(format!("{label} d1"), "dG/dv", set.first.clone());
            bundle.push(format!("{label} d2"), "d²G/dv²", set.second.clone());
        }
    }
    bundle
}

fn select_order(base: &Curve, derivatives: Option<&DerivativeSet>, order: DerivativeOrder) -> Curve {
    match (order, derivatives) {
        (DerivativeOrder::First, Some(set)) => set.first.clone(),
        (DerivativeOrder::Second, Some(set)) => set.second.clone(),
        _ => base.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::simulate;
    use crate::domain::{Chemistry, TitrationParameters};

    fn strong_acid_curve() -> Curve {
        let params = TitrationParameters::preset(Chemistry::StrongAcid);
        simulate(&params, Chemistry::StrongAcid).unwrap().curve().unwrap()
    }

    #[test]
    fn bank_analysis_covers_all_variants() {
        let window = VolumeWindow::new(0.0, 20.0).unwrap();
        let entries = analyze_bank(&strong_acid_curve(), 25.0, SchwarzConstants::default(), Some(window)).unwrap();
        assert_eq!(entries.len(), 12);

        let sa_g1 = &entries[0];
        assert_eq!(sa_g1.transformed.spec.label(), "strong-acid G1");
        let x0 = sa_g1.fit.unwrap().x_intercept().unwrap();
        assert!((x0 - 25.0).abs() < 1e-6);
        assert!(sa_g1.derivatives.is_some());
        assert_eq!(sa_g1.curve(DerivativeOrder::First).len(), sa_g1.transformed.curve.len());
    }

    #[test]
    fn bundle_holds_raw_and_every_series() {
        let curve = strong_acid_curve();
        let entries = analyze_bank(&curve, 25.0, SchwarzConstants::default(), None).unwrap();
        let bundle = build_bundle(None, &curve, ResponseKind::Ph, &entries);
        let with_derivs = entries.iter().filter(|e| e.derivatives.is_some()).count();
        assert_eq!(bundle.series.len(), 1 + entries.len() + 2 * with_derivs);
        assert_eq!(bundle.series[0].label, "raw");
    }
}
