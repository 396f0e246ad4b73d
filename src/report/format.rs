//! Formatted terminal output.
//!
//! Formatting lives in one place so the chemistry and transform code stays
//! free of presentation concerns, and output changes stay localized.

use crate::app::pipeline::{BankEntry, TransformRun};
use crate::chemistry::Simulation;
use crate::domain::{BranchModel, LinearFit, TitrationRecord};
use crate::io::ingest::LoadedCurve;
use crate::math::DerivativeSummary;
use crate::transform::{Transformed, formula_text};

use super::branch_spans;

/// Simulation header: chemistry, parameters, landmarks and branch regions.
pub fn format_simulation_summary(sim: &Simulation) -> String {
    let p = &sim.parameters;
    let mut out = String::new();

    out.push_str(&format!("=== grantit - {} ===\n", sim.chemistry.display_name()));
    out.push_str(&format!(
        "Analyte: {:.4} M x {:.2} mL | Titrant: {:.4} M\n",
        p.analyte_concentration, p.analyte_volume_ml, p.titrant_concentration
    ));
    let mut constants = Vec::new();
    if let Some(pka) = p.pka {
        constants.push(format!("pKa={pka:.2}"));
    }
    if let Some(pkb) = p.pkb {
        constants.push(format!("pKb={pkb:.2}"));
    }
    if let Some(pka2) = p.pka2 {
        constants.push(format!("pKa2={pka2:.2}"));
    }
    if !constants.is_empty() {
        out.push_str(&format!("Constants: {}\n", constants.join(" ")));
    }
    out.push_str(&format!(
        "Grid: 0..{:.2} mL step {:.3} ({} points) | model: {}\n",
        p.max_volume_ml,
        p.step_ml,
        sim.records.len(),
        match sim.model {
            BranchModel::Classic => "classic",
            BranchModel::Bounded => "bounded",
        }
    ));

    out.push_str(&format!("Equivalence: V1={:.3} mL", sim.landmarks.first_equivalence_ml));
    if let Some(v2) = sim.landmarks.second_equivalence_ml {
        out.push_str(&format!(" V2={v2:.3} mL"));
    }
    out.push('\n');

    out.push_str("\nRegions:\n");
    for span in branch_spans(&sim.records) {
        out.push_str(&format!(
            "  {:>8.3} .. {:>8.3} mL  ({:>3})  {}\n",
            span.start_ml, span.end_ml, span.count, span.branch
        ));
    }
    out
}

/// Records as an aligned table.
pub fn format_records_table(records: &[TitrationRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10} {:>8} {:>10}  {}\n", "V (mL)", "pH", "Vtot (mL)", "note"));
    out.push_str(&format!("{:->10} {:->8} {:->10}  {:-<4}\n", "", "", "", ""));
    for r in records {
        out.push_str(&format!(
            "{:>10.3} {:>8.4} {:>10.3}  {}\n",
            r.volume_ml, r.response, r.total_volume_ml, r.branch
        ));
    }
    out
}

/// What was loaded and what was skipped.
pub fn format_load_summary(loaded: &LoadedCurve) -> String {
    let mut out = String::new();
    let (lo, hi) = loaded.curve.response_range();
    let v = loaded.curve.volumes();
    out.push_str(&format!("Data: {}\n", loaded.path.display()));
    out.push_str(&format!(
        "Points: n={} (rows read {}, skipped {}) | V=[{:.3}, {:.3}] mL | response=[{:.4}, {:.4}]\n",
        loaded.curve.len(),
        loaded.rows_read,
        loaded.row_errors.len(),
        v[0],
        v[v.len() - 1],
        lo,
        hi
    ));
    for err in loaded.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", err.line, err.message));
    }
    if loaded.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more skipped row(s)\n", loaded.row_errors.len() - 5));
    }
    for warning in &loaded.report.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out
}

/// Single-transform summary (spec, range, derivatives, extrapolation, sweep).
pub fn format_transform_summary(run: &TransformRun) -> String {
    let mut out = String::new();
    let t = &run.transformed;

    out.push_str(&format!("\nTransform: {}  =  {}\n", t.spec.label(), formula_text(&t.spec)));
    out.push_str(&format!("V = {:.3} mL", t.spec.initial_volume_ml()));
    if t.spec.family() == crate::domain::TransformFamily::Schwarz {
        let c = t.spec.constants();
        out.push_str(&format!(" | k = {:.3} | s = {:.3}", c.exponent_offset, c.divisor));
    }
    out.push('\n');
    out.push_str(&format_range_line(t));

    if let Some(set) = &run.derivatives {
        out.push_str(&format_derivative_summary(&set.summary));
    }
    if let Some(fit) = &run.fit {
        out.push_str(&format_fit(fit));
    }
    if !run.sweep.is_empty() {
        out.push_str("\nSchwarz k-sweep:\n");
        for s in &run.sweep {
            out.push_str(&format!("  k={:<6.3} ", s.spec.constants().exponent_offset));
            out.push_str(&format_range_line(s));
        }
    }
    out
}

/// Bank overview: one row per transform variant.
pub fn format_bank_table(entries: &[BankEntry]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<32} {:<16} {:>12} {:>12} {:>4} {:>10} {:>10} {:>10}\n",
            "transform", "formula", "min", "max", "sat", "steep V", "infl V", "x-int V"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<32} {:-<16} {:->12} {:->12} {:->4} {:->10} {:->10} {:->10}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for e in entries {
        let t = &e.transformed;
        let (lo, hi) = t.curve.response_range();
        let summary = e.derivatives.as_ref().map(|d| d.summary);
        out.push_str(
            format!(
                "{:<32} {:<16} {:>12.4e} {:>12.4e} {:>4} {:>10} {:>10} {:>10}\n",
                truncate(&t.spec.label(), 32),
                formula_text(&t.spec),
                lo,
                hi,
                t.warnings.len(),
                fmt_opt(summary.map(|s| s.steepest_volume_ml)),
                fmt_opt(summary.and_then(|s| s.inflection_volume_ml)),
                fmt_opt(e.fit.and_then(|f| f.x_intercept())),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    let notes: Vec<_> = entries
        .iter()
        .filter_map(|e| e.note.as_ref().map(|n| (e.transformed.spec.label(), n)))
        .collect();
    if !notes.is_empty() {
        out.push('\n');
        for (label, note) in notes {
            out.push_str(&format!("note: {label}: {note}\n"));
        }
    }
    out
}

fn format_range_line(t: &Transformed) -> String {
    let (lo, hi) = t.curve.response_range();
    let mut line = format!("range=[{lo:.4e}, {hi:.4e}]");
    if !t.warnings.is_empty() {
        line.push_str(&format!(" | {} saturated point(s)", t.warnings.len()));
    }
    line.push('\n');
    line
}

fn format_derivative_summary(summary: &DerivativeSummary) -> String {
    let mut out = format!(
        "Steepest: v={:.3} mL (slope {:.4e})",
        summary.steepest_volume_ml, summary.steepest_slope
    );
    match summary.inflection_volume_ml {
        Some(v) => out.push_str(&format!(" | inflection: v={v:.3} mL\n")),
        None => out.push_str(" | no inflection\n"),
    }
    out
}

fn format_fit(fit: &LinearFit) -> String {
    let mut out = format!(
        "Line fit: y = {:.6e} + {:.6e}·v (R²={:.6}, n={})\n",
        fit.intercept, fit.slope, fit.r_squared, fit.n
    );
    match fit.x_intercept() {
        Some(v) => out.push_str(&format!("Extrapolated equivalence: {v:.3} mL\n")),
        None => out.push_str("Extrapolated equivalence: none (flat line)\n"),
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::analyze_bank;
    use crate::chemistry::simulate;
    use crate::domain::{Chemistry, SchwarzConstants, TitrationParameters, VolumeWindow};

    #[test]
    fn simulation_summary_lists_landmarks_and_regions() {
        let params = TitrationParameters::preset(Chemistry::Diprotic);
        let sim = simulate(&params, Chemistry::Diprotic).unwrap();
        let text = format_simulation_summary(&sim);
        assert!(text.contains("diprotic acid vs strong base"));
        assert!(text.contains("V1=12.500 mL V2=25.000 mL"));
        assert!(text.contains("first equivalence (amphiprotic HA-)"));
        assert!(text.contains("pKa=2.00 pKa2=7.00"));
    }

    #[test]
    fn records_table_has_one_line_per_record() {
        let params = TitrationParameters::preset(Chemistry::StrongAcid);
        let sim = simulate(&params, Chemistry::StrongAcid).unwrap();
        let table = format_records_table(&sim.records);
        assert_eq!(table.lines().count(), sim.records.len() + 2);
        assert!(table.lines().nth(27).unwrap().contains("equivalence (neutral)"));
    }

    #[test]
    fn bank_table_reports_extrapolation() {
        let params = TitrationParameters::preset(Chemistry::StrongAcid);
        let curve = simulate(&params, Chemistry::StrongAcid).unwrap().curve().unwrap();
        let window = VolumeWindow::new(0.0, 20.0).unwrap();
        let entries = analyze_bank(&curve, 25.0, SchwarzConstants::default(), Some(window)).unwrap();
        let table = format_bank_table(&entries);
        assert_eq!(table.lines().count(), 2 + 12);
        let first = table.lines().nth(2).unwrap();
        assert!(first.starts_with("strong-acid G1"));
        assert!(first.ends_with("25.000"), "{first}");
    }

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
