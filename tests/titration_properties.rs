//! End-to-end checks of the simulator, transforms and derivatives through
//! the public library API, including the file round trips the CLI uses.

use std::path::PathBuf;

use grantit::app::pipeline::{analyze_bank, build_bundle};
use grantit::chemistry::{point_at, simulate, simulate_with};
use grantit::domain::{
    Analyte, Branch, BranchModel, Chemistry, GranIndex, ResponseKind, SchwarzConstants, TitrationParameters,
    TransformSpec, VolumeWindow,
};
use grantit::io::{load_curve, read_bundle_json, write_bundle_json, write_curve_text, write_records_csv};
use grantit::math::{derivative, second_derivative};
use grantit::transform::{fit_line, transform};

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("grantit_it_{}_{name}", std::process::id()))
}

fn ph_at(chemistry: Chemistry, params: &TitrationParameters, v: f64) -> f64 {
    let sim = simulate(params, chemistry).unwrap();
    sim.record_at(v, 1e-9).unwrap().response
}

#[test]
fn equal_strong_solutions_are_neutral_at_equivalence() {
    let params = TitrationParameters {
        analyte_concentration: 0.05,
        analyte_volume_ml: 20.0,
        titrant_concentration: 0.05,
        pka: None,
        pkb: None,
        pka2: None,
        max_volume_ml: 40.0,
        step_ml: 0.5,
    };
    for chemistry in [Chemistry::StrongAcid, Chemistry::StrongBase] {
        let ph = ph_at(chemistry, &params, 20.0);
        assert!((ph - 7.0).abs() < 1e-9, "{chemistry:?}: {ph}");
    }
}

#[test]
fn every_chemistry_fills_a_fine_grid() {
    for chemistry in Chemistry::ALL {
        let mut params = TitrationParameters::preset(chemistry);
        params.step_ml = 0.1;
        let sim = simulate(&params, chemistry).unwrap();
        let curve = sim.curve().unwrap();
        assert_eq!(curve.len(), 501, "{chemistry:?}");
        assert!(curve.volumes().windows(2).all(|w| w[1] > w[0]));
        assert!(curve.responses().iter().all(|r| r.is_finite()));
    }
}

#[test]
fn weak_acid_has_no_jump_at_equivalence() {
    let params = TitrationParameters::preset(Chemistry::WeakAcid);
    // 1e-9 mol of 0.1 M titrant.
    let dv = 1e-9 / params.titrant_concentration * 1000.0;
    let below = point_at(&params, Chemistry::WeakAcid, BranchModel::Bounded, 25.0 - dv).unwrap();
    let above = point_at(&params, Chemistry::WeakAcid, BranchModel::Bounded, 25.0 + dv).unwrap();
    assert_eq!(below.branch, Branch::Buffer);
    assert_eq!(above.branch, Branch::ExcessHydroxide);
    assert!((above.response - below.response).abs() < 0.01);
}

#[test]
fn strong_acid_preset_reference_values() {
    let params = TitrationParameters::preset(Chemistry::StrongAcid);
    assert!((ph_at(Chemistry::StrongAcid, &params, 0.0) - 1.0).abs() < 1e-9);
    assert!((ph_at(Chemistry::StrongAcid, &params, 25.0) - 7.0).abs() < 1e-9);
    let end = ph_at(Chemistry::StrongAcid, &params, 50.0);
    assert!((12.5..=13.0).contains(&end), "{end}");
}

#[test]
fn diprotic_first_equivalence_is_the_pka_average() {
    let params = TitrationParameters::preset(Chemistry::Diprotic);
    let sim = simulate(&params, Chemistry::Diprotic).unwrap();
    let rec = sim.record_at(12.5, 1e-9).unwrap();
    assert_eq!(rec.branch, Branch::FirstEquivalence);
    assert!((rec.response - 4.5).abs() < 1e-9);
}

#[test]
fn second_derivative_is_derivative_applied_twice() {
    for chemistry in Chemistry::ALL {
        let params = TitrationParameters::preset(chemistry);
        let curve = simulate_with(&params, chemistry, BranchModel::Classic).unwrap().curve().unwrap();
        let twice = derivative(&derivative(&curve).unwrap()).unwrap();
        let direct = second_derivative(&curve).unwrap();
        for (a, b) in twice.responses().iter().zip(direct.responses()) {
            assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0));
        }
    }
}

#[test]
fn gran_extrapolation_survives_a_text_file_round_trip() {
    let params = TitrationParameters::preset(Chemistry::StrongAcid);
    let curve = simulate(&params, Chemistry::StrongAcid).unwrap().curve().unwrap();
    let path = scratch("strong_acid.dat");
    write_curve_text(&path, &curve).unwrap();

    let loaded = load_curve(&path, ResponseKind::Ph).unwrap();
    assert_eq!(loaded.curve.len(), curve.len());
    assert!(loaded.row_errors.is_empty());

    let spec = TransformSpec::gran(Analyte::StrongAcid, GranIndex::G1, 25.0).unwrap();
    let g1 = transform(&loaded.curve, &spec).unwrap();
    let fit = fit_line(&g1.curve, VolumeWindow::new(0.0, 20.0).unwrap()).unwrap();
    // The text export keeps four decimals of pH.
    let v_eq = fit.x_intercept().unwrap();
    assert!((v_eq - 25.0).abs() < 0.05, "{v_eq}");
    std::fs::remove_file(&path).ok();
}

#[test]
fn records_csv_loads_back_as_a_curve() {
    let params = TitrationParameters::preset(Chemistry::WeakBase);
    let sim = simulate(&params, Chemistry::WeakBase).unwrap();
    let path = scratch("weak_base.csv");
    write_records_csv(&path, &sim.records).unwrap();

    let loaded = load_curve(&path, ResponseKind::Ph).unwrap();
    assert_eq!(loaded.curve.len(), sim.records.len());
    assert!((loaded.curve.responses()[0] - sim.records[0].response).abs() < 1e-4);
    std::fs::remove_file(&path).ok();
}

#[test]
fn bank_bundle_round_trips_through_json() {
    let params = TitrationParameters::preset(Chemistry::WeakAcid);
    let curve = simulate(&params, Chemistry::WeakAcid).unwrap().curve().unwrap();
    let entries = analyze_bank(&curve, 25.0, SchwarzConstants::default(), None).unwrap();
    let bundle = build_bundle(Some("weak acid".into()), &curve, ResponseKind::Ph, &entries);

    let path = scratch("bundle.json");
    write_bundle_json(&path, &bundle).unwrap();
    let back = read_bundle_json(&path).unwrap();
    assert_eq!(back, bundle);
    assert!(back.series.iter().any(|s| s.label == "weak-acid G1"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn corrupt_rows_are_skipped_and_reported() {
    let path = scratch("noisy.dat");
    std::fs::write(&path, "# V pH\n0 1.0\n1 abc\n2 1.2\n\n3 1.3 extra\n4\n").unwrap();
    let loaded = load_curve(&path, ResponseKind::Ph).unwrap();
    assert_eq!(loaded.curve.volumes(), &[0.0, 2.0, 3.0]);
    assert_eq!(loaded.row_errors.len(), 2);
    std::fs::remove_file(&path).ok();
}
