//! Forward titration simulation.
//!
//! `simulate` walks the volume grid `V_i = i * step` and evaluates, for each
//! step, the first matching rule of the chemistry's rule table
//! (see [`rules`]). Every response is a closed form; there is no iterative
//! equilibrium solver.

pub mod equilibrium;
pub mod noise;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Branch, BranchModel, Chemistry, Curve, Landmarks, TitrationParameters, TitrationRecord,
};
use crate::error::TitrationError;

pub use noise::add_measurement_noise;
pub use rules::{Constants, MOLE_TOL, StepState};

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub chemistry: Chemistry,
    pub model: BranchModel,
    pub parameters: TitrationParameters,
    pub landmarks: Landmarks,
    pub records: Vec<TitrationRecord>,
}

impl Simulation {
    /// The `(volume, pH)` curve of this run.
    pub fn curve(&self) -> Result<Curve, TitrationError> {
        Curve::new(
            self.records.iter().map(|r| r.volume_ml).collect(),
            self.records.iter().map(|r| r.response).collect(),
        )
    }

    /// Record whose volume is within `tol` of `volume_ml`.
    pub fn record_at(&self, volume_ml: f64, tol: f64) -> Option<&TitrationRecord> {
        self.records.iter().find(|r| (r.volume_ml - volume_ml).abs() <= tol)
    }
}

/// Simulate with the default [`BranchModel`].
pub fn simulate(parameters: &TitrationParameters, chemistry: Chemistry) -> Result<Simulation, TitrationError> {
    simulate_with(parameters, chemistry, BranchModel::default())
}

pub fn simulate_with(
    parameters: &TitrationParameters,
    chemistry: Chemistry,
    model: BranchModel,
) -> Result<Simulation, TitrationError> {
    parameters.validate_for(chemistry)?;

    let constants = constants_for(parameters, chemistry, model);
    let landmarks = landmarks(parameters, chemistry);
    let n = parameters.step_count();

    tracing::debug!(
        chemistry = chemistry.display_name(),
        ?model,
        steps = n,
        v1 = landmarks.first_equivalence_ml,
        "simulating titration"
    );

    let records = (0..n)
        .map(|i| record_at_volume(parameters, chemistry, &constants, i as f64 * parameters.step_ml))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Simulation {
        chemistry,
        model,
        parameters: parameters.clone(),
        landmarks,
        records,
    })
}

/// Evaluate a single point at an arbitrary titrant volume (mL).
///
/// Uses the same rules as [`simulate_with`]; handy for probing the curve
/// next to a landmark without a fine grid.
pub fn point_at(
    parameters: &TitrationParameters,
    chemistry: Chemistry,
    model: BranchModel,
    volume_ml: f64,
) -> Result<TitrationRecord, TitrationError> {
    parameters.validate_for(chemistry)?;
    if !volume_ml.is_finite() || volume_ml < 0.0 {
        return Err(TitrationError::parameter(format!(
            "titrant volume must be non-negative and finite, got {volume_ml}"
        )));
    }
    let constants = constants_for(parameters, chemistry, model);
    record_at_volume(parameters, chemistry, &constants, volume_ml)
}

/// Equivalence volumes: `V1 = n_analyte / C_titrant`, and `V2 = 2 * V1` for
/// the diprotic acid.
pub fn landmarks(parameters: &TitrationParameters, chemistry: Chemistry) -> Landmarks {
    let first = parameters.analyte_mol() / parameters.titrant_concentration * 1000.0;
    Landmarks {
        first_equivalence_ml: first,
        second_equivalence_ml: (chemistry == Chemistry::Diprotic).then_some(2.0 * first),
    }
}

/// Select and evaluate the first matching rule for one mole balance.
pub fn evaluate(
    chemistry: Chemistry,
    constants: &Constants,
    state: &StepState,
) -> Result<(Branch, f64), TitrationError> {
    let rule = rules::rules(chemistry)
        .iter()
        .find(|rule| (rule.applies)(state))
        .ok_or_else(|| TitrationError::domain("no branch rule matched the mole balance"))?;
    let response = (rule.response)(state, constants)?;
    if !response.is_finite() {
        return Err(TitrationError::domain(format!(
            "{} produced a non-finite response",
            rule.branch
        )));
    }
    Ok((rule.branch, response))
}

fn constants_for(parameters: &TitrationParameters, chemistry: Chemistry, model: BranchModel) -> Constants {
    let pk = match chemistry {
        Chemistry::WeakBase => parameters.pkb,
        _ => parameters.pka,
    };
    Constants {
        pk: pk.unwrap_or_default(),
        pk2: parameters.pka2.unwrap_or_default(),
        model,
    }
}

fn record_at_volume(
    parameters: &TitrationParameters,
    chemistry: Chemistry,
    constants: &Constants,
    volume_ml: f64,
) -> Result<TitrationRecord, TitrationError> {
    let total_volume_ml = parameters.analyte_volume_ml + volume_ml;
    let state = StepState {
        titrant_mol: parameters.titrant_concentration * volume_ml / 1000.0,
        analyte_mol: parameters.analyte_mol(),
        total_volume_l: total_volume_ml / 1000.0,
    };
    let (branch, response) = evaluate(chemistry, constants, &state).map_err(|err| match err {
        TitrationError::Domain { message } => {
            TitrationError::domain(format!("at V = {volume_ml:.4} mL: {message}"))
        }
        other => other,
    })?;
    Ok(TitrationRecord {
        volume_ml,
        response,
        total_volume_ml,
        branch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chemistry: Chemistry, model: BranchModel) -> Simulation {
        simulate_with(&TitrationParameters::preset(chemistry), chemistry, model).unwrap()
    }

    fn ph_at(sim: &Simulation, v: f64) -> f64 {
        sim.record_at(v, 1e-9).unwrap().response
    }

    #[test]
    fn strong_acid_reference_points() {
        for model in [BranchModel::Classic, BranchModel::Bounded] {
            let sim = run(Chemistry::StrongAcid, model);
            assert!((ph_at(&sim, 0.0) - 1.0).abs() < 1e-9);
            assert!((ph_at(&sim, 25.0) - 7.0).abs() < 1e-9);
            let end = ph_at(&sim, 50.0);
            assert!(end > 12.5 && end < 13.0, "end pH {end}");
        }
    }

    #[test]
    fn strong_base_mirror_is_neutral_at_equivalence() {
        let sim = run(Chemistry::StrongBase, BranchModel::Classic);
        assert!((ph_at(&sim, 0.0) - 13.0).abs() < 1e-9);
        assert!((ph_at(&sim, 25.0) - 7.0).abs() < 1e-9);
        assert!(ph_at(&sim, 50.0) < 1.5);
    }

    #[test]
    fn every_chemistry_produces_the_full_grid() {
        for chem in Chemistry::ALL {
            let params = TitrationParameters::preset(chem);
            let sim = simulate(&params, chem).unwrap();
            assert_eq!(sim.records.len(), params.step_count());
            assert!(sim.records.windows(2).all(|w| w[1].volume_ml > w[0].volume_ml));
            assert!(sim.curve().is_ok());
        }
    }

    #[test]
    fn weak_acid_is_continuous_at_equivalence() {
        let chem = Chemistry::WeakAcid;
        let params = TitrationParameters::preset(chem);
        let v1 = landmarks(&params, chem).first_equivalence_ml;
        // 1e-9 mol of 0.1 M titrant is 1e-5 mL.
        let dv = 1e-9 / params.titrant_concentration * 1000.0;

        let at = point_at(&params, chem, BranchModel::Bounded, v1).unwrap();
        let before = point_at(&params, chem, BranchModel::Bounded, v1 - dv).unwrap();
        let after = point_at(&params, chem, BranchModel::Bounded, v1 + dv).unwrap();

        assert_eq!(at.branch, Branch::ConjugateBaseHydrolysis);
        assert_eq!(before.branch, Branch::Buffer);
        assert_eq!(after.branch, Branch::ExcessHydroxide);
        assert!((before.response - at.response).abs() < 0.01);
        assert!((after.response - at.response).abs() < 0.01);
    }

    #[test]
    fn classic_weak_acid_keeps_the_raw_branch_values() {
        let sim = run(Chemistry::WeakAcid, BranchModel::Classic);
        // Acetic acid, 0.1 M: initial pH ~2.88, half-equivalence = pKa, hydrolysis ~8.73.
        assert!((ph_at(&sim, 0.0) - 2.88).abs() < 0.01);
        assert!((ph_at(&sim, 12.5) - 4.76).abs() < 1e-9);
        assert!((ph_at(&sim, 25.0) - 8.72).abs() < 0.02);
        assert_eq!(sim.record_at(25.0, 1e-9).unwrap().branch, Branch::ConjugateBaseHydrolysis);
    }

    #[test]
    fn weak_base_mirrors_weak_acid() {
        let sim = run(Chemistry::WeakBase, BranchModel::Bounded);
        assert!((ph_at(&sim, 0.0) - 11.12).abs() < 0.02);
        assert!((ph_at(&sim, 12.5) - 9.25).abs() < 1e-9);
        assert!((ph_at(&sim, 25.0) - 5.28).abs() < 0.02);
        assert!(sim.records.windows(2).all(|w| w[1].response <= w[0].response + 1e-12));
    }

    #[test]
    fn diprotic_first_equivalence_is_amphiprotic_average() {
        let sim = run(Chemistry::Diprotic, BranchModel::Classic);
        // 0.050 M x 25 mL H2A against 0.100 M base: V1 = 12.5 mL, V2 = 25 mL.
        assert_eq!(sim.landmarks.first_equivalence_ml, 12.5);
        assert_eq!(sim.landmarks.second_equivalence_ml, Some(25.0));
        let rec = sim.record_at(12.5, 1e-9).unwrap();
        assert_eq!(rec.branch, Branch::FirstEquivalence);
        assert!((rec.response - 4.5).abs() < 1e-12);
        assert_eq!(sim.record_at(25.0, 1e-9).unwrap().branch, Branch::SecondEquivalence);
    }

    #[test]
    fn bounded_diprotic_lifts_the_early_first_buffer() {
        let chem = Chemistry::Diprotic;
        let params = TitrationParameters::preset(chem);
        let classic = point_at(&params, chem, BranchModel::Classic, 0.5).unwrap();
        let bounded = point_at(&params, chem, BranchModel::Bounded, 0.5).unwrap();
        assert_eq!(bounded.branch, Branch::FirstBuffer);
        // Henderson-Hasselbalch dips below the H2A dissociation pH here.
        assert!((classic.response - 0.620).abs() < 0.01, "{}", classic.response);
        assert!((bounded.response - 1.752).abs() < 0.01, "{}", bounded.response);

        // Half-way to V1 the two models agree again.
        let classic = point_at(&params, chem, BranchModel::Classic, 6.25).unwrap();
        let bounded = point_at(&params, chem, BranchModel::Bounded, 6.25).unwrap();
        assert!((classic.response - 2.0).abs() < 1e-9);
        assert_eq!(classic.response, bounded.response);
    }

    #[test]
    fn bounded_curves_are_monotone() {
        for chem in [Chemistry::StrongAcid, Chemistry::WeakAcid, Chemistry::Diprotic] {
            let sim = run(chem, BranchModel::Bounded);
            assert!(
                sim.records.windows(2).all(|w| w[1].response >= w[0].response - 1e-12),
                "{} not monotone",
                chem.display_name()
            );
        }
    }

    #[test]
    fn invalid_parameters_are_rejected_before_simulating() {
        let mut params = TitrationParameters::preset(Chemistry::WeakAcid);
        params.pka = None;
        assert!(matches!(
            simulate(&params, Chemistry::WeakAcid),
            Err(TitrationError::Parameter { .. })
        ));
    }

    #[test]
    fn total_volume_is_tracked() {
        let sim = run(Chemistry::StrongAcid, BranchModel::Bounded);
        let rec = sim.record_at(10.0, 1e-9).unwrap();
        assert!((rec.total_volume_ml - 35.0).abs() < 1e-12);
    }
}
