//! Ordered branch rules for each chemistry.
//!
//! A chemistry is a small table of `(branch, predicate, response)` rules. For
//! every volume step the simulator walks the table and uses the first rule whose
//! predicate holds; the last rule of every table always applies.
//!
//! Predicates compare mole amounts with an absolute tolerance of
//! [`MOLE_TOL`] so an exact stoichiometric match never reaches a `log10(0)`.
//!
//! Under [`BranchModel::Bounded`] each region's closed form is clamped by the
//! closed form of the adjacent landmark evaluated at the current dilution.
//! Most clamps only bite in the last ~1e-6 mol before a landmark, where the
//! Henderson–Hasselbalch and excess-titrant forms diverge. The diprotic first
//! buffer is the exception: with a low pKa1 its Henderson–Hasselbalch pH
//! falls below the initial H2A dissociation pH over the early part of the
//! buffer, so the lower clamp replaces those points outright.

use crate::domain::{Branch, BranchModel, Chemistry};
use crate::error::TitrationError;

use super::equilibrium::{
    dissociation_root, henderson_hasselbalch, hydrolysis, k_from_pk, ph_from_hydronium,
    ph_from_hydroxide, NEUTRAL_PH, PKW,
};

/// Absolute mole tolerance for landmark predicates.
pub const MOLE_TOL: f64 = 1e-12;

/// Mole balance at one volume step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepState {
    pub titrant_mol: f64,
    pub analyte_mol: f64,
    pub total_volume_l: f64,
}

impl StepState {
    fn conc(&self, mol: f64) -> f64 {
        mol / self.total_volume_l
    }
}

/// Constants a rule needs beyond the mole balance.
///
/// `pk` is pKa (weak acid, diprotic pKa1) or pKb (weak base); `pk2` is the
/// diprotic pKa2. Strong chemistries ignore both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constants {
    pub pk: f64,
    pub pk2: f64,
    pub model: BranchModel,
}

type Predicate = fn(&StepState) -> bool;
type Response = fn(&StepState, &Constants) -> Result<f64, TitrationError>;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub branch: Branch,
    pub applies: Predicate,
    pub response: Response,
}

/// Rule table for `chemistry`.
pub fn rules(chemistry: Chemistry) -> &'static [Rule] {
    match chemistry {
        Chemistry::StrongAcid => &STRONG_ACID,
        Chemistry::StrongBase => &STRONG_BASE,
        Chemistry::WeakAcid => &WEAK_ACID,
        Chemistry::WeakBase => &WEAK_BASE,
        Chemistry::Diprotic => &DIPROTIC,
    }
}

static STRONG_ACID: [Rule; 3] = [
    Rule {
        branch: Branch::ExcessHydronium,
        applies: before_equivalence,
        response: strong_acid_excess_analyte,
    },
    Rule {
        branch: Branch::Neutral,
        applies: at_equivalence,
        response: neutral,
    },
    Rule {
        branch: Branch::ExcessHydroxide,
        applies: always,
        response: strong_acid_excess_titrant,
    },
];

static STRONG_BASE: [Rule; 3] = [
    Rule {
        branch: Branch::ExcessHydroxide,
        applies: before_equivalence,
        response: strong_base_excess_analyte,
    },
    Rule {
        branch: Branch::Neutral,
        applies: at_equivalence,
        response: neutral,
    },
    Rule {
        branch: Branch::ExcessHydronium,
        applies: always,
        response: strong_base_excess_titrant,
    },
];

static WEAK_ACID: [Rule; 4] = [
    Rule {
        branch: Branch::InitialWeakAcid,
        applies: no_titrant,
        response: weak_acid_initial,
    },
    Rule {
        branch: Branch::Buffer,
        applies: before_equivalence,
        response: weak_acid_buffer,
    },
    Rule {
        branch: Branch::ConjugateBaseHydrolysis,
        applies: at_equivalence,
        response: weak_acid_equivalence,
    },
    Rule {
        branch: Branch::ExcessHydroxide,
        applies: always,
        response: weak_acid_excess,
    },
];

static WEAK_BASE: [Rule; 4] = [
    Rule {
        branch: Branch::InitialWeakBase,
        applies: no_titrant,
        response: weak_base_initial,
    },
    Rule {
        branch: Branch::Buffer,
        applies: before_equivalence,
        response: weak_base_buffer,
    },
    Rule {
        branch: Branch::ConjugateAcidHydrolysis,
        applies: at_equivalence,
        response: weak_base_equivalence,
    },
    Rule {
        branch: Branch::ExcessHydronium,
        applies: always,
        response: weak_base_excess,
    },
];

static DIPROTIC: [Rule; 6] = [
    Rule {
        branch: Branch::InitialDiprotic,
        applies: no_titrant,
        response: diprotic_initial,
    },
    Rule {
        branch: Branch::FirstBuffer,
        applies: before_equivalence,
        response: diprotic_first_buffer,
    },
    Rule {
        branch: Branch::FirstEquivalence,
        applies: at_equivalence,
        response: diprotic_first_equivalence,
    },
    Rule {
        branch: Branch::SecondBuffer,
        applies: before_second_equivalence,
        response: diprotic_second_buffer,
    },
    Rule {
        branch: Branch::SecondEquivalence,
        applies: at_second_equivalence,
        response: diprotic_second_equivalence,
    },
    Rule {
        branch: Branch::ExcessAfterSecond,
        applies: always,
        response: diprotic_excess,
    },
];

// --- predicates ---

fn no_titrant(s: &StepState) -> bool {
    s.titrant_mol <= 0.0
}

fn before_equivalence(s: &StepState) -> bool {
    s.titrant_mol < s.analyte_mol - MOLE_TOL
}

fn at_equivalence(s: &StepState) -> bool {
    (s.titrant_mol - s.analyte_mol).abs() < MOLE_TOL
}

fn before_second_equivalence(s: &StepState) -> bool {
    s.titrant_mol < 2.0 * s.analyte_mol - MOLE_TOL
}

fn at_second_equivalence(s: &StepState) -> bool {
    (s.titrant_mol - 2.0 * s.analyte_mol).abs() < MOLE_TOL
}

fn always(_: &StepState) -> bool {
    true
}

// --- strong acid / strong base ---

fn neutral(_: &StepState, _: &Constants) -> Result<f64, TitrationError> {
    Ok(NEUTRAL_PH)
}

fn strong_acid_excess_analyte(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydronium(s.conc(s.analyte_mol - s.titrant_mol))?;
    Ok(match c.model {
        BranchModel::Classic => ph,
        BranchModel::Bounded => ph.min(NEUTRAL_PH),
    })
}

fn strong_acid_excess_titrant(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydroxide(s.conc(s.titrant_mol - s.analyte_mol))?;
    Ok(match c.model {
        BranchModel::Classic => ph,
        BranchModel::Bounded => ph.max(NEUTRAL_PH),
    })
}

fn strong_base_excess_analyte(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydroxide(s.conc(s.analyte_mol - s.titrant_mol))?;
    Ok(match c.model {
        BranchModel::Classic => ph,
        BranchModel::Bounded => ph.max(NEUTRAL_PH),
    })
}

fn strong_base_excess_titrant(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydronium(s.conc(s.titrant_mol - s.analyte_mol))?;
    Ok(match c.model {
        BranchModel::Classic => ph,
        BranchModel::Bounded => ph.min(NEUTRAL_PH),
    })
}

// --- weak acid vs strong base (pk = pKa) ---

fn weak_acid_dissociation_ph(ka: f64, c: f64) -> Result<f64, TitrationError> {
    ph_from_hydronium(dissociation_root(ka, c)?)
}

/// pH of a conjugate-base solution (A⁻ hydrolysis).
fn conjugate_base_ph(ka: f64, c_salt: f64) -> Result<f64, TitrationError> {
    ph_from_hydroxide(hydrolysis(ka, c_salt)?)
}

fn weak_acid_initial(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    weak_acid_dissociation_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))
}

fn weak_acid_buffer(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = henderson_hasselbalch(c.pk, s.titrant_mol, s.analyte_mol - s.titrant_mol)?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => {
            let ka = k_from_pk(c.pk);
            let upper = conjugate_base_ph(ka, s.conc(s.titrant_mol))?;
            let lower = weak_acid_dissociation_ph(ka, s.conc(s.analyte_mol))?;
            Ok(ph.min(upper).max(lower))
        }
    }
}

fn weak_acid_equivalence(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    conjugate_base_ph(k_from_pk(c.pk), s.conc(s.titrant_mol))
}

fn weak_acid_excess(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydroxide(s.conc(s.titrant_mol - s.analyte_mol))?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => Ok(ph.max(conjugate_base_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))?)),
    }
}

// --- weak base vs strong acid (pk = pKb) ---

fn weak_base_dissociation_ph(kb: f64, c: f64) -> Result<f64, TitrationError> {
    ph_from_hydroxide(dissociation_root(kb, c)?)
}

/// pH of a conjugate-acid solution (BH⁺ hydrolysis).
fn conjugate_acid_ph(kb: f64, c_salt: f64) -> Result<f64, TitrationError> {
    ph_from_hydronium(hydrolysis(kb, c_salt)?)
}

fn weak_base_initial(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    weak_base_dissociation_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))
}

fn weak_base_buffer(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    // pKa of BH⁺; the remaining base is the conjugate, BH⁺ the parent.
    let pka_conjugate = PKW - c.pk;
    let ph = henderson_hasselbalch(pka_conjugate, s.analyte_mol - s.titrant_mol, s.titrant_mol)?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => {
            let kb = k_from_pk(c.pk);
            let lower = conjugate_acid_ph(kb, s.conc(s.titrant_mol))?;
            let upper = weak_base_dissociation_ph(kb, s.conc(s.analyte_mol))?;
            Ok(ph.max(lower).min(upper))
        }
    }
}

fn weak_base_equivalence(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    conjugate_acid_ph(k_from_pk(c.pk), s.conc(s.titrant_mol))
}

fn weak_base_excess(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydronium(s.conc(s.titrant_mol - s.analyte_mol))?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => Ok(ph.min(conjugate_acid_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))?)),
    }
}

// --- diprotic acid vs strong base (pk = pKa1, pk2 = pKa2) ---

/// Amphiprotic shortcut `½(pKa1 + pKa2)`.
fn amphiprotic_ph(c: &Constants) -> f64 {
    0.5 * (c.pk + c.pk2)
}

/// pH of an A²⁻ solution; a zero hydroxide concentration reads as pOH 7.
fn second_equivalence_ph(ka2: f64, c_salt: f64) -> Result<f64, TitrationError> {
    let oh = hydrolysis(ka2, c_salt)?;
    if oh > 0.0 {
        ph_from_hydroxide(oh)
    } else {
        Ok(PKW - NEUTRAL_PH)
    }
}

fn diprotic_initial(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    weak_acid_dissociation_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))
}

fn diprotic_first_buffer(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = henderson_hasselbalch(c.pk, s.titrant_mol, s.analyte_mol - s.titrant_mol)?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => {
            let lower = weak_acid_dissociation_ph(k_from_pk(c.pk), s.conc(s.analyte_mol))?;
            Ok(ph.min(amphiprotic_ph(c)).max(lower))
        }
    }
}

fn diprotic_first_equivalence(_: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    Ok(amphiprotic_ph(c))
}

fn diprotic_second_buffer(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let a2 = s.titrant_mol - s.analyte_mol;
    let ha = if s.titrant_mol > s.analyte_mol {
        s.analyte_mol - a2
    } else {
        0.0
    };
    let ph = if ha <= 0.0 {
        c.pk2
    } else {
        henderson_hasselbalch(c.pk2, a2, ha)?
    };
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => {
            let upper = second_equivalence_ph(k_from_pk(c.pk2), s.conc(s.titrant_mol))?;
            Ok(ph.min(upper).max(amphiprotic_ph(c)))
        }
    }
}

fn diprotic_second_equivalence(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    second_equivalence_ph(k_from_pk(c.pk2), s.conc(s.titrant_mol))
}

fn diprotic_excess(s: &StepState, c: &Constants) -> Result<f64, TitrationError> {
    let ph = ph_from_hydroxide(s.conc(s.titrant_mol - 2.0 * s.analyte_mol))?;
    match c.model {
        BranchModel::Classic => Ok(ph),
        BranchModel::Bounded => {
            let floor = second_equivalence_ph(k_from_pk(c.pk2), s.conc(2.0 * s.analyte_mol))?;
            Ok(ph.max(floor))
        }
    }
}
