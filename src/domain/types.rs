//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during simulation and transforms
//! - exported to text/CSV/JSON
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TitrationError;

/// The five simulated chemistries (analyte vs titrant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Chemistry {
    /// Strong acid (e.g. HCl) titrated by a strong base (NaOH).
    StrongAcid,
    /// Strong base (NaOH) titrated by a strong acid (HCl).
    StrongBase,
    /// Weak monoprotic acid (e.g. acetic acid) titrated by a strong base.
    WeakAcid,
    /// Weak base (e.g. ammonia) titrated by a strong acid.
    WeakBase,
    /// Diprotic acid H2A titrated by a strong base.
    Diprotic,
}

impl Chemistry {
    pub const ALL: [Chemistry; 5] = [
        Chemistry::StrongAcid,
        Chemistry::StrongBase,
        Chemistry::WeakAcid,
        Chemistry::WeakBase,
        Chemistry::Diprotic,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Chemistry::StrongAcid => "strong acid vs strong base",
            Chemistry::StrongBase => "strong base vs strong acid",
            Chemistry::WeakAcid => "weak acid vs strong base",
            Chemistry::WeakBase => "weak base vs strong acid",
            Chemistry::Diprotic => "diprotic acid vs strong base",
        }
    }

    /// File stem used for batch exports.
    pub fn file_stem(self) -> &'static str {
        match self {
            Chemistry::StrongAcid => "strong_acid",
            Chemistry::StrongBase => "strong_base",
            Chemistry::WeakAcid => "weak_acid",
            Chemistry::WeakBase => "weak_base",
            Chemistry::Diprotic => "diprotic",
        }
    }

    /// The analyte class whose Gran transforms linearize this chemistry.
    pub fn analyte(self) -> Analyte {
        match self {
            Chemistry::StrongAcid => Analyte::StrongAcid,
            Chemistry::StrongBase => Analyte::StrongBase,
            Chemistry::WeakAcid | Chemistry::Diprotic => Analyte::WeakAcid,
            Chemistry::WeakBase => Analyte::WeakBase,
        }
    }

    /// Number of equivalence points.
    pub fn equivalence_count(self) -> usize {
        match self {
            Chemistry::Diprotic => 2,
            _ => 1,
        }
    }

    /// Resolve a parameter-form selection into a chemistry.
    ///
    /// `diprotic` only applies to weak acids.
    pub fn from_selection(
        titration_type: TitrationType,
        strength: Strength,
        diprotic: bool,
    ) -> Result<Self, TitrationError> {
        let analyte = Analyte::from_selection(titration_type, strength)?;
        match (analyte, diprotic) {
            (Analyte::WeakAcid, true) => Ok(Chemistry::Diprotic),
            (_, true) => Err(TitrationError::parameter(
                "the diprotic model is only defined for weak acids",
            )),
            (Analyte::StrongAcid, false) => Ok(Chemistry::StrongAcid),
            (Analyte::StrongBase, false) => Ok(Chemistry::StrongBase),
            (Analyte::WeakAcid, false) => Ok(Chemistry::WeakAcid),
            (Analyte::WeakBase, false) => Ok(Chemistry::WeakBase),
        }
    }
}

/// Titration type as chosen in the parameter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TitrationType {
    Acid,
    Base,
    /// "Don't know" in the form; rejected by the core.
    Unknown,
}

/// Titration strength as chosen in the parameter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Weak,
    /// "Don't know" in the form; rejected by the core.
    Unknown,
}

/// Analyte class used to pick a Gran/Schwarz transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Analyte {
    StrongAcid,
    StrongBase,
    WeakAcid,
    WeakBase,
}

impl Analyte {
    pub const ALL: [Analyte; 4] = [
        Analyte::StrongAcid,
        Analyte::StrongBase,
        Analyte::WeakAcid,
        Analyte::WeakBase,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Analyte::StrongAcid => "strong-acid",
            Analyte::StrongBase => "strong-base",
            Analyte::WeakAcid => "weak-acid",
            Analyte::WeakBase => "weak-base",
        }
    }

    /// Map a type × strength selection to an analyte. "Unknown" is never guessed.
    pub fn from_selection(titration_type: TitrationType, strength: Strength) -> Result<Self, TitrationError> {
        match (titration_type, strength) {
            (TitrationType::Acid, Strength::Strong) => Ok(Analyte::StrongAcid),
            (TitrationType::Acid, Strength::Weak) => Ok(Analyte::WeakAcid),
            (TitrationType::Base, Strength::Strong) => Ok(Analyte::StrongBase),
            (TitrationType::Base, Strength::Weak) => Ok(Analyte::WeakBase),
            (TitrationType::Unknown, _) => Err(TitrationError::parameter(
                "titration type is 'unknown'; choose acid or base",
            )),
            (_, Strength::Unknown) => Err(TitrationError::parameter(
                "titration strength is 'unknown'; choose strong or weak",
            )),
        }
    }

    /// Inverse of [`Analyte::from_selection`] (used when writing method files).
    pub fn selection(self) -> (TitrationType, Strength) {
        match self {
            Analyte::StrongAcid => (TitrationType::Acid, Strength::Strong),
            Analyte::WeakAcid => (TitrationType::Acid, Strength::Weak),
            Analyte::StrongBase => (TitrationType::Base, Strength::Strong),
            Analyte::WeakBase => (TitrationType::Base, Strength::Weak),
        }
    }
}

/// Gran transform index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GranIndex {
    G1,
    G2,
}

impl GranIndex {
    pub fn display_name(self) -> &'static str {
        match self {
            GranIndex::G1 => "G1",
            GranIndex::G2 => "G2",
        }
    }
}

/// Transform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformFamily {
    /// Classical Gran functions.
    Gran,
    /// Gran G1 with a tunable exponent offset `k` and divisor scale.
    Schwarz,
}

/// What the response axis of a curve measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// pH units; typical range [0, 14].
    Ph,
    /// Electrode potential in millivolts; typical range [-2000, 2000].
    Potential,
}

impl ResponseKind {
    /// Physically typical bounds. Values outside produce warnings, not failures.
    pub fn typical_bounds(self) -> (f64, f64) {
        match self {
            ResponseKind::Ph => (0.0, 14.0),
            ResponseKind::Potential => (-2000.0, 2000.0),
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            ResponseKind::Ph => "pH",
            ResponseKind::Potential => "E (mV)",
        }
    }
}

/// How branch responses are combined near stoichiometric landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum BranchModel {
    /// Each branch's closed form exactly as written (jumps at landmarks).
    Classic,
    /// Each branch's closed form bounded by the adjacent landmark's closed form
    /// at the current dilution, which keeps the curve continuous.
    #[default]
    Bounded,
}

/// Dosing parameters for a simulation.
///
/// Volumes are in millilitres and concentrations in mol/L. Dissociation
/// constants are given as p-values; the diprotic model reads `pka` as pKa1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitrationParameters {
    pub analyte_concentration: f64,
    pub analyte_volume_ml: f64,
    pub titrant_concentration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pka: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pka2: Option<f64>,
    pub max_volume_ml: f64,
    pub step_ml: f64,
}

/// Largest simulated grid, in points.
pub const MAX_STEP_COUNT: usize = 1_000_000;

impl TitrationParameters {
    /// Reference datasets (HCl/NaOH, acetic acid, ammonia, H2A with pKa 2/7).
    pub fn preset(chemistry: Chemistry) -> Self {
        let base = Self {
            analyte_concentration: 0.100,
            analyte_volume_ml: 25.0,
            titrant_concentration: 0.100,
            pka: None,
            pkb: None,
            pka2: None,
            max_volume_ml: 50.0,
            step_ml: 1.0,
        };
        match chemistry {
            Chemistry::StrongAcid | Chemistry::StrongBase => base,
            Chemistry::WeakAcid => Self {
                pka: Some(4.76),
                ..base
            },
            Chemistry::WeakBase => Self {
                pkb: Some(4.75),
                ..base
            },
            Chemistry::Diprotic => Self {
                analyte_concentration: 0.050,
                pka: Some(2.00),
                pka2: Some(7.00),
                step_ml: 0.5,
                ..base
            },
        }
    }

    /// Check the invariants required by `chemistry`.
    pub fn validate_for(&self, chemistry: Chemistry) -> Result<(), TitrationError> {
        require_positive(self.analyte_concentration, "analyte concentration")?;
        require_positive(self.analyte_volume_ml, "analyte volume")?;
        require_positive(self.titrant_concentration, "titrant concentration")?;
        require_positive(self.step_ml, "volume step")?;
        require_positive(self.max_volume_ml, "maximum titrant volume")?;
        if self.max_volume_ml < self.step_ml {
            return Err(TitrationError::parameter(format!(
                "maximum titrant volume ({}) must be >= step ({})",
                self.max_volume_ml, self.step_ml
            )));
        }
        if self.checked_step_count().is_none() {
            return Err(TitrationError::parameter(format!(
                "volume step {} over {} mL exceeds {MAX_STEP_COUNT} grid points",
                self.step_ml, self.max_volume_ml
            )));
        }

        match chemistry {
            Chemistry::StrongAcid | Chemistry::StrongBase => {}
            Chemistry::WeakAcid => {
                require_pk(self.pka, "pKa")?;
            }
            Chemistry::WeakBase => {
                require_pk(self.pkb, "pKb")?;
            }
            Chemistry::Diprotic => {
                require_pk(self.pka, "pKa1")?;
                require_pk(self.pka2, "pKa2")?;
            }
        }
        Ok(())
    }

    /// Number of volume steps: `floor(Vmax / step) + 1`, saturating at
    /// [`MAX_STEP_COUNT`].
    pub fn step_count(&self) -> usize {
        self.checked_step_count().unwrap_or(MAX_STEP_COUNT)
    }

    /// `None` when the grid would exceed [`MAX_STEP_COUNT`] points.
    pub fn checked_step_count(&self) -> Option<usize> {
        // The epsilon absorbs representation error for ratios like 50.0 / 0.1.
        let intervals = (self.max_volume_ml / self.step_ml + 1e-9).floor();
        if !intervals.is_finite() || intervals < 0.0 || intervals >= MAX_STEP_COUNT as f64 {
            return None;
        }
        Some(intervals as usize + 1)
    }

    /// Analyte amount in moles.
    pub fn analyte_mol(&self) -> f64 {
        self.analyte_concentration * self.analyte_volume_ml / 1000.0
    }
}

fn require_positive(value: f64, name: &str) -> Result<f64, TitrationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TitrationError::parameter(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(value)
}

fn require_pk(value: Option<f64>, name: &str) -> Result<f64, TitrationError> {
    let Some(value) = value else {
        return Err(TitrationError::parameter(format!("{name} is required for this chemistry")));
    };
    require_positive(value, name)
}

/// Stoichiometric landmark volumes (mL of titrant).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub first_equivalence_ml: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_equivalence_ml: Option<f64>,
}

/// Closed-form branch that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    ExcessHydronium,
    ExcessHydroxide,
    Neutral,
    InitialWeakAcid,
    InitialWeakBase,
    Buffer,
    ConjugateBaseHydrolysis,
    ConjugateAcidHydrolysis,
    InitialDiprotic,
    FirstBuffer,
    FirstEquivalence,
    SecondBuffer,
    SecondEquivalence,
    ExcessAfterSecond,
}

impl Branch {
    /// Descriptive label written to the CSV `note` column.
    pub fn label(self) -> &'static str {
        match self {
            Branch::ExcessHydronium => "excess H+",
            Branch::ExcessHydroxide => "excess OH-",
            Branch::Neutral => "equivalence (neutral)",
            Branch::InitialWeakAcid => "initial weak acid",
            Branch::InitialWeakBase => "initial weak base",
            Branch::Buffer => "buffer region",
            Branch::ConjugateBaseHydrolysis => "equivalence (conjugate base hydrolysis)",
            Branch::ConjugateAcidHydrolysis => "equivalence (conjugate acid hydrolysis)",
            Branch::InitialDiprotic => "initial diprotic acid",
            Branch::FirstBuffer => "between 0 and first eq (buffer of H2A/HA-)",
            Branch::FirstEquivalence => "first equivalence (amphiprotic HA-)",
            Branch::SecondBuffer => "between first and second eq (buffer of HA-/A2-)",
            Branch::SecondEquivalence => "second equivalence (A2- solution)",
            Branch::ExcessAfterSecond => "excess OH- after second eq",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One simulated row: a curve point plus audit fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TitrationRecord {
    pub volume_ml: f64,
    pub response: f64,
    pub total_volume_ml: f64,
    pub branch: Branch,
}

/// A raw `(volume, response)` row before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub volume: f64,
    pub response: f64,
}

impl Sample {
    pub fn new(volume: f64, response: f64) -> Self {
        Self { volume, response }
    }
}

/// Minimum points for a curve (needed for any difference quotient).
pub const MIN_CURVE_POINTS: usize = 2;

/// An ordered `(volume, response)` curve.
///
/// Invariants (checked on construction):
/// - at least [`MIN_CURVE_POINTS`] points
/// - volumes strictly increasing
/// - all values finite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveData")]
pub struct Curve {
    volume_ml: Vec<f64>,
    response: Vec<f64>,
}

/// Unchecked serde mirror of [`Curve`].
#[derive(Debug, Clone, Deserialize)]
struct CurveData {
    volume_ml: Vec<f64>,
    response: Vec<f64>,
}

impl TryFrom<CurveData> for Curve {
    type Error = TitrationError;

    fn try_from(value: CurveData) -> Result<Self, Self::Error> {
        Curve::new(value.volume_ml, value.response)
    }
}

impl Curve {
    pub fn new(volume_ml: Vec<f64>, response: Vec<f64>) -> Result<Self, TitrationError> {
        if volume_ml.len() != response.len() {
            return Err(TitrationError::validation(format!(
                "volume and response lengths differ ({} vs {})",
                volume_ml.len(),
                response.len()
            )));
        }
        if let Some(problem) = crate::validate::structural_problem(&volume_ml, &response) {
            return Err(TitrationError::validation(problem.to_string()));
        }
        Ok(Self { volume_ml, response })
    }

    pub fn from_samples(samples: &[Sample]) -> Result<Self, TitrationError> {
        let volume_ml = samples.iter().map(|s| s.volume).collect();
        let response = samples.iter().map(|s| s.response).collect();
        Self::new(volume_ml, response)
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volume_ml
    }

    pub fn responses(&self) -> &[f64] {
        &self.response
    }

    pub fn len(&self) -> usize {
        self.volume_ml.len()
    }

    /// Always false for a constructed curve; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.volume_ml.is_empty()
    }

    /// `(volume, response)` pairs in volume order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.volume_ml.iter().copied().zip(self.response.iter().copied())
    }

    pub fn to_pairs(&self) -> Vec<(f64, f64)> {
        self.points().collect()
    }

    /// Response at an exact volume (within `tol`), if sampled.
    pub fn response_at(&self, volume: f64, tol: f64) -> Option<f64> {
        self.points()
            .find(|&(v, _)| (v - volume).abs() <= tol)
            .map(|(_, r)| r)
    }

    /// Min/max of the response axis.
    pub fn response_range(&self) -> (f64, f64) {
        self.response
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| (lo.min(r), hi.max(r)))
    }

    /// Same volume domain, new responses.
    pub fn with_responses(&self, response: Vec<f64>) -> Result<Self, TitrationError> {
        Self::new(self.volume_ml.clone(), response)
    }
}

/// Exponent offset and divisor scale of the Schwarz family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchwarzConstants {
    /// `k` in `10^(k ± r)`.
    pub exponent_offset: f64,
    /// Divisor applied to the whole expression.
    pub divisor: f64,
}

impl Default for SchwarzConstants {
    fn default() -> Self {
        Self {
            exponent_offset: 1.0,
            divisor: 1.0,
        }
    }
}

/// Identifies one transform variant plus its constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    family: TransformFamily,
    analyte: Analyte,
    index: GranIndex,
    initial_volume_ml: f64,
    constants: SchwarzConstants,
}

impl TransformSpec {
    /// A classical Gran transform.
    pub fn gran(analyte: Analyte, index: GranIndex, initial_volume_ml: f64) -> Result<Self, TitrationError> {
        check_initial_volume(initial_volume_ml)?;
        Ok(Self {
            family: TransformFamily::Gran,
            analyte,
            index,
            initial_volume_ml,
            constants: SchwarzConstants::default(),
        })
    }

    /// A Schwarz transform (G1 only).
    pub fn schwarz(
        analyte: Analyte,
        initial_volume_ml: f64,
        constants: SchwarzConstants,
    ) -> Result<Self, TitrationError> {
        check_initial_volume(initial_volume_ml)?;
        if !constants.exponent_offset.is_finite() {
            return Err(TitrationError::parameter(format!(
                "Schwarz exponent offset must be finite, got {}",
                constants.exponent_offset
            )));
        }
        if !constants.divisor.is_finite() || constants.divisor == 0.0 {
            return Err(TitrationError::parameter(format!(
                "Schwarz divisor must be finite and non-zero, got {}",
                constants.divisor
            )));
        }
        Ok(Self {
            family: TransformFamily::Schwarz,
            analyte,
            index: GranIndex::G1,
            initial_volume_ml,
            constants,
        })
    }

    /// Build a spec from raw form values, rejecting undefined combinations.
    pub fn build(
        family: TransformFamily,
        analyte: Analyte,
        index: GranIndex,
        initial_volume_ml: f64,
        constants: SchwarzConstants,
    ) -> Result<Self, TitrationError> {
        match (family, index) {
            (TransformFamily::Gran, _) => Self::gran(analyte, index, initial_volume_ml),
            (TransformFamily::Schwarz, GranIndex::G1) => Self::schwarz(analyte, initial_volume_ml, constants),
            (TransformFamily::Schwarz, GranIndex::G2) => Err(TitrationError::parameter(
                "Schwarz transforms are only defined for G1",
            )),
        }
    }

    /// Build a spec from a parameter-form selection; "unknown" is rejected.
    pub fn from_selection(
        family: TransformFamily,
        titration_type: TitrationType,
        strength: Strength,
        index: GranIndex,
        initial_volume_ml: f64,
        constants: SchwarzConstants,
    ) -> Result<Self, TitrationError> {
        let analyte = Analyte::from_selection(titration_type, strength)?;
        Self::build(family, analyte, index, initial_volume_ml, constants)
    }

    pub fn family(&self) -> TransformFamily {
        self.family
    }

    pub fn analyte(&self) -> Analyte {
        self.analyte
    }

    pub fn index(&self) -> GranIndex {
        self.index
    }

    pub fn initial_volume_ml(&self) -> f64 {
        self.initial_volume_ml
    }

    pub fn constants(&self) -> SchwarzConstants {
        self.constants
    }

    /// Short label, e.g. `strong-acid G1` or `Schwarz weak-base G1 (k=1.10)`.
    pub fn label(&self) -> String {
        match self.family {
            TransformFamily::Gran => format!("{} {}", self.analyte.display_name(), self.index.display_name()),
            TransformFamily::Schwarz => format!(
                "Schwarz {} {} (k={:.2})",
                self.analyte.display_name(),
                self.index.display_name(),
                self.constants.exponent_offset
            ),
        }
    }
}

fn check_initial_volume(value: f64) -> Result<(), TitrationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TitrationError::parameter(format!(
            "initial volume must be non-negative and finite, got {value}"
        )));
    }
    Ok(())
}

/// A transform value that overflowed and was saturated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeWarning {
    pub index: usize,
    pub volume_ml: f64,
    /// Base-10 exponent that overflowed.
    pub exponent: f64,
    /// Saturated value actually returned.
    pub value: f64,
}

impl fmt::Display for RangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transform overflow at v={:.3} mL (10^{:.1}); saturated to {:e}",
            self.volume_ml, self.exponent, self.value
        )
    }
}

/// Problems found by the curve validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// Fewer than [`MIN_CURVE_POINTS`] rows.
    TooFewPoints { n: usize },
    /// NaN or infinite value.
    NonFinite { index: usize },
    /// Volume did not strictly increase.
    NonMonotonic { index: usize, previous_ml: f64, volume_ml: f64 },
    /// Responses outside the typical range of `kind`.
    ResponseOutOfRange {
        kind: ResponseKind,
        count: usize,
        min: f64,
        max: f64,
    },
}

impl ValidationWarning {
    /// Fatal warnings make a curve unusable for transforms and derivatives.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ValidationWarning::ResponseOutOfRange { .. })
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::TooFewPoints { n } => {
                write!(f, "need at least {MIN_CURVE_POINTS} points, got {n}")
            }
            ValidationWarning::NonFinite { index } => {
                write!(f, "non-finite value at row {}", index + 1)
            }
            ValidationWarning::NonMonotonic {
                index,
                previous_ml,
                volume_ml,
            } => write!(
                f,
                "volumes are not strictly increasing at row {} ({previous_ml} -> {volume_ml})",
                index + 1
            ),
            ValidationWarning::ResponseOutOfRange { kind, count, min, max } => {
                let (lo, hi) = kind.typical_bounds();
                write!(
                    f,
                    "{count} {} value(s) outside typical range [{lo}, {hi}] (observed {min:.4}..{max:.4})",
                    kind.axis_label()
                )
            }
        }
    }
}

/// Validator output: a hard usability flag plus all warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub ok: bool,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

/// Least-squares line `y = intercept + slope * v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, volume: f64) -> f64 {
        self.intercept + self.slope * volume
    }

    /// Volume where the fitted line crosses zero (the Gran estimate of Veq).
    pub fn x_intercept(&self) -> Option<f64> {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return None;
        }
        let v = -self.intercept / self.slope;
        v.is_finite().then_some(v)
    }
}

/// Inclusive volume window, parsed from `start:end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeWindow {
    pub start_ml: f64,
    pub end_ml: f64,
}

impl VolumeWindow {
    pub fn new(start_ml: f64, end_ml: f64) -> Result<Self, TitrationError> {
        if !(start_ml.is_finite() && end_ml.is_finite()) || end_ml <= start_ml {
            return Err(TitrationError::parameter(format!(
                "invalid volume window {start_ml}:{end_ml} (need finite start < end)"
            )));
        }
        Ok(Self { start_ml, end_ml })
    }

    pub fn contains(&self, volume: f64) -> bool {
        volume >= self.start_ml && volume <= self.end_ml
    }
}

impl FromStr for VolumeWindow {
    type Err = TitrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| TitrationError::parameter(format!("expected START:END, got '{s}'")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| TitrationError::parameter(format!("invalid window bound '{part}': {e}")))
        };
        VolumeWindow::new(parse(a)?, parse(b)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for chem in Chemistry::ALL {
            TitrationParameters::preset(chem).validate_for(chem).unwrap();
        }
    }

    #[test]
    fn missing_pk_is_rejected() {
        let params = TitrationParameters::preset(Chemistry::StrongAcid);
        let err = params.validate_for(Chemistry::WeakAcid).unwrap_err();
        assert!(matches!(err, TitrationError::Parameter { .. }));

        let mut params = TitrationParameters::preset(Chemistry::Diprotic);
        params.pka2 = Some(-1.0);
        assert!(params.validate_for(Chemistry::Diprotic).is_err());
    }

    #[test]
    fn non_positive_concentration_is_rejected() {
        let mut params = TitrationParameters::preset(Chemistry::StrongAcid);
        params.titrant_concentration = 0.0;
        assert!(params.validate_for(Chemistry::StrongAcid).is_err());

        let mut params = TitrationParameters::preset(Chemistry::StrongAcid);
        params.max_volume_ml = 0.5;
        assert!(params.validate_for(Chemistry::StrongAcid).is_err());
    }

    #[test]
    fn step_count_matches_floor_plus_one() {
        let mut params = TitrationParameters::preset(Chemistry::StrongAcid);
        assert_eq!(params.step_count(), 51);
        params.step_ml = 0.1;
        assert_eq!(params.step_count(), 501);
        params.step_ml = 3.0;
        assert_eq!(params.step_count(), 17);
    }

    #[test]
    fn oversized_grid_is_a_parameter_error() {
        let mut params = TitrationParameters::preset(Chemistry::StrongAcid);
        for step in [1e-310, 1e-9, 50.0 / MAX_STEP_COUNT as f64] {
            params.step_ml = step;
            assert_eq!(params.checked_step_count(), None, "step {step}");
            assert_eq!(params.step_count(), MAX_STEP_COUNT);
            let err = params.validate_for(Chemistry::StrongAcid).unwrap_err();
            assert!(matches!(err, TitrationError::Parameter { .. }), "{err:?}");
        }

        params.step_ml = 50.0 / (MAX_STEP_COUNT - 1) as f64;
        assert_eq!(params.checked_step_count(), Some(MAX_STEP_COUNT));
        assert!(params.validate_for(Chemistry::StrongAcid).is_ok());
    }

    #[test]
    fn unknown_selection_is_rejected() {
        assert!(Analyte::from_selection(TitrationType::Unknown, Strength::Strong).is_err());
        assert!(Analyte::from_selection(TitrationType::Acid, Strength::Unknown).is_err());
        assert_eq!(
            Analyte::from_selection(TitrationType::Base, Strength::Weak).unwrap(),
            Analyte::WeakBase
        );
        assert_eq!(
            Chemistry::from_selection(TitrationType::Acid, Strength::Weak, true).unwrap(),
            Chemistry::Diprotic
        );
        assert!(Chemistry::from_selection(TitrationType::Base, Strength::Strong, true).is_err());
    }

    #[test]
    fn curve_rejects_non_increasing_volumes() {
        assert!(Curve::new(vec![0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0]).is_err());
        assert!(Curve::new(vec![0.0, 2.0, 1.0], vec![1.0, 2.0, 3.0]).is_err());
        assert!(Curve::new(vec![0.0], vec![1.0]).is_err());
        assert!(Curve::new(vec![0.0, 1.0], vec![1.0, f64::NAN]).is_err());
        assert!(Curve::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Curve::new(vec![0.0, 1.0], vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn curve_json_is_revalidated() {
        let good: Curve = serde_json::from_str(r#"{"volume_ml":[0.0,1.0],"response":[1.0,2.0]}"#).unwrap();
        assert_eq!(good.len(), 2);
        let bad = serde_json::from_str::<Curve>(r#"{"volume_ml":[1.0,0.0],"response":[1.0,2.0]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn schwarz_g2_is_undefined() {
        let err = TransformSpec::build(
            TransformFamily::Schwarz,
            Analyte::StrongAcid,
            GranIndex::G2,
            25.0,
            SchwarzConstants::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TitrationError::Parameter { .. }));
    }

    #[test]
    fn spec_from_form_selection() {
        let spec = TransformSpec::from_selection(
            TransformFamily::Gran,
            TitrationType::Base,
            Strength::Weak,
            GranIndex::G2,
            25.0,
            SchwarzConstants::default(),
        )
        .unwrap();
        assert_eq!(spec.analyte(), Analyte::WeakBase);
        assert_eq!(spec.label(), "weak-base G2");

        assert!(TransformSpec::from_selection(
            TransformFamily::Schwarz,
            TitrationType::Unknown,
            Strength::Weak,
            GranIndex::G1,
            25.0,
            SchwarzConstants::default(),
        )
        .is_err());
    }

    #[test]
    fn volume_window_parses() {
        let w: VolumeWindow = "2.5:20".parse().unwrap();
        assert_eq!(w, VolumeWindow { start_ml: 2.5, end_ml: 20.0 });
        assert!("20:2".parse::<VolumeWindow>().is_err());
        assert!("abc".parse::<VolumeWindow>().is_err());
    }

    #[test]
    fn x_intercept_of_line() {
        let fit = LinearFit {
            slope: -0.1,
            intercept: 2.5,
            r_squared: 1.0,
            n: 10,
        };
        assert!((fit.x_intercept().unwrap() - 25.0).abs() < 1e-12);
    }
}
