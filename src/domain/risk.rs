//! Risk stratification: fuses a model probability with clinical thresholds.
//!
//! Rules are evaluated top to bottom and the first match wins. The clinical
//! override is checked before the probability is consulted at all.

use serde::{Deserialize, Serialize};

use super::metrics::round_to;
use super::patient::PatientRecord;

/// Probability at or above which the model alone marks moderate risk.
pub const MODERATE_PROBABILITY_THRESHOLD: f64 = 0.4;

/// Minimum number of moderate indicators (out of six) that marks moderate risk.
pub const MODERATE_INDICATOR_MIN: usize = 2;

/// Systolic pressure forcing HIGH.
pub const HIGH_SYSTOLIC: i32 = 160;

/// Diastolic pressure forcing HIGH.
pub const HIGH_DIASTOLIC: i32 = 100;

/// Risk level classification for cardiovascular disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Low risk of cardiovascular disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, intervention recommended
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Everything the rule cascade looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    /// Model probability of disease (0.0 to 1.0)
    pub probability: f64,
    pub age: i32,
    pub ap_hi: i32,
    pub ap_lo: i32,
    pub chol: i32,
    pub gluc: i32,
    pub smoke: i32,
    pub alco: i32,
}

impl RiskInputs {
    #[must_use]
    pub fn from_record(record: &PatientRecord, probability: f64) -> Self {
        Self {
            probability,
            age: record.age,
            ap_hi: record.ap_hi,
            ap_lo: record.ap_lo,
            chol: record.chol,
            gluc: record.gluc,
            smoke: record.smoke,
            alco: record.alco,
        }
    }

    /// How many of the six moderate indicators hold.
    #[must_use]
    pub fn moderate_indicator_count(&self) -> usize {
        [
            self.age >= 60,
            self.smoke == 1,
            self.alco == 1,
            self.chol >= 2,
            self.gluc >= 2,
            self.ap_lo >= 90,
        ]
        .into_iter()
        .filter(|&hit| hit)
        .count()
    }
}

/// One entry of the ordered rule cascade.
#[derive(Clone, Copy)]
pub struct RiskRule {
    pub name: &'static str,
    pub tier: RiskLevel,
    pub applies: fn(&RiskInputs) -> bool,
}

fn clinical_override(inputs: &RiskInputs) -> bool {
    inputs.ap_hi >= HIGH_SYSTOLIC
        || inputs.ap_lo >= HIGH_DIASTOLIC
        || (inputs.chol == 3 && inputs.gluc == 3)
}

fn moderate_signal(inputs: &RiskInputs) -> bool {
    inputs.moderate_indicator_count() >= MODERATE_INDICATOR_MIN
        || inputs.probability >= MODERATE_PROBABILITY_THRESHOLD
}

/// Rule cascade, highest tier first. Anything unmatched is LOW.
pub const RISK_RULES: [RiskRule; 2] = [
    RiskRule {
        name: "clinical_override",
        tier: RiskLevel::High,
        applies: clinical_override,
    },
    RiskRule {
        name: "moderate_signal",
        tier: RiskLevel::Moderate,
        applies: moderate_signal,
    },
];

/// Evaluate the rule cascade; first matching rule wins.
#[must_use]
pub fn classify(inputs: &RiskInputs) -> RiskLevel {
    RISK_RULES
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map_or(RiskLevel::Low, |rule| rule.tier)
}

/// Positional form of [`classify`].
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn classify_risk(
    probability: f64,
    age: i32,
    ap_hi: i32,
    ap_lo: i32,
    chol: i32,
    gluc: i32,
    smoke: i32,
    alco: i32,
) -> RiskLevel {
    classify(&RiskInputs {
        probability,
        age,
        ap_hi,
        ap_lo,
        chol,
        gluc,
        smoke,
        alco,
    })
}

/// Result of scoring one patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Model probability of disease (0.0 to 1.0)
    pub probability: f64,

    /// Tier from the rule cascade
    pub risk_level: RiskLevel,
}

impl RiskAssessment {
    #[must_use]
    pub fn new(probability: f64, record: &PatientRecord) -> Self {
        Self {
            probability,
            risk_level: classify(&RiskInputs::from_record(record, probability)),
        }
    }

    /// Response payload: probability as a percentage rounded to 2 decimals.
    #[must_use]
    pub fn to_response(&self) -> InferenceResponse {
        InferenceResponse {
            probability: round_to(self.probability * 100.0, 2),
            risk_level: self.risk_level,
        }
    }
}

/// Inference response payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Percentage in [0, 100]
    pub probability: f64,
    pub risk_level: RiskLevel,
}
