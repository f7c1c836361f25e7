//! Risk assessment value types shared by both classifiers.

use serde::{Deserialize, Serialize};

/// Risk tier, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Map a score to a tier. Ties at a cut point go to the higher tier.
    pub fn from_score(score: u8, cuts: CutPoints) -> Self {
        if score >= cuts.high {
            RiskLevel::High
        } else if score >= cuts.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn color(self) -> RiskColor {
        match self {
            RiskLevel::Low => RiskColor::Green,
            RiskLevel::Moderate => RiskColor::Orange,
            RiskLevel::High => RiskColor::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskColor {
    Green,
    Orange,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MlPrediction {
    Healthy,
    Pathological,
}

/// Which engine produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    RuleBased,
    Hybrid,
}

impl ClassificationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationMethod::RuleBased => "rule_based",
            ClassificationMethod::Hybrid => "hybrid",
        }
    }
}

/// Score thresholds for the MODERATE and HIGH tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutPoints {
    pub moderate: u8,
    pub high: u8,
}

impl CutPoints {
    pub const RULE_BASED: CutPoints = CutPoints { moderate: 40, high: 60 };
    pub const HYBRID: CutPoints = CutPoints { moderate: 45, high: 70 };
}

/// Output of one classification call.
///
/// Immutable once built. A later analysis for the same session replaces the
/// cached copy wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub risk_factors: Vec<String>,
    pub recommendation: String,
    pub color: RiskColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_prediction: Option<MlPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub severe_indicators: u8,
    pub method: ClassificationMethod,
}

/// Truncate a blended score to an integer in [0, 100].
pub(crate) fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.trunc().clamp(0.0, 100.0) as u8
}
