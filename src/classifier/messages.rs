//! Localized risk-factor and recommendation text.
//!
//! Classifiers only decide *which* finding fired; the wording lives here so a
//! deployment can switch language without touching the scoring code.

use super::assessment::{ClassificationMethod, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en")]
    En,
}

/// A threshold breach worth reporting to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding {
    HnrSeverePathology,
    HnrExtremelyLow,
    HnrLow,
    HnrSlightlyReduced,
    F0VeryAbnormal,
    F0Abnormal,
    JitterSeverePathology,
    JitterVeryHigh,
    JitterHigh,
    ShimmerSeverePathology,
    ShimmerVeryHigh,
    ShimmerHigh,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::En => "en",
        }
    }

    /// Render a finding with the measured value.
    pub fn describe(self, finding: Finding, value: f64) -> String {
        use Finding::*;
        match self {
            Locale::PtBr => match finding {
                HnrSeverePathology => format!("HNR extremamente baixo ({:.1} dB) - possível patologia severa", value),
                HnrExtremelyLow => format!("HNR extremamente baixo ({:.1} dB) - possível patologia", value),
                HnrLow => format!("HNR baixo ({:.1} dB) - monitorar", value),
                HnrSlightlyReduced => format!("HNR levemente reduzido ({:.1} dB)", value),
                F0VeryAbnormal => format!("Frequência fundamental muito anormal ({:.1} Hz)", value),
                F0Abnormal => format!("Frequência fundamental anormal ({:.1} Hz)", value),
                JitterSeverePathology => format!("Jitter extremamente elevado ({:.2}%) - possível patologia severa", value),
                JitterVeryHigh => format!("Jitter muito elevado ({:.2}%) - possível instabilidade", value),
                JitterHigh => format!("Jitter elevado ({:.2}%) - monitorar", value),
                ShimmerSeverePathology => format!("Shimmer extremamente elevado ({:.2}%) - possível patologia severa", value),
                ShimmerVeryHigh => format!("Shimmer muito elevado ({:.2}%) - possível instabilidade", value),
                ShimmerHigh => format!("Shimmer elevado ({:.2}%) - monitorar", value),
            },
            Locale::En => match finding {
                HnrSeverePathology => format!("Extremely low HNR ({:.1} dB) - possible severe pathology", value),
                HnrExtremelyLow => format!("Extremely low HNR ({:.1} dB) - possible pathology", value),
                HnrLow => format!("Low HNR ({:.1} dB) - monitor", value),
                HnrSlightlyReduced => format!("Slightly reduced HNR ({:.1} dB)", value),
                F0VeryAbnormal => format!("Highly abnormal fundamental frequency ({:.1} Hz)", value),
                F0Abnormal => format!("Abnormal fundamental frequency ({:.1} Hz)", value),
                JitterSeverePathology => format!("Extremely high jitter ({:.2}%) - possible severe pathology", value),
                JitterVeryHigh => format!("Very high jitter ({:.2}%) - possible instability", value),
                JitterHigh => format!("High jitter ({:.2}%) - monitor", value),
                ShimmerSeverePathology => format!("Extremely high shimmer ({:.2}%) - possible severe pathology", value),
                ShimmerVeryHigh => format!("Very high shimmer ({:.2}%) - possible instability", value),
                ShimmerHigh => format!("High shimmer ({:.2}%) - monitor", value),
            },
        }
    }

    /// Fixed recommendation for a tier. The hybrid engine words the moderate
    /// tier as a preventive visit.
    pub fn recommendation(self, level: RiskLevel, method: ClassificationMethod) -> &'static str {
        match (self, level) {
            (Locale::PtBr, RiskLevel::High) => {
                "URGENTE: Consulte um otorrinolaringologista imediatamente para exame laríngeo detalhado."
            }
            (Locale::PtBr, RiskLevel::Moderate) => match method {
                ClassificationMethod::Hybrid => {
                    "Recomendamos consultar um otorrinolaringologista para avaliação preventiva."
                }
                ClassificationMethod::RuleBased => {
                    "Recomendamos consultar um otorrinolaringologista para avaliação."
                }
            },
            (Locale::PtBr, RiskLevel::Low) => {
                "Parâmetros vocais dentro da normalidade. Mantenha acompanhamento regular."
            }
            (Locale::En, RiskLevel::High) => {
                "URGENT: See an ear, nose and throat specialist immediately for a detailed laryngeal examination."
            }
            (Locale::En, RiskLevel::Moderate) => match method {
                ClassificationMethod::Hybrid => {
                    "We recommend seeing an ear, nose and throat specialist for a preventive evaluation."
                }
                ClassificationMethod::RuleBased => {
                    "We recommend seeing an ear, nose and throat specialist for an evaluation."
                }
            },
            (Locale::En, RiskLevel::Low) => {
                "Voice parameters are within normal limits. Keep up regular check-ups."
            }
        }
    }
}
