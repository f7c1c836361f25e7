//! # Rule-Based Classifier
//!
//! Deterministic threshold engine. It is the ground truth when no trained
//! model is configured.
//!
//! ## Scoring tiers (first matching tier per dimension):
//! | dimension | severe | elevated | mild |
//! |---|---|---|---|
//! | HNR | < 5 dB → +30 | < 8 dB → +15 | < 12 dB → +5 |
//! | F0 | outside [70, 300] Hz → +15 | outside [85, 250] Hz → +8 | |
//! | Jitter | > 4 % → +12 | > 2.5 % → +6 | |
//! | Shimmer | > 12 % → +12 | > 8 % → +6 | |
//!
//! Cut points: 60 → HIGH, 40 → MODERATE.

use super::assessment::{clamp_score, ClassificationMethod, CutPoints, RiskAssessment, RiskLevel};
use super::messages::{Finding, Locale};
use crate::features::{FeatureVector, InvalidFeatureVector};

/// Running tally for one classification call.
struct Tally {
    score: u32,
    severe: u8,
    factors: Vec<String>,
    locale: Locale,
}

impl Tally {
    fn hit(&mut self, points: u32, finding: Finding, value: f64, severe: bool) {
        self.score += points;
        if severe {
            self.severe += 1;
        }
        self.factors.push(self.locale.describe(finding, value));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier {
    locale: Locale,
}

impl RuleBasedClassifier {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<RiskAssessment, InvalidFeatureVector> {
        features.validate()?;

        let hnr = features.hnr.mean;
        let f0 = features.f0.mean;
        let jitter = features.jitter.local;
        let shimmer = features.shimmer.local;

        let mut tally = Tally {
            score: 0,
            severe: 0,
            factors: Vec::new(),
            locale: self.locale,
        };

        if hnr < 5.0 {
            tally.hit(30, Finding::HnrExtremelyLow, hnr, true);
        } else if hnr < 8.0 {
            tally.hit(15, Finding::HnrLow, hnr, false);
        } else if hnr < 12.0 {
            tally.hit(5, Finding::HnrSlightlyReduced, hnr, false);
        }

        if !(70.0..=300.0).contains(&f0) {
            tally.hit(15, Finding::F0VeryAbnormal, f0, true);
        } else if !(85.0..=250.0).contains(&f0) {
            tally.hit(8, Finding::F0Abnormal, f0, false);
        }

        if jitter > 4.0 {
            tally.hit(12, Finding::JitterVeryHigh, jitter, true);
        } else if jitter > 2.5 {
            tally.hit(6, Finding::JitterHigh, jitter, false);
        }

        if shimmer > 12.0 {
            tally.hit(12, Finding::ShimmerVeryHigh, shimmer, true);
        } else if shimmer > 8.0 {
            tally.hit(6, Finding::ShimmerHigh, shimmer, false);
        }

        let risk_score = clamp_score(tally.score as f64);
        let risk_level = RiskLevel::from_score(risk_score, CutPoints::RULE_BASED);

        Ok(RiskAssessment {
            risk_level,
            risk_score,
            risk_factors: tally.factors,
            recommendation: self
                .locale
                .recommendation(risk_level, ClassificationMethod::RuleBased)
                .to_string(),
            color: risk_level.color(),
            ml_prediction: None,
            confidence: None,
            severe_indicators: tally.severe,
            method: ClassificationMethod::RuleBased,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::assessment::RiskColor;
    use crate::features::tests::vector;

    fn classify(hnr: f64, f0: f64, jitter: f64, shimmer: f64) -> RiskAssessment {
        RuleBasedClassifier::default()
            .classify(&vector(hnr, f0, jitter, shimmer))
            .unwrap()
    }

    #[test]
    fn test_mixed_tiers_land_in_moderate() {
        // +15 (HNR) +15 (F0) +12 (jitter) +6 (shimmer)
        let result = classify(6.0, 400.0, 5.0, 10.0);
        assert_eq!(result.risk_score, 48);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.color, RiskColor::Orange);
        assert_eq!(result.risk_factors.len(), 4);
        assert_eq!(result.severe_indicators, 2);
        assert_eq!(result.method, ClassificationMethod::RuleBased);
        assert!(result.ml_prediction.is_none());
    }

    #[test]
    fn test_healthy_voice_has_no_factors() {
        let result = classify(20.0, 180.0, 0.5, 2.0);
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.color, RiskColor::Green);
        assert!(result.risk_factors.is_empty());
    }

    #[test]
    fn test_all_severe_tiers_reach_high() {
        // 30 + 15 + 12 + 12
        let result = classify(3.0, 50.0, 7.0, 22.0);
        assert_eq!(result.risk_score, 69);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.severe_indicators, 4);
    }

    #[test]
    fn test_tier_boundaries() {
        // exactly 5 dB is not "< 5", so it scores as the elevated tier
        assert_eq!(classify(5.0, 180.0, 0.5, 2.0).risk_score, 15);
        assert_eq!(classify(11.9, 180.0, 0.5, 2.0).risk_score, 5);
        assert_eq!(classify(12.0, 180.0, 0.5, 2.0).risk_score, 0);
        // F0 bounds are inclusive
        assert_eq!(classify(20.0, 70.0, 0.5, 2.0).risk_score, 8);
        assert_eq!(classify(20.0, 250.0, 0.5, 2.0).risk_score, 0);
        assert_eq!(classify(20.0, 260.0, 0.5, 2.0).risk_score, 8);
    }

    #[test]
    fn test_score_stays_in_range_and_level_follows_score() {
        let hnrs = [1.0, 4.9, 6.0, 10.0, 25.0];
        let f0s = [40.0, 80.0, 150.0, 280.0, 500.0];
        let jitters = [0.2, 3.0, 9.0];
        let shimmers = [1.0, 9.0, 30.0];
        for &h in &hnrs {
            for &f in &f0s {
                for &j in &jitters {
                    for &s in &shimmers {
                        let r = classify(h, f, j, s);
                        assert!(r.risk_score <= 100);
                        assert_eq!(r.risk_level, RiskLevel::from_score(r.risk_score, CutPoints::RULE_BASED));
                    }
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let mut v = vector(6.0, 180.0, 1.0, 2.0);
        v.jitter.local = f64::INFINITY;
        assert!(RuleBasedClassifier::default().classify(&v).is_err());
    }
}
