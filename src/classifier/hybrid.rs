//! # Hybrid Classifier
//!
//! Combines the trained model's pathology probability with a count of
//! ultra-conservative "severe indicators". The indicator count acts as a veto
//! or amplifier on the probability, never as a tie-break: the model alone is
//! miscalibrated for the proxy dataset it was trained on.
//!
//! ## Severe indicators (one point each):
//! - HNR < 4 dB
//! - Jitter > 6 %
//! - Shimmer > 20 %
//! - F0 outside [70, 300] Hz
//!
//! Near-threshold values (HNR < 8, jitter > 3.5, shimmer > 15, F0 outside
//! [85, 260]) are reported as "monitor" factors without adding to the count.

use super::assessment::{clamp_score, ClassificationMethod, MlPrediction, RiskAssessment, RiskLevel};
use super::calibration::HybridCalibration;
use super::messages::{Finding, Locale};
use super::model::TrainedModel;
use crate::features::{FeatureVector, InvalidFeatureVector};

/// Severe-indicator count plus the reported findings.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorScan {
    pub severe: u8,
    pub factors: Vec<String>,
}

/// Count severe indicators and collect findings for one vector.
pub fn scan_indicators(features: &FeatureVector, locale: Locale) -> IndicatorScan {
    let hnr = features.hnr.mean;
    let f0 = features.f0.mean;
    let jitter = features.jitter.local;
    let shimmer = features.shimmer.local;

    let mut severe = 0u8;
    let mut factors = Vec::new();

    if hnr < 4.0 {
        severe += 1;
        factors.push(locale.describe(Finding::HnrSeverePathology, hnr));
    } else if hnr < 8.0 {
        factors.push(locale.describe(Finding::HnrLow, hnr));
    }

    if jitter > 6.0 {
        severe += 1;
        factors.push(locale.describe(Finding::JitterSeverePathology, jitter));
    } else if jitter > 3.5 {
        factors.push(locale.describe(Finding::JitterHigh, jitter));
    }

    if shimmer > 20.0 {
        severe += 1;
        factors.push(locale.describe(Finding::ShimmerSeverePathology, shimmer));
    } else if shimmer > 15.0 {
        factors.push(locale.describe(Finding::ShimmerHigh, shimmer));
    }

    if !(70.0..=300.0).contains(&f0) {
        severe += 1;
        factors.push(locale.describe(Finding::F0VeryAbnormal, f0));
    } else if !(85.0..=260.0).contains(&f0) {
        factors.push(locale.describe(Finding::F0Abnormal, f0));
    }

    IndicatorScan { severe, factors }
}

#[derive(Debug, Clone)]
pub struct HybridClassifier {
    model: TrainedModel,
    calibration: HybridCalibration,
    locale: Locale,
}

impl HybridClassifier {
    pub fn new(model: TrainedModel, locale: Locale) -> Self {
        Self::with_calibration(model, HybridCalibration::default(), locale)
    }

    pub fn with_calibration(model: TrainedModel, calibration: HybridCalibration, locale: Locale) -> Self {
        Self { model, calibration, locale }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<RiskAssessment, InvalidFeatureVector> {
        features.validate()?;

        let probability = self.model.pathology_probability(features);
        Ok(self.assess(features, probability))
    }

    /// Score a vector given an already-computed model probability (0–100).
    ///
    /// A NaN probability is treated as 0 so a misbehaving model can only
    /// lower the blended score, never raise it.
    pub fn assess(&self, features: &FeatureVector, probability: f64) -> RiskAssessment {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 100.0)
        } else {
            tracing::warn!("Model produced a non-finite probability, scoring with 0");
            0.0
        };

        let scan = scan_indicators(features, self.locale);
        let blended = self.calibration.blend(probability, scan.severe, scan.factors.len());
        let risk_score = clamp_score(blended);
        let risk_level = RiskLevel::from_score(risk_score, self.calibration.cut_points);

        let ml_prediction = if probability >= self.calibration.prediction_threshold {
            MlPrediction::Pathological
        } else {
            MlPrediction::Healthy
        };
        let confidence = probability.max(100.0 - probability);

        RiskAssessment {
            risk_level,
            risk_score,
            risk_factors: scan.factors,
            recommendation: self
                .locale
                .recommendation(risk_level, ClassificationMethod::Hybrid)
                .to_string(),
            color: risk_level.color(),
            ml_prediction: Some(ml_prediction),
            confidence: Some(confidence),
            severe_indicators: scan.severe,
            method: ClassificationMethod::Hybrid,
        }
    }
}
