//! Calibration parameters for the hybrid classifier.
//!
//! These values were tuned empirically against a population-shifted proxy
//! dataset and have no closed-form derivation. Treat them as parameters to be
//! revised against real clinical data, not as constants of nature.

use super::assessment::CutPoints;

/// Probability weighting and clamp band used for one severe-indicator count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub weight: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Band {
    fn score(&self, probability: f64) -> f64 {
        (probability * self.weight).clamp(self.floor, self.ceiling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridCalibration {
    /// 0 indicators: probability weight
    pub quiet_weight: f64,
    /// 0 indicators: points per reported "monitor" factor
    pub quiet_factor_bonus: f64,
    /// 0 indicators: score ceiling
    pub quiet_ceiling: f64,
    /// Bands for 1, 2 and 3 indicators.
    pub bands: [Band; 3],
    /// 4+ indicators: `min(base + per_indicator * n, ceiling)`
    pub saturated_base: f64,
    pub saturated_per_indicator: f64,
    pub saturated_ceiling: f64,
    pub cut_points: CutPoints,
    /// Probability (percent) at or above which the model's call is PATHOLOGICAL.
    pub prediction_threshold: f64,
}

impl Default for HybridCalibration {
    fn default() -> Self {
        Self {
            quiet_weight: 0.05,
            quiet_factor_bonus: 0.5,
            quiet_ceiling: 8.0,
            bands: [
                Band { weight: 0.15, floor: 10.0, ceiling: 20.0 },
                Band { weight: 0.3, floor: 25.0, ceiling: 35.0 },
                Band { weight: 0.5, floor: 40.0, ceiling: 50.0 },
            ],
            saturated_base: 75.0,
            saturated_per_indicator: 3.0,
            saturated_ceiling: 95.0,
            cut_points: CutPoints::HYBRID,
            prediction_threshold: 50.0,
        }
    }
}

impl HybridCalibration {
    /// Blend model probability (0–100) with the severe-indicator count.
    ///
    /// The raw probability is suppressed at low indicator counts and only
    /// dominates once three indicators agree.
    pub fn blend(&self, probability: f64, severe_indicators: u8, factor_count: usize) -> f64 {
        match severe_indicators {
            0 => (probability * self.quiet_weight + self.quiet_factor_bonus * factor_count as f64)
                .min(self.quiet_ceiling),
            1..=3 => self.bands[(severe_indicators - 1) as usize].score(probability),
            n => (self.saturated_base + self.saturated_per_indicator * n as f64)
                .min(self.saturated_ceiling),
        }
    }
}
