//! # Feature Vector
//!
//! The fixed-shape acoustic summary of one sustained-vowel recording. It is
//! produced by the external feature extractor, consumed by exactly one
//! classifier call and never cached (only the derived assessment is).
//!
//! ## Units:
//! - **F0**: Hz
//! - **Jitter / Shimmer**: percent
//! - **HNR**: dB
//! - **Duration**: seconds

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical feature names, in the order the extractor reports them.
///
/// A trained model declares its own column order using these names.
pub const FEATURE_NAMES: [&str; 11] = [
    "f0_mean",
    "f0_std",
    "jitter_local",
    "jitter_rap",
    "jitter_ppq5",
    "shimmer_local",
    "shimmer_apq3",
    "shimmer_apq5",
    "hnr_mean",
    "hnr_std",
    "duration",
];

/// Raised when a feature vector cannot be classified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidFeatureVector {
    #[error("feature `{0}` is not a finite number")]
    NonFinite(&'static str),

    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct F0Stats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterStats {
    pub local: f64,
    pub rap: f64,
    pub ppq5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShimmerStats {
    pub local: f64,
    pub apq3: f64,
    pub apq5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnrStats {
    pub mean: f64,
    pub std: f64,
}

/// Acoustic statistics for one recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(alias = "fundamental_frequency")]
    pub f0: F0Stats,
    pub jitter: JitterStats,
    pub shimmer: ShimmerStats,
    pub hnr: HnrStats,
    pub duration: f64,
}

/// Display strings for the four dimensions the classifiers look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureSummary {
    #[serde(rename = "HNR")]
    pub hnr: String,
    #[serde(rename = "F0")]
    pub f0: String,
    pub jitter: String,
    pub shimmer: String,
}

impl FeatureVector {
    /// Check the invariants the classifiers rely on.
    pub fn validate(&self) -> Result<(), InvalidFeatureVector> {
        for name in FEATURE_NAMES {
            // every canonical name resolves, so the Option is always Some here
            if let Some(value) = self.value(name) {
                if !value.is_finite() {
                    return Err(InvalidFeatureVector::NonFinite(name));
                }
            }
        }

        if self.duration <= 0.0 {
            return Err(InvalidFeatureVector::NonPositiveDuration(self.duration));
        }

        Ok(())
    }

    /// Look a feature up by its canonical name.
    pub fn value(&self, name: &str) -> Option<f64> {
        let value = match name {
            "f0_mean" => self.f0.mean,
            "f0_std" => self.f0.std,
            "jitter_local" => self.jitter.local,
            "jitter_rap" => self.jitter.rap,
            "jitter_ppq5" => self.jitter.ppq5,
            "shimmer_local" => self.shimmer.local,
            "shimmer_apq3" => self.shimmer.apq3,
            "shimmer_apq5" => self.shimmer.apq5,
            "hnr_mean" => self.hnr.mean,
            "hnr_std" => self.hnr.std,
            "duration" => self.duration,
            _ => return None,
        };
        Some(value)
    }

    pub fn summary(&self) -> FeatureSummary {
        FeatureSummary {
            hnr: format!("{:.1} dB", self.hnr.mean),
            f0: format!("{:.1} Hz", self.f0.mean),
            jitter: format!("{:.2}%", self.jitter.local),
            shimmer: format!("{:.2}%", self.shimmer.local),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a vector from the four dimensions the classifiers score on.
    pub(crate) fn vector(hnr: f64, f0: f64, jitter: f64, shimmer: f64) -> FeatureVector {
        FeatureVector {
            f0: F0Stats { mean: f0, std: 2.0 },
            jitter: JitterStats { local: jitter, rap: jitter * 0.6, ppq5: jitter * 0.7 },
            shimmer: ShimmerStats { local: shimmer, apq3: shimmer * 0.5, apq5: shimmer * 0.6 },
            hnr: HnrStats { mean: hnr, std: 1.5 },
            duration: 3.2,
        }
    }

    #[test]
    fn test_valid_vector_passes() {
        assert!(vector(15.0, 180.0, 0.8, 3.0).validate().is_ok());
    }

    #[test]
    fn test_non_finite_field_is_named() {
        let mut v = vector(15.0, 180.0, 0.8, 3.0);
        v.shimmer.apq3 = f64::NAN;
        assert_eq!(v.validate(), Err(InvalidFeatureVector::NonFinite("shimmer_apq3")));

        let mut v = vector(15.0, 180.0, 0.8, 3.0);
        v.hnr.mean = f64::NEG_INFINITY;
        assert_eq!(v.validate(), Err(InvalidFeatureVector::NonFinite("hnr_mean")));
    }

    #[test]
    fn test_duration_must_be_positive() {
        let mut v = vector(15.0, 180.0, 0.8, 3.0);
        v.duration = 0.0;
        assert!(matches!(v.validate(), Err(InvalidFeatureVector::NonPositiveDuration(_))));
    }

    #[test]
    fn test_every_canonical_name_resolves() {
        let v = vector(15.0, 180.0, 0.8, 3.0);
        for name in FEATURE_NAMES {
            assert!(v.value(name).is_some(), "{} should resolve", name);
        }
        assert_eq!(v.value("hnr_mean"), Some(15.0));
        assert_eq!(v.value("loudness"), None);
    }

    #[test]
    fn test_extractor_json_shape() {
        let json = r#"{
            "fundamental_frequency": {"mean": 182.4, "std": 3.1},
            "jitter": {"local": 0.41, "rap": 0.22, "ppq5": 0.25},
            "shimmer": {"local": 2.9, "apq3": 1.4, "apq5": 1.7},
            "hnr": {"mean": 21.3, "std": 2.2},
            "duration": 4.05
        }"#;
        let v: FeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(v.f0.mean, 182.4);
        assert!(v.validate().is_ok());
        assert_eq!(v.summary().hnr, "21.3 dB");
        assert_eq!(v.summary().jitter, "0.41%");
    }
}
