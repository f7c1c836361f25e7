//! # Trained Model
//!
//! Loads the pathology model exported by the offline training job and scores
//! feature vectors with it.
//!
//! ## Artifact format (JSON):
//! ```json
//! {
//!   "model_type": "logistic_regression",
//!   "description": "laryngeal pathology screen",
//!   "feature_names": ["hnr_mean", "hnr_std", "jitter_local", "..."],
//!   "scaler": { "mean": [ ... ], "scale": [ ... ] },
//!   "coefficients": [ ... ],
//!   "intercept": -0.42
//! }
//! ```
//! The artifact names its own input columns, so the training job is free to
//! order them however it likes.

use crate::features::{FeatureVector, FEATURE_NAMES};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model file {path} is not a valid artifact: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported model type `{0}`")]
    UnsupportedType(String),

    #[error("unknown feature name `{0}`")]
    UnknownFeature(String),

    #[error("artifact declares {features} features but {field} has {len} entries")]
    ShapeMismatch {
        features: usize,
        field: &'static str,
        len: usize,
    },

    #[error("scaler scale for `{0}` must be a positive finite number")]
    InvalidScale(String),
}

#[derive(Debug, Clone, Deserialize)]
struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelArtifact {
    model_type: String,
    #[serde(default)]
    description: Option<String>,
    feature_names: Vec<String>,
    scaler: StandardScaler,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// A loaded, validated logistic-regression model over standardized features.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    coefficients: Vec<f64>,
    intercept: f64,
    description: String,
}

impl TrainedModel {
    /// Load a model artifact.
    ///
    /// A missing file is not an error: it returns `Ok(None)`, which callers
    /// treat as "use the rule-based classifier".
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw)
            .map(Some)
            .map_err(|err| match err {
                ModelLoadError::Parse { source, .. } => ModelLoadError::Parse {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact = serde_json::from_str(raw).map_err(|source| ModelLoadError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        if artifact.model_type != "logistic_regression" {
            return Err(ModelLoadError::UnsupportedType(artifact.model_type));
        }

        let features = artifact.feature_names.len();
        for (field, len) in [
            ("scaler.mean", artifact.scaler.mean.len()),
            ("scaler.scale", artifact.scaler.scale.len()),
            ("coefficients", artifact.coefficients.len()),
        ] {
            if len != features {
                return Err(ModelLoadError::ShapeMismatch { features, field, len });
            }
        }

        for (name, scale) in artifact.feature_names.iter().zip(&artifact.scaler.scale) {
            if !FEATURE_NAMES.contains(&name.as_str()) {
                return Err(ModelLoadError::UnknownFeature(name.clone()));
            }
            if !scale.is_finite() || *scale <= 0.0 {
                return Err(ModelLoadError::InvalidScale(name.clone()));
            }
        }

        Ok(Self {
            feature_names: artifact.feature_names,
            mean: artifact.scaler.mean,
            scale: artifact.scaler.scale,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
            description: artifact
                .description
                .unwrap_or_else(|| "logistic regression".to_string()),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Probability (0–100) that the recording is pathological.
    ///
    /// Returns NaN if the model or input produces a non-finite logit.
    pub fn pathology_probability(&self, features: &FeatureVector) -> f64 {
        let mut logit = self.intercept;
        for (i, name) in self.feature_names.iter().enumerate() {
            // names were checked against FEATURE_NAMES at load time
            let value = features.value(name).unwrap_or(f64::NAN);
            let standardized = (value - self.mean[i]) / self.scale[i];
            logit += self.coefficients[i] * standardized;
        }
        if !logit.is_finite() {
            return f64::NAN;
        }
        100.0 / (1.0 + (-logit).exp())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::tests::vector;
    use std::io::Write;

    /// A model that leans pathological as HNR drops.
    pub(crate) fn hnr_model(intercept: f64) -> TrainedModel {
        TrainedModel::from_json(&format!(
            r#"{{
                "model_type": "logistic_regression",
                "description": "test model",
                "feature_names": ["hnr_mean", "jitter_local"],
                "scaler": {{ "mean": [15.0, 1.0], "scale": [5.0, 1.0] }},
                "coefficients": [-2.0, 0.5],
                "intercept": {}
            }}"#,
            intercept
        ))
        .unwrap()
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrainedModel::load(dir.path().join("absent.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model_type":"logistic_regression","feature_names":["f0_mean"],
               "scaler":{{"mean":[150.0],"scale":[30.0]}},"coefficients":[0.0],"intercept":0.0}}"#
        )
        .unwrap();

        let model = TrainedModel::load(file.path()).unwrap().unwrap();
        assert_eq!(model.feature_count(), 1);
        assert_eq!(model.description(), "logistic regression");
        let p = model.pathology_probability(&vector(15.0, 180.0, 1.0, 3.0));
        assert!((p - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(TrainedModel::load(file.path()), Err(ModelLoadError::Parse { .. })));
    }

    #[test]
    fn test_artifact_validation() {
        let shape = r#"{"model_type":"logistic_regression","feature_names":["hnr_mean"],
            "scaler":{"mean":[1.0,2.0],"scale":[1.0]},"coefficients":[1.0],"intercept":0.0}"#;
        assert!(matches!(TrainedModel::from_json(shape), Err(ModelLoadError::ShapeMismatch { .. })));

        let unknown = r#"{"model_type":"logistic_regression","feature_names":["loudness"],
            "scaler":{"mean":[1.0],"scale":[1.0]},"coefficients":[1.0],"intercept":0.0}"#;
        assert!(matches!(TrainedModel::from_json(unknown), Err(ModelLoadError::UnknownFeature(_))));

        let zero = r#"{"model_type":"logistic_regression","feature_names":["hnr_mean"],
            "scaler":{"mean":[1.0],"scale":[0.0]},"coefficients":[1.0],"intercept":0.0}"#;
        assert!(matches!(TrainedModel::from_json(zero), Err(ModelLoadError::InvalidScale(_))));

        let forest = r#"{"model_type":"random_forest","feature_names":[],
            "scaler":{"mean":[],"scale":[]},"coefficients":[],"intercept":0.0}"#;
        assert!(matches!(TrainedModel::from_json(forest), Err(ModelLoadError::UnsupportedType(_))));
    }

    #[test]
    fn test_probability_tracks_features() {
        let model = hnr_model(0.0);
        let healthy = model.pathology_probability(&vector(25.0, 180.0, 0.5, 2.0));
        let noisy = model.pathology_probability(&vector(3.0, 180.0, 7.0, 2.0));
        assert!(healthy < 10.0);
        assert!(noisy > 90.0);
        assert!((0.0..=100.0).contains(&healthy));
    }
}
