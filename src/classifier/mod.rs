//! # Risk Classification
//!
//! Turns a [`FeatureVector`](crate::features::FeatureVector) into a
//! [`RiskAssessment`]. Two engines are available:
//!
//! - **Rule-based**: deterministic thresholds, used when no trained model is
//!   configured or the model fails to load.
//! - **Hybrid**: trained-model probability gated by a severe-indicator count.
//!
//! The active engine is chosen once at startup and never changes for the life
//! of the process.

pub mod assessment;
pub mod calibration;
pub mod hybrid;
pub mod messages;
pub mod model;
pub mod rules;

pub use assessment::{ClassificationMethod, RiskAssessment, RiskLevel};
pub use hybrid::HybridClassifier;
pub use messages::Locale;
pub use model::TrainedModel;
pub use rules::RuleBasedClassifier;

use crate::features::{FeatureVector, InvalidFeatureVector};
use std::path::Path;
use tracing::{info, warn};

/// The process-wide classifier.
#[derive(Debug, Clone)]
pub enum RiskClassifier {
    RuleBased(RuleBasedClassifier),
    Hybrid(HybridClassifier),
}

impl RiskClassifier {
    /// Build the classifier from the configured model path.
    ///
    /// A missing or unloadable model selects the rule-based engine; the
    /// reason is logged here, once.
    pub fn from_model_path(path: impl AsRef<Path>, locale: Locale) -> Self {
        let path = path.as_ref();
        match TrainedModel::load(path) {
            Ok(Some(model)) => {
                info!(
                    path = %path.display(),
                    features = model.feature_count(),
                    description = model.description(),
                    "Trained model loaded, using hybrid classification"
                );
                RiskClassifier::Hybrid(HybridClassifier::new(model, locale))
            }
            Ok(None) => {
                warn!(path = %path.display(), "Model not found, using rule-based classification");
                RiskClassifier::RuleBased(RuleBasedClassifier::new(locale))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Model failed to load, using rule-based classification");
                RiskClassifier::RuleBased(RuleBasedClassifier::new(locale))
            }
        }
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<RiskAssessment, InvalidFeatureVector> {
        match self {
            RiskClassifier::RuleBased(classifier) => classifier.classify(features),
            RiskClassifier::Hybrid(classifier) => classifier.classify(features),
        }
    }

    pub fn method(&self) -> ClassificationMethod {
        match self {
            RiskClassifier::RuleBased(_) => ClassificationMethod::RuleBased,
            RiskClassifier::Hybrid(_) => ClassificationMethod::Hybrid,
        }
    }

    pub fn model_description(&self) -> Option<&str> {
        match self {
            RiskClassifier::RuleBased(_) => None,
            RiskClassifier::Hybrid(classifier) => Some(classifier.model().description()),
        }
    }
}
