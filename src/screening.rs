//! # Screening Pipeline
//!
//! One request, start to finish:
//! 1. Convert the upload to canonical PCM ([`AudioNormalizer`])
//! 2. Reject silent or too-short audio ([`PcmInspector`])
//! 3. Measure acoustic features ([`FeatureExtractor`])
//! 4. Classify them ([`RiskClassifier`])
//! 5. If the caller named a session, hand the result off ([`HandoffDispatcher`])
//!
//! Every stage is owned by a [`ScreeningService`] built once at startup and
//! shared read-only across workers. Scratch files live exactly as long as the
//! [`ScratchFile`] guards that name them.

use crate::audio::scratch::ensure_dir;
use crate::audio::{
    AudioNormalizer, CommandExtractor, FeatureExtractor, FfmpegNormalizer, PcmInspector, ScratchFile,
};
use crate::cache::ResultCache;
use crate::classifier::{RiskAssessment, RiskClassifier};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::features::FeatureSummary;
use crate::handoff::{HandoffDispatcher, HandoffSummary, Notifier, WebhookNotifier};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// What a successful screening returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningOutcome {
    pub features: FeatureSummary,
    pub risk_assessment: RiskAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffSummary>,
}

pub struct ScreeningService {
    classifier: RiskClassifier,
    normalizer: Arc<dyn AudioNormalizer>,
    inspector: PcmInspector,
    extractor: Arc<dyn FeatureExtractor>,
    handoff: HandoffDispatcher,
    scratch_dir: PathBuf,
}

impl ScreeningService {
    pub fn new(
        classifier: RiskClassifier,
        normalizer: Arc<dyn AudioNormalizer>,
        inspector: PcmInspector,
        extractor: Arc<dyn FeatureExtractor>,
        handoff: HandoffDispatcher,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            classifier,
            normalizer,
            inspector,
            extractor,
            handoff,
            scratch_dir,
        }
    }

    /// Wire the production stages from configuration.
    ///
    /// The classifier is chosen here, once: a loadable model artifact selects
    /// the hybrid method, anything else falls back to rules.
    pub async fn from_config(config: &AppConfig, cache: Arc<dyn ResultCache>) -> anyhow::Result<Self> {
        ensure_dir(&config.analysis.upload_dir)
            .await
            .with_context(|| format!("creating upload dir {}", config.analysis.upload_dir.display()))?;

        let classifier = RiskClassifier::from_model_path(&config.model.path, config.analysis.locale);

        let notifier: Option<Arc<dyn Notifier>> = match &config.handoff.webhook_url {
            Some(url) => {
                let notifier = WebhookNotifier::new(url.clone(), Duration::from_secs(config.handoff.timeout_secs))
                    .context("building webhook client")?;
                info!(target_url = %url, "Agent notification enabled");
                Some(Arc::new(notifier))
            }
            None => {
                info!("No webhook configured, agent notification disabled");
                None
            }
        };

        let handoff = HandoffDispatcher::new(
            cache,
            notifier,
            config.cache.ttl(),
            Duration::from_secs(config.handoff.timeout_secs),
        );

        Ok(Self::new(
            classifier,
            Arc::new(FfmpegNormalizer::new(
                config.normalizer.ffmpeg_path.clone(),
                Duration::from_secs(config.normalizer.timeout_secs),
            )),
            PcmInspector::new(config.analysis.min_duration_secs),
            Arc::new(CommandExtractor::new(&config.extractor)),
            handoff,
            config.analysis.upload_dir.clone(),
        ))
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn handoff(&self) -> &HandoffDispatcher {
        &self.handoff
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Run the full pipeline on an uploaded file.
    #[instrument(skip(self, upload), fields(method = self.classifier.method().as_str()))]
    pub async fn screen(&self, upload: &ScratchFile, session_id: Option<&str>) -> AppResult<ScreeningOutcome> {
        let started = Instant::now();

        let pcm = self.normalizer.to_canonical_pcm(upload.path(), &self.scratch_dir).await?;

        let inspector = self.inspector;
        let pcm_path = pcm.path().to_path_buf();
        let summary = tokio::task::spawn_blocking(move || inspector.inspect(&pcm_path))
            .await
            .map_err(|e| AppError::Internal(format!("PCM inspection task failed: {}", e)))??;

        let features = self
            .extractor
            .extract(pcm.path(), Duration::from_secs_f64(summary.duration_secs))
            .await?;

        let assessment = self.classifier.classify(&features)?;

        info!(
            risk_score = assessment.risk_score,
            risk_level = assessment.risk_level.as_str(),
            severe_indicators = assessment.severe_indicators,
            audio_secs = summary.duration_secs,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Screening complete"
        );

        let handoff = match session_id {
            Some(session_id) => {
                let report = self.handoff.dispatch(session_id, &assessment).await;
                if !report.cached {
                    warn!(session_id = %session_id, "Returning result without handoff");
                }
                Some(report.summary(session_id))
            }
            None => None,
        };

        Ok(ScreeningOutcome {
            features: features.summary(),
            risk_assessment: assessment,
            handoff,
        })
    }
}
