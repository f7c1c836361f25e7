//! Acoustic feature extraction through an external command.
//!
//! The command receives the canonical PCM path as its last argument and must
//! print one JSON feature vector on stdout:
//!
//! ```json
//! {
//!   "f0": {"mean": 182.4, "std": 3.1},
//!   "jitter": {"local": 0.62, "rap": 0.35, "ppq5": 0.41},
//!   "shimmer": {"local": 3.8, "apq3": 1.9, "apq5": 2.3},
//!   "hnr": {"mean": 17.2, "std": 1.4},
//!   "duration": 3.4
//! }
//! ```

use super::normalizer::tail;
use crate::config::ExtractorConfig;
use crate::features::{FeatureVector, InvalidFeatureVector};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Ceiling on the time one extraction may take.
pub const MAX_BUDGET: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to launch feature extractor `{program}`: {source}")]
    Launch { program: String, source: io::Error },

    #[error("feature extractor exited with {status}")]
    Failed { status: String, stderr: String },

    #[error("feature extraction did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("feature extractor output is not a feature vector: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("feature extractor returned an unusable vector: {0}")]
    InvalidVector(#[from] InvalidFeatureVector),
}

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Measure `pcm_path`. `audio_duration` sizes the time budget.
    async fn extract(&self, pcm_path: &Path, audio_duration: Duration) -> Result<FeatureVector, ExtractionError>;
}

pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    per_audio_second: f64,
    overhead: Duration,
}

impl CommandExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            per_audio_second: config.timeout_per_audio_second,
            overhead: Duration::from_secs(config.timeout_overhead_secs),
        }
    }

    /// Time allowed for a recording of `audio_duration`, capped at
    /// `MAX_BUDGET`. A rate that is not a positive number contributes nothing.
    pub fn budget(&self, audio_duration: Duration) -> Duration {
        let scaled = (audio_duration.as_secs_f64() * self.per_audio_second).clamp(0.0, MAX_BUDGET.as_secs_f64());
        let scaled = Duration::try_from_secs_f64(scaled).unwrap_or(Duration::ZERO);
        scaled.saturating_add(self.overhead).min(MAX_BUDGET)
    }
}

#[async_trait]
impl FeatureExtractor for CommandExtractor {
    async fn extract(&self, pcm_path: &Path, audio_duration: Duration) -> Result<FeatureVector, ExtractionError> {
        let budget = self.budget(audio_duration);
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(pcm_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(budget, child.wait_with_output())
            .await
            .map_err(|_| ExtractionError::TimedOut(budget))?
            .map_err(|source| ExtractionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %tail(&stderr, 500), "Feature extractor failed");
            return Err(ExtractionError::Failed {
                status: output.status.to_string(),
                stderr: tail(&stderr, 500).to_string(),
            });
        }

        let features: FeatureVector = serde_json::from_slice(&output.stdout)?;
        features.validate()?;

        debug!(
            hnr = features.hnr.mean,
            f0 = features.f0.mean,
            jitter = features.jitter.local,
            shimmer = features.shimmer.local,
            "Features extracted"
        );
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"f0":{"mean":182.4,"std":3.1},"jitter":{"local":0.62,"rap":0.35,"ppq5":0.41},"shimmer":{"local":3.8,"apq3":1.9,"apq5":2.3},"hnr":{"mean":17.2,"std":1.4},"duration":3.4}"#;

    /// An extractor running `sh -c <script>`; the PCM path arrives as `$1`.
    fn shell(script: &str, overhead_secs: u64) -> CommandExtractor {
        CommandExtractor::new(&ExtractorConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "extractor".to_string()],
            timeout_per_audio_second: 0.0,
            timeout_overhead_secs: overhead_secs,
        })
    }

    #[test]
    fn test_budget_scales_with_duration() {
        let extractor = CommandExtractor::new(&ExtractorConfig::default());
        assert_eq!(extractor.budget(Duration::from_secs(0)), Duration::from_secs(15));
        assert_eq!(extractor.budget(Duration::from_secs(10)), Duration::from_secs(35));
    }

    #[test]
    fn test_budget_never_panics_on_extreme_rates() {
        let budget = |rate: f64| {
            CommandExtractor::new(&ExtractorConfig {
                timeout_per_audio_second: rate,
                ..ExtractorConfig::default()
            })
            .budget(Duration::from_secs(30))
        };

        assert_eq!(budget(f64::INFINITY), MAX_BUDGET);
        assert_eq!(budget(1e300), MAX_BUDGET);
        assert_eq!(budget(f64::NAN), Duration::from_secs(15));
        assert_eq!(budget(-4.0), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_parses_stdout() {
        let extractor = shell(&format!("test -n \"$1\" && printf '%s' '{}'", VALID), 5);
        let features = extractor.extract(Path::new("/tmp/a.wav"), Duration::from_secs(3)).await.unwrap();
        assert_eq!(features.f0.mean, 182.4);
        assert_eq!(features.hnr.mean, 17.2);
        assert_eq!(features.duration, 3.4);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let extractor = shell("echo 'praat blew up' >&2; exit 3", 5);
        let result = extractor.extract(Path::new("/tmp/a.wav"), Duration::from_secs(3)).await;
        match result {
            Err(ExtractionError::Failed { stderr, .. }) => assert!(stderr.contains("praat blew up")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let extractor = shell("echo 'not json'", 5);
        let result = extractor.extract(Path::new("/tmp/a.wav"), Duration::from_secs(3)).await;
        assert!(matches!(result, Err(ExtractionError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn test_invalid_vector() {
        let zero_duration = VALID.replace("\"duration\":3.4", "\"duration\":0.0");
        let extractor = shell(&format!("printf '%s' '{}'", zero_duration), 5);
        let result = extractor.extract(Path::new("/tmp/a.wav"), Duration::from_secs(3)).await;
        assert!(matches!(
            result,
            Err(ExtractionError::InvalidVector(InvalidFeatureVector::NonPositiveDuration(_)))
        ));
    }

    #[tokio::test]
    async fn test_slow_extractor_times_out() {
        let extractor = shell("sleep 10", 1);
        let started = std::time::Instant::now();
        let result = extractor.extract(Path::new("/tmp/a.wav"), Duration::from_secs(3)).await;
        assert!(matches!(result, Err(ExtractionError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
