//! # Configuration Management
//!
//! This module loads the service configuration from multiple sources:
//! - TOML configuration file (config.toml)
//! - Environment variables (APP_ prefix, `__` between section and key)
//! - A handful of bare variables used by deployment platforms
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Deserialize nested TOML/env values straight into typed structs
//! - **Enums in config**: `backend = "redis"` becomes `CacheBackendKind::Redis`,
//!   so an unknown backend name fails at startup instead of at first use
//! - **Option<T>**: `handoff.webhook_url` may be absent, which disables notification
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Bare deployment variables (HOST, PORT, REDIS_URL, CACHE_EXPIRY_HOURS, WEBHOOK_URL)
//! 2. Prefixed environment variables (APP_SERVER__PORT, APP_CACHE__TTL_HOURS, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impls)
//!
//! The configuration is read once at startup and is immutable afterwards.

use crate::cache::CacheBackendKind;
use crate::classifier::Locale;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Largest accepted `extractor.timeout_per_audio_second`.
pub const MAX_TIMEOUT_PER_AUDIO_SECOND: f64 = 600.0;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each section maps to one component (HTTP server, upload handling, model,
/// cache, handoff, and the two external tools), so a component only ever
/// receives the slice it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub handoff: HandoffConfig,
    pub normalizer: NormalizerConfig,
    pub extractor: ExtractorConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (containers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Upload handling and audio acceptance rules.
///
/// ## Fields:
/// - `upload_dir`: Scratch directory for uploads and converted PCM files
/// - `allowed_extensions`: Lowercase file extensions accepted on upload
/// - `max_upload_bytes`: Hard cap on the uploaded file size
/// - `min_duration_secs`: Recordings shorter than this are rejected before extraction
/// - `locale`: Language of risk-factor and recommendation text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub upload_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: usize,
    pub min_duration_secs: f64,
    pub locale: Locale,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            upload_dir: env::temp_dir().join("voice-screen-uploads"),
            allowed_extensions: ["wav", "mp3", "ogg", "webm"].iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: 10 * 1024 * 1024,
            min_duration_secs: 1.0,
            locale: Locale::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

/// Trained model artifact location. A missing file selects the rule-based classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/voice_model.json"),
        }
    }
}

/// Result cache settings.
///
/// ## Fields:
/// - `backend`: `"redis"` (shared) or `"memory"` (process-local)
/// - `redis_url`: Connection string, only read when `backend = "redis"`
/// - `ttl_hours`: How long a cached result stays retrievable
/// - `sweep_interval_secs`: How often the memory backend drops expired entries
/// - `connect_timeout_secs`: Startup budget for reaching Redis before falling back
/// - `op_timeout_secs`: Budget for a single Redis command once connected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    pub ttl_hours: u64,
    pub sweep_interval_secs: u64,
    pub connect_timeout_secs: u64,
    pub op_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            redis_url: "redis://localhost:6379/0".to_string(),
            ttl_hours: 24,
            sweep_interval_secs: 300,
            connect_timeout_secs: 3,
            op_timeout_secs: 2,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

/// Conversational agent notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Full URL the result is POSTed to. `None` disables notification.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub ffmpeg_path: String,
    pub timeout_secs: u64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_secs: 30,
        }
    }
}

/// External feature extraction command.
///
/// The command is invoked as `command args... <pcm_path>` and must print a
/// feature vector as JSON on stdout. Its time budget grows with the audio:
/// `duration * timeout_per_audio_second + timeout_overhead_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_per_audio_second: f64,
    pub timeout_overhead_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["scripts/extract_features.py".to_string()],
            timeout_per_audio_second: 2.0,
            timeout_overhead_secs: 15,
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with APP_ environment variables
    /// 4. Handle the bare variables deployment platforms set
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_CACHE__BACKEND=memory`: Skip Redis entirely
    /// - `APP_ANALYSIS__LOCALE=en`: English risk-factor text
    /// - `PORT=3000`: Special case for deployment platforms
    /// - `REDIS_URL=redis://cache:6379/0`: Shared cache location
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double underscore separates sections so that keys like
            // `ttl_hours` keep their single underscores.
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(url) = env::var("REDIS_URL") {
            settings = settings.set_override("cache.redis_url", url)?;
        }

        if let Ok(hours) = env::var("CACHE_EXPIRY_HOURS") {
            settings = settings.set_override("cache.ttl_hours", hours)?;
        }

        if let Ok(url) = env::var("WEBHOOK_URL") {
            settings = settings.set_override("handoff.webhook_url", url)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Cache TTL and every timeout are non-zero
    /// - At least one upload extension is accepted and the size cap is non-zero
    /// - The extractor has a command to run
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.analysis.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("At least one audio extension must be allowed"));
        }

        if self.analysis.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if !self.analysis.min_duration_secs.is_finite() || self.analysis.min_duration_secs < 0.0 {
            return Err(anyhow::anyhow!("Minimum audio duration must be a non-negative number"));
        }

        if self.cache.ttl_hours == 0 {
            return Err(anyhow::anyhow!("Cache TTL must be greater than 0"));
        }

        if self.cache.sweep_interval_secs == 0
            || self.cache.connect_timeout_secs == 0
            || self.cache.op_timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Cache sweep interval and timeouts must be greater than 0"));
        }

        if self.handoff.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Handoff timeout must be greater than 0"));
        }

        if self.normalizer.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Normalizer timeout must be greater than 0"));
        }

        if self.extractor.command.trim().is_empty() {
            return Err(anyhow::anyhow!("Extractor command cannot be empty"));
        }

        let per_second = self.extractor.timeout_per_audio_second;
        if !per_second.is_finite() || per_second <= 0.0 || self.extractor.timeout_overhead_secs == 0 {
            return Err(anyhow::anyhow!("Extractor timeouts must be greater than 0"));
        }

        if per_second > MAX_TIMEOUT_PER_AUDIO_SECOND {
            return Err(anyhow::anyhow!(
                "Extractor timeout per audio second cannot exceed {}",
                MAX_TIMEOUT_PER_AUDIO_SECOND
            ));
        }

        Ok(())
    }

    /// A copy safe to return over HTTP: credentials in the Redis URL and the
    /// webhook query string are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.cache.redis_url = redact_url(&copy.cache.redis_url);
        copy.handoff.webhook_url = copy.handoff.webhook_url.as_deref().map(redact_url);
        copy
    }
}

/// Mask `user:password@` and anything after `?`.
fn redact_url(url: &str) -> String {
    let without_query = match url.split_once('?') {
        Some((base, _)) => format!("{}?***", base),
        None => url.to_string(),
    };

    let Some((scheme, rest)) = without_query.split_once("://") else {
        return without_query;
    };

    match rest.split_once('@') {
        Some((_, host)) => format!("{}://***@{}", scheme, host),
        None => without_query,
    }
}
