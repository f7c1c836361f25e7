//! # Result Cache
//!
//! Session-keyed, bounded-TTL storage for risk assessments. The analysis
//! request writes here; the conversational agent reads the same entry later,
//! out of band.
//!
//! ## Backends:
//! - **redis**: shared across processes and hosts
//! - **memory**: process-local table
//!
//! Both check the stored `expires_at` on every read, so an entry past its TTL
//! is absent even if the backend has not evicted it yet. Callers cannot tell
//! the backends apart except for cross-process visibility.
//!
//! ## Failure policy:
//! - `put` reports connectivity failures to the caller
//! - `get` fails open: errors are logged and read as "absent"
//! - `delete` is idempotent

pub mod clock;
pub mod memory;
pub mod redis_cache;

pub use clock::{Clock, SystemClock};
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use crate::classifier::RiskAssessment;
use crate::config::CacheConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("ttl {0:?} is out of range")]
    InvalidTtl(Duration),
}

/// Which backend the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

/// A cached assessment with its validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCacheEntry {
    pub session_id: String,
    pub result: RiskAssessment,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionCacheEntry {
    pub fn new(
        session_id: &str,
        result: RiskAssessment,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, CacheError> {
        let ttl_chrono = chrono::Duration::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;
        let expires_at = created_at
            .checked_add_signed(ttl_chrono)
            .ok_or(CacheError::InvalidTtl(ttl))?;

        Ok(Self {
            session_id: session_id.to_string(),
            result,
            created_at,
            expires_at,
        })
    }

    /// An entry is gone from the moment the clock reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Store `assessment` under `session_id`, replacing any previous entry.
    async fn put(&self, session_id: &str, assessment: &RiskAssessment, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch a live entry. Backend errors read as `None`.
    async fn get(&self, session_id: &str) -> Option<RiskAssessment>;

    /// Remove an entry. Removing an absent key succeeds.
    async fn delete(&self, session_id: &str) -> Result<(), CacheError>;

    /// Drop entries past their expiry. Backends with native eviction return 0.
    async fn purge_expired(&self) -> usize {
        0
    }

    fn backend_name(&self) -> &'static str;
}

/// Resolve the configured backend once at startup.
///
/// When Redis is preferred but cannot be reached the process-local backend is
/// used instead. The choice is logged and never revisited.
pub async fn build_cache(config: &CacheConfig, clock: Arc<dyn Clock>) -> Arc<dyn ResultCache> {
    match config.backend {
        CacheBackendKind::Memory => {
            info!(backend = "memory", "Result cache ready (process-local)");
            Arc::new(MemoryCache::new(clock))
        }
        CacheBackendKind::Redis => {
            let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
            let connect = RedisCache::connect(&config.redis_url, config.op_timeout(), clock.clone());
            match tokio::time::timeout(connect_timeout, connect).await {
                Ok(Ok(cache)) => {
                    info!(backend = "redis", "Result cache ready (shared)");
                    Arc::new(cache)
                }
                Ok(Err(e)) => {
                    warn!(backend = "memory", error = %e, "Redis unavailable, falling back to process-local cache");
                    Arc::new(MemoryCache::new(clock))
                }
                Err(_) => {
                    warn!(
                        backend = "memory",
                        timeout_secs = config.connect_timeout_secs,
                        "Redis connection timed out, falling back to process-local cache"
                    );
                    Arc::new(MemoryCache::new(clock))
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::assessment::{ClassificationMethod, RiskColor, RiskLevel};

    pub(crate) fn assessment(score: u8) -> RiskAssessment {
        RiskAssessment {
            risk_level: RiskLevel::Low,
            risk_score: score,
            risk_factors: vec!["HNR baixo (7.2 dB) - monitorar".to_string()],
            recommendation: "Parâmetros vocais dentro da normalidade.".to_string(),
            color: RiskColor::Green,
            ml_prediction: None,
            confidence: None,
            severe_indicators: 0,
            method: ClassificationMethod::RuleBased,
        }
    }

    #[test]
    fn test_entry_expiry_window() {
        let now = Utc::now();
        let entry = SessionCacheEntry::new("abc", assessment(3), now, Duration::from_secs(60)).unwrap();
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(60));
        assert!(!entry.is_expired(now + chrono::Duration::seconds(59)));
        assert!(entry.is_expired(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_entry_rejects_absurd_ttl() {
        let result = SessionCacheEntry::new("abc", assessment(3), Utc::now(), Duration::from_secs(u64::MAX));
        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
    }

    #[tokio::test]
    async fn test_memory_backend_selected_directly() {
        let config = CacheConfig {
            backend: CacheBackendKind::Memory,
            ..CacheConfig::default()
        };
        let cache = build_cache(&config, Arc::new(SystemClock)).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_memory() {
        let config = CacheConfig {
            backend: CacheBackendKind::Redis,
            redis_url: "not-a-redis-url".to_string(),
            ..CacheConfig::default()
        };
        let cache = build_cache(&config, Arc::new(SystemClock)).await;
        assert_eq!(cache.backend_name(), "memory");

        cache.put("s1", &assessment(4), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("s1").await, Some(assessment(4)));
    }
}
