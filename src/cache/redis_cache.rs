//! Shared result cache backed by Redis.
//!
//! Entries are stored as JSON under `session:{id}` with a native `EX` TTL.
//! The stored `expires_at` is still checked on read so expiry behaves exactly
//! like the process-local backend.
//!
//! Every command runs under the configured operation timeout. A server that
//! accepts the connection but stops answering makes `put`/`delete` fail with
//! `CacheError::Unavailable` and `get` report the entry as absent.

use super::{CacheError, Clock, ResultCache, SessionCacheEntry};
use crate::classifier::RiskAssessment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "session:";

fn key(session_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, session_id)
}

/// Whole seconds for `EX`, rounded up and never zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Decode a stored entry, treating corrupt or expired payloads as absent.
fn decode_live(session_id: &str, raw: &str, now: DateTime<Utc>) -> Option<RiskAssessment> {
    match serde_json::from_str::<SessionCacheEntry>(raw) {
        Ok(entry) if entry.is_expired(now) => None,
        Ok(entry) => Some(entry.result),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

pub struct RedisCache {
    connection: ConnectionManager,
    op_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl RedisCache {
    /// Open a managed connection and confirm the server answers.
    pub async fn connect(url: &str, op_timeout: Duration, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        let cache = Self {
            connection,
            op_timeout,
            clock,
        };

        let mut connection = cache.connection.clone();
        let _pong: String = cache
            .bounded("PING", redis::cmd("PING").query_async(&mut connection))
            .await?;
        Ok(cache)
    }

    /// Run one command under the operation timeout.
    async fn bounded<T>(
        &self,
        command: &'static str,
        op: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Unavailable(format!(
                "redis {} did not answer within {:?}",
                command, self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn put(&self, session_id: &str, assessment: &RiskAssessment, ttl: Duration) -> Result<(), CacheError> {
        let entry = SessionCacheEntry::new(session_id, assessment.clone(), self.clock.now(), ttl)?;
        let payload = serde_json::to_string(&entry)?;

        let mut connection = self.connection.clone();
        let _: () = self
            .bounded("SETEX", connection.set_ex(key(session_id), payload, ttl_seconds(ttl)))
            .await?;
        debug!(session_id = %session_id, "Result cached in redis");
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Option<RiskAssessment> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = match self.bounded("GET", connection.get(key(session_id))).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Cache read failed, treating as absent");
                return None;
            }
        };
        raw.and_then(|raw| decode_live(session_id, &raw, self.clock.now()))
    }

    async fn delete(&self, session_id: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let _removed: i64 = self.bounded("DEL", connection.del(key(session_id))).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::assessment;
    use crate::cache::SystemClock;
    use crate::classifier::assessment::MlPrediction;
    use crate::classifier::ClassificationMethod;
    use crate::handoff::HandoffDispatcher;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A server that completes the connection handshake and `PING`, then
    /// never answers anything else.
    async fn unresponsive_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    loop {
                        let n = match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        let text = String::from_utf8_lossy(&buf[..n]).to_string();
                        let tokens: Vec<&str> = text.split("\r\n").collect();
                        let mut reply = String::new();
                        for (i, token) in tokens.iter().enumerate() {
                            if !token.starts_with('*') {
                                continue;
                            }
                            match tokens.get(i + 2).map(|name| name.to_ascii_uppercase()).as_deref() {
                                Some("PING") => reply.push_str("+PONG\r\n"),
                                Some("CLIENT") | Some("SELECT") => reply.push_str("+OK\r\n"),
                                _ => {}
                            }
                        }
                        if !reply.is_empty() && socket.write_all(reply.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        format!("redis://{}", addr)
    }

    fn hybrid_assessment(confidence: f64) -> RiskAssessment {
        RiskAssessment {
            ml_prediction: Some(MlPrediction::Pathological),
            confidence: Some(confidence),
            method: ClassificationMethod::Hybrid,
            ..assessment(72)
        }
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(key("abc-123"), "session:abc-123");
    }

    #[test]
    fn test_ttl_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_secs(86_400)), 86_400);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
    }

    #[test]
    fn test_decode_checks_stored_expiry() {
        let now = Utc::now();
        let entry = SessionCacheEntry::new("s1", assessment(9), now, Duration::from_secs(60)).unwrap();
        let raw = serde_json::to_string(&entry).unwrap();

        assert_eq!(decode_live("s1", &raw, now), Some(assessment(9)));
        assert_eq!(decode_live("s1", &raw, now + chrono::Duration::seconds(60)), None);
    }

    #[test]
    fn test_decode_keeps_confidence_exact() {
        let now = Utc::now();
        let mut confidences = vec![99.64931357878855, 50.000000000000014, 66.66666666666667];
        // confidence is max(p, 100 - p) of a logistic output
        confidences.extend((0..2000).map(|i| {
            let p = 100.0 / (1.0 + (-(f64::from(i) * 0.0137 - 13.0)).exp());
            p.max(100.0 - p)
        }));

        for confidence in confidences {
            let stored = hybrid_assessment(confidence);
            let entry = SessionCacheEntry::new("s1", stored.clone(), now, Duration::from_secs(60)).unwrap();
            let raw = serde_json::to_string(&entry).unwrap();

            let read = decode_live("s1", &raw, now).unwrap();
            assert_eq!(
                read.confidence.map(f64::to_bits),
                Some(confidence.to_bits()),
                "confidence {} changed through redis",
                confidence
            );
            assert_eq!(read, stored);
        }
    }

    #[test]
    fn test_decode_discards_garbage() {
        assert_eq!(decode_live("s1", "{\"session_id\":", Utc::now()), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = RedisCache::connect("definitely not a url", Duration::from_secs(1), Arc::new(SystemClock)).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unresponsive_server_cannot_hang_commands() {
        let url = unresponsive_server().await;
        let cache = RedisCache::connect(&url, Duration::from_millis(200), Arc::new(SystemClock))
            .await
            .unwrap();
        let limit = Duration::from_secs(5);

        let put = tokio::time::timeout(limit, cache.put("s1", &assessment(9), Duration::from_secs(60)))
            .await
            .expect("put did not return");
        assert!(matches!(put, Err(CacheError::Unavailable(_))));

        let get = tokio::time::timeout(limit, cache.get("s1")).await.expect("get did not return");
        assert_eq!(get, None);

        let delete = tokio::time::timeout(limit, cache.delete("s1")).await.expect("delete did not return");
        assert!(matches!(delete, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_handoff_reports_unresponsive_cache() {
        let url = unresponsive_server().await;
        let cache: Arc<dyn ResultCache> = Arc::new(
            RedisCache::connect(&url, Duration::from_millis(200), Arc::new(SystemClock))
                .await
                .unwrap(),
        );
        let dispatcher = HandoffDispatcher::new(cache, None, Duration::from_secs(60), Duration::from_secs(1));

        let report = tokio::time::timeout(Duration::from_secs(5), dispatcher.dispatch("s1", &assessment(9)))
            .await
            .expect("dispatch did not return");
        assert!(!report.cached);
        assert!(report.cache_error.is_some());
        assert!(report.notification.is_none());
    }
}
