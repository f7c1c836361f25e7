//! Process-local result cache.

use super::{CacheError, Clock, ResultCache, SessionCacheEntry};
use crate::classifier::RiskAssessment;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Session table guarded by an async reader-writer lock.
///
/// Keys are request-scoped and never read-modify-written, so a single lock
/// over the whole map is enough; concurrent writers to one key resolve as
/// last-write-wins.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, SessionCacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn put(&self, session_id: &str, assessment: &RiskAssessment, ttl: Duration) -> Result<(), CacheError> {
        let entry = SessionCacheEntry::new(session_id, assessment.clone(), self.clock.now(), ttl)?;
        self.entries.write().await.insert(session_id.to_string(), entry);
        debug!(session_id = %session_id, "Result cached in memory");
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Option<RiskAssessment> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(session_id) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.result.clone()),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime.
        let mut entries = self.entries.write().await;
        if entries.get(session_id).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(session_id);
            debug!(session_id = %session_id, "Expired entry dropped on read");
        }
        None
    }

    async fn delete(&self, session_id: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
