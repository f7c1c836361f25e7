//! # Session Handoff
//!
//! After classification the result is written to the [`ResultCache`] under the
//! caller's session id, then the conversational agent is told it can fetch
//! it. The agent may also poll the cache on its own, so notification is
//! strictly best-effort.
//!
//! ## Ordering and failure rules:
//! 1. Cache write is awaited before anything else.
//! 2. If the write failed, no notification is sent (the payload would point at
//!    a result that cannot be fetched).
//! 3. One notification attempt, bounded by a timeout, on its own task. Its
//!    outcome is logged and otherwise ignored. No retries.

pub mod notifier;

pub use notifier::{NotificationError, Notifier, WebhookNotifier};

use crate::cache::ResultCache;
use crate::classifier::RiskAssessment;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Message shown to callers when the handoff write fails.
pub const CACHE_WRITE_FAILED: &str = "Result could not be stored for retrieval by session id";

/// What happened during one dispatch.
#[derive(Debug)]
pub struct HandoffReport {
    pub cached: bool,
    pub cache_error: Option<&'static str>,
    /// Handle to the in-flight notification. Production callers drop it.
    pub notification: Option<JoinHandle<()>>,
}

/// Caller-facing slice of a [`HandoffReport`].
#[derive(Debug, Clone, Serialize)]
pub struct HandoffSummary {
    pub session_id: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_error: Option<&'static str>,
}

impl HandoffReport {
    pub fn summary(&self, session_id: &str) -> HandoffSummary {
        HandoffSummary {
            session_id: session_id.to_string(),
            cached: self.cached,
            cache_error: self.cache_error,
        }
    }
}

pub struct HandoffDispatcher {
    cache: Arc<dyn ResultCache>,
    notifier: Option<Arc<dyn Notifier>>,
    ttl: Duration,
    notify_timeout: Duration,
}

impl HandoffDispatcher {
    pub fn new(
        cache: Arc<dyn ResultCache>,
        notifier: Option<Arc<dyn Notifier>>,
        ttl: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            notifier,
            ttl,
            notify_timeout,
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Persist then notify. Never fails; see [`HandoffReport`].
    pub async fn dispatch(&self, session_id: &str, assessment: &RiskAssessment) -> HandoffReport {
        if let Err(e) = self.cache.put(session_id, assessment, self.ttl).await {
            error!(
                session_id = %session_id,
                backend = self.cache.backend_name(),
                error = %e,
                "Failed to cache result for handoff"
            );
            return HandoffReport {
                cached: false,
                cache_error: Some(CACHE_WRITE_FAILED),
                notification: None,
            };
        }

        info!(
            session_id = %session_id,
            backend = self.cache.backend_name(),
            ttl_secs = self.ttl.as_secs(),
            "Result cached for handoff"
        );

        let notification = self.notifier.clone().map(|notifier| {
            let session_id = session_id.to_string();
            let assessment = assessment.clone();
            let limit = self.notify_timeout;

            tokio::spawn(async move {
                let outcome = match tokio::time::timeout(limit, notifier.notify(&session_id, &assessment)).await {
                    Ok(result) => result,
                    Err(_) => Err(NotificationError::TimedOut(limit)),
                };
                match outcome {
                    Ok(()) => info!(session_id = %session_id, target = notifier.target(), "Agent notified"),
                    Err(e) => warn!(
                        session_id = %session_id,
                        target = notifier.target(),
                        error = %e,
                        "Agent notification failed (ignored)"
                    ),
                }
            })
        });

        if notification.is_none() {
            debug!(session_id = %session_id, "No webhook configured, agent must poll");
        }

        HandoffReport {
            cached: true,
            cache_error: None,
            notification,
        }
    }
}
