//! Webhook notification to the conversational agent.
//!
//! The body is `{"session_id": ..., "result": {...}}`. The key is snake_case,
//! so agents that expect `sessionId` must be configured to read `session_id`.

use crate::classifier::RiskAssessment;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook answered with status {0}")]
    Rejected(u16),

    #[error("webhook did not answer within {0:?}")]
    TimedOut(Duration),
}

/// Something that can be told a session's result is ready.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, session_id: &str, assessment: &RiskAssessment) -> Result<(), NotificationError>;

    fn target(&self) -> &str;
}

#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub session_id: &'a str,
    pub result: &'a RiskAssessment,
}

/// Posts `{session_id, result}` as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, session_id: &str, assessment: &RiskAssessment) -> Result<(), NotificationError> {
        let payload = WebhookPayload { session_id, result: assessment };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotificationError::Rejected(response.status().as_u16()))
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}
