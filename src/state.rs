//! # Application State Management
//!
//! Shared state handed to every HTTP handler through `web::Data<AppState>`.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Lets every worker thread hold the same cache, classifier and config
//! - **Memory safety**: The data is freed when the last reference is dropped
//!
//! ### Arc<dyn Trait>
//! - **Purpose**: The result cache is chosen at startup (Redis or memory);
//!   handlers only see the `ResultCache` trait
//! - **Send + Sync bounds** on the trait make the trait object shareable across threads
//!
//! ### Arc<RwLock<T>> Pattern
//! - Only the metrics are mutable after startup, so only they sit behind a lock
//! - A poisoned lock still holds valid counters, so it is recovered instead of
//!   propagating the panic into every later request

use crate::cache::ResultCache;
use crate::classifier::RiskLevel;
use crate::config::AppConfig;
use crate::screening::ScreeningService;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
///
/// ## Ownership:
/// - `config`: read-only after startup
/// - `cache`: the one result cache, also owned by the screening service's handoff
/// - `screening`: classifier and pipeline stages, read-only after startup
/// - `metrics`: the only mutable part
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub metrics: Arc<RwLock<AppMetrics>>,
    pub cache: Arc<dyn ResultCache>,
    pub screening: Arc<ScreeningService>,
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of 4xx/5xx responses since server start
    pub error_count: u64,

    /// Uploads currently inside the screening pipeline
    pub active_analyses: u32,

    /// Completed screenings, by resulting risk level
    pub analyses_by_level: HashMap<RiskLevel, u64>,

    /// Per-route statistics keyed by "METHOD /route/{pattern}"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
///
/// ## Performance calculations:
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, cache: Arc<dyn ResultCache>, screening: ScreeningService) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            cache,
            screening: Arc::new(screening),
            start_time: Instant::now(),
        }
    }

    fn metrics_read(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_write(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        self.metrics_write().request_count += 1;
    }

    /// Increment the total error counter (called for every 4xx/5xx response).
    pub fn increment_error_count(&self) {
        self.metrics_write().error_count += 1;
    }

    /// Record detailed metrics for one route.
    ///
    /// ## Parameters:
    /// - **endpoint**: Method plus route pattern (e.g., "GET /api/v1/results/{session_id}")
    /// - **duration_ms**: How long the request took to process
    /// - **is_error**: Whether the response status was 4xx/5xx
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_write();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Count one upload as in flight until the returned guard is dropped.
    pub fn begin_analysis(&self) -> ActiveAnalysis {
        self.metrics_write().active_analyses += 1;
        ActiveAnalysis {
            metrics: Arc::clone(&self.metrics),
        }
    }

    pub fn record_risk_level(&self, level: RiskLevel) {
        *self.metrics_write().analyses_by_level.entry(level).or_default() += 1;
    }

    /// Get a snapshot of current metrics, released from the lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_read().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Decrements `active_analyses` when dropped, whichever way the request ends.
pub struct ActiveAnalysis {
    metrics: Arc<RwLock<AppMetrics>>,
}

impl Drop for ActiveAnalysis {
    fn drop(&mut self) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.active_analyses = metrics.active_analyses.saturating_sub(1);
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
