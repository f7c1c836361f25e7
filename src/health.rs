use crate::state::{AppMetrics, AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;
    let classifier = state.screening.classifier();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "classifier": {
            "method": classifier.method(),
            "model_loaded": classifier.model_description().is_some(),
            "model": classifier.model_description(),
            "locale": config.analysis.locale
        },
        "cache": {
            "backend": state.cache.backend_name(),
            "ttl_hours": config.cache.ttl_hours
        },
        "handoff": {
            "notifications_enabled": state.screening.handoff().notifications_enabled()
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "active_analyses": metrics.active_analyses
        },
        "memory": get_memory_info()
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "active_analyses": metrics.active_analyses,
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "analyses": analyses_by_level(&metrics),
        "endpoints": endpoint_stats,
        "memory": get_memory_info()
    }))
}

fn analyses_by_level(metrics: &AppMetrics) -> serde_json::Value {
    use crate::classifier::RiskLevel;

    let count = |level: RiskLevel| metrics.analyses_by_level.get(&level).copied().unwrap_or(0);
    let low = count(RiskLevel::Low);
    let moderate = count(RiskLevel::Moderate);
    let high = count(RiskLevel::High);

    json!({
        "total": low + moderate + high,
        "LOW": low,
        "MODERATE": moderate,
        "HIGH": high
    })
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", process::id())) {
            let read_kb = |prefix: &str| {
                status
                    .lines()
                    .find(|line| line.starts_with(prefix))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
                    .unwrap_or(0)
                    * 1024
            };

            return json!({
                "resident_memory_bytes": read_kb("VmRSS:"),
                "virtual_memory_bytes": read_kb("VmSize:"),
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false,
        "pid": process::id()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RiskLevel;
    use crate::features::tests::vector;
    use crate::state::tests::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_components() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        let app = test::init_service(App::new().app_data(state).route("/health", web::get().to(health_check))).await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["classifier"]["method"], "rule_based");
        assert_eq!(body["classifier"]["model_loaded"], false);
        assert_eq!(body["cache"]["backend"], "memory");
        assert_eq!(body["handoff"]["notifications_enabled"], false);
    }

    #[actix_web::test]
    async fn test_metrics_count_risk_levels() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        state.record_risk_level(RiskLevel::Moderate);
        state.record_risk_level(RiskLevel::High);
        state.record_risk_level(RiskLevel::High);

        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/metrics", web::get().to(detailed_metrics)),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(body["analyses"]["total"], 3);
        assert_eq!(body["analyses"]["HIGH"], 2);
        assert_eq!(body["analyses"]["LOW"], 0);
    }
}
