use crate::{error::AppResult, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /api/v1/config`: the effective configuration with credentials masked.
///
/// Configuration is fixed for the life of the process; change it through
/// `config.toml` or the environment and restart.
pub async fn get_config(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "cache_backend_active": state.cache.backend_name(),
        "config": state.config.redacted()
    })))
}
