use super::validate_session_id;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

/// `GET /api/v1/results/{session_id}`: the cached assessment, if still live.
pub async fn get_result(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    validate_session_id(&session_id)?;

    match state.cache.get(&session_id).await {
        Some(result) => Ok(HttpResponse::Ok().json(json!({
            "session_id": session_id,
            "result": result
        }))),
        None => Err(AppError::NotFound(format!("No result for session '{}'", session_id))),
    }
}

/// `DELETE /api/v1/results/{session_id}`: drop the cached assessment.
/// Deleting an absent session also answers 204.
pub async fn delete_result(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    validate_session_id(&session_id)?;

    state
        .cache
        .delete(&session_id)
        .await
        .map_err(|e| AppError::Internal(format!("cache delete failed for {}: {}", session_id, e)))?;

    info!(session_id = %session_id, "Cached result deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::assessment;
    use crate::features::tests::vector;
    use crate::state::tests::test_state;
    use actix_web::{test, App};
    use std::time::Duration;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .route("/api/v1/results/{session_id}", web::get().to(get_result))
                    .route("/api/v1/results/{session_id}", web::delete().to(delete_result)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_cached_result() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        state.cache.put("wa-1", &assessment(9), Duration::from_secs(60)).await.unwrap();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/results/wa-1").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["session_id"], "wa-1");
        assert_eq!(body["result"]["risk_score"], 9);
    }

    #[actix_web::test]
    async fn test_missing_result_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/results/never-seen").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[actix_web::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        state.cache.put("wa-2", &assessment(9), Duration::from_secs(60)).await.unwrap();
        let app = app!(state);

        for _ in 0..2 {
            let req = test::TestRequest::delete().uri("/api/v1/results/wa-2").to_request();
            assert_eq!(test::call_service(&app, req).await.status(), 204);
        }
        assert!(state.cache.get("wa-2").await.is_none());
    }

    #[actix_web::test]
    async fn test_invalid_id_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = web::Data::new(test_state(dir.path(), vector(15.0, 180.0, 0.8, 3.0)));
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/v1/results/a%3Ab").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
