use super::validate_session_id;
use crate::audio::ScratchFile;
use crate::config::AnalysisConfig;
use crate::error::{AppError, AppResult};
use crate::screening::ScreeningOutcome;
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Multipart field carrying the recording.
pub const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ScreeningOutcome,
}

/// `POST /api/v1/analyze`: classify a recording and return the result.
pub async fn analyze(state: web::Data<AppState>, payload: Multipart) -> AppResult<HttpResponse> {
    run_analysis(state, payload, None).await
}

/// `POST /api/v1/analyze/{session_id}`: classify, then hand the result off
/// to the conversational agent under `session_id`.
pub async fn analyze_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    validate_session_id(&session_id)?;
    run_analysis(state, payload, Some(session_id)).await
}

async fn run_analysis(
    state: web::Data<AppState>,
    payload: Multipart,
    session_id: Option<String>,
) -> AppResult<HttpResponse> {
    let upload = read_upload(payload, &state.config.analysis).await?;

    // The pipeline runs on its own task: if the client disconnects, this
    // handler future is dropped but extraction and handoff still finish.
    let task_state = state.clone();
    let screening = Arc::clone(&state.screening);
    let outcome = actix_web::rt::spawn(async move {
        let _active = task_state.begin_analysis();
        let outcome = screening.screen(&upload, session_id.as_deref()).await?;
        task_state.record_risk_level(outcome.risk_assessment.risk_level);
        Ok::<_, AppError>(outcome)
    })
    .await
    .map_err(|e| AppError::Internal(format!("screening task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(AnalysisResponse { success: true, outcome }))
}

/// Pull the `audio` field out of the form, validate it and park it in a
/// scratch file. Other fields are skipped.
pub async fn read_upload(mut payload: Multipart, rules: &AnalysisConfig) -> AppResult<ScratchFile> {
    let mut upload = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(AUDIO_FIELD) || upload.is_some() {
            drain(&mut field).await?;
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .unwrap_or_default();
        let extension = checked_extension(&filename, rules)?;
        let bytes = read_limited(&mut field, rules.max_upload_bytes).await?;

        let scratch = ScratchFile::new_in(&rules.upload_dir, &extension);
        scratch.write(&bytes).await?;
        debug!(filename = %filename, bytes = bytes.len(), "Upload stored");
        upload = Some(scratch);
    }

    let upload = upload.ok_or_else(|| AppError::Validation("No audio file provided".to_string()))?;
    info!(path = %upload.path().display(), "Audio upload accepted");
    Ok(upload)
}

/// Lowercased extension of `filename` if the configuration accepts it.
fn checked_extension(filename: &str, rules: &AnalysisConfig) -> AppResult<String> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("No audio file provided".to_string()));
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension.is_empty() || !rules.is_allowed_extension(&extension) {
        return Err(AppError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            rules.allowed_extensions.join(", ")
        )));
    }

    Ok(extension)
}

async fn read_limited(field: &mut Field, limit: usize) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("Upload interrupted: {}", e)))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::Validation(format!(
                "Audio file exceeds the {} byte limit",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(AppError::Validation("Audio file is empty".to_string()));
    }
    Ok(bytes)
}

async fn drain(field: &mut Field) -> AppResult<()> {
    while field
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
        .is_some()
    {}
    Ok(())
}
