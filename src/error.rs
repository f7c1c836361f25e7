//! # Error Handling
//!
//! This module defines the HTTP-facing error type and how domain errors are
//! converted into it.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Two layers of errors
//! - **Domain errors** (`ConversionError`, `ExtractionError`, `PcmError`, ...)
//!   are `thiserror` enums owned by the module that raises them. They carry
//!   whatever detail is useful for logs.
//! - **AppError** is what handlers return. Each domain error is mapped onto a
//!   variant with an HTTP status and a client-safe message.
//!
//! ### Traits for Error Conversion
//! - **From trait**: lets `?` turn a domain error into an `AppError`
//! - **ResponseError trait**: converts an `AppError` into an HTTP response
//! - **Display trait**: defines how errors are formatted as strings
//!
//! ## What clients never see:
//! Internal details (file paths, process stderr, backend messages) are logged
//! with `tracing::error!` and replaced with a generic message.

use crate::audio::{ConversionError, ExtractionError, PcmError};
use crate::features::InvalidFeatureVector;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Generic message used for every 500 response.
pub const INTERNAL_MESSAGE: &str = "An internal error occurred while processing the request";

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Validation**: Bad upload, bad session id, bad form field (400)
/// - **UnsupportedFormat**: The audio container could not be decoded (400)
/// - **AudioRejected**: Decoded fine but too short, silent or slow to convert (422)
/// - **Extraction**: Acoustic features could not be measured (422)
/// - **NotFound**: No cached result for the session (404)
/// - **Internal / ConfigError**: Server-side problems (500)
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::Validation("No audio file provided".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Client sent a request that fails validation rules
    Validation(String),

    /// Uploaded audio could not be converted to PCM
    UnsupportedFormat(String),

    /// Converted audio is not usable for analysis
    AudioRejected(String),

    /// The feature extractor failed or produced unusable output
    Extraction(String),

    /// Requested resource was not found
    NotFound(String),

    /// Server-side failure; the message is logged, never returned
    Internal(String),

    /// Configuration file or environment variable problems
    ConfigError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            AppError::AudioRejected(_) | AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error type used in the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::UnsupportedFormat(_) => "unsupported_format",
            AppError::AudioRejected(_) => "audio_rejected",
            AppError::Extraction(_) => "extraction_error",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
            AppError::ConfigError(_) => "config_error",
        }
    }

    /// The message a client is allowed to see.
    fn public_message(&self) -> &str {
        match self {
            AppError::Validation(msg)
            | AppError::UnsupportedFormat(msg)
            | AppError::AudioRejected(msg)
            | AppError::Extraction(msg)
            | AppError::NotFound(msg) => msg,
            AppError::Internal(_) | AppError::ConfigError(_) => INTERNAL_MESSAGE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            AppError::AudioRejected(msg) => write!(f, "Audio rejected: {}", msg),
            AppError::Extraction(msg) => write!(f, "Extraction error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

/// Converts errors into JSON HTTP responses.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "validation_error",
///     "message": "Unsupported file type 'flac'",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) | AppError::ConfigError(detail) = self {
            error!(error_type = self.kind(), detail = %detail, "Request failed");
        }

        HttpResponse::build(self.status()).json(json!({
            "error": {
                "type": self.kind(),
                "message": self.public_message(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

/// JSON errors at the HTTP edge come from client payloads.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

impl From<InvalidFeatureVector> for AppError {
    fn from(err: InvalidFeatureVector) -> Self {
        AppError::Extraction(err.to_string())
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Unsupported { stderr } => {
                tracing::warn!(stderr = %stderr, "Audio conversion rejected the upload");
                AppError::UnsupportedFormat("Audio format could not be decoded".to_string())
            }
            ConversionError::TimedOut(_) => AppError::AudioRejected(err.to_string()),
            ConversionError::Launch { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PcmError> for AppError {
    fn from(err: PcmError) -> Self {
        match err {
            PcmError::Unreadable(_) => AppError::Internal(err.to_string()),
            PcmError::Empty | PcmError::TooShort { .. } | PcmError::Silent { .. } => {
                AppError::AudioRejected(err.to_string())
            }
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Launch { .. } => AppError::Internal(err.to_string()),
            ExtractionError::Failed { .. } => {
                AppError::Extraction("Voice features could not be measured from this recording".to_string())
            }
            ExtractionError::TimedOut(_)
            | ExtractionError::InvalidOutput(_)
            | ExtractionError::InvalidVector(_) => AppError::Extraction(err.to_string()),
        }
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use std::time::Duration;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.error_response();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_error_body_shape() {
        let body = body_json(AppError::Validation("No audio file provided".to_string())).await;
        assert_eq!(body["error"]["type"], "validation_error");
        assert_eq!(body["error"]["message"], "No audio file provided");
        assert!(body["error"]["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn test_internal_detail_is_hidden() {
        let body = body_json(AppError::Internal("/var/tmp/uploads: permission denied".to_string())).await;
        assert_eq!(body["error"]["type"], "internal_error");
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Extraction(String::new()).status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unsupported: AppError = ConversionError::Unsupported { stderr: "moov atom not found".to_string() }.into();
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
        assert!(!unsupported.to_string().contains("moov"));

        let slow: AppError = ConversionError::TimedOut(Duration::from_secs(30)).into();
        assert_eq!(slow.kind(), "audio_rejected");

        let short: AppError = PcmError::TooShort { duration: 0.4, min: 1.0 }.into();
        assert_eq!(short.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let crashed: AppError = ExtractionError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "Traceback (most recent call last)".to_string(),
        }
        .into();
        assert_eq!(crashed.kind(), "extraction_error");
        assert!(!crashed.to_string().contains("Traceback"));
    }
}
