use crate::classifier::ClassificationMethod;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /api/v1/info`: what the screener measures and how to record for it.
pub async fn get_info(state: web::Data<AppState>) -> HttpResponse {
    let classifier = state.screening.classifier();
    let model_type = match classifier.method() {
        ClassificationMethod::Hybrid => "Hybrid: trained model gated by severe acoustic indicators",
        ClassificationMethod::RuleBased => "Rule-based acoustic thresholds",
    };

    HttpResponse::Ok().json(json!({
        "name": "Voice Check - Laryngeal Cancer Screening",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Acoustic voice analysis for laryngeal cancer risk screening",
        "method": classifier.method(),
        "model_type": model_type,
        "model": classifier.model_description(),
        "based_on": "Diagnostic Acoustics Distinguish Vocal Fold Lesions (Frontiers in Digital Health, 2025)",
        "cancer_indicators": [
            "HNR < 4 dB (extremely low harmonic-to-noise ratio)",
            "Jitter > 6% (extreme pitch perturbation)",
            "Shimmer > 20% (extreme amplitude instability)",
            "F0 < 70 Hz or > 300 Hz (abnormal fundamental frequency)"
        ],
        "features_analyzed": [
            "Fundamental Frequency (F0)",
            "Jitter (pitch perturbation)",
            "Shimmer (amplitude perturbation)",
            "Harmonics-to-Noise Ratio (HNR)"
        ],
        "accepted_formats": state.config.analysis.allowed_extensions,
        "max_upload_bytes": state.config.analysis.max_upload_bytes,
        "instructions": [
            "1. Find a quiet environment",
            "2. Hold phone/microphone 10-15cm from mouth",
            "3. Take a deep breath",
            "4. Sustain the vowel \"ah\" (as in \"father\") for 3-5 seconds at comfortable pitch",
            "5. Keep volume and pitch steady",
            "6. Submit recording for analysis"
        ],
        "disclaimer": "This tool is for screening purposes only and does NOT replace professional medical diagnosis. Always consult an ENT specialist for proper evaluation."
    }))
}
