// libs/video-conferencing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    MountTarget, NormalizeIdentityRequest, NormalizedIdentity, ProviderSettings, SessionConfig,
    VideoConferencingError,
};
use crate::services::{normalize_identity, ScriptLoader};

/// Shared state for the video routes.
#[derive(Clone)]
pub struct VideoState {
    pub config: Arc<AppConfig>,
    pub loader: Arc<ScriptLoader>,
}

impl VideoState {
    pub fn new(config: Arc<AppConfig>, loader: Arc<ScriptLoader>) -> Self {
        Self { config, loader }
    }
}

/// Health check for video conferencing. Reports the SDK script status without triggering a load.
#[axum::debug_handler]
pub async fn video_health_check(State(state): State<VideoState>) -> Json<Value> {
    if !state.config.is_video_conferencing_configured() {
        return Json(json!({
            "status": "not_configured",
            "video_configured": false,
            "message": "Video conferencing not configured"
        }));
    }

    let sdk_script = state.loader.status().await;
    let last_failure = state.loader.last_failure().await;

    Json(json!({
        "status": if last_failure.is_none() { "healthy" } else { "degraded" },
        "video_configured": true,
        "provider_host": state.config.video_provider_host,
        "sdk_script": sdk_script,
        "sdk_script_error": last_failure,
    }))
}

/// Preview the SDK-safe identity a session would use.
#[axum::debug_handler]
pub async fn preview_identity(
    State(state): State<VideoState>,
    Json(request): Json<NormalizeIdentityRequest>,
) -> Result<Json<NormalizedIdentity>, AppError> {
    if !state.config.is_video_conferencing_configured() {
        return Err(to_app_error(VideoConferencingError::NotConfigured));
    }
    if request.participant_name.trim().is_empty() {
        return Err(to_app_error(VideoConferencingError::ValidationError {
            message: "participant_name is required".to_string(),
        }));
    }

    let config = SessionConfig::new(
        request.room_token,
        request.participant_name,
        request.participant_role,
        MountTarget::new("preview"),
    );
    let settings = ProviderSettings::from_config(&state.config);

    Ok(Json(normalize_identity(&config, &settings)))
}

fn to_app_error(err: VideoConferencingError) -> AppError {
    match err {
        VideoConferencingError::NotConfigured | VideoConferencingError::RuntimeUnavailable => {
            AppError::ServiceUnavailable(err.to_string())
        }
        VideoConferencingError::ValidationError { message } => AppError::ValidationError(message),
        VideoConferencingError::InvalidSessionState { .. } => {
            AppError::ValidationError(err.to_string())
        }
    }
}
