// libs/video-conferencing-cell/src/router.rs
use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;

/// Creates the video conferencing routes
pub fn video_conferencing_routes(state: VideoState) -> Router {
    Router::new()
        .route("/health", get(video_health_check))
        .route("/identity", post(preview_identity))
        .with_state(state)
}
