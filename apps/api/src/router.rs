use axum::{
    Router,
    routing::get,
};

use video_conferencing_cell::{video_conferencing_routes, VideoState};

pub fn create_router(video_state: VideoState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic video API is running!" }))
        .nest("/video", video_conferencing_routes(video_state))
}
