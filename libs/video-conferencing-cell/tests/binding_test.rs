// libs/video-conferencing-cell/tests/binding_test.rs
mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;

use common::{session_config, CountingScriptSource, FakeSdk};
use video_conferencing_cell::{
    ConferenceEvent, EndReason, ExitNavigation, HostView, ParticipantRole, ProviderSettings,
    ScriptLoader, SessionController, SessionState, VideoConferencingError, VideoRoomBinding,
};

fn controller_with(sdk: Arc<FakeSdk>, source: CountingScriptSource) -> SessionController {
    let loader = Arc::new(ScriptLoader::new(Arc::new(source)));
    SessionController::new(loader, sdk, ProviderSettings::default())
}

fn appointments_exit() -> ExitNavigation {
    ExitNavigation::Route("/appointments".to_string())
}

fn mount_binding(controller: SessionController) -> VideoRoomBinding {
    VideoRoomBinding::mount(
        controller,
        session_config("abc", "Alice", ParticipantRole::Participant),
        appointments_exit(),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_binding_renders_loading_then_call() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::default());
    let mut binding = mount_binding(controller);

    for stage in [
        SessionState::LoadingSdk,
        SessionState::Initializing,
        SessionState::Connecting,
    ] {
        assert_eq!(binding.next_view().await, Some(HostView::Loading { stage }));
    }

    sdk.session(0)
        .emit(ConferenceEvent::VideoConferenceJoined, json!({}));
    assert_eq!(binding.next_view().await, Some(HostView::InCall));

    binding.leave();
    let closed = Some(HostView::Closed {
        reason: Some(EndReason::LeaveRequested),
        navigate_to: appointments_exit(),
    });
    assert_eq!(binding.next_view().await, closed);
    assert_eq!(binding.next_view().await, closed);

    // The render loop ends once the session is disposed.
    assert_eq!(binding.next_view().await, None);
    assert_eq!(binding.next_view().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_render_loop_terminates_after_session_ends() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::default());
    let mut binding = mount_binding(controller);

    let mut views = Vec::new();
    let mut joined = false;
    while let Some(view) = binding.next_view().await {
        if view == (HostView::Loading { stage: SessionState::Connecting }) && !joined {
            joined = true;
            sdk.session(0).emit(ConferenceEvent::VideoConferenceJoined, json!({}));
        }
        if view == HostView::InCall {
            sdk.session(0).emit(ConferenceEvent::ReadyToClose, json!({}));
        }
        views.push(view);
    }

    assert_eq!(views.len(), 6);
    assert_eq!(
        views.last(),
        Some(&HostView::Closed {
            reason: Some(EndReason::ReadyToClose),
            navigate_to: appointments_exit(),
        })
    );
    assert_eq!(sdk.session(0).dispose_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_binding_offers_retry_after_failure() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::failing_first(1));
    let mut binding = mount_binding(controller);

    assert_eq!(
        binding.next_view().await,
        Some(HostView::Loading {
            stage: SessionState::LoadingSdk
        })
    );
    assert_matches!(
        binding.next_view().await,
        Some(HostView::Failed { can_retry: true, message }) if message.contains("script host unreachable")
    );

    binding.retry().unwrap();
    assert_eq!(
        binding.next_view().await,
        Some(HostView::Loading {
            stage: SessionState::LoadingSdk
        })
    );
    assert_eq!(
        binding.next_view().await,
        Some(HostView::Loading {
            stage: SessionState::Initializing
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_disposes_and_returns_exit() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::default());
    let mut binding = mount_binding(controller);

    while binding.next_view().await
        != Some(HostView::Loading {
            stage: SessionState::Connecting,
        })
    {}

    assert_eq!(binding.cancel(), appointments_exit());
    assert_eq!(
        binding.next_view().await,
        Some(HostView::Closed {
            reason: None,
            navigate_to: appointments_exit(),
        })
    );
    assert_eq!(binding.next_view().await, None);
    assert_eq!(binding.controller().state(), SessionState::Disposed);
    assert_eq!(sdk.session(0).dispose_calls(), 1);

    drop(binding);
    assert_eq!(sdk.session(0).dispose_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_binding_disposes_session() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::default());
    let mut binding = mount_binding(controller);

    while binding.next_view().await
        != Some(HostView::Loading {
            stage: SessionState::Connecting,
        })
    {}

    drop(binding);
    assert_eq!(sdk.session(0).dispose_calls(), 1);
}

#[test]
fn test_mount_outside_runtime_is_rejected() {
    let sdk = Arc::new(FakeSdk::default());
    let controller = controller_with(sdk.clone(), CountingScriptSource::default());

    let result = VideoRoomBinding::mount(
        controller,
        session_config("abc", "Alice", ParticipantRole::Participant),
        appointments_exit(),
    );

    assert!(matches!(result, Err(VideoConferencingError::RuntimeUnavailable)));
    assert_eq!(sdk.created(), 0);
}
