// libs/video-conferencing-cell/src/binding.rs
//! Host-side adapter between a view and its `SessionController`.
//!
//! A binding is created when a video view becomes active and dropped when the
//! view is torn down; dropping it disposes the controller. It turns state
//! changes into the data a view renders and never touches the external
//! session itself.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{EndReason, SessionConfig, SessionState, StateChange, VideoConferencingError};
use crate::services::session::SessionController;

/// Where the host navigates once the session is over.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum ExitNavigation {
    Route(String),
    Back,
}

/// What the host view should render for the latest state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum HostView {
    Loading { stage: SessionState },
    InCall,
    Failed { message: String, can_retry: bool },
    Closed {
        reason: Option<EndReason>,
        navigate_to: ExitNavigation,
    },
}

pub struct VideoRoomBinding {
    controller: SessionController,
    updates: broadcast::Receiver<StateChange>,
    exit: ExitNavigation,
    finished: bool,
}

impl VideoRoomBinding {
    /// Subscribes to the controller and starts the session. Must be called
    /// from within a Tokio runtime; otherwise fails with `RuntimeUnavailable`.
    pub fn mount(
        controller: SessionController,
        config: SessionConfig,
        exit: ExitNavigation,
    ) -> Result<Self, VideoConferencingError> {
        let updates = controller.subscribe();
        controller.start(config)?;

        Ok(Self {
            controller,
            updates,
            exit,
            finished: false,
        })
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn view_for(&self, change: &StateChange) -> HostView {
        match change.state {
            SessionState::Idle
            | SessionState::LoadingSdk
            | SessionState::Initializing
            | SessionState::Connecting => HostView::Loading { stage: change.state },
            SessionState::Joined => HostView::InCall,
            SessionState::Error => HostView::Failed {
                message: change
                    .last_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "Video session failed".to_string()),
                can_retry: true,
            },
            SessionState::Leaving | SessionState::Disposed => HostView::Closed {
                reason: change.end_reason,
                navigate_to: self.exit.clone(),
            },
        }
    }

    /// Waits for the next state change and maps it to a view.
    /// Returns `None` once the `Disposed` view has been yielded.
    pub async fn next_view(&mut self) -> Option<HostView> {
        if self.finished {
            return None;
        }
        loop {
            match self.updates.recv().await {
                Ok(change) => {
                    if change.state == SessionState::Disposed {
                        self.finished = true;
                    }
                    return Some(self.view_for(&change));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Video view lagged behind {} state changes", skipped);
                    if self.controller.state() == SessionState::Disposed {
                        self.finished = true;
                        return Some(HostView::Closed {
                            reason: self.controller.end_reason(),
                            navigate_to: self.exit.clone(),
                        });
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    pub fn retry(&self) -> Result<(), VideoConferencingError> {
        self.controller.retry()
    }

    pub fn leave(&self) {
        self.controller.leave();
    }

    /// Always available: disposes regardless of state and returns where to go.
    pub fn cancel(&self) -> ExitNavigation {
        debug!("Video view cancelled by user");
        self.controller.dispose();
        self.exit.clone()
    }
}

impl Drop for VideoRoomBinding {
    fn drop(&mut self) {
        self.controller.dispose();
    }
}
