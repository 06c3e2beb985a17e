// libs/video-conferencing-cell/src/lib.rs
//! # Video Conferencing Cell
//!
//! Turns "this user wants to join room R" into a live session hosted by an
//! external conferencing SDK, and tears it down again on every exit path.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Video Cell                        |
//! +-----------------------------------------------------+
//! |  binding.rs      |  Host-side adapter for views     |
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Config, state, events, errors   |
//! |  services/       |  Session lifecycle core          |
//! |    script_loader |  Single-flight SDK script loader |
//! |    identity.rs   |  Room/participant normalization  |
//! |    sdk.rs        |  External SDK contract           |
//! |    session.rs    |  Lifecycle state machine         |
//! +-----------------------------------------------------+
//! ```
//!
//! ## Lifecycle
//!
//! `Idle -> LoadingSdk -> Initializing -> Connecting -> Joined -> Leaving -> Disposed`,
//! with `Error` reachable from loading, initializing and connecting, and
//! `Disposed` reachable from everywhere. `retry()` leaves `Error` with a new
//! generation; callbacks from older generations are discarded.
//!
//! ## API Endpoints
//!
//! - `GET /video/health` - SDK script status
//! - `POST /video/identity` - Preview the normalized room identity
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shared_config::AppConfig;
//! use video_conferencing_cell::{
//!     ExitNavigation, MountTarget, ParticipantRole, ProviderSettings, ScriptLoader,
//!     SessionConfig, SessionController, VideoRoomBinding,
//! };
//!
//! let config = AppConfig::from_env();
//! let controller = SessionController::new(
//!     ScriptLoader::global(&config),
//!     sdk, // Arc<dyn ConferenceSdk> provided by the host environment
//!     ProviderSettings::from_config(&config),
//! );
//! let session = SessionConfig::new(
//!     "Room #42!",
//!     "Alice",
//!     ParticipantRole::Participant,
//!     MountTarget::new("jitsi-container"),
//! );
//! let mut binding = VideoRoomBinding::mount(controller, session, ExitNavigation::Back)?;
//! while let Some(view) = binding.next_view().await {
//!     render(view);
//! }
//! ```
//!
//! ## Configuration
//!
//! - `VIDEO_PROVIDER_HOST` - Conferencing host (defaults to `meet.jit.si`)
//! - `VIDEO_SDK_SCRIPT_URL` - Bootstrap script URL
//! - `VIDEO_SDK_GLOBAL_SYMBOL` - Constructor the script must define
//! - `VIDEO_CONNECT_TIMEOUT_MS` - Default connect timeout

pub mod binding;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{
    ConferenceEvent, ConferenceOptions, EndReason, MountTarget, NormalizedIdentity,
    ParticipantRole, ProviderSettings, ScriptLoadError, SdkError, SessionConfig, SessionError,
    SessionState, StateChange, ToolbarButton, VideoConferencingError,
};

pub use binding::{ExitNavigation, HostView, VideoRoomBinding};

pub use services::{
    ConferenceSdk, ConferenceSession, HttpScriptSource, ScriptLoader, ScriptSource,
    ScriptStatus, SessionController,
};

pub use handlers::VideoState;
pub use router::video_conferencing_routes;
