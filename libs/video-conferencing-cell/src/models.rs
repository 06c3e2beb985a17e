// libs/video-conferencing-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_CONNECT_TIMEOUT_MS};

// ==============================================================================
// SESSION CONFIGURATION
// ==============================================================================

/// Role of the local participant. Doctors get the honorific in their display name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ParticipantRole {
    #[serde(rename = "doctor")]
    Doctor,
    #[serde(rename = "participant")]
    Participant,
}

/// Toolbar buttons the conferencing SDK recognizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolbarButton {
    #[serde(rename = "microphone")]
    Microphone,
    #[serde(rename = "camera")]
    Camera,
    #[serde(rename = "hangup")]
    Hangup,
    #[serde(rename = "chat")]
    Chat,
    #[serde(rename = "desktop")]
    Desktop,
    #[serde(rename = "fullscreen")]
    Fullscreen,
    #[serde(rename = "settings")]
    Settings,
    #[serde(rename = "raisehand")]
    RaiseHand,
}

impl ToolbarButton {
    pub const ALL: [ToolbarButton; 8] = [
        ToolbarButton::Microphone,
        ToolbarButton::Camera,
        ToolbarButton::Hangup,
        ToolbarButton::Chat,
        ToolbarButton::Desktop,
        ToolbarButton::Fullscreen,
        ToolbarButton::Settings,
        ToolbarButton::RaiseHand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolbarButton::Microphone => "microphone",
            ToolbarButton::Camera => "camera",
            ToolbarButton::Hangup => "hangup",
            ToolbarButton::Chat => "chat",
            ToolbarButton::Desktop => "desktop",
            ToolbarButton::Fullscreen => "fullscreen",
            ToolbarButton::Settings => "settings",
            ToolbarButton::RaiseHand => "raisehand",
        }
    }
}

/// Opaque handle to the UI container the SDK renders into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MountTarget(String);

impl MountTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn is_resolvable(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

/// Input for one session attempt. Immutable once `start` accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub room_token: String,
    pub participant_name: String,
    pub participant_role: ParticipantRole,
    pub mount_target: MountTarget,
    /// Falls back to the deployment default in `ProviderSettings` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    /// Empty means every recognized button.
    #[serde(default)]
    pub toolbar_options: BTreeSet<ToolbarButton>,
    #[serde(default = "default_true")]
    pub suppress_welcome_screen: bool,
    #[serde(default = "default_true")]
    pub suppress_prejoin: bool,
    #[serde(default)]
    pub start_with_audio_muted: bool,
    #[serde(default)]
    pub start_with_video_muted: bool,
    #[serde(default = "default_true")]
    pub disable_invite_functions: bool,
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    pub fn new(
        room_token: impl Into<String>,
        participant_name: impl Into<String>,
        participant_role: ParticipantRole,
        mount_target: MountTarget,
    ) -> Self {
        Self {
            room_token: room_token.into(),
            participant_name: participant_name.into(),
            participant_role,
            mount_target,
            connect_timeout_ms: None,
            toolbar_options: BTreeSet::new(),
            suppress_welcome_screen: true,
            suppress_prejoin: true,
            start_with_audio_muted: false,
            start_with_video_muted: false,
            disable_invite_functions: true,
        }
    }

    pub fn with_connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(connect_timeout_ms);
        self
    }

    pub fn resolved_connect_timeout_ms(&self, settings: &ProviderSettings) -> u64 {
        self.connect_timeout_ms.unwrap_or(settings.connect_timeout_ms)
    }

    pub fn with_toolbar(mut self, buttons: impl IntoIterator<Item = ToolbarButton>) -> Self {
        self.toolbar_options = buttons.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<(), VideoConferencingError> {
        if self.connect_timeout_ms == Some(0) {
            return Err(VideoConferencingError::ValidationError {
                message: "connect_timeout_ms must be greater than zero".to_string(),
            });
        }
        if !self.mount_target.is_resolvable() {
            return Err(VideoConferencingError::ValidationError {
                message: "mount target must be resolvable before starting a session".to_string(),
            });
        }
        Ok(())
    }

    /// Toolbar buttons in SDK order, expanding an empty selection to all buttons.
    pub fn toolbar_buttons(&self) -> Vec<ToolbarButton> {
        if self.toolbar_options.is_empty() {
            ToolbarButton::ALL.to_vec()
        } else {
            self.toolbar_options.iter().copied().collect()
        }
    }
}

/// Deployment-wide provider settings projected from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider_host: String,
    pub room_prefix: Option<String>,
    pub doctor_honorific: String,
    pub contact_domain: String,
    pub frame_width: String,
    pub frame_height: String,
    pub connect_timeout_ms: u64,
}

impl ProviderSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            provider_host: config.video_provider_host.clone(),
            room_prefix: config.video_room_prefix.clone(),
            doctor_honorific: config.video_doctor_honorific.clone(),
            contact_domain: config.video_contact_domain.clone(),
            frame_width: config.video_frame_width.clone(),
            frame_height: config.video_frame_height.clone(),
            connect_timeout_ms: if config.video_connect_timeout_ms == 0 {
                tracing::warn!(
                    "VIDEO_CONNECT_TIMEOUT_MS must be greater than zero, using {}",
                    DEFAULT_CONNECT_TIMEOUT_MS
                );
                DEFAULT_CONNECT_TIMEOUT_MS
            } else {
                config.video_connect_timeout_ms
            },
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// SDK-safe identity derived from a `SessionConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub sdk_room_name: String,
    pub display_name: String,
    pub contact_address: String,
}

// ==============================================================================
// LIFECYCLE STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "loading_sdk")]
    LoadingSdk,
    #[serde(rename = "initializing")]
    Initializing,
    #[serde(rename = "connecting")]
    Connecting,
    #[serde(rename = "joined")]
    Joined,
    #[serde(rename = "leaving")]
    Leaving,
    #[serde(rename = "disposed")]
    Disposed,
    #[serde(rename = "error")]
    Error,
}

impl SessionState {
    /// States where the connect-timeout timer may be armed.
    pub fn awaits_connection(&self) -> bool {
        matches!(self, SessionState::Initializing | SessionState::Connecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::LoadingSdk => "loading_sdk",
            SessionState::Initializing => "initializing",
            SessionState::Connecting => "connecting",
            SessionState::Joined => "joined",
            SessionState::Leaving => "leaving",
            SessionState::Disposed => "disposed",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Why a joined session ended. Both SDK-driven reasons tear down identically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EndReason {
    /// The local participant hung up inside the SDK UI.
    #[serde(rename = "participant_left")]
    ParticipantLeft,
    /// The host or the remote side closed the conference.
    #[serde(rename = "ready_to_close")]
    ReadyToClose,
    /// `leave()` was called on the controller.
    #[serde(rename = "leave_requested")]
    LeaveRequested,
}

/// Notification delivered to subscribers on every transition.
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    pub session_id: Uuid,
    pub generation: u64,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SessionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
    pub at: DateTime<Utc>,
}

// ==============================================================================
// CONFERENCING SDK BOUNDARY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub email: String,
}

/// Construction options handed to the SDK, mirroring its constructor argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConferenceOptions {
    #[serde(rename = "providerHost")]
    pub provider_host: String,
    #[serde(rename = "roomName")]
    pub room_name: String,
    pub width: String,
    pub height: String,
    #[serde(rename = "mountTarget")]
    pub mount_target: MountTarget,
    #[serde(rename = "userInfo")]
    pub user_info: UserInfo,
    #[serde(rename = "configOverwrite")]
    pub config_overwrite: serde_json::Value,
    #[serde(rename = "interfaceConfigOverwrite")]
    pub interface_config_overwrite: serde_json::Value,
}

/// Events the controller subscribes to on the external session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConferenceEvent {
    #[serde(rename = "videoConferenceJoined")]
    VideoConferenceJoined,
    #[serde(rename = "videoConferenceLeft")]
    VideoConferenceLeft,
    #[serde(rename = "readyToClose")]
    ReadyToClose,
    #[serde(rename = "participantJoined")]
    ParticipantJoined,
    #[serde(rename = "connectionFailed")]
    ConnectionFailed,
}

impl ConferenceEvent {
    pub const ALL: [ConferenceEvent; 5] = [
        ConferenceEvent::VideoConferenceJoined,
        ConferenceEvent::VideoConferenceLeft,
        ConferenceEvent::ReadyToClose,
        ConferenceEvent::ParticipantJoined,
        ConferenceEvent::ConnectionFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConferenceEvent::VideoConferenceJoined => "videoConferenceJoined",
            ConferenceEvent::VideoConferenceLeft => "videoConferenceLeft",
            ConferenceEvent::ReadyToClose => "readyToClose",
            ConferenceEvent::ParticipantJoined => "participantJoined",
            ConferenceEvent::ConnectionFailed => "connectionFailed",
        }
    }
}

// ==============================================================================
// API REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeIdentityRequest {
    pub room_token: String,
    pub participant_name: String,
    pub participant_role: ParticipantRole,
}

// ==============================================================================
// ERROR HANDLING
// ==============================================================================

/// Failures surfaced to the host as `last_error` while in the `Error` state.
/// `DisposalFailure` is only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionError {
    #[error("Failed to load conferencing SDK: {reason}")]
    ScriptLoadFailure { reason: String },

    #[error("Failed to construct conferencing session: {message}")]
    ConstructionFailure { message: String },

    #[error("connection timeout after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },

    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Failed to dispose conferencing session: {message}")]
    DisposalFailure { message: String },
}

/// Outcome of a failed `ScriptLoader::ensure_loaded` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ScriptLoadError {
    pub reason: String,
}

impl ScriptLoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Error raised by the conferencing SDK boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SdkError {
    pub message: String,
}

impl SdkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VideoConferencingError {
    #[error("Video session is not in a state that allows this operation: {status}")]
    InvalidSessionState { status: String },

    #[error("Video conferencing not configured")]
    NotConfigured,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Video sessions must be started from within a Tokio runtime")]
    RuntimeUnavailable,
}
