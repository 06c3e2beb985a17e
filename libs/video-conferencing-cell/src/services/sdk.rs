// libs/video-conferencing-cell/src/services/sdk.rs
//! Contract consumed from the external conferencing SDK.
//!
//! Only the lifecycle controller talks to these traits. Host code never
//! registers listeners on a `ConferenceSession` itself.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::models::{
    ConferenceEvent, ConferenceOptions, NormalizedIdentity, ProviderSettings, SdkError,
    SessionConfig, UserInfo,
};

/// Callback invoked by the SDK with the event payload.
pub type EventListener = Box<dyn Fn(Value) + Send + Sync>;

/// Listener map handed to `ConferenceSession::add_event_listeners`.
pub type EventListeners = HashMap<ConferenceEvent, EventListener>;

/// The global constructor the bootstrap script makes available.
pub trait ConferenceSdk: Send + Sync {
    /// Builds one session bound to `options.mount_target`. Fails when the
    /// mount target cannot be found or the SDK rejects the options.
    fn create_session(
        &self,
        options: ConferenceOptions,
    ) -> Result<Box<dyn ConferenceSession>, SdkError>;
}

/// A live session object owned by exactly one controller.
pub trait ConferenceSession: Send + Sync {
    fn add_event_listeners(&self, listeners: EventListeners);

    /// Releases network and media resources held by the session.
    fn dispose(&self) -> Result<(), SdkError>;
}

/// Assembles SDK construction options. Only recognized options are passed through.
pub fn build_conference_options(
    config: &SessionConfig,
    identity: &NormalizedIdentity,
    settings: &ProviderSettings,
) -> ConferenceOptions {
    let toolbar: Vec<&'static str> = config
        .toolbar_buttons()
        .iter()
        .map(|button| button.as_str())
        .collect();

    ConferenceOptions {
        provider_host: settings.provider_host.clone(),
        room_name: identity.sdk_room_name.clone(),
        width: settings.frame_width.clone(),
        height: settings.frame_height.clone(),
        mount_target: config.mount_target.clone(),
        user_info: UserInfo {
            display_name: identity.display_name.clone(),
            email: identity.contact_address.clone(),
        },
        config_overwrite: json!({
            "enableWelcomePage": !config.suppress_welcome_screen,
            "prejoinPageEnabled": !config.suppress_prejoin,
            "startWithAudioMuted": config.start_with_audio_muted,
            "startWithVideoMuted": config.start_with_video_muted,
            "disableInviteFunctions": config.disable_invite_functions,
            "toolbarButtons": toolbar,
        }),
        interface_config_overwrite: json!({
            "TOOLBAR_BUTTONS": toolbar,
            "SHOW_JITSI_WATERMARK": false,
        }),
    }
}
