// libs/video-conferencing-cell/src/services/identity.rs
use crate::models::{NormalizedIdentity, ParticipantRole, ProviderSettings, SessionConfig};

/// Room name used when the token is empty.
pub const FALLBACK_ROOM_NAME: &str = "consultation-room";

const FALLBACK_CONTACT_LOCAL_PART: &str = "participant";

/// Maps a session config to SDK-safe room, display name and contact address.
/// Pure and total: every input yields a usable identity.
pub fn normalize_identity(config: &SessionConfig, settings: &ProviderSettings) -> NormalizedIdentity {
    NormalizedIdentity {
        sdk_room_name: sdk_room_name(&config.room_token, settings.room_prefix.as_deref()),
        display_name: display_name(
            &config.participant_name,
            config.participant_role,
            &settings.doctor_honorific,
        ),
        contact_address: contact_address(&config.participant_name, &settings.contact_domain),
    }
}

/// Replaces every character outside `[A-Za-z0-9-]` with `-`, one for one.
pub fn sanitize_room_token(token: &str) -> String {
    token
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

pub fn sdk_room_name(token: &str, prefix: Option<&str>) -> String {
    let sanitized = sanitize_room_token(token);
    let room = if sanitized.is_empty() {
        FALLBACK_ROOM_NAME.to_string()
    } else {
        sanitized
    };

    match prefix.map(|prefix| sanitize_room_token(prefix.trim())) {
        Some(prefix) if !prefix.is_empty() => format!("{}-{}", prefix, room),
        _ => room,
    }
}

pub fn display_name(name: &str, role: ParticipantRole, honorific: &str) -> String {
    match role {
        ParticipantRole::Participant => name.to_string(),
        ParticipantRole::Doctor => {
            let trimmed = name.trim();
            if trimmed.starts_with(honorific) {
                trimmed.to_string()
            } else if trimmed.is_empty() {
                honorific.to_string()
            } else {
                format!("{} {}", honorific, trimmed)
            }
        }
    }
}

pub fn contact_address(name: &str, domain: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(".").to_lowercase();
    let local_part = if collapsed.is_empty() {
        FALLBACK_CONTACT_LOCAL_PART.to_string()
    } else {
        collapsed
    };
    format!("{}@{}", local_part, domain.to_lowercase())
}
