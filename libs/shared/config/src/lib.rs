use std::env;
use tracing::warn;

pub const DEFAULT_PROVIDER_HOST: &str = "meet.jit.si";
pub const DEFAULT_SDK_GLOBAL_SYMBOL: &str = "JitsiMeetExternalAPI";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub video_provider_host: String,
    pub video_sdk_script_url: String,
    pub video_sdk_global_symbol: String,
    pub video_sdk_fetch_timeout_ms: u64,
    pub video_room_prefix: Option<String>,
    pub video_doctor_honorific: String,
    pub video_contact_domain: String,
    pub video_connect_timeout_ms: u64,
    pub video_frame_width: String,
    pub video_frame_height: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            video_provider_host: DEFAULT_PROVIDER_HOST.to_string(),
            video_sdk_script_url: format!("https://{}/external_api.js", DEFAULT_PROVIDER_HOST),
            video_sdk_global_symbol: DEFAULT_SDK_GLOBAL_SYMBOL.to_string(),
            video_sdk_fetch_timeout_ms: 15_000,
            video_room_prefix: None,
            video_doctor_honorific: "Dr.".to_string(),
            video_contact_domain: "hospital.local".to_string(),
            video_connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            video_frame_width: "100%".to_string(),
            video_frame_height: "600".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let video_provider_host = env::var("VIDEO_PROVIDER_HOST").unwrap_or_else(|_| {
            warn!("VIDEO_PROVIDER_HOST not set, using default");
            defaults.video_provider_host.clone()
        });

        let config = Self {
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            video_sdk_script_url: env::var("VIDEO_SDK_SCRIPT_URL").unwrap_or_else(|_| {
                warn!("VIDEO_SDK_SCRIPT_URL not set, deriving from provider host");
                format!("https://{}/external_api.js", video_provider_host)
            }),
            video_provider_host,
            video_sdk_global_symbol: env::var("VIDEO_SDK_GLOBAL_SYMBOL").unwrap_or_else(|_| {
                warn!("VIDEO_SDK_GLOBAL_SYMBOL not set, using default");
                defaults.video_sdk_global_symbol.clone()
            }),
            video_sdk_fetch_timeout_ms: parse_var(
                "VIDEO_SDK_FETCH_TIMEOUT_MS",
                defaults.video_sdk_fetch_timeout_ms,
            ),
            video_room_prefix: env::var("VIDEO_ROOM_PREFIX")
                .ok()
                .filter(|prefix| !prefix.trim().is_empty()),
            video_doctor_honorific: env::var("VIDEO_DOCTOR_HONORIFIC").unwrap_or_else(|_| {
                warn!("VIDEO_DOCTOR_HONORIFIC not set, using default");
                defaults.video_doctor_honorific.clone()
            }),
            video_contact_domain: env::var("VIDEO_CONTACT_DOMAIN").unwrap_or_else(|_| {
                warn!("VIDEO_CONTACT_DOMAIN not set, using default");
                defaults.video_contact_domain.clone()
            }),
            video_connect_timeout_ms: parse_var(
                "VIDEO_CONNECT_TIMEOUT_MS",
                defaults.video_connect_timeout_ms,
            ),
            video_frame_width: env::var("VIDEO_FRAME_WIDTH")
                .unwrap_or_else(|_| defaults.video_frame_width.clone()),
            video_frame_height: env::var("VIDEO_FRAME_HEIGHT")
                .unwrap_or_else(|_| defaults.video_frame_height.clone()),
        };

        if !config.is_video_conferencing_configured() {
            warn!("Video conferencing not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_video_conferencing_configured(&self) -> bool {
        !self.video_provider_host.is_empty()
            && !self.video_sdk_script_url.is_empty()
            && !self.video_sdk_global_symbol.is_empty()
    }
}

fn parse_var<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}
