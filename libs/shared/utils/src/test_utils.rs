use std::sync::Arc;

use shared_config::AppConfig;

pub struct TestConfig {
    pub provider_host: String,
    pub sdk_script_url: String,
    pub sdk_global_symbol: String,
    pub connect_timeout_ms: u64,
    pub room_prefix: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            provider_host: "meet.test.local".to_string(),
            sdk_script_url: "http://localhost:54321/external_api.js".to_string(),
            sdk_global_symbol: "JitsiMeetExternalAPI".to_string(),
            connect_timeout_ms: 20_000,
            room_prefix: None,
        }
    }
}

impl TestConfig {
    /// Points the SDK script at a mock server, e.g. a `wiremock::MockServer` uri.
    pub fn with_script_server(server_uri: &str) -> Self {
        Self {
            sdk_script_url: format!("{}/external_api.js", server_uri),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            video_provider_host: self.provider_host.clone(),
            video_sdk_script_url: self.sdk_script_url.clone(),
            video_sdk_global_symbol: self.sdk_global_symbol.clone(),
            video_sdk_fetch_timeout_ms: 2_000,
            video_room_prefix: self.room_prefix.clone(),
            video_contact_domain: "hospital.test".to_string(),
            video_connect_timeout_ms: self.connect_timeout_ms,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned bodies for the conferencing SDK bootstrap script.
pub struct MockSdkScripts;

impl MockSdkScripts {
    pub fn bootstrap_script(global_symbol: &str) -> String {
        format!(
            "(function(root){{ function {0}(domain, options) {{ this.domain = domain; }} root.{0} = {0}; }})(window);",
            global_symbol
        )
    }

    pub fn unrelated_script() -> String {
        "console.log('maintenance page');".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.video_provider_host, "meet.test.local");
        assert_eq!(app_config.video_connect_timeout_ms, 20_000);
        assert!(app_config.is_video_conferencing_configured());
    }

    #[test]
    fn test_script_server_url() {
        let config = TestConfig::with_script_server("http://127.0.0.1:9999");
        assert_eq!(config.sdk_script_url, "http://127.0.0.1:9999/external_api.js");
    }

    #[test]
    fn test_bootstrap_script_defines_symbol() {
        let script = MockSdkScripts::bootstrap_script("JitsiMeetExternalAPI");
        assert!(script.contains("root.JitsiMeetExternalAPI"));
        assert!(!MockSdkScripts::unrelated_script().contains("JitsiMeetExternalAPI"));
    }
}
