//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, GEMINI_API_KEY, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
    pub performance: PerformanceConfig,
}

/// Server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream hosted-AI endpoint settings.
///
/// The API key is never written to config files; it comes from the
/// environment (`GEMINI_API_KEY` or `APP_UPSTREAM_API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the REST completion endpoint
    pub base_url: String,

    /// URL of the bidirectional live voice WebSocket endpoint
    pub ws_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Model used for structured chat replies and session reports
    pub chat_model: String,

    /// Model used for the live voice session
    pub live_model: String,

    /// Prebuilt voice name for model speech
    pub voice: String,

    /// Completion request timeout in seconds (0 disables the timeout)
    pub request_timeout_secs: u64,
}

/// Audio format expectations for the live voice bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Microphone sample rate (Hz)
    pub input_sample_rate: u32,

    /// Model speech sample rate (Hz)
    pub output_sample_rate: u32,

    pub channels: u8,
    pub bit_depth: u8,

    /// Upper bound on one browser microphone frame, in bytes
    pub max_frame_bytes: usize,
}

/// Locations of persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the single JSON profile document
    pub profile_path: String,
}

/// Capacity tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum concurrent chat sessions
    pub max_chat_sessions: usize,

    /// Maximum concurrent onboarding drafts
    pub max_onboarding_drafts: usize,

    /// Lines retained in the rolling live transcript window
    pub transcript_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            upstream: UpstreamConfig {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                ws_url: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
                api_key: String::new(),
                chat_model: "gemini-3-flash-preview".to_string(),
                live_model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
                voice: "Kore".to_string(),
                request_timeout_secs: 30,
            },
            audio: AudioConfig {
                input_sample_rate: 16_000,
                output_sample_rate: 24_000,
                channels: 1,
                bit_depth: 16,
                max_frame_bytes: 32_768,
            },
            storage: StorageConfig {
                profile_path: "data/profile.json".to_string(),
            },
            performance: PerformanceConfig {
                max_chat_sessions: 16,
                max_onboarding_drafts: 16,
                transcript_window: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment-platform conventions that don't follow the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(api_key) = env::var("GEMINI_API_KEY") {
            settings = settings.set_override("upstream.api_key", api_key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.upstream.base_url.is_empty() || self.upstream.ws_url.is_empty() {
            return Err(anyhow::anyhow!("Upstream endpoint URLs cannot be empty"));
        }

        if self.upstream.chat_model.is_empty() || self.upstream.live_model.is_empty() {
            return Err(anyhow::anyhow!("Upstream model names cannot be empty"));
        }

        if self.audio.input_sample_rate == 0 || self.audio.output_sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rates must be greater than 0"));
        }

        if self.audio.channels != 1 {
            return Err(anyhow::anyhow!("Only mono audio is supported"));
        }

        if self.audio.bit_depth != 16 {
            return Err(anyhow::anyhow!("Only 16-bit PCM is supported"));
        }

        if self.audio.max_frame_bytes == 0 {
            return Err(anyhow::anyhow!("Max audio frame size must be greater than 0"));
        }

        if self.storage.profile_path.is_empty() {
            return Err(anyhow::anyhow!("Profile path cannot be empty"));
        }

        if self.performance.max_chat_sessions == 0 {
            return Err(anyhow::anyhow!("Max chat sessions must be greater than 0"));
        }

        if self.performance.max_onboarding_drafts == 0 {
            return Err(anyhow::anyhow!("Max onboarding drafts must be greater than 0"));
        }

        if self.performance.transcript_window == 0 {
            return Err(anyhow::anyhow!("Transcript window must be greater than 0"));
        }

        Ok(())
    }

    /// Apply a partial runtime update from a JSON document.
    ///
    /// Only the listed fields can change at runtime; endpoint URLs and audio
    /// formats are fixed for the life of the process.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(upstream) = partial.get("upstream") {
            if let Some(chat_model) = upstream.get("chat_model").and_then(|v| v.as_str()) {
                self.upstream.chat_model = chat_model.to_string();
            }
            if let Some(live_model) = upstream.get("live_model").and_then(|v| v.as_str()) {
                self.upstream.live_model = live_model.to_string();
            }
            if let Some(voice) = upstream.get("voice").and_then(|v| v.as_str()) {
                self.upstream.voice = voice.to_string();
            }
            if let Some(timeout) = upstream.get("request_timeout_secs").and_then(|v| v.as_u64()) {
                self.upstream.request_timeout_secs = timeout;
            }
        }

        if let Some(performance) = partial.get("performance") {
            if let Some(sessions) = performance.get("max_chat_sessions").and_then(|v| v.as_u64()) {
                self.performance.max_chat_sessions = sessions as usize;
            }
            if let Some(drafts) = performance
                .get("max_onboarding_drafts")
                .and_then(|v| v.as_u64())
            {
                self.performance.max_onboarding_drafts = drafts as usize;
            }
            if let Some(window) = performance.get("transcript_window").and_then(|v| v.as_u64()) {
                self.performance.transcript_window = window as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        AppConfig::default().upstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.audio.input_sample_rate, 16_000);
        assert_eq!(config.audio.output_sample_rate, 24_000);
        assert_eq!(config.performance.transcript_window, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.channels = 2;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.performance.transcript_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"upstream": {"voice": "Puck"}, "performance": {"max_chat_sessions": 4}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.upstream.voice, "Puck");
        assert_eq!(config.performance.max_chat_sessions, 4);
        // Untouched fields keep their values.
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_update_rejects_invalid_values() {
        let mut config = AppConfig::default();
        let json = r#"{"performance": {"max_chat_sessions": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
