//! Main settings module

use std::collections::HashMap;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to build telephony callback URLs.
    #[serde(default = "default_base_url")]
    pub public_base_url: String,

    /// Allow cross-origin requests on the direct audio endpoint.
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_base_url(),
            cors_enabled: true,
        }
    }
}

/// AI provider configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base, e.g. `https://api.groq.com/openai/v1`.
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,

    /// Usually supplied via `VOICEDESK__PROVIDER__API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Per-request timeout in seconds. There is no retry layer; a turn runs
    /// to completion or to first failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            api_key: None,
            stt_model: default_stt_model(),
            chat_model: default_chat_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Telephony channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Spoken-language tag passed to the gateway's say/gather primitives.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Maps a gateway phone number (the called number) to the public
    /// identifier of the company answering on it.
    #[serde(default)]
    pub number_companies: HashMap<String, String>,

    /// Consecutive empty gather results tolerated before the call is ended
    /// with a goodbye.
    #[serde(default = "default_max_silent_retries")]
    pub max_silent_retries: u32,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            number_companies: HashMap::new(),
            max_silent_retries: default_max_silent_retries(),
        }
    }
}

/// Rolling-context configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Persisted context window; older entries are dropped at save time.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_stt_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_chat_model() -> String {
    "openai/gpt-oss-120b".to_string()
}

fn default_tts_model() -> String {
    "playai-tts".to_string()
}

fn default_tts_voice() -> String {
    "Mikail-PlayAI".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_locale() -> String {
    "es-ES".to_string()
}

fn default_max_silent_retries() -> u32 {
    3
}

fn default_max_messages() -> usize {
    40
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be non-zero"));
        }
        if self.server.public_base_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "server.public_base_url",
                "must not be empty",
            ));
        }
        if self.provider.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("provider.endpoint", "must not be empty"));
        }
        if !(1..=300).contains(&self.provider.timeout_secs) {
            return Err(ConfigError::invalid(
                "provider.timeout_secs",
                format!("must be 1-300, got {}", self.provider.timeout_secs),
            ));
        }
        if self.context.max_messages < 2 {
            return Err(ConfigError::invalid(
                "context.max_messages",
                "window must hold at least one exchange",
            ));
        }
        if self.telephony.max_silent_retries == 0 {
            return Err(ConfigError::invalid(
                "telephony.max_silent_retries",
                "must allow at least one retry",
            ));
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env}")).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("VOICEDESK").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
