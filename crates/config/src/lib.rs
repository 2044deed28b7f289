//! Configuration for the voicedesk server
//!
//! Settings are layered: `config/default.yaml`, then `config/{env}.yaml`,
//! then `VOICEDESK__*` environment variables. Everything has a sensible
//! default so the server starts with no files at all.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{
    load_settings, ContextConfig, ObservabilityConfig, ProviderConfig, ServerConfig, Settings,
    TelephonyConfig,
};
