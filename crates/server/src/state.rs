//! Application state
//!
//! Shared state across all handlers.

use std::sync::Arc;

use voicedesk_config::Settings;
use voicedesk_core::{ContextStore, Result};
use voicedesk_pipeline::{GroqProvider, TurnPipeline};
use voicedesk_session::CallSessionManager;
use voicedesk_store::MemoryStore;

/// Application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: CallSessionManager,
    pub pipeline: TurnPipeline,
}

impl AppState {
    /// Wire the default composition: Groq-style provider over the in-memory
    /// record store.
    pub fn new(settings: Settings) -> Result<Self> {
        let provider = Arc::new(GroqProvider::new(settings.provider.clone())?);
        let context = ContextStore::new(settings.context.max_messages);
        let pipeline = TurnPipeline::with_provider(provider, context);
        let sessions = CallSessionManager::with_store(Arc::new(MemoryStore::new()));

        Ok(Self {
            settings: Arc::new(settings),
            sessions,
            pipeline,
        })
    }

    /// Assemble from pre-built parts. Used by tests to inject mock providers
    /// and a shared store.
    pub fn with_parts(
        settings: Settings,
        sessions: CallSessionManager,
        pipeline: TurnPipeline,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            sessions,
            pipeline,
        }
    }
}
