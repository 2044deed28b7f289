//! AI turn pipeline
//!
//! The three-stage transform behind every conversational turn:
//! audio/text in → transcript → generated reply → synthesized audio, with
//! rolling-context threading and end-of-call detection. Stages are
//! independently callable; channel adapters compose them.

pub mod farewell;
pub mod prompt;
pub mod provider;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;

use voicedesk_core::{
    ContextMessage, ContextStore, Error, ReplyGenerator, Result, SpeechSynthesizer, SpeechToText,
};

pub use farewell::FarewellDetector;
pub use provider::GroqProvider;

/// Audio payloads below this are rejected as too short before any provider
/// call is attempted.
pub const MIN_AUDIO_BYTES: usize = 50;

/// Result of the generation stage for one turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Assistant reply text.
    pub text: String,
    /// Updated serialized context, ready to write onto the call.
    pub context_blob: String,
    /// Caller signalled farewell intent.
    pub end_call: bool,
}

/// Orchestrates the three provider stages around the context codec.
#[derive(Clone)]
pub struct TurnPipeline {
    stt: Arc<dyn SpeechToText>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    context: ContextStore,
    farewell: FarewellDetector,
}

impl TurnPipeline {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        context: ContextStore,
    ) -> Self {
        Self {
            stt,
            generator,
            synthesizer,
            context,
            farewell: FarewellDetector::new(),
        }
    }

    /// Build a pipeline where one provider client serves all three stages.
    pub fn with_provider<P>(provider: Arc<P>, context: ContextStore) -> Self
    where
        P: SpeechToText + ReplyGenerator + SpeechSynthesizer + 'static,
    {
        Self::new(provider.clone(), provider.clone(), provider, context)
    }

    /// Transcribe a turn's audio payload.
    ///
    /// Empty and sub-threshold payloads are rejected locally; the provider
    /// is never invoked for them.
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::Validation("audio payload is empty".to_string()));
        }
        if audio.len() < MIN_AUDIO_BYTES {
            return Err(Error::Validation(format!(
                "audio payload too short: {} bytes (minimum {MIN_AUDIO_BYTES})",
                audio.len()
            )));
        }

        let text = self.stt.transcribe(audio).await?;
        tracing::debug!(
            model = self.stt.model_name(),
            chars = text.chars().count(),
            "turn audio transcribed"
        );
        Ok(text)
    }

    /// Generate the assistant reply for one user message.
    ///
    /// Loads the prior context (tolerant of absence or corruption), puts a
    /// fresh preamble from the company's current business logic in front,
    /// classifies farewell intent locally, and calls the generation provider
    /// once. On provider failure nothing is produced: reply and updated
    /// context blob come into existence together or not at all.
    pub async fn generate_reply(
        &self,
        user_message: &str,
        business_logic: &str,
        prior_blob: Option<&str>,
    ) -> Result<TurnReply> {
        let mut history = self.context.load(prior_blob);
        let end_call = self.farewell.wants_to_end(user_message);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ContextMessage::system(prompt::preamble(business_logic)));
        messages.extend(history.iter().cloned());
        messages.push(ContextMessage::user(user_message));

        let text = self.generator.generate(&messages).await?;

        history.push(ContextMessage::user(user_message));
        history.push(ContextMessage::assistant(text.clone()));
        let context_blob = self.context.save(&history, Utc::now());

        tracing::debug!(
            model = self.generator.model_name(),
            end_call,
            history_len = history.len(),
            "turn reply generated"
        );

        Ok(TurnReply {
            text,
            context_blob,
            end_call,
        })
    }

    /// Synthesize reply text and base64-encode the audio for transport.
    pub async fn synthesize_base64(&self, text: &str) -> Result<String> {
        let audio = self.synthesizer.synthesize(text).await?;
        tracing::debug!(
            voice = self.synthesizer.voice_name(),
            bytes = audio.len(),
            "turn reply synthesized"
        );
        Ok(BASE64.encode(audio))
    }
}
