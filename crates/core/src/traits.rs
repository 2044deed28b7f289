//! Provider trait seams for the three external AI calls
//!
//! The turn pipeline is written against these traits so tests can substitute
//! counting mocks and so a provider swap never touches orchestration code.

use async_trait::async_trait;

use crate::context::ContextMessage;
use crate::Result;

/// Speech-recognition interface.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a complete audio payload to text.
    ///
    /// Fails with `Error::Transcription` carrying the provider's message.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

/// Text-generation interface.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate one non-streaming reply for the assembled prompt.
    ///
    /// The message sequence is preamble-first, prior turns in order, new
    /// user message last. Fails with `Error::Generation`.
    async fn generate(&self, messages: &[ContextMessage]) -> Result<String>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

/// Speech-synthesis interface.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the full text to audio bytes (uncompressed format).
    ///
    /// Fails with `Error::Synthesis`, or with
    /// `Error::SynthesisTermsNotAccepted` when the provider requires its
    /// usage terms to be accepted first.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Voice name for logging.
    fn voice_name(&self) -> &str;
}
