//! OpenAI-compatible AI provider client
//!
//! One `reqwest` client serving all three stages against a Groq-style API:
//! `/audio/transcriptions` (multipart), `/chat/completions` (JSON,
//! non-streaming), `/audio/speech` (JSON in, raw audio out). Decoding
//! parameters are pinned for reproducible latency and cost.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use voicedesk_config::ProviderConfig;
use voicedesk_core::{ContextMessage, Error, ReplyGenerator, Result, SpeechSynthesizer, SpeechToText};

/// Pinned sampling configuration for the generation stage.
const CHAT_TEMPERATURE: f32 = 1.0;
const CHAT_TOP_P: f32 = 1.0;
const CHAT_MAX_COMPLETION_TOKENS: u32 = 8192;
const CHAT_REASONING_EFFORT: &str = "medium";

/// Uncompressed output keeps synthesis deterministic to decode downstream.
const TTS_RESPONSE_FORMAT: &str = "wav";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    reasoning_effort: &'a str,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    response_format: &'a str,
    input: &'a str,
}

/// Client for a Groq-style OpenAI-compatible provider.
pub struct GroqProvider {
    http: Client,
    config: ProviderConfig,
}

impl GroqProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Validation(format!("provider http client: {e}")))?;

        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl SpeechToText for GroqProvider {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let part = Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")
            .map_err(|e| Error::Transcription(e.to_string()))?;

        // Zero temperature keeps recognition deterministic.
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.stt_model.clone())
            .text("temperature", "0")
            .text("response_format", "verbose_json");

        let response = self
            .authorize(self.http.post(self.url("/audio/transcriptions")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!("{status}: {body}")));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("invalid response: {e}")))?;

        Ok(transcription.text)
    }

    fn model_name(&self) -> &str {
        &self.config.stt_model
    }
}

#[async_trait]
impl ReplyGenerator for GroqProvider {
    async fn generate(&self, messages: &[ContextMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: CHAT_TEMPERATURE,
            max_completion_tokens: CHAT_MAX_COMPLETION_TOKENS,
            top_p: CHAT_TOP_P,
            reasoning_effort: CHAT_REASONING_EFFORT,
            stream: false,
        };

        let response = self
            .authorize(self.http.post(self.url("/chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!("{status}: {body}")));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Generation("provider returned no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

#[async_trait]
impl SpeechSynthesizer for GroqProvider {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.config.tts_model,
            voice: &self.config.tts_voice,
            response_format: TTS_RESPONSE_FORMAT,
            input: text,
        };

        let response = self
            .authorize(self.http.post(self.url("/audio/speech")))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(synthesis_error(&self.config.tts_model, status.as_u16(), &body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        if audio.is_empty() {
            return Err(Error::Synthesis("provider returned no audio".to_string()));
        }

        Ok(audio.to_vec())
    }

    fn voice_name(&self) -> &str {
        &self.config.tts_voice
    }
}

/// Classify a synthesis failure. A rejection over unaccepted usage terms is
/// reported separately with remediation text for the operator.
fn synthesis_error(model: &str, status: u16, body: &str) -> Error {
    if body.to_lowercase().contains("terms") {
        return Error::SynthesisTermsNotAccepted(format!(
            "the {model} model requires accepting the provider's usage terms; \
             open the provider console, select the model, and accept them"
        ));
    }
    Error::Synthesis(format!("{status}: {body}"))
}
