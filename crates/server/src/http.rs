//! HTTP endpoints
//!
//! Router assembly plus the direct audio channel: one multipart request per
//! conversational turn, audio in and base64 audio out.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use voicedesk_core::{Error, MessageRole};
use voicedesk_session::require_business_logic;

use crate::state::AppState;
use crate::telephony;
use crate::ApiError;

/// Uploads below this are rejected as too short to hold speech.
pub const MIN_UPLOAD_BYTES: usize = 100;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/voice/process", post(process_voice))
        .route("/api/calls/:id/end", patch(end_call))
        .route("/api/telephony/incoming", post(telephony::incoming))
        .route("/api/telephony/gather", post(telephony::gather))
        .route("/api/telephony/status", post(telephony::status))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http());

    let router = if state.settings.server.cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// One direct-channel turn.
#[derive(Debug, Serialize)]
struct VoiceTurnResponse {
    call_id: u64,
    transcript: String,
    response_text: String,
    /// Base64-encoded reply audio.
    audio_response: String,
    call_ended: bool,
}

/// Collected multipart fields for the direct endpoint.
#[derive(Debug, Default)]
struct VoiceTurnUpload {
    audio: Option<Vec<u8>>,
    company_identifier: Option<String>,
    call_id: Option<u64>,
}

async fn read_upload(mut multipart: Multipart) -> Result<VoiceTurnUpload, Error> {
    let mut upload = VoiceTurnUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("unreadable audio field: {e}")))?;
                upload.audio = Some(bytes.to_vec());
            }
            Some("company_identifier") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("unreadable field: {e}")))?;
                upload.company_identifier = Some(text);
            }
            Some("call_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("unreadable field: {e}")))?;
                let id = text
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Validation(format!("invalid call_id: {text:?}")))?;
                upload.call_id = Some(id);
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Process one audio turn: transcribe, reply, synthesize.
async fn process_voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VoiceTurnResponse>, ApiError> {
    let upload = read_upload(multipart).await?;

    let company_identifier = upload
        .company_identifier
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("company_identifier is required".to_string()))?;

    let audio = upload
        .audio
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::Validation("audio field is required".to_string()))?;
    if audio.len() < MIN_UPLOAD_BYTES {
        return Err(Error::Validation(format!(
            "audio upload too short: {} bytes (minimum {MIN_UPLOAD_BYTES})",
            audio.len()
        ))
        .into());
    }

    let (company, mut call) = state
        .sessions
        .resolve_call(company_identifier, upload.call_id)
        .await?;
    let script = require_business_logic(&company)?;

    let transcript = state.pipeline.transcribe(&audio).await?;
    state
        .sessions
        .append_message(call.id, MessageRole::Client, &transcript)
        .await?;

    let reply = state
        .pipeline
        .generate_reply(&transcript, script, call.context.as_deref())
        .await?;
    state
        .sessions
        .apply_turn_result(&mut call, &reply.text, reply.context_blob, reply.end_call)
        .await?;

    let audio_response = state.pipeline.synthesize_base64(&reply.text).await?;

    tracing::info!(
        call_id = call.id,
        company_id = company.id,
        ended = reply.end_call,
        "voice turn processed"
    );

    Ok(Json(VoiceTurnResponse {
        call_id: call.id,
        transcript,
        response_text: reply.text,
        audio_response,
        call_ended: reply.end_call,
    }))
}

#[derive(Debug, Deserialize, Default)]
struct EndCallRequest {
    rating: Option<u8>,
}

#[derive(Debug, Serialize)]
struct EndCallResponse {
    call_id: u64,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
    rating: Option<u8>,
}

/// End a call from the direct channel, optionally rating it.
async fn end_call(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Option<Json<EndCallRequest>>,
) -> Result<Json<EndCallResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let call = state.sessions.end_call(id, request.rating).await?;

    Ok(Json(EndCallResponse {
        call_id: call.id,
        ended_at: call.ended_at,
        rating: call.rating,
    }))
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
