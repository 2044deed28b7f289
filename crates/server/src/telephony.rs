//! Telephony dialog endpoints
//!
//! Gateway-driven conversation loop: the gateway transcribes caller speech
//! and posts form-encoded callbacks; every answer is a TwiML document. These
//! handlers never surface a raw error to the caller, a failure is rendered
//! as a spoken apology.

use axum::{
    extract::{Query, State},
    Form,
};
use serde::Deserialize;

use voicedesk_core::MessageRole;
use voicedesk_session::require_business_logic;

use crate::state::AppState;
use crate::twiml::{Gather, Twiml, TwimlBuilder};

/// Gateway statuses after which the call record is force-ended.
const TERMINAL_STATUSES: [&str; 5] = ["completed", "busy", "failed", "no-answer", "canceled"];

const APOLOGY: &str =
    "Lo siento, ha ocurrido un error técnico. Por favor, inténtelo de nuevo más tarde.";
const SILENT_REPROMPT: &str = "No le he escuchado. ¿Puede repetirlo, por favor?";
const SILENT_GOODBYE: &str = "No he podido escucharle. Gracias por llamar. ¡Hasta luego!";

#[derive(Debug, Deserialize)]
pub struct IncomingForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
}

#[derive(Debug, Deserialize)]
pub struct GatherQuery {
    pub call_id: u64,
    #[serde(default)]
    pub attempt: u32,
}

#[derive(Debug, Deserialize)]
pub struct GatherForm {
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
    #[serde(rename = "CallDuration", default)]
    pub call_duration: Option<String>,
}

fn apology(locale: &str) -> Twiml {
    TwimlBuilder::new().say(APOLOGY, locale).hangup().render()
}

fn gather_action(base_url: &str, call_id: u64, attempt: u32) -> String {
    format!(
        "{}/api/telephony/gather?call_id={call_id}&attempt={attempt}",
        base_url.trim_end_matches('/')
    )
}

/// Answer an inbound call: map the called number to its company, open the
/// call record, and arm the first speech capture.
pub async fn incoming(
    State(state): State<AppState>,
    Form(form): Form<IncomingForm>,
) -> Twiml {
    let locale = state.settings.telephony.locale.clone();

    tracing::info!(
        gateway_sid = %form.call_sid,
        from = %form.from,
        to = %form.to,
        "inbound telephony call"
    );

    let Some(company_identifier) = state.settings.telephony.number_companies.get(&form.to) else {
        tracing::warn!(to = %form.to, "no company mapped to called number");
        return TwimlBuilder::new()
            .say(
                "Lo sentimos, este número no está disponible en este momento. ¡Hasta luego!",
                &locale,
            )
            .hangup()
            .render();
    };

    let company = match state.sessions.resolve_company(company_identifier).await {
        Ok(company) => company,
        Err(e) => {
            tracing::error!(identifier = %company_identifier, error = %e, "mapped company missing");
            return apology(&locale);
        }
    };

    let call = match state
        .sessions
        .start_gateway_call(company.id, &form.call_sid)
        .await
    {
        Ok(call) => call,
        Err(e) => {
            tracing::error!(company_id = company.id, error = %e, "could not open call record");
            return apology(&locale);
        }
    };

    let welcome = format!(
        "Hola, gracias por llamar a {}. ¿En qué puedo ayudarle?",
        company.name
    );
    // On a speech timeout the gateway skips the action URL and falls through
    // to the next verb, so every gather is backed by a redirect into the same
    // action. The redirected request carries no SpeechResult and is handled
    // as a silent attempt.
    let action = gather_action(&state.settings.server.public_base_url, call.id, 0);
    TwimlBuilder::new()
        .gather(Gather {
            action: action.clone(),
            language: locale,
            prompt: Some(welcome),
        })
        .redirect(action)
        .render()
}

/// Handle one captured speech result: run the turn and speak the reply, then
/// either hang up or re-arm capture.
pub async fn gather(
    State(state): State<AppState>,
    query: Option<Query<GatherQuery>>,
    Form(form): Form<GatherForm>,
) -> Twiml {
    let locale = state.settings.telephony.locale.clone();
    let base_url = state.settings.server.public_base_url.clone();

    // A callback without a usable call_id still gets spoken markup, never a
    // bare 400.
    let Some(Query(query)) = query else {
        tracing::warn!("gather callback missing call_id");
        return apology(&locale);
    };

    let speech = form
        .speech_result
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let Some(speech) = speech else {
        let attempt = query.attempt + 1;
        if attempt >= state.settings.telephony.max_silent_retries {
            tracing::info!(call_id = query.call_id, attempt, "silence limit reached");
            if let Err(e) = state.sessions.end_call(query.call_id, None).await {
                tracing::warn!(call_id = query.call_id, error = %e, "could not end silent call");
            }
            return TwimlBuilder::new().say(SILENT_GOODBYE, &locale).hangup().render();
        }
        tracing::debug!(call_id = query.call_id, attempt, "empty speech result, re-prompting");
        let action = gather_action(&base_url, query.call_id, attempt);
        return TwimlBuilder::new()
            .gather(Gather {
                action: action.clone(),
                language: locale,
                prompt: Some(SILENT_REPROMPT.to_string()),
            })
            .redirect(action)
            .render();
    };

    match run_turn(&state, query.call_id, speech).await {
        Ok((reply_text, end_call)) => {
            if end_call {
                TwimlBuilder::new().say(reply_text, &locale).hangup().render()
            } else {
                let action = gather_action(&base_url, query.call_id, 0);
                TwimlBuilder::new()
                    .say(reply_text, &locale)
                    .gather(Gather {
                        action: action.clone(),
                        language: locale,
                        prompt: None,
                    })
                    .redirect(action)
                    .render()
            }
        }
        Err(e) => {
            tracing::error!(call_id = query.call_id, error = %e, "telephony turn failed");
            apology(&locale)
        }
    }
}

async fn run_turn(
    state: &AppState,
    call_id: u64,
    speech: &str,
) -> voicedesk_core::Result<(String, bool)> {
    let mut call = state.sessions.get_call(call_id).await?;
    let company = state.sessions.get_company(call.company_id).await?;
    let script = require_business_logic(&company)?;

    state
        .sessions
        .append_message(call.id, MessageRole::User, speech)
        .await?;

    let reply = state
        .pipeline
        .generate_reply(speech, script, call.context.as_deref())
        .await?;
    state
        .sessions
        .apply_turn_result(&mut call, &reply.text, reply.context_blob, reply.end_call)
        .await?;

    tracing::info!(call_id, ended = reply.end_call, "telephony turn processed");
    Ok((reply.text, reply.end_call))
}

/// Status callback: log, and close the call record on terminal statuses.
pub async fn status(
    State(state): State<AppState>,
    Form(form): Form<StatusForm>,
) -> &'static str {
    tracing::info!(
        gateway_sid = %form.call_sid,
        status = %form.call_status,
        duration = form.call_duration.as_deref().unwrap_or("-"),
        "telephony status callback"
    );

    if TERMINAL_STATUSES.contains(&form.call_status.as_str()) {
        match state.sessions.finalize_by_gateway_sid(&form.call_sid).await {
            Ok(Some(call)) => {
                tracing::info!(call_id = call.id, gateway_sid = %form.call_sid, "call finalized");
            }
            Ok(None) => {
                tracing::debug!(gateway_sid = %form.call_sid, "no call record for session");
            }
            Err(e) => {
                tracing::warn!(gateway_sid = %form.call_sid, error = %e, "finalization failed");
            }
        }
    }

    "OK"
}
