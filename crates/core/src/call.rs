//! Call session and transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a transcript message.
///
/// Caller turns are recorded as `client` by the direct audio channel and as
/// `user` by the telephony channel; `assistant` is the reply role on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Client,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Client => "client",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Both caller-side roles, regardless of channel.
    pub fn is_caller(&self) -> bool {
        matches!(self, MessageRole::Client | MessageRole::User)
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One conversational session, owned by exactly one company for its entire
/// lifetime. `ended_at`, once set, is never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: u64,
    pub company_id: u64,
    /// Absent for anonymous callers.
    pub client_id: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Caller satisfaction, 1-5.
    pub rating: Option<u8>,
    /// Serialized rolling conversation context (see `context` module).
    pub context: Option<String>,
    /// Telephony gateway session id, set when the call originates from the
    /// dialog channel. Lets status callbacks locate the call record.
    pub gateway_sid: Option<String>,
}

impl Call {
    /// A fresh anonymous call under the given company.
    pub fn anonymous(id: u64, company_id: u64) -> Self {
        Self {
            id,
            company_id,
            client_id: None,
            started_at: Utc::now(),
            ended_at: None,
            rating: None,
            context: None,
            gateway_sid: None,
        }
    }

    pub fn with_gateway_sid(mut self, sid: impl Into<String>) -> Self {
        self.gateway_sid = Some(sid.into());
        self
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// One utterance in a call's transcript. Never mutated after creation;
/// insertion order within a call is the conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMessage {
    pub id: u64,
    pub call_id: u64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
