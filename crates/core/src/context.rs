//! Rolling conversation context stored on a call
//!
//! The persisted blob is a JSON document of the form
//! `{"messages": [{"role": "...", "content": "..."}], "last_updated": "..."}`.
//! Only `user` and `assistant` entries are ever persisted: the system
//! preamble is re-synthesized from the company's current business logic on
//! every turn, so storing it would duplicate and drift.
//!
//! Loading is deliberately tolerant. A missing, malformed, or wrong-shaped
//! blob degrades to an empty context rather than failing the turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a context entry as seen by the generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    System,
    User,
    Assistant,
}

impl ContextRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextRole::System => "system",
            ContextRole::User => "user",
            ContextRole::Assistant => "assistant",
        }
    }
}

/// One role-tagged entry of the rolling context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: ContextRole,
    pub content: String,
}

impl ContextMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Assistant,
            content: content.into(),
        }
    }
}

/// Serialized document shape. Writing goes through this struct; reading walks
/// a `serde_json::Value` instead so malformed entries degrade individually.
#[derive(Debug, Serialize)]
struct ContextDocument<'a> {
    messages: &'a [ContextMessage],
    last_updated: DateTime<Utc>,
}

/// Codec for the context blob on a call record.
///
/// `max_messages` bounds the persisted window: only the most recent entries
/// survive a save. The window applies at save time so a long-running call's
/// blob cannot grow without limit.
#[derive(Debug, Clone)]
pub struct ContextStore {
    max_messages: usize,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self { max_messages: 40 }
    }
}

impl ContextStore {
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    /// Deserialize a stored blob into the ordered caller/assistant sequence.
    ///
    /// Never fails: absent or malformed input yields an empty context, and
    /// entries whose role is not `user` or `assistant` are dropped.
    pub fn load(&self, blob: Option<&str>) -> Vec<ContextMessage> {
        let Some(raw) = blob else {
            return Vec::new();
        };

        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "malformed context blob, starting fresh");
                return Vec::new();
            }
        };

        let Some(entries) = value.get("messages").and_then(|m| m.as_array()) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let role = match entry.get("role").and_then(|r| r.as_str())? {
                    "user" => ContextRole::User,
                    "assistant" => ContextRole::Assistant,
                    _ => return None,
                };
                let content = entry.get("content").and_then(|c| c.as_str())?;
                Some(ContextMessage {
                    role,
                    content: content.to_string(),
                })
            })
            .collect()
    }

    /// Serialize the ordered message sequence plus a last-updated timestamp.
    ///
    /// System entries are excluded and the sequence is trimmed to the most
    /// recent `max_messages` entries. Round-trips exactly through `load` for
    /// what it keeps.
    pub fn save(&self, messages: &[ContextMessage], now: DateTime<Utc>) -> String {
        let kept: Vec<ContextMessage> = messages
            .iter()
            .filter(|m| m.role != ContextRole::System)
            .cloned()
            .collect();
        let start = kept.len().saturating_sub(self.max_messages);

        serde_json::to_string(&ContextDocument {
            messages: &kept[start..],
            last_updated: now,
        })
        .expect("context document is always serializable")
    }
}
