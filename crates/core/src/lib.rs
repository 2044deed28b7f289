//! Core types for the voicedesk turn engine
//!
//! This crate provides the foundational pieces shared by all other crates:
//! - Tenant and call domain types
//! - The rolling conversation-context codec
//! - Provider trait seams (speech recognition, reply generation, synthesis)
//! - The error taxonomy

pub mod call;
pub mod company;
pub mod context;
pub mod error;
pub mod traits;

pub use call::{Call, CallMessage, MessageRole};
pub use company::Company;
pub use context::{ContextMessage, ContextRole, ContextStore};
pub use error::{Error, Result};
pub use traits::{ReplyGenerator, SpeechSynthesizer, SpeechToText};
