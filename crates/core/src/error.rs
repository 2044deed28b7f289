//! Error taxonomy shared across the workspace
//!
//! Channel adapters translate these into transport-appropriate failures at
//! the boundary: client faults map to 4xx responses on the direct channel and
//! to a spoken apology on the telephony channel.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing input from the caller.
    #[error("validation: {0}")]
    Validation(String),

    /// Company or call absent from the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The call exists but belongs to a different company.
    #[error("call {call_id} does not belong to company {company_id}")]
    CompanyMismatch { call_id: u64, company_id: u64 },

    /// Speech-recognition provider failure, wrapping the upstream message.
    #[error("speech recognition failed: {0}")]
    Transcription(String),

    /// Text-generation provider failure, wrapping the upstream message.
    #[error("reply generation failed: {0}")]
    Generation(String),

    /// Speech-synthesis provider failure, wrapping the upstream message.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// The synthesis provider rejected the request because its usage terms
    /// have not been accepted. Carries remediation text for the operator.
    #[error("speech synthesis unavailable: {0}")]
    SynthesisTermsNotAccepted(String),

    /// Record-store failure.
    #[error("storage: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the failure is the caller's fault (4xx) rather than ours (5xx).
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::CompanyMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_classification() {
        assert!(Error::Validation("empty audio".into()).is_client_fault());
        assert!(Error::NotFound("company acme".into()).is_client_fault());
        assert!(Error::CompanyMismatch {
            call_id: 7,
            company_id: 2
        }
        .is_client_fault());
        assert!(!Error::Generation("upstream 500".into()).is_client_fault());
        assert!(!Error::Storage("lost row".into()).is_client_fault());
    }
}
