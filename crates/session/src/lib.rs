//! Call session management
//!
//! Resolves or creates the call record for a turn, enforces company/call
//! consistency, persists transcript messages, and finalizes calls.
//!
//! Concurrency: one logical turn per call is assumed. Transcript rows are
//! append-only and survive races; the context blob and end time are
//! last-writer-wins on the call record.

use std::sync::Arc;

use chrono::Utc;

use voicedesk_core::{Call, CallMessage, Company, Error, MessageRole, Result};
use voicedesk_store::{CallStore, CompanyStore, MessageStore};

/// Valid caller rating range.
const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Orchestrates call lifecycle against the record stores.
#[derive(Clone)]
pub struct CallSessionManager {
    companies: Arc<dyn CompanyStore>,
    calls: Arc<dyn CallStore>,
    messages: Arc<dyn MessageStore>,
}

impl CallSessionManager {
    pub fn new(
        companies: Arc<dyn CompanyStore>,
        calls: Arc<dyn CallStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            companies,
            calls,
            messages,
        }
    }

    /// Convenience constructor for a store implementing all three seams.
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: CompanyStore + CallStore + MessageStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store)
    }

    /// Resolve a company from a caller-supplied identifier.
    ///
    /// Lookup order: public identifier, then numeric id when the string
    /// parses as one, then display name. First match wins.
    pub async fn resolve_company(&self, identifier: &str) -> Result<Company> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::Validation("company identifier is required".to_string()));
        }

        if let Some(company) = self.companies.find_by_identifier(identifier).await? {
            return Ok(company);
        }
        if let Ok(id) = identifier.parse::<u64>() {
            if let Some(company) = self.companies.get(id).await? {
                return Ok(company);
            }
        }
        if let Some(company) = self.companies.find_by_name(identifier).await? {
            return Ok(company);
        }

        Err(Error::NotFound(format!("company {identifier}")))
    }

    /// Resolve the call for a turn: an existing one (verified to belong to
    /// the resolved company) or a brand-new anonymous call.
    pub async fn resolve_call(
        &self,
        company_identifier: &str,
        existing_call_id: Option<u64>,
    ) -> Result<(Company, Call)> {
        let company = self.resolve_company(company_identifier).await?;

        let call = match existing_call_id {
            None => {
                let call = self.calls.create_anonymous(company.id, None).await?;
                tracing::info!(call_id = call.id, company_id = company.id, "call created");
                call
            }
            Some(id) => {
                let call = self
                    .calls
                    .get(id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("call {id}")))?;
                if call.company_id != company.id {
                    return Err(Error::CompanyMismatch {
                        call_id: id,
                        company_id: company.id,
                    });
                }
                call
            }
        };

        Ok((company, call))
    }

    /// Create a call for an inbound telephony session.
    pub async fn start_gateway_call(&self, company_id: u64, gateway_sid: &str) -> Result<Call> {
        let call = self
            .calls
            .create_anonymous(company_id, Some(gateway_sid.to_string()))
            .await?;
        tracing::info!(
            call_id = call.id,
            company_id,
            gateway_sid,
            "telephony call created"
        );
        Ok(call)
    }

    pub async fn get_company(&self, id: u64) -> Result<Company> {
        self.companies
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("company {id}")))
    }

    pub async fn get_call(&self, id: u64) -> Result<Call> {
        self.calls
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("call {id}")))
    }

    /// Persist one transcript row.
    pub async fn append_message(
        &self,
        call_id: u64,
        role: MessageRole,
        content: &str,
    ) -> Result<CallMessage> {
        self.messages.append(call_id, role, content).await
    }

    /// Apply one turn's outcome: assistant message, updated context, and the
    /// end stamp when the caller said goodbye.
    ///
    /// The assistant message is written before the call record so no reader
    /// observes an updated context without its reply. An already-ended call
    /// is never un-ended.
    pub async fn apply_turn_result(
        &self,
        call: &mut Call,
        reply_text: &str,
        context_blob: String,
        end_call: bool,
    ) -> Result<()> {
        self.messages
            .append(call.id, MessageRole::Assistant, reply_text)
            .await?;

        call.context = Some(context_blob);
        if end_call && call.ended_at.is_none() {
            call.ended_at = Some(Utc::now());
        }
        self.calls.update(call).await?;

        tracing::info!(call_id = call.id, ended = call.is_ended(), "turn applied");
        Ok(())
    }

    /// End a call, optionally recording a rating (1-5).
    ///
    /// Idempotent in effect: ending an already-ended call keeps the original
    /// end time.
    pub async fn end_call(&self, call_id: u64, rating: Option<u8>) -> Result<Call> {
        if let Some(rating) = rating {
            if !RATING_RANGE.contains(&rating) {
                return Err(Error::Validation(format!(
                    "rating must be 1-5, got {rating}"
                )));
            }
        }

        let mut call = self.get_call(call_id).await?;
        if call.ended_at.is_none() {
            call.ended_at = Some(Utc::now());
        }
        if rating.is_some() {
            call.rating = rating;
        }
        self.calls.update(&call).await?;

        tracing::info!(call_id, rating, "call ended");
        Ok(call)
    }

    /// Force-end the call tied to a telephony gateway session, if any.
    /// Used by status callbacks on terminal gateway statuses.
    pub async fn finalize_by_gateway_sid(&self, sid: &str) -> Result<Option<Call>> {
        let Some(call) = self.calls.find_by_gateway_sid(sid).await? else {
            return Ok(None);
        };
        if call.is_ended() {
            return Ok(Some(call));
        }
        let ended = self.end_call(call.id, None).await?;
        Ok(Some(ended))
    }

    pub async fn transcript(&self, call_id: u64) -> Result<Vec<CallMessage>> {
        self.messages.list_for_call(call_id).await
    }
}

/// A turn cannot run for a company without a configured script.
pub fn require_business_logic(company: &Company) -> Result<&str> {
    company
        .business_logic
        .as_deref()
        .filter(|script| !script.trim().is_empty())
        .ok_or_else(|| {
            Error::Validation(format!(
                "company {} has no business logic configured",
                company.identifier
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicedesk_store::{MemoryStore, NewCompany};

    async fn manager_with_companies() -> (CallSessionManager, MemoryStore) {
        let store = MemoryStore::new();
        // id 1: identifier happens to look like another company's numeric id
        store
            .create(NewCompany::new("2", "Colliding").with_business_logic("script"))
            .await
            .unwrap();
        // id 2
        store
            .create(NewCompany::new("acme-1", "Acme").with_business_logic("script"))
            .await
            .unwrap();
        (CallSessionManager::with_store(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn identifier_takes_precedence_over_numeric_id() {
        let (manager, _) = manager_with_companies().await;
        // "2" matches company 1's public identifier even though company 2
        // would match by numeric id.
        let company = manager.resolve_company("2").await.unwrap();
        assert_eq!(company.id, 1);
        assert_eq!(company.name, "Colliding");
    }

    #[tokio::test]
    async fn numeric_id_and_name_fallbacks() {
        let (manager, _) = manager_with_companies().await;

        // No identifier "1", falls through to numeric id.
        let by_id = manager.resolve_company("1").await.unwrap();
        assert_eq!(by_id.name, "Colliding");

        let by_name = manager.resolve_company("Acme").await.unwrap();
        assert_eq!(by_name.identifier, "acme-1");

        assert!(matches!(
            manager.resolve_company("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            manager.resolve_company("   ").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn resolve_call_creates_and_verifies_ownership() {
        let (manager, _) = manager_with_companies().await;

        let (company, call) = manager.resolve_call("acme-1", None).await.unwrap();
        assert_eq!(call.company_id, company.id);
        assert!(call.client_id.is_none());

        // Same call id under the right company resolves.
        let (_, same) = manager.resolve_call("acme-1", Some(call.id)).await.unwrap();
        assert_eq!(same.id, call.id);

        // Under a different company it is a mismatch.
        let mismatch = manager.resolve_call("Colliding", Some(call.id)).await;
        assert!(matches!(mismatch, Err(Error::CompanyMismatch { .. })));

        let missing = manager.resolve_call("acme-1", Some(999)).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn apply_turn_result_writes_message_then_context() {
        let (manager, store) = manager_with_companies().await;
        let (_, mut call) = manager.resolve_call("acme-1", None).await.unwrap();

        manager
            .apply_turn_result(&mut call, "claro que sí", "{\"messages\":[]}".into(), false)
            .await
            .unwrap();

        let reloaded = CallStore::get(&store, call.id).await.unwrap().unwrap();
        assert!(reloaded.context.is_some());
        assert!(!reloaded.is_ended());

        let transcript = manager.transcript(call.id).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, MessageRole::Assistant);
        assert_eq!(transcript[0].content, "claro que sí");
    }

    #[tokio::test]
    async fn farewell_turn_stamps_end_time() {
        let (manager, _) = manager_with_companies().await;
        let (_, mut call) = manager.resolve_call("acme-1", None).await.unwrap();

        manager
            .apply_turn_result(&mut call, "¡hasta luego!", "{}".into(), true)
            .await
            .unwrap();
        assert!(call.is_ended());

        let first_end = call.ended_at;
        // A late second turn must not move or clear the end time.
        manager
            .apply_turn_result(&mut call, "algo más", "{}".into(), true)
            .await
            .unwrap();
        assert_eq!(call.ended_at, first_end);
    }

    #[tokio::test]
    async fn end_call_validates_rating_and_is_idempotent() {
        let (manager, _) = manager_with_companies().await;
        let (_, call) = manager.resolve_call("acme-1", None).await.unwrap();

        assert!(matches!(
            manager.end_call(call.id, Some(0)).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            manager.end_call(call.id, Some(6)).await,
            Err(Error::Validation(_))
        ));

        let ended = manager.end_call(call.id, Some(5)).await.unwrap();
        assert!(ended.is_ended());
        assert_eq!(ended.rating, Some(5));

        let again = manager.end_call(call.id, None).await.unwrap();
        assert_eq!(again.ended_at, ended.ended_at);
        assert_eq!(again.rating, Some(5));
    }

    #[tokio::test]
    async fn finalize_by_gateway_sid_ends_open_calls_only_once() {
        let (manager, _) = manager_with_companies().await;
        let call = manager.start_gateway_call(1, "CA42").await.unwrap();

        let ended = manager.finalize_by_gateway_sid("CA42").await.unwrap().unwrap();
        assert!(ended.is_ended());
        assert_eq!(ended.id, call.id);

        let again = manager.finalize_by_gateway_sid("CA42").await.unwrap().unwrap();
        assert_eq!(again.ended_at, ended.ended_at);

        assert!(manager.finalize_by_gateway_sid("CA99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn business_logic_is_required() {
        let store = MemoryStore::new();
        let bare = store.create(NewCompany::new("bare-1", "Bare")).await.unwrap();
        assert!(require_business_logic(&bare).is_err());

        let configured = store
            .create(NewCompany::new("full-1", "Full").with_business_logic("script"))
            .await
            .unwrap();
        assert_eq!(require_business_logic(&configured).unwrap(), "script");
    }
}
