//! In-memory record store
//!
//! Backs development and tests. Ids are allocated from per-table counters;
//! maps are `DashMap`s so the store is cheaply cloneable and shareable
//! across handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use voicedesk_core::{Call, CallMessage, Company, Error, MessageRole, Result};

use crate::{CallStore, CompanyStore, MessageStore, NewCompany};

#[derive(Default)]
struct Tables {
    companies: DashMap<u64, Company>,
    calls: DashMap<u64, Call>,
    messages: DashMap<u64, Vec<CallMessage>>,
    next_company_id: AtomicU64,
    next_call_id: AtomicU64,
    next_message_id: AtomicU64,
}

/// One store serving all three record types.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl CompanyStore for MemoryStore {
    async fn create(&self, company: NewCompany) -> Result<Company> {
        let taken = self.tables.companies.iter().any(|entry| {
            entry.identifier == company.identifier || entry.name == company.name
        });
        if taken {
            return Err(Error::Validation(format!(
                "company identifier or name already registered: {}",
                company.identifier
            )));
        }

        let id = Self::next_id(&self.tables.next_company_id);
        let record = Company {
            id,
            identifier: company.identifier,
            name: company.name,
            business_logic: company.business_logic,
            description: company.description,
            created_at: Utc::now(),
        };
        self.tables.companies.insert(id, record.clone());
        tracing::debug!(company_id = id, identifier = %record.identifier, "company registered");
        Ok(record)
    }

    async fn get(&self, id: u64) -> Result<Option<Company>> {
        Ok(self.tables.companies.get(&id).map(|c| c.clone()))
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Company>> {
        Ok(self
            .tables
            .companies
            .iter()
            .find(|c| c.identifier == identifier)
            .map(|c| c.clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Company>> {
        Ok(self
            .tables
            .companies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.clone()))
    }
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn create_anonymous(
        &self,
        company_id: u64,
        gateway_sid: Option<String>,
    ) -> Result<Call> {
        let id = Self::next_id(&self.tables.next_call_id);
        let call = match gateway_sid {
            Some(sid) => Call::anonymous(id, company_id).with_gateway_sid(sid),
            None => Call::anonymous(id, company_id),
        };
        self.tables.calls.insert(id, call.clone());
        Ok(call)
    }

    async fn get(&self, id: u64) -> Result<Option<Call>> {
        Ok(self.tables.calls.get(&id).map(|c| c.clone()))
    }

    async fn update(&self, call: &Call) -> Result<()> {
        match self.tables.calls.get_mut(&call.id) {
            Some(mut existing) => {
                *existing = call.clone();
                Ok(())
            }
            None => Err(Error::Storage(format!("call {} vanished", call.id))),
        }
    }

    async fn find_by_gateway_sid(&self, sid: &str) -> Result<Option<Call>> {
        Ok(self
            .tables
            .calls
            .iter()
            .find(|c| c.gateway_sid.as_deref() == Some(sid))
            .map(|c| c.clone()))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(
        &self,
        call_id: u64,
        role: MessageRole,
        content: &str,
    ) -> Result<CallMessage> {
        let message = CallMessage {
            id: Self::next_id(&self.tables.next_message_id),
            call_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .messages
            .entry(call_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_for_call(&self, call_id: u64) -> Result<Vec<CallMessage>> {
        Ok(self
            .tables
            .messages
            .get(&call_id)
            .map(|m| m.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn company_uniqueness_enforced() {
        let store = MemoryStore::new();
        store.create(NewCompany::new("acme-1", "Acme")).await.unwrap();

        let dup_identifier = store.create(NewCompany::new("acme-1", "Other")).await;
        assert!(matches!(dup_identifier, Err(Error::Validation(_))));

        let dup_name = store.create(NewCompany::new("other-1", "Acme")).await;
        assert!(matches!(dup_name, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn lookups_by_identifier_and_name() {
        let store = MemoryStore::new();
        let company = store.create(NewCompany::new("acme-1", "Acme")).await.unwrap();

        let by_identifier = store.find_by_identifier("acme-1").await.unwrap().unwrap();
        assert_eq!(by_identifier.id, company.id);

        let by_name = store.find_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(by_name.id, company.id);

        assert!(store.find_by_identifier("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_keep_insertion_order() {
        let store = MemoryStore::new();
        let call = store.create_anonymous(1, None).await.unwrap();

        store.append(call.id, MessageRole::Client, "hola").await.unwrap();
        store
            .append(call.id, MessageRole::Assistant, "buenas")
            .await
            .unwrap();
        store.append(call.id, MessageRole::Client, "adiós").await.unwrap();

        let messages = store.list_for_call(call.id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hola", "buenas", "adiós"]);
    }

    #[tokio::test]
    async fn update_round_trips_mutable_fields() {
        let store = MemoryStore::new();
        let mut call = store.create_anonymous(1, Some("CA123".into())).await.unwrap();

        call.context = Some("{}".to_string());
        call.ended_at = Some(Utc::now());
        store.update(&call).await.unwrap();

        let reloaded = CallStore::get(&store, call.id).await.unwrap().unwrap();
        assert!(reloaded.is_ended());
        assert_eq!(reloaded.context.as_deref(), Some("{}"));

        let by_sid = store.find_by_gateway_sid("CA123").await.unwrap().unwrap();
        assert_eq!(by_sid.id, call.id);
    }
}
