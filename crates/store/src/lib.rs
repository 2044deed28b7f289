//! Record-store seams for the turn engine
//!
//! Relational storage proper is an external collaborator; this crate defines
//! the create/read/update contracts the engine consumes and ships an
//! in-memory implementation used for development and tests.

pub mod memory;

use async_trait::async_trait;

use voicedesk_core::{Call, CallMessage, Company, MessageRole, Result};

pub use memory::MemoryStore;

/// Input for registering a company.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub identifier: String,
    pub name: String,
    pub business_logic: Option<String>,
    pub description: Option<String>,
}

impl NewCompany {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            business_logic: None,
            description: None,
        }
    }

    pub fn with_business_logic(mut self, script: impl Into<String>) -> Self {
        self.business_logic = Some(script.into());
        self
    }
}

/// Company records, keyed by numeric id with unique public identifier and name.
#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Register a company. Fails with `Error::Validation` when the public
    /// identifier or the name is already taken.
    async fn create(&self, company: NewCompany) -> Result<Company>;

    async fn get(&self, id: u64) -> Result<Option<Company>>;

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Company>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Company>>;
}

/// Call records. Updates overwrite the mutable fields (context, end time,
/// rating); `company_id` and `started_at` are immutable after creation.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Create a new anonymous call under a company, allocating its id.
    async fn create_anonymous(
        &self,
        company_id: u64,
        gateway_sid: Option<String>,
    ) -> Result<Call>;

    async fn get(&self, id: u64) -> Result<Option<Call>>;

    /// Write back a mutated call record. Last writer wins on the context
    /// field; callers are expected to run one turn per call at a time.
    async fn update(&self, call: &Call) -> Result<()>;

    /// Locate the call created for a telephony gateway session.
    async fn find_by_gateway_sid(&self, sid: &str) -> Result<Option<Call>>;
}

/// Transcript rows. Append-only: a message is never mutated once written and
/// insertion order within a call is the conversation order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, call_id: u64, role: MessageRole, content: &str)
        -> Result<CallMessage>;

    async fn list_for_call(&self, call_id: u64) -> Result<Vec<CallMessage>>;
}
