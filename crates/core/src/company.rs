//! Tenant boundary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered tenant.
///
/// `identifier` is the public handle anonymous callers use to reach the
/// company's assistant; both `identifier` and `name` are globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub identifier: String,
    pub name: String,
    /// Free-text script governing assistant behaviour, persona, and
    /// knowledge. Read fresh on every turn so live edits take effect even
    /// for calls already in progress.
    pub business_logic: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(id: u64, identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            name: name.into(),
            business_logic: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_business_logic(mut self, script: impl Into<String>) -> Self {
        self.business_logic = Some(script.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let company = Company::new(1, "acme-1", "Acme")
            .with_business_logic("Sell anvils politely.")
            .with_description("Roadrunner supplies");
        assert_eq!(company.identifier, "acme-1");
        assert_eq!(company.business_logic.as_deref(), Some("Sell anvils politely."));
    }
}
