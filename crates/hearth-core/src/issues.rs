//! Repair issues raised while processing configuration.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Error,
    Warning,
}

/// An actionable problem shown to the operator until it is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub domain: String,
    pub issue_id: String,
    pub is_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learn_more_url: Option<String>,
    pub severity: IssueSeverity,
    pub translation_key: String,
    pub translation_placeholders: BTreeMap<String, String>,
}

/// Receives issue notifications. Nothing is returned to the caller.
pub trait IssueRegistry: Send + Sync {
    fn create_issue(&self, issue: Issue);

    fn delete_issue(&self, domain: &str, issue_id: &str);
}

/// Keeps issues in memory, keyed by domain and issue id.
#[derive(Debug, Default)]
pub struct InMemoryIssueRegistry {
    issues: Mutex<IndexMap<(String, String), Issue>>,
}

impl InMemoryIssueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, domain: &str, issue_id: &str) -> Option<Issue> {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(domain.to_string(), issue_id.to_string()))
            .cloned()
    }
}

impl IssueRegistry for InMemoryIssueRegistry {
    fn create_issue(&self, issue: Issue) {
        tracing::debug!(domain = %issue.domain, issue_id = %issue.issue_id, "issue created");
        let key = (issue.domain.clone(), issue.issue_id.clone());
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, issue);
    }

    fn delete_issue(&self, domain: &str, issue_id: &str) {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&(domain.to_string(), issue_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: &str) -> Issue {
        Issue {
            domain: "core".into(),
            issue_id: id.into(),
            is_fixable: false,
            learn_more_url: None,
            severity: IssueSeverity::Warning,
            translation_key: id.into(),
            translation_placeholders: BTreeMap::new(),
        }
    }

    #[test]
    fn test_create_replaces_and_delete_removes() {
        let registry = InMemoryIssueRegistry::new();
        registry.create_issue(issue("historic_currency"));
        registry.create_issue(issue("historic_currency"));
        registry.create_issue(issue("country_not_configured"));
        assert_eq!(registry.issues().len(), 2);

        registry.delete_issue("core", "historic_currency");
        assert!(registry.get("core", "historic_currency").is_none());
        assert!(registry.get("core", "country_not_configured").is_some());

        // Deleting an unknown issue is a no-op.
        registry.delete_issue("core", "nope");
        assert_eq!(registry.issues().len(), 1);
    }
}
