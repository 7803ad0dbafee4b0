use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized record extracted from a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    local_element_id: String,
    fields: BTreeMap<String, String>,
}

impl Element {
    pub fn new(local_element_id: impl Into<String>) -> Self {
        Self {
            local_element_id: local_element_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter, keyed by full context name
    pub fn with(mut self, context: impl Into<String>, text: impl Into<String>) -> Self {
        self.set(context, text);
        self
    }

    pub fn set(&mut self, context: impl Into<String>, text: impl Into<String>) {
        self.fields.insert(context.into(), text.into());
    }

    pub fn local_element_id(&self) -> &str {
        &self.local_element_id
    }

    /// Drop surrounding whitespace from the local ID
    pub fn trim_local_element_id(&mut self) {
        let trimmed = self.local_element_id.trim();
        if trimmed.len() != self.local_element_id.len() {
            self.local_element_id = trimmed.to_string();
        }
    }

    pub fn field(&self, context: &str) -> Option<&str> {
        self.fields.get(context).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// True when no context carries any text
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}
