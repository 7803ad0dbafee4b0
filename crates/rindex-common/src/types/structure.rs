use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{is_sql_identifier, Element, MAX_RESOURCE_ID_LEN};
use crate::error::{Result, RiError};

/// One named text field of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// `<RESOURCE_ID>_<item_key>`, e.g. `CT_title`
    pub name: String,
    /// Annotation weight in `[0, 1]`
    pub weight: f64,
    /// Ontology whose concepts this field's values come from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_id: Option<String>,
}

impl Context {
    /// Lowercased name, used as the ET table column
    pub fn column_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Declared set of contexts for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub resource_id: String,
    pub contexts: Vec<Context>,
}

impl Structure {
    pub fn builder(resource_id: impl Into<String>) -> StructureBuilder {
        StructureBuilder {
            resource_id: resource_id.into(),
            contexts: Vec::new(),
        }
    }

    /// Full context name for an item key of this resource
    pub fn context_name(&self, item_key: &str) -> String {
        format!("{}_{}", self.resource_id, item_key)
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|c| c.name.as_str())
    }

    /// Ontology IDs referenced by any context, deduplicated in declaration order
    pub fn ontology_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.contexts
            .iter()
            .filter_map(|c| c.ontology_id.as_deref())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let id = &self.resource_id;

        if id.is_empty() || id.len() > MAX_RESOURCE_ID_LEN {
            return Err(RiError::invalid_structure(
                id,
                format!("resource ID must be 1..={} characters", MAX_RESOURCE_ID_LEN),
            ));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RiError::invalid_structure(
                id,
                "resource ID must be ASCII alphanumeric",
            ));
        }
        if self.contexts.is_empty() {
            return Err(RiError::invalid_structure(id, "no contexts declared"));
        }

        let prefix = format!("{}_", id);
        let mut names = HashSet::new();
        for context in &self.contexts {
            if !context.name.starts_with(&prefix) {
                return Err(RiError::invalid_structure(
                    id,
                    format!("context '{}' is not prefixed with '{}'", context.name, prefix),
                ));
            }
            if !is_sql_identifier(&context.name) {
                return Err(RiError::invalid_structure(
                    id,
                    format!("context '{}' is not a valid column name", context.name),
                ));
            }
            if !names.insert(context.column_name()) {
                return Err(RiError::invalid_structure(
                    id,
                    format!("context '{}' declared twice", context.name),
                ));
            }
            if !(0.0..=1.0).contains(&context.weight) {
                return Err(RiError::invalid_structure(
                    id,
                    format!("context '{}' weight {} outside [0, 1]", context.name, context.weight),
                ));
            }
        }

        Ok(())
    }

    /// Reshape an element so it carries exactly this structure's contexts.
    ///
    /// Missing contexts are filled with empty strings; a context the
    /// structure does not declare is an error.
    pub fn conform(&self, element: Element) -> Result<Element> {
        if let Some(unknown) = element
            .fields()
            .keys()
            .find(|name| self.context(name).is_none())
        {
            return Err(RiError::UnknownContext {
                resource_id: self.resource_id.clone(),
                local_element_id: element.local_element_id().to_string(),
                context: unknown.clone(),
            });
        }

        let mut conformed = element;
        for name in self.context_names() {
            if conformed.field(name).is_none() {
                conformed.set(name, "");
            }
        }
        Ok(conformed)
    }
}

/// Builder that prefixes item keys with the resource ID
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    resource_id: String,
    contexts: Vec<Context>,
}

impl StructureBuilder {
    pub fn context(mut self, item_key: &str, weight: f64, ontology_id: Option<&str>) -> Self {
        self.contexts.push(Context {
            name: format!("{}_{}", self.resource_id, item_key),
            weight,
            ontology_id: ontology_id.map(str::to_string),
        });
        self
    }

    pub fn build(self) -> Structure {
        Structure {
            resource_id: self.resource_id,
            contexts: self.contexts,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> Structure {
        Structure::builder("CT")
            .context("title", 1.0, None)
            .context("condition", 1.0, Some("1009"))
            .context("summary", 0.8, None)
            .build()
    }

    #[test]
    fn test_builder_prefixes_context_names() {
        let structure = sample();
        let names: Vec<_> = structure.context_names().collect();
        assert_eq!(names, vec!["CT_title", "CT_condition", "CT_summary"]);
        assert_eq!(structure.context_name("title"), "CT_title");
        assert_eq!(structure.contexts[1].column_name(), "ct_condition");
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_weight() {
        let structure = Structure::builder("CT").context("title", 1.5, None).build();
        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_context() {
        let structure = Structure::builder("CT")
            .context("title", 1.0, None)
            .context("TITLE", 1.0, None)
            .build();
        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_resource_id() {
        let structure = Structure::builder("C T").context("title", 1.0, None).build();
        assert!(structure.validate().is_err());

        let structure = Structure::builder("").context("title", 1.0, None).build();
        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_structure() {
        let structure = Structure::builder("CT").build();
        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_conform_fills_missing_contexts() {
        let element = Element::new("NCT001").with("CT_title", "A trial");
        let conformed = sample().conform(element).unwrap();

        assert_eq!(conformed.field("CT_title"), Some("A trial"));
        assert_eq!(conformed.field("CT_condition"), Some(""));
        assert_eq!(conformed.field("CT_summary"), Some(""));
        assert_eq!(conformed.fields().len(), 3);
    }

    #[test]
    fn test_conform_rejects_unknown_context() {
        let element = Element::new("NCT001").with("CT_sponsor", "NIH");
        let err = sample().conform(element).unwrap_err();
        assert!(matches!(err, RiError::UnknownContext { ref context, .. } if context == "CT_sponsor"));
    }

    #[test]
    fn test_ontology_ids_dedup() {
        let structure = Structure::builder("AE")
            .context("description", 1.0, None)
            .context("species", 1.0, Some("1132"))
            .context("organism", 1.0, Some("1132"))
            .build();
        assert_eq!(structure.ontology_ids(), vec!["1132"]);
    }

    #[test]
    fn test_structure_serde_round_trip() {
        let structure = sample();
        let json = serde_json::to_string(&structure).unwrap();
        let back: Structure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, structure);
    }
}
