use serde::{Deserialize, Serialize};

use super::Structure;
use crate::error::{Result, RiError};

/// Descriptive metadata for one external data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub resource_id: String,
    pub structure: Structure,
    /// Context used as the element's display label
    pub main_context: String,
    /// Home page of the resource
    pub url: String,
    /// Prefix that turns a local element ID into a browsable URL
    pub element_url: String,
    pub description: String,
    pub logo: String,
}

impl Resource {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RiError::invalid_resource(&self.resource_id, "name is empty"));
        }
        if self.structure.resource_id != self.resource_id {
            return Err(RiError::invalid_resource(
                &self.resource_id,
                format!(
                    "structure belongs to resource '{}'",
                    self.structure.resource_id
                ),
            ));
        }
        self.structure.validate()?;
        if self.structure.context(&self.main_context).is_none() {
            return Err(RiError::invalid_resource(
                &self.resource_id,
                format!("main context '{}' is not declared", self.main_context),
            ));
        }
        Ok(())
    }

    pub fn element_url_for(&self, local_element_id: &str) -> String {
        format!("{}{}", self.element_url, local_element_id)
    }

    /// Per-resource ET table name
    pub fn element_table_name(&self) -> String {
        format!("obr_{}_et", self.resource_id.to_lowercase())
    }
}
