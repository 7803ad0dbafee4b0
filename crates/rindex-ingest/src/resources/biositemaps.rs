//! BioSiteMaps: biomedical resource descriptions published as RDF/XML
//!
//! Each configured URL points at one site map. Every typed node with a
//! subject becomes an element keyed by that subject.

use async_trait::async_trait;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use tracing::{info, warn};

use crate::config::{env_list, require_http_url};
use crate::error::Result;
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;
use crate::framework::rdf::{parse_rdf_xml, RdfNode};

pub const RESOURCE_ID: &str = "BSM";

const NAME_PROPERTIES: [&str; 3] = ["resource_name", "name", "title"];
const DESCRIPTION_PROPERTIES: [&str; 3] = ["resource_description", "description", "comment"];
const KEYWORD_PROPERTIES: [&str; 3] = ["keywords", "keyword", "subject"];

#[derive(Debug, Clone, Default)]
pub struct BioSiteMapsConfig {
    /// Site map documents to read, in order
    pub urls: Vec<String>,
}

impl BioSiteMapsConfig {
    /// `BSM_URLS`: comma-separated list
    pub fn from_env() -> Self {
        Self {
            urls: env_list("BSM_URLS", &[]),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for url in &self.urls {
            require_http_url("BSM_URLS", url)?;
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "BioSiteMaps".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("name", 1.0, None)
            .context("description", 0.8, None)
            .context("keywords", 0.9, None)
            .build(),
        main_context: "BSM_name".to_string(),
        url: "http://biositemaps.ncbcs.org/".to_string(),
        element_url: String::new(),
        description: "Biomedical software, data and services described in BioSiteMaps RDF."
            .to_string(),
        logo: String::new(),
    }
}

fn first_of(node: &RdfNode, properties: &[&str]) -> String {
    properties
        .iter()
        .find_map(|p| node.first(p))
        .map(normalize)
        .unwrap_or_default()
}

/// Turn a site map's nodes into elements; anonymous and untyped nodes are
/// skipped.
pub fn nodes_to_elements(nodes: &[RdfNode]) -> Vec<Element> {
    nodes
        .iter()
        .filter(|node| !node.subject.is_empty() && !node.types.is_empty())
        .map(|node| {
            let mut keywords = Vec::new();
            for property in KEYWORD_PROPERTIES {
                keywords.extend(node.values(property));
            }
            Element::new(node.subject.clone())
                .with("BSM_name", first_of(node, &NAME_PROPERTIES))
                .with("BSM_description", first_of(node, &DESCRIPTION_PROPERTIES))
                .with("BSM_keywords", join_values(keywords))
        })
        .collect()
}

pub struct BioSiteMapsTool {
    resource: Resource,
    config: BioSiteMapsConfig,
    http: HttpClient,
}

impl BioSiteMapsTool {
    pub fn new(config: BioSiteMapsConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            config,
            http,
        })
    }
}

#[async_trait]
impl ResourceAccessTool for BioSiteMapsTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        if self.config.urls.is_empty() {
            warn!(resource_id = RESOURCE_ID, "BSM_URLS is empty, nothing to read");
        }

        let mut collector = ElementCollector::new(ctx);
        for url in &self.config.urls {
            let bytes = match self.http.get_bytes(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(resource_id = RESOURCE_ID, url = %url, error = %e, "Skipping site map");
                    continue;
                },
            };
            let nodes = match parse_rdf_xml(&bytes) {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!(resource_id = RESOURCE_ID, url = %url, error = %e, "Unreadable site map");
                    continue;
                },
            };
            let elements = nodes_to_elements(&nodes);
            info!(resource_id = RESOURCE_ID, url = %url, nodes = nodes.len(), elements = elements.len(), "Read site map");

            for element in elements {
                if !collector.push(element) {
                    return Ok(collector.finish(RESOURCE_ID));
                }
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }
}
