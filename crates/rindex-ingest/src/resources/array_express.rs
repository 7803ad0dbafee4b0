//! ArrayExpress experiments, via the BioStudies search and study APIs

use async_trait::async_trait;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::extend_capped;
use crate::config::{env_opt, env_or, env_string, require_http_url};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;

pub const RESOURCE_ID: &str = "AE";

#[derive(Debug, Clone)]
pub struct ArrayExpressConfig {
    pub base_url: String,
    pub query: Option<String>,
    pub page_size: usize,
    pub query_limit: usize,
}

impl Default for ArrayExpressConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ebi.ac.uk/biostudies/api/v1".to_string(),
            query: None,
            page_size: 100,
            query_limit: super::DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ArrayExpressConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            base_url: env_string("AE_BASE_URL", &d.base_url),
            query: env_opt("AE_QUERY"),
            page_size: env_or("AE_PAGE_SIZE", d.page_size)?,
            query_limit: env_or("AE_QUERY_LIMIT", d.query_limit)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("AE_BASE_URL", &self.base_url)?;
        if self.page_size == 0 || self.page_size > 100 {
            return Err(IngestError::config("AE_PAGE_SIZE must be between 1 and 100"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "ArrayExpress".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("name", 1.0, None)
            .context("description", 0.8, None)
            .context("species", 1.0, Some("1132"))
            .build(),
        main_context: "AE_name".to_string(),
        url: "https://www.ebi.ac.uk/biostudies/arrayexpress".to_string(),
        element_url: "https://www.ebi.ac.uk/biostudies/arrayexpress/studies/".to_string(),
        description: "Archive of functional genomics data from high-throughput experiments."
            .to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPage {
    pub total_hits: usize,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub accession: String,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Section {
    pub attributes: Vec<Attribute>,
    /// BioStudies nests subsections either singly or as tables (arrays)
    pub subsections: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StudyDetail {
    pub accno: String,
    pub attributes: Vec<Attribute>,
    pub section: Section,
}

fn attribute_values<'a>(attributes: &'a [Attribute], name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    attributes
        .iter()
        .filter(move |a| a.name.eq_ignore_ascii_case(name))
        .map(|a| a.value.as_str())
}

/// Collect `name` attribute values anywhere in a subsection tree
fn collect_nested(value: &serde_json::Value, name: &str, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_nested(item, name, out);
            }
        },
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::Array(attrs)) = map.get("attributes") {
                for attr in attrs {
                    let matches = attr
                        .get("name")
                        .and_then(|n| n.as_str())
                        .is_some_and(|n| n.eq_ignore_ascii_case(name));
                    if let (true, Some(v)) = (matches, attr.get("value").and_then(|v| v.as_str())) {
                        out.push(v.to_string());
                    }
                }
            }
            if let Some(children) = map.get("subsections") {
                collect_nested(children, name, out);
            }
        },
        _ => {},
    }
}

impl StudyDetail {
    pub fn to_element(&self) -> Element {
        let name = attribute_values(&self.section.attributes, "Title")
            .chain(attribute_values(&self.attributes, "Title"))
            .next()
            .unwrap_or_default();
        let description = join_values(attribute_values(&self.section.attributes, "Description"));

        let mut species: Vec<String> = attribute_values(&self.section.attributes, "Organism")
            .map(str::to_string)
            .collect();
        for sub in &self.section.subsections {
            collect_nested(sub, "Organism", &mut species);
        }

        Element::new(self.accno.trim())
            .with("AE_name", normalize(name))
            .with("AE_description", description)
            .with("AE_species", join_values(&species))
    }
}

pub fn parse_search_page(json: &str) -> Result<SearchPage> {
    serde_json::from_str(json).map_err(|e| IngestError::parse(RESOURCE_ID, e.to_string()))
}

pub fn parse_study(json: &str) -> Result<StudyDetail> {
    serde_json::from_str(json).map_err(|e| IngestError::parse(RESOURCE_ID, e.to_string()))
}

/// Errors that belong to one study rather than to the service
fn is_study_defect(err: &IngestError) -> bool {
    matches!(
        err,
        IngestError::Parse { .. } | IngestError::HttpStatus { status: 404 | 410, .. }
    )
}

pub struct ArrayExpressTool {
    resource: Resource,
    config: ArrayExpressConfig,
    http: HttpClient,
}

impl ArrayExpressTool {
    pub fn new(config: ArrayExpressConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            config,
            http,
        })
    }

    async fn search(&self, query: Option<&str>, page: usize) -> Result<SearchPage> {
        let url = format!("{}/arrayexpress/search", self.config.base_url);
        let mut params = vec![
            ("page", page.to_string()),
            ("pageSize", self.config.page_size.to_string()),
        ];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        let body = self.http.get_text(&url, &params).await?;
        parse_search_page(&body)
    }

    async fn study(&self, accession: &str) -> Result<StudyDetail> {
        let url = format!("{}/studies/{}", self.config.base_url, accession);
        let body = self.http.get_text(&url, &[]).await?;
        parse_study(&body)
    }
}

#[async_trait]
impl ResourceAccessTool for ArrayExpressTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let mut collector = ElementCollector::new(ctx);
        let mut page_number = 1;

        'pages: loop {
            let page = self.search(self.config.query.as_deref(), page_number).await?;
            if page.hits.is_empty() {
                break;
            }
            debug!(resource_id = RESOURCE_ID, page = page_number, hits = page.hits.len(), "Fetched search page");

            for hit in &page.hits {
                let accession = hit.accession.trim();
                if accession.is_empty() {
                    warn!(resource_id = RESOURCE_ID, title = %hit.title, "Hit without accession");
                    continue;
                }
                if !collector.wants(accession) {
                    collector.skip_known();
                    continue;
                }
                match self.study(accession).await {
                    Ok(study) => {
                        let mut element = study.to_element();
                        if element.local_element_id().is_empty() {
                            element = Element::new(accession)
                                .with("AE_name", normalize(&hit.title));
                        }
                        if !collector.push(element) {
                            break 'pages;
                        }
                    },
                    Err(e) if is_study_defect(&e) => {
                        warn!(resource_id = RESOURCE_ID, accession, error = %e, "Skipping study")
                    },
                    Err(e) => return Err(e),
                }
            }

            if page_number * self.config.page_size >= page.total_hits {
                break;
            }
            page_number += 1;
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let mut ids = HashSet::new();
        let mut page_number = 1;
        while ids.len() < self.config.query_limit {
            let page = self.search(Some(query), page_number).await?;
            if page.hits.is_empty() {
                break;
            }
            extend_capped(
                &mut ids,
                page.hits.into_iter().map(|h| h.accession),
                self.config.query_limit,
            );
            if page_number * self.config.page_size >= page.total_hits {
                break;
            }
            page_number += 1;
        }
        Ok(ids)
    }
}
