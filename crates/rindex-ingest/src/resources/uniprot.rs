//! UniProtKB entries, via the REST search endpoint in TSV format
//!
//! Pages are chained through the `Link: <...>; rel="next"` response header.

use async_trait::async_trait;
use regex::Regex;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use super::extend_capped;
use crate::config::{env_or, env_string, require_http_url};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;

pub const RESOURCE_ID: &str = "UPKB";
const FIELDS: &str = "accession,protein_name,gene_names,organism_name,cc_function,keyword";

static EVIDENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{ECO:[^}]*\}").expect("static regex")
});

#[derive(Debug, Clone)]
pub struct UniProtConfig {
    pub base_url: String,
    pub query: String,
    pub page_size: usize,
    pub query_limit: usize,
}

impl Default for UniProtConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rest.uniprot.org".to_string(),
            query: "reviewed:true".to_string(),
            page_size: 500,
            query_limit: super::DEFAULT_QUERY_LIMIT,
        }
    }
}

impl UniProtConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            base_url: env_string("UNIPROT_BASE_URL", &d.base_url),
            query: env_string("UNIPROT_QUERY", &d.query),
            page_size: env_or("UNIPROT_PAGE_SIZE", d.page_size)?,
            query_limit: env_or("UNIPROT_QUERY_LIMIT", d.query_limit)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("UNIPROT_BASE_URL", &self.base_url)?;
        if self.page_size == 0 || self.page_size > 500 {
            return Err(IngestError::config("UNIPROT_PAGE_SIZE must be between 1 and 500"));
        }
        if self.query.trim().is_empty() {
            return Err(IngestError::config("UNIPROT_QUERY must not be empty"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "UniProtKB".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("protein_name", 1.0, None)
            .context("gene_names", 0.9, None)
            .context("organism", 1.0, Some("1132"))
            .context("function", 0.8, None)
            .context("keywords", 0.7, None)
            .build(),
        main_context: "UPKB_protein_name".to_string(),
        url: "https://www.uniprot.org/".to_string(),
        element_url: "https://www.uniprot.org/uniprotkb/".to_string(),
        description: "Protein sequence and functional information.".to_string(),
        logo: String::new(),
    }
}

/// Drop the `FUNCTION:` label and evidence tags from a comment field
fn clean_function(raw: &str) -> String {
    let without_evidence = EVIDENCE_RE.replace_all(raw, "");
    normalize(&without_evidence.replace("FUNCTION:", " "))
}

/// Parse one TSV page; columns are located by header name
pub fn parse_tsv(body: &str) -> Result<Vec<Element>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let entry = column("Entry")
        .ok_or_else(|| IngestError::parse(RESOURCE_ID, "TSV has no Entry column"))?;
    let protein = column("Protein names");
    let genes = column("Gene Names");
    let organism = column("Organism");
    let function = column("Function [CC]");
    let keywords = column("Keywords");

    let mut elements = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or_default();
        let accession = get(Some(entry)).trim();
        if accession.is_empty() {
            continue;
        }
        elements.push(
            Element::new(accession)
                .with("UPKB_protein_name", normalize(get(protein)))
                .with("UPKB_gene_names", normalize(get(genes)))
                .with("UPKB_organism", normalize(get(organism)))
                .with("UPKB_function", clean_function(get(function)))
                .with("UPKB_keywords", join_values(get(keywords).split(';'))),
        );
    }
    Ok(elements)
}

pub struct UniProtTool {
    resource: Resource,
    config: UniProtConfig,
    http: HttpClient,
}

impl UniProtTool {
    pub fn new(config: UniProtConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            config,
            http,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/uniprotkb/search", self.config.base_url)
    }

    fn first_page_params(&self, query: &str, fields: &str) -> Vec<(&'static str, String)> {
        vec![
            ("query", query.to_string()),
            ("format", "tsv".to_string()),
            ("fields", fields.to_string()),
            ("size", self.config.page_size.to_string()),
        ]
    }
}

#[async_trait]
impl ResourceAccessTool for UniProtTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let mut collector = ElementCollector::new(ctx);
        let first = self.first_page_params(&self.config.query, FIELDS);
        let (mut body, mut next) = self
            .http
            .get_text_with_next_link(&self.search_url(), &first)
            .await?;

        loop {
            let elements = parse_tsv(&body)?;
            if elements.is_empty() {
                break;
            }
            debug!(resource_id = RESOURCE_ID, entries = elements.len(), "Fetched page");
            for element in elements {
                if !collector.push(element) {
                    break;
                }
            }
            // the next link already carries every query parameter
            match next.take() {
                Some(url) if !collector.is_full() => {
                    (body, next) = self.http.get_text_with_next_link(&url, &[]).await?;
                },
                _ => break,
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let mut ids = HashSet::new();
        let params = self.first_page_params(query, "accession");
        let (mut body, mut next) = self
            .http
            .get_text_with_next_link(&self.search_url(), &params)
            .await?;

        loop {
            let page = parse_tsv(&body)?;
            if page.is_empty() {
                break;
            }
            extend_capped(
                &mut ids,
                page.into_iter().map(|e| e.local_element_id().to_string()),
                self.config.query_limit,
            );
            match next.take() {
                Some(url) if ids.len() < self.config.query_limit => {
                    (body, next) = self.http.get_text_with_next_link(&url, &[]).await?;
                },
                _ => break,
            }
        }
        Ok(ids)
    }
}
