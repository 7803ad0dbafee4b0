//! Gene Expression Omnibus series, via E-utilities esearch + esummary

use async_trait::async_trait;
use quick_xml::events::BytesStart;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use std::collections::HashSet;
use tracing::{info, warn};

use super::eutils::{item_name, Eutils, EutilsConfig};
use crate::error::Result;
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;
use crate::framework::xml::{walk_str, XmlVisitor};

pub const RESOURCE_ID: &str = "GEO";
const DB: &str = "gds";
/// Publication date, used to split searches deeper than esearch allows
const DATE_TYPE: &str = "pdat";

/// GDS uids of series are this offset plus the GSE number; samples start at
/// the next hundred million
const SERIES_UID_BASE: u64 = 200_000_000;
const SERIES_UID_SPAN: u64 = 100_000_000;

/// `GSE` accession encoded in a series uid; `None` for datasets, platforms
/// and samples, whose uids use other ranges
pub fn series_accession(uid: &str) -> Option<String> {
    let uid: u64 = uid.trim().parse().ok()?;
    match uid.checked_sub(SERIES_UID_BASE)? {
        0 => None,
        n if n < SERIES_UID_SPAN => Some(format!("GSE{}", n)),
        _ => None,
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "Gene Expression Omnibus".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("summary", 0.8, None)
            .context("organism", 1.0, Some("1132"))
            .build(),
        main_context: "GEO_title".to_string(),
        url: "https://www.ncbi.nlm.nih.gov/geo/".to_string(),
        element_url: "https://www.ncbi.nlm.nih.gov/geo/query/acc.cgi?acc=".to_string(),
        description: "Public functional genomics data repository of array and \
                      sequence-based experiments."
            .to_string(),
        logo: "https://www.ncbi.nlm.nih.gov/geo/img/geo_main.gif".to_string(),
    }
}

/// One `<DocSum>` of an esummary response
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeoSummary {
    pub uid: String,
    pub accession: String,
    pub title: String,
    pub summary: String,
    pub taxon: String,
}

impl GeoSummary {
    pub fn into_element(self) -> Element {
        Element::new(self.accession)
            .with("GEO_title", normalize(&self.title))
            .with("GEO_summary", normalize(&self.summary))
            .with("GEO_organism", join_values(self.taxon.split(';')))
    }
}

#[derive(Default)]
struct SummaryVisitor {
    current: Option<GeoSummary>,
    item: Option<String>,
    summaries: Vec<GeoSummary>,
}

impl XmlVisitor for SummaryVisitor {
    fn start(&mut self, path: &[String], element: &BytesStart<'_>) -> Result<()> {
        match path.last().map(String::as_str) {
            Some("DocSum") => self.current = Some(GeoSummary::default()),
            Some("Item") if path.len() == 3 => self.item = item_name(element)?,
            _ => {},
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) -> Result<()> {
        let Some(summary) = self.current.as_mut() else {
            return Ok(());
        };
        match (path.len(), path.last().map(String::as_str), self.item.as_deref()) {
            (3, Some("Id"), _) => summary.uid = text.trim().to_string(),
            (3, Some("Item"), Some("Accession")) => summary.accession = text.trim().to_string(),
            (3, Some("Item"), Some("title")) => summary.title = text.to_string(),
            (3, Some("Item"), Some("summary")) => summary.summary = text.to_string(),
            (3, Some("Item"), Some("taxon")) => summary.taxon = text.to_string(),
            _ => {},
        }
        Ok(())
    }

    fn end(&mut self, path: &[String]) -> Result<()> {
        match path.last().map(String::as_str) {
            Some("DocSum") => {
                if let Some(summary) = self.current.take() {
                    self.summaries.push(summary);
                }
            },
            Some("Item") if path.len() == 3 => self.item = None,
            _ => {},
        }
        Ok(())
    }
}

/// Parse a `db=gds` esummary document (version 1.0 XML)
pub fn parse_esummary(xml: &str) -> Result<Vec<GeoSummary>> {
    let mut visitor = SummaryVisitor::default();
    walk_str(xml, &mut visitor)?;
    Ok(visitor.summaries)
}

pub struct GeoTool {
    resource: Resource,
    eutils: Eutils,
}

impl GeoTool {
    pub fn new(config: EutilsConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            eutils: Eutils::new(config, http),
        })
    }

    async fn summaries(&self, uids: &[String]) -> Result<Vec<GeoSummary>> {
        let xml = self.eutils.esummary(DB, uids).await?;
        parse_esummary(&xml)
    }
}

#[async_trait]
impl ResourceAccessTool for GeoTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let config = self.eutils.config();
        let limit = ctx.max_elements().map(|max| max.saturating_add(ctx.known_count()));
        let uids = self
            .eutils
            .search_ids(DB, &config.geo_query, DATE_TYPE, limit)
            .await?;

        let mut collector = ElementCollector::new(ctx);
        let mut pending = Vec::new();
        for uid in uids {
            match series_accession(&uid) {
                Some(accession) if !collector.wants(&accession) => collector.skip_known(),
                _ => pending.push(uid),
            }
        }
        info!(resource_id = RESOURCE_ID, pending = pending.len(), "GEO search complete");

        for batch in pending.chunks(config.fetch_batch_size) {
            if collector.is_full() {
                break;
            }
            for summary in self.summaries(batch).await? {
                if summary.accession.is_empty() {
                    warn!(resource_id = RESOURCE_ID, uid = %summary.uid, "DocSum without accession");
                    continue;
                }
                if !collector.push(summary.into_element()) {
                    break;
                }
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let config = self.eutils.config();
        let uids = self
            .eutils
            .search_ids(DB, query, DATE_TYPE, Some(config.query_limit))
            .await?;

        let mut accessions = HashSet::new();
        for batch in uids.chunks(config.fetch_batch_size) {
            accessions.extend(
                self.summaries(batch)
                    .await?
                    .into_iter()
                    .map(|s| s.accession)
                    .filter(|a| !a.is_empty()),
            );
        }
        Ok(accessions)
    }
}
