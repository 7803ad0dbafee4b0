//! PubMed citations, via E-utilities esearch + efetch
//!
//! Search results are PMIDs, which are also the local element IDs, so known
//! citations are dropped before any efetch request.

use async_trait::async_trait;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use std::collections::HashSet;
use tracing::info;

use super::eutils::{Eutils, EutilsConfig};
use crate::error::Result;
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;
use crate::framework::xml::{path_ends_with, walk_str, XmlVisitor};

pub const RESOURCE_ID: &str = "PM";
const DB: &str = "pubmed";
/// Entrez date, used to split searches deeper than esearch allows
const DATE_TYPE: &str = "edat";

pub fn resource() -> Resource {
    Resource {
        name: "PubMed".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("abstract", 0.8, None)
            .context("meshheading", 1.0, Some("1351"))
            .build(),
        main_context: "PM_title".to_string(),
        url: "https://pubmed.ncbi.nlm.nih.gov/".to_string(),
        element_url: "https://pubmed.ncbi.nlm.nih.gov/".to_string(),
        description: "Citations for biomedical literature from MEDLINE, life science \
                      journals and online books."
            .to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Citation {
    pub pmid: String,
    pub title: Vec<String>,
    pub abstract_parts: Vec<String>,
    pub mesh_headings: Vec<String>,
}

impl Citation {
    pub fn into_element(self) -> Element {
        Element::new(self.pmid)
            .with("PM_title", normalize(&self.title.join(" ")))
            .with("PM_abstract", normalize(&self.abstract_parts.join(" ")))
            .with("PM_meshheading", join_values(&self.mesh_headings))
    }
}

#[derive(Default)]
struct EfetchVisitor {
    current: Option<Citation>,
    citations: Vec<Citation>,
}

impl XmlVisitor for EfetchVisitor {
    fn start(&mut self, path: &[String], _element: &quick_xml::events::BytesStart<'_>) -> Result<()> {
        if path_ends_with(path, &["PubmedArticleSet", "PubmedArticle"]) {
            self.current = Some(Citation::default());
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) -> Result<()> {
        let Some(citation) = self.current.as_mut() else {
            return Ok(());
        };
        if path_ends_with(path, &["MedlineCitation", "PMID"]) {
            citation.pmid = text.trim().to_string();
        } else if path.iter().any(|p| p == "ArticleTitle") {
            // inline markup such as <i> splits the title into fragments
            citation.title.push(text.to_string());
        } else if path.iter().any(|p| p == "AbstractText") {
            citation.abstract_parts.push(text.to_string());
        } else if path_ends_with(path, &["MeshHeading", "DescriptorName"]) {
            citation.mesh_headings.push(text.to_string());
        }
        Ok(())
    }

    fn end(&mut self, path: &[String]) -> Result<()> {
        if path_ends_with(path, &["PubmedArticleSet", "PubmedArticle"]) {
            if let Some(citation) = self.current.take() {
                self.citations.push(citation);
            }
        }
        Ok(())
    }
}

/// Parse an efetch `PubmedArticleSet` document
pub fn parse_efetch(xml: &str) -> Result<Vec<Citation>> {
    let mut visitor = EfetchVisitor::default();
    walk_str(xml, &mut visitor)?;
    Ok(visitor.citations)
}

pub struct PubMedTool {
    resource: Resource,
    eutils: Eutils,
}

impl PubMedTool {
    pub fn new(config: EutilsConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            eutils: Eutils::new(config, http),
        })
    }
}

#[async_trait]
impl ResourceAccessTool for PubMedTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let config = self.eutils.config();
        // enough hits to find `max` new citations even if every known one matches
        let limit = ctx.max_elements().map(|max| max.saturating_add(ctx.known_count()));
        let pmids = self
            .eutils
            .search_ids(DB, &config.pubmed_query, DATE_TYPE, limit)
            .await?;

        let mut collector = ElementCollector::new(ctx);
        let mut new_pmids = Vec::new();
        for pmid in pmids {
            if collector.wants(&pmid) {
                new_pmids.push(pmid);
            } else {
                collector.skip_known();
            }
        }
        if let Some(max) = ctx.max_elements() {
            new_pmids.truncate(max);
        }
        info!(resource_id = RESOURCE_ID, new = new_pmids.len(), "PubMed search complete");

        for batch in new_pmids.chunks(config.fetch_batch_size) {
            let xml = self.eutils.efetch(DB, batch).await?;
            for citation in parse_efetch(&xml)? {
                if citation.pmid.is_empty() {
                    continue;
                }
                if !collector.push(citation.into_element()) {
                    break;
                }
            }
            if collector.is_full() {
                break;
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let limit = self.eutils.config().query_limit;
        let pmids = self.eutils.search_ids(DB, query, DATE_TYPE, Some(limit)).await?;
        Ok(pmids.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const EFETCH: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
<PubmedArticle>
  <MedlineCitation Status="MEDLINE" Owner="NLM">
    <PMID Version="1">38000001</PMID>
    <Article PubModel="Print">
      <ArticleTitle>Role of <i>IL-13</i> in asthma.</ArticleTitle>
      <Abstract>
        <AbstractText Label="BACKGROUND">Airway inflammation.</AbstractText>
        <AbstractText Label="METHODS">Cohort &amp; controls.</AbstractText>
      </Abstract>
    </Article>
    <MeshHeadingList>
      <MeshHeading><DescriptorName UI="D001249" MajorTopicYN="Y">Asthma</DescriptorName>
        <QualifierName UI="Q000235">genetics</QualifierName></MeshHeading>
      <MeshHeading><DescriptorName UI="D006801">Humans</DescriptorName></MeshHeading>
    </MeshHeadingList>
    <CommentsCorrectionsList>
      <CommentsCorrections RefType="Cites"><PMID Version="1">12345</PMID></CommentsCorrections>
    </CommentsCorrectionsList>
  </MedlineCitation>
</PubmedArticle>
<PubmedArticle>
  <MedlineCitation><PMID Version="1">38000002</PMID>
    <Article><ArticleTitle>No abstract here</ArticleTitle></Article>
  </MedlineCitation>
</PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch() {
        let citations = parse_efetch(EFETCH).unwrap();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].pmid, "38000001");
        assert_eq!(citations[0].mesh_headings, vec!["Asthma", "Humans"]);
        assert!(citations[1].abstract_parts.is_empty());
    }

    #[test]
    fn test_into_element() {
        let element = parse_efetch(EFETCH).unwrap().remove(0).into_element();
        assert_eq!(element.field("PM_title"), Some("Role of IL-13 in asthma."));
        assert_eq!(
            element.field("PM_abstract"),
            Some("Airway inflammation. Cohort & controls.")
        );
        assert_eq!(element.field("PM_meshheading"), Some("Asthma, Humans"));
    }

    #[test]
    fn test_resource_is_valid() {
        resource().validate().unwrap();
    }
}
