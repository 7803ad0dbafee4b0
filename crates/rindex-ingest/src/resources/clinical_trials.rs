//! ClinicalTrials.gov studies, via the v2 JSON API with page tokens

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

pub const RESOURCE_ID: &str = "CT";

#[derive(Debug, Clone)]
pub struct ClinicalTrialsConfig {
    pub base_url: String,
    /// `query.term` expression; `None` walks the whole registry
    pub query: Option<String>,
    pub page_size: usize,
    pub query_limit: usize,
}

impl Default for ClinicalTrialsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clinicaltrials.gov/api/v2".to_string(),
            query: None,
            page_size: 100,
            query_limit: super::DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ClinicalTrialsConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            base_url: env_string("CT_BASE_URL", &d.base_url),
            query: env_opt("CT_QUERY"),
            page_size: env_or("CT_PAGE_SIZE", d.page_size)?,
            query_limit: env_or("CT_QUERY_LIMIT", d.query_limit)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("CT_BASE_URL", &self.base_url)?;
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(IngestError::config("CT_PAGE_SIZE must be between 1 and 1000"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "ClinicalTrials.gov".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("summary", 0.8, None)
            .context("detailed_description", 0.6, None)
            .context("condition", 1.0, Some("1009"))
            .context("intervention", 0.9, None)
            .context("keywords", 0.8, None)
            .build(),
        main_context: "CT_title".to_string(),
        url: "https://clinicaltrials.gov/".to_string(),
        element_url: "https://clinicaltrials.gov/study/".to_string(),
        description: "Registry of clinical studies conducted around the world.".to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesPage {
    #[serde(default)]
    pub studies: Vec<Study>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    #[serde(default)]
    pub protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolSection {
    pub identification_module: IdentificationModule,
    pub description_module: DescriptionModule,
    pub conditions_module: ConditionsModule,
    pub arms_interventions_module: ArmsInterventionsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentificationModule {
    pub nct_id: String,
    pub brief_title: String,
    pub official_title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptionModule {
    pub brief_summary: String,
    pub detailed_description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionsModule {
    pub conditions: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArmsInterventionsModule {
    pub interventions: Vec<Intervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Intervention {
    pub name: String,
}

impl Study {
    pub fn nct_id(&self) -> &str {
        self.protocol_section.identification_module.nct_id.trim()
    }

    pub fn to_element(&self) -> Element {
        let p = &self.protocol_section;
        let id = &p.identification_module;
        let title = if id.brief_title.trim().is_empty() {
            &id.official_title
        } else {
            &id.brief_title
        };

        Element::new(self.nct_id())
            .with("CT_title", normalize(title))
            .with("CT_summary", normalize(&p.description_module.brief_summary))
            .with(
                "CT_detailed_description",
                normalize(&p.description_module.detailed_description),
            )
            .with("CT_condition", join_values(&p.conditions_module.conditions))
            .with(
                "CT_intervention",
                join_values(p.arms_interventions_module.interventions.iter().map(|i| &i.name)),
            )
            .with("CT_keywords", join_values(&p.conditions_module.keywords))
    }
}

pub fn parse_studies_page(json: &str) -> Result<StudiesPage> {
    serde_json::from_str(json).map_err(|e| IngestError::parse(RESOURCE_ID, e.to_string()))
}

pub struct ClinicalTrialsTool {
    resource: Resource,
    config: ClinicalTrialsConfig,
    http: HttpClient,
}

impl ClinicalTrialsTool {
    pub fn new(config: ClinicalTrialsConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            config,
            http,
        })
    }

    async fn page(&self, query: Option<&str>, token: Option<&str>, size: usize) -> Result<StudiesPage> {
        let url = format!("{}/studies", self.config.base_url);
        let mut params = vec![
            ("format", "json".to_string()),
            ("pageSize", size.to_string()),
        ];
        if let Some(query) = query {
            params.push(("query.term", query.to_string()));
        }
        if let Some(token) = token {
            params.push(("pageToken", token.to_string()));
        }
        let body = self.http.get_text(&url, &params).await?;
        parse_studies_page(&body)
    }
}

#[async_trait]
impl ResourceAccessTool for ClinicalTrialsTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let mut collector = ElementCollector::new(ctx);
        let mut token: Option<String> = None;

        loop {
            let page = self
                .page(self.config.query.as_deref(), token.as_deref(), self.config.page_size)
                .await?;
            if page.studies.is_empty() {
                break;
            }
            debug!(resource_id = RESOURCE_ID, studies = page.studies.len(), "Fetched page");

            for study in &page.studies {
                if study.nct_id().is_empty() {
                    warn!(resource_id = RESOURCE_ID, "Study without NCT ID");
                    continue;
                }
                if !collector.wants(study.nct_id()) {
                    collector.skip_known();
                    continue;
                }
                collector.push(study.to_element());
            }

            match page.next_page_token {
                Some(next) if !collector.is_full() => token = Some(next),
                _ => break,
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let mut ids = HashSet::new();
        let mut token: Option<String> = None;

        while ids.len() < self.config.query_limit {
            let page = self
                .page(Some(query), token.as_deref(), self.config.page_size)
                .await?;
            if page.studies.is_empty() {
                break;
            }
            extend_capped(
                &mut ids,
                page.studies.iter().map(|s| s.nct_id().to_string()),
                self.config.query_limit,
            );
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }
}
