//! NIH RePORTER funded projects, via the v2 project search API

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{env_or, env_string, require_http_url};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;
use crate::framework::window::{DateWindow, WindowStack};

pub const RESOURCE_ID: &str = "RPTR";

/// RePORTER rejects offsets beyond this
const MAX_OFFSET: usize = 14_999;

/// Results one query can page through
pub const MAX_RESULTS: usize = MAX_OFFSET + 1;

/// Award notices for a fiscal year go out up to this many years earlier
const AWARD_LEAD_YEARS: i32 = 2;

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub base_url: String,
    pub fiscal_years: Vec<i32>,
    pub page_size: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.reporter.nih.gov".to_string(),
            fiscal_years: vec![chrono::Utc::now().year()],
            page_size: 500,
        }
    }
}

impl ReporterConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let fiscal_years = match crate::config::env_opt("RPTR_FISCAL_YEARS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse().map_err(|_| {
                        IngestError::config(format!("RPTR_FISCAL_YEARS has an invalid year: {}", s))
                    })
                })
                .collect::<Result<Vec<i32>>>()?,
            None => d.fiscal_years,
        };
        Ok(Self {
            base_url: env_string("RPTR_BASE_URL", &d.base_url),
            fiscal_years,
            page_size: env_or("RPTR_PAGE_SIZE", d.page_size)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("RPTR_BASE_URL", &self.base_url)?;
        if self.page_size == 0 || self.page_size > 500 {
            return Err(IngestError::config("RPTR_PAGE_SIZE must be between 1 and 500"));
        }
        if self.fiscal_years.is_empty() {
            return Err(IngestError::config("RPTR_FISCAL_YEARS must list at least one year"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "NIH RePORTER".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("abstract", 0.8, None)
            .context("public_health_relevance", 0.7, None)
            .context("terms", 0.6, None)
            .build(),
        main_context: "RPTR_title".to_string(),
        url: "https://reporter.nih.gov/".to_string(),
        element_url: "https://reporter.nih.gov/project-details/".to_string(),
        description: "Research projects funded by the National Institutes of Health.".to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    criteria: Criteria<'a>,
    include_fields: &'a [&'a str],
    offset: usize,
    limit: usize,
    sort_field: &'a str,
    sort_order: &'a str,
}

#[derive(Debug, Serialize)]
struct Criteria<'a> {
    fiscal_years: &'a [i32],
    #[serde(skip_serializing_if = "Option::is_none")]
    award_notice_date: Option<DateRange>,
}

#[derive(Debug, Serialize)]
struct DateRange {
    from_date: String,
    to_date: String,
}

impl From<DateWindow> for DateRange {
    fn from(window: DateWindow) -> Self {
        Self {
            from_date: window.from.format("%Y-%m-%d").to_string(),
            to_date: window.to.format("%Y-%m-%d").to_string(),
        }
    }
}

const INCLUDE_FIELDS: &[&str] = &[
    "ApplId",
    "ProjectNum",
    "ProjectTitle",
    "AbstractText",
    "PhrText",
    "PrefTerms",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub meta: Meta,
    pub results: Vec<Project>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Project {
    pub appl_id: Option<u64>,
    pub project_num: Option<String>,
    pub project_title: Option<String>,
    pub abstract_text: Option<String>,
    pub phr_text: Option<String>,
    pub pref_terms: Option<String>,
}

impl Project {
    pub fn to_element(&self) -> Option<Element> {
        let appl_id = self.appl_id?;
        let text = |v: &Option<String>| normalize(v.as_deref().unwrap_or_default());
        Some(
            Element::new(appl_id.to_string())
                .with("RPTR_title", text(&self.project_title))
                .with("RPTR_abstract", text(&self.abstract_text))
                .with("RPTR_public_health_relevance", text(&self.phr_text))
                .with(
                    "RPTR_terms",
                    join_values(self.pref_terms.as_deref().unwrap_or_default().split(';')),
                ),
        )
    }
}

pub struct ReporterTool {
    resource: Resource,
    config: ReporterConfig,
    http: HttpClient,
}

impl ReporterTool {
    pub fn new(config: ReporterConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            config,
            http,
        })
    }

    /// Award notice dates that can belong to the configured fiscal years
    fn award_window(&self) -> Result<DateWindow> {
        let first = self.config.fiscal_years.iter().min().copied().unwrap_or_default();
        let last = self.config.fiscal_years.iter().max().copied().unwrap_or_default();
        let from = NaiveDate::from_ymd_opt(first - AWARD_LEAD_YEARS, 1, 1);
        let to = NaiveDate::from_ymd_opt(last, 12, 31);
        match (from, to) {
            (Some(from), Some(to)) => Ok(DateWindow::new(from, to)),
            _ => Err(IngestError::config("RPTR_FISCAL_YEARS is out of range")),
        }
    }

    async fn search(&self, window: Option<DateWindow>, offset: usize) -> Result<SearchResponse> {
        let url = format!("{}/v2/projects/search", self.config.base_url);
        let request = SearchRequest {
            criteria: Criteria {
                fiscal_years: &self.config.fiscal_years,
                award_notice_date: window.map(DateRange::from),
            },
            include_fields: INCLUDE_FIELDS,
            offset,
            limit: self.config.page_size,
            sort_field: "appl_id",
            sort_order: "asc",
        };
        self.http.post_json(&url, &request).await
    }

    /// Page one query from its first page until the results or the offset
    /// cap run out
    async fn collect_pages(
        &self,
        window: Option<DateWindow>,
        first: SearchResponse,
        collector: &mut ElementCollector<'_>,
    ) -> Result<()> {
        let total = first.meta.total;
        let mut page = first;
        let mut offset = 0;
        loop {
            if page.results.is_empty() {
                break;
            }
            debug!(resource_id = RESOURCE_ID, offset, total, "Fetched page");
            offset += page.results.len();
            push_projects(&page.results, collector);
            if collector.is_full() || offset >= total || offset > MAX_OFFSET {
                break;
            }
            page = self.search(window, offset).await?;
        }
        Ok(())
    }
}

fn push_projects(projects: &[Project], collector: &mut ElementCollector<'_>) {
    for project in projects {
        match project.to_element() {
            Some(element) => {
                if !collector.push(element) {
                    return;
                }
            },
            None => warn!(
                resource_id = RESOURCE_ID,
                project_num = project.project_num.as_deref().unwrap_or("-"),
                "Skipping project without appl_id"
            ),
        }
    }
}

#[async_trait]
impl ResourceAccessTool for ReporterTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let mut collector = ElementCollector::new(ctx);

        let first = self.search(None, 0).await?;
        let total = first.meta.total;
        if total <= MAX_RESULTS {
            self.collect_pages(None, first, &mut collector).await?;
            return Ok(collector.finish(RESOURCE_ID));
        }

        // too deep for offset paging: slice by award notice date
        info!(resource_id = RESOURCE_ID, total, "Splitting search by award notice date");
        let mut windows = WindowStack::new(self.award_window()?);
        let mut reached = 0;
        while let Some(window) = windows.pop() {
            if collector.is_full() {
                break;
            }
            let first = self.search(Some(window), 0).await?;
            let count = first.meta.total;
            if count == 0 {
                continue;
            }
            if count > MAX_RESULTS {
                if windows.split(window) {
                    continue;
                }
                warn!(
                    resource_id = RESOURCE_ID,
                    date = %window.from,
                    count,
                    "More awards on one day than one search can return"
                );
            }
            reached += count.min(MAX_RESULTS);
            self.collect_pages(Some(window), first, &mut collector).await?;
        }

        if !collector.is_full() && reached < total {
            warn!(
                resource_id = RESOURCE_ID,
                total,
                reached,
                "Some projects fall outside every award notice window"
            );
        }
        Ok(collector.finish(RESOURCE_ID))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
      "meta": {"search_id": "abc", "total": 2, "offset": 0, "limit": 500},
      "results": [
        {"appl_id": 10654321, "project_title": "GENETICS OF ASTHMA",
         "abstract_text": "Project   summary.", "phr_text": null,
         "pref_terms": "Asthma;Genes;asthma;"},
        {"project_title": "No application id"}
      ]
    }"#;

    fn parse_response(json: &str) -> SearchResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_response() {
        let response = parse_response(RESPONSE);
        assert_eq!(response.meta.total, 2);
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn test_project_to_element() {
        let response = parse_response(RESPONSE);
        let element = response.results[0].to_element().unwrap();
        assert_eq!(element.local_element_id(), "10654321");
        assert_eq!(element.field("RPTR_abstract"), Some("Project summary."));
        assert_eq!(element.field("RPTR_public_health_relevance"), Some(""));
        assert_eq!(element.field("RPTR_terms"), Some("Asthma, Genes"));
        assert!(response.results[1].to_element().is_none());
    }

    #[test]
    fn test_push_projects_skips_missing_appl_id() {
        let response = parse_response(RESPONSE);
        let known = std::collections::HashSet::new();
        let ctx = FetchContext::new(&known, None);
        let mut collector = ElementCollector::new(&ctx);
        push_projects(&response.results, &mut collector);
        let elements = collector.finish(RESOURCE_ID);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].local_element_id(), "10654321");
    }

    #[test]
    fn test_request_shape() {
        let years = [2024];
        let request = SearchRequest {
            criteria: Criteria {
                fiscal_years: &years,
                award_notice_date: None,
            },
            include_fields: INCLUDE_FIELDS,
            offset: 500,
            limit: 500,
            sort_field: "appl_id",
            sort_order: "asc",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["criteria"]["fiscal_years"][0], 2024);
        assert!(json["criteria"].get("award_notice_date").is_none());
        assert_eq!(json["offset"], 500);
    }

    #[test]
    fn test_award_window_request() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        );
        let years = [2024];
        let request = SearchRequest {
            criteria: Criteria {
                fiscal_years: &years,
                award_notice_date: Some(window.into()),
            },
            include_fields: INCLUDE_FIELDS,
            offset: 0,
            limit: 500,
            sort_field: "appl_id",
            sort_order: "asc",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["criteria"]["award_notice_date"]["from_date"], "2023-10-01");
        assert_eq!(json["criteria"]["award_notice_date"]["to_date"], "2024-09-30");
    }

    #[test]
    fn test_award_window_spans_fiscal_years() {
        let tool = ReporterTool::new(
            ReporterConfig {
                fiscal_years: vec![2024, 2022],
                ..ReporterConfig::default()
            },
            HttpClient::new(&crate::config::HttpConfig::default()).unwrap(),
        )
        .unwrap();
        let window = tool.award_window().unwrap();
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(window.to, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }
}
