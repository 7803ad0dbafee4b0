//! NCBI E-utilities client shared by the GEO and PubMed connectors

use chrono::{NaiveDate, Utc};
use quick_xml::events::BytesStart;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::{env_opt, env_or, env_string, require_http_url};
use crate::error::{IngestError, Result};
use crate::framework::http::HttpClient;
use crate::framework::window::{DateWindow, WindowStack};
use crate::framework::xml::{path_ends_with, walk_str, XmlVisitor};

/// esearch pages are capped at 10 000 IDs by NCBI
const MAX_RETMAX: usize = 10_000;

/// esearch refuses `retstart` beyond 9 998, so one query reaches 9 999 IDs
pub const MAX_SEARCH_DEPTH: usize = 9_999;

/// Lower bound of the date filter used to split deep searches
const EARLIEST_DATE: (i32, u32, u32) = (1700, 1, 1);

const DATE_FORMAT: &str = "%Y/%m/%d";

#[derive(Debug, Clone)]
pub struct EutilsConfig {
    pub base_url: String,
    /// Raises the NCBI rate limit from 3 to 10 requests per second
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub tool: String,
    /// IDs per esummary/efetch request
    pub fetch_batch_size: usize,
    pub geo_query: String,
    pub pubmed_query: String,
    pub query_limit: usize,
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            api_key: None,
            email: None,
            tool: "rindex".to_string(),
            fetch_batch_size: 200,
            geo_query: "gse[ETYP]".to_string(),
            pubmed_query: "hasabstract AND \"last 30 days\"[edat]".to_string(),
            query_limit: super::DEFAULT_QUERY_LIMIT,
        }
    }
}

impl EutilsConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            base_url: env_string("EUTILS_BASE_URL", &d.base_url),
            api_key: env_opt("NCBI_API_KEY"),
            email: env_opt("NCBI_EMAIL"),
            tool: env_string("NCBI_TOOL", &d.tool),
            fetch_batch_size: env_or("EUTILS_FETCH_BATCH_SIZE", d.fetch_batch_size)?,
            geo_query: env_string("GEO_QUERY", &d.geo_query),
            pubmed_query: env_string("PUBMED_QUERY", &d.pubmed_query),
            query_limit: env_or("EUTILS_QUERY_LIMIT", d.query_limit)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("EUTILS_BASE_URL", &self.base_url)?;
        if self.fetch_batch_size == 0 || self.fetch_batch_size > 500 {
            return Err(IngestError::config(
                "EUTILS_FETCH_BATCH_SIZE must be between 1 and 500",
            ));
        }
        Ok(())
    }
}

/// One page of esearch output
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EsearchResult {
    pub count: usize,
    pub ids: Vec<String>,
}

#[derive(Default)]
struct EsearchVisitor {
    result: EsearchResult,
    error: Option<String>,
}

impl XmlVisitor for EsearchVisitor {
    fn text(&mut self, path: &[String], text: &str) -> Result<()> {
        if path_ends_with(path, &["eSearchResult", "Count"]) {
            self.result.count = text.trim().parse().unwrap_or(0);
        } else if path_ends_with(path, &["IdList", "Id"]) {
            self.result.ids.push(text.trim().to_string());
        } else if path_ends_with(path, &["eSearchResult", "ERROR"]) {
            self.error = Some(text.to_string());
        }
        Ok(())
    }
}

pub fn parse_esearch(xml: &str) -> Result<EsearchResult> {
    let mut visitor = EsearchVisitor::default();
    walk_str(xml, &mut visitor)?;
    if let Some(error) = visitor.error {
        return Err(IngestError::parse("eutils", error));
    }
    Ok(visitor.result)
}

/// Thin E-utilities client
#[derive(Debug, Clone)]
pub struct Eutils {
    config: EutilsConfig,
    http: HttpClient,
}

impl Eutils {
    pub fn new(config: EutilsConfig, http: HttpClient) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &EutilsConfig {
        &self.config
    }

    fn params(&self, extra: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let mut params = extra;
        params.push(("tool", self.config.tool.clone()));
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// One esearch page, optionally restricted to a date window on `date_type`
    pub async fn esearch(
        &self,
        db: &str,
        term: &str,
        window: Option<(&str, DateWindow)>,
        retstart: usize,
        retmax: usize,
    ) -> Result<EsearchResult> {
        let url = format!("{}/esearch.fcgi", self.config.base_url);
        let mut extra = vec![
            ("db", db.to_string()),
            ("term", term.to_string()),
            ("retstart", retstart.to_string()),
            ("retmax", retmax.to_string()),
        ];
        if let Some((date_type, window)) = window {
            extra.push(("datetype", date_type.to_string()));
            extra.push(("mindate", window.from.format(DATE_FORMAT).to_string()));
            extra.push(("maxdate", window.to.format(DATE_FORMAT).to_string()));
        }
        let xml = self.http.get_text(&url, &self.params(extra)).await?;
        parse_esearch(&xml)
    }

    /// IDs matching `term`, newest first, stopping after `limit` when given.
    ///
    /// Searches deeper than [`MAX_SEARCH_DEPTH`] are split into `date_type`
    /// windows (`edat`, `pdat`, ...) small enough to page through.
    pub async fn search_ids(
        &self,
        db: &str,
        term: &str,
        date_type: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let total = self.esearch(db, term, None, 0, 0).await?.count;
        let wanted = limit.map_or(total, |l| l.min(total));
        if wanted <= MAX_SEARCH_DEPTH {
            return self.page_ids(db, term, None, wanted).await;
        }

        let earliest = NaiveDate::from_ymd_opt(EARLIEST_DATE.0, EARLIEST_DATE.1, EARLIEST_DATE.2)
            .ok_or_else(|| IngestError::config("invalid esearch start date"))?;
        let mut windows = WindowStack::new(DateWindow::new(earliest, Utc::now().date_naive()));
        let mut ids = Vec::new();
        let mut seen = HashSet::new();

        while let Some(window) = windows.pop() {
            if ids.len() >= wanted {
                break;
            }
            let filter = Some((date_type, window));
            let count = self.esearch(db, term, filter, 0, 0).await?.count;
            if count == 0 {
                continue;
            }
            if count > MAX_SEARCH_DEPTH {
                if windows.split(window) {
                    continue;
                }
                warn!(
                    db,
                    date = %window.from,
                    count,
                    "More hits on one day than esearch can return, keeping the first"
                );
            }
            let want = count.min(MAX_SEARCH_DEPTH).min(wanted - ids.len());
            debug!(db, from = %window.from, to = %window.to, count, "Paging date window");
            for id in self.page_ids(db, term, filter, want).await? {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }

        if ids.len() < wanted {
            warn!(db, found = ids.len(), total, "Date windows missed some hits");
        }
        ids.truncate(wanted);
        Ok(ids)
    }

    /// Up to `wanted` IDs of one query, never past the esearch depth
    async fn page_ids(
        &self,
        db: &str,
        term: &str,
        window: Option<(&str, DateWindow)>,
        wanted: usize,
    ) -> Result<Vec<String>> {
        let wanted = wanted.min(MAX_SEARCH_DEPTH);
        let mut ids = Vec::new();
        while ids.len() < wanted {
            let want = (wanted - ids.len()).min(MAX_RETMAX);
            let page = self.esearch(db, term, window, ids.len(), want).await?;
            if page.ids.is_empty() {
                break;
            }
            ids.extend(page.ids);
            if ids.len() >= page.count {
                break;
            }
        }
        ids.truncate(wanted);
        Ok(ids)
    }

    pub async fn esummary(&self, db: &str, ids: &[String]) -> Result<String> {
        let url = format!("{}/esummary.fcgi", self.config.base_url);
        let params = self.params(vec![("db", db.to_string()), ("id", ids.join(","))]);
        self.http.get_text(&url, &params).await
    }

    pub async fn efetch(&self, db: &str, ids: &[String]) -> Result<String> {
        let url = format!("{}/efetch.fcgi", self.config.base_url);
        let params = self.params(vec![
            ("db", db.to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
        ]);
        self.http.get_text(&url, &params).await
    }
}

/// `Name` attribute of an esummary `<Item>`
pub(crate) fn item_name(element: &BytesStart<'_>) -> Result<Option<String>> {
    crate::framework::xml::attribute(element, "Name")
}
