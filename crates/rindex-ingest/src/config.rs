//! Ingestion configuration
//!
//! Values come from environment variables (after `.env` is loaded by the
//! binary). Every section has a `Default`, a `from_env` and a `validate`.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};
use crate::resources::{
    array_express::ArrayExpressConfig, biositemaps::BioSiteMapsConfig,
    clinical_trials::ClinicalTrialsConfig, drugbank::DrugBankConfig, eutils::EutilsConfig,
    omim::OmimConfig, reactome::ReactomeConfig, reporter::ReporterConfig,
    uniprot::UniProtConfig, youtube::YouTubeConfig,
};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Read `key` and parse it, falling back to `default` when unset.
///
/// A set but unparseable value is a configuration error rather than being
/// silently replaced.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| IngestError::config(format!("{} has an invalid value: {}", key, raw))),
        _ => Ok(default),
    }
}

pub(crate) fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Comma-separated list; unset means `default`
pub(crate) fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env_opt(key) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

pub(crate) fn require_http_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(IngestError::config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )))
    }
}

/// Shared HTTP client settings (`INGEST_HTTP_*`)
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Pause before every request, to stay under public API rate limits
    pub request_delay_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            request_delay_ms: 0,
            user_agent: format!("rindex/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            timeout_secs: env_or("INGEST_HTTP_TIMEOUT_SECS", d.timeout_secs)?,
            max_retries: env_or("INGEST_HTTP_MAX_RETRIES", d.max_retries)?,
            retry_base_delay_ms: env_or("INGEST_HTTP_RETRY_DELAY_MS", d.retry_base_delay_ms)?,
            request_delay_ms: env_or("INGEST_HTTP_REQUEST_DELAY_MS", d.request_delay_ms)?,
            user_agent: env_string("INGEST_HTTP_USER_AGENT", &d.user_agent),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(IngestError::config("INGEST_HTTP_TIMEOUT_SECS must be > 0"));
        }
        if self.max_retries > 10 {
            return Err(IngestError::config("INGEST_HTTP_MAX_RETRIES must be <= 10"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based): base * 2^(attempt-1)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(factor))
    }
}

/// Top-level ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Rows per multi-row insert
    pub batch_size: usize,
    /// Per-run cap on elements fetched from one resource
    pub max_elements: Option<usize>,
    pub show_progress: bool,
    pub http: HttpConfig,
    pub clinical_trials: ClinicalTrialsConfig,
    /// Shared by GEO and PubMed
    pub eutils: EutilsConfig,
    pub array_express: ArrayExpressConfig,
    pub uniprot: UniProtConfig,
    pub reporter: ReporterConfig,
    pub youtube: YouTubeConfig,
    pub drugbank: DrugBankConfig,
    pub biositemaps: BioSiteMapsConfig,
    pub reactome: ReactomeConfig,
    pub omim: OmimConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_elements: None,
            show_progress: true,
            http: HttpConfig::default(),
            clinical_trials: ClinicalTrialsConfig::default(),
            eutils: EutilsConfig::default(),
            array_express: ArrayExpressConfig::default(),
            uniprot: UniProtConfig::default(),
            reporter: ReporterConfig::default(),
            youtube: YouTubeConfig::default(),
            drugbank: DrugBankConfig::default(),
            biositemaps: BioSiteMapsConfig::default(),
            reactome: ReactomeConfig::default(),
            omim: OmimConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            batch_size: env_or("INGEST_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            max_elements: match env_opt("INGEST_MAX_ELEMENTS") {
                Some(_) => Some(env_or("INGEST_MAX_ELEMENTS", 0usize)?),
                None => None,
            },
            show_progress: env_or("INGEST_SHOW_PROGRESS", true)?,
            http: HttpConfig::from_env()?,
            clinical_trials: ClinicalTrialsConfig::from_env()?,
            eutils: EutilsConfig::from_env()?,
            array_express: ArrayExpressConfig::from_env()?,
            uniprot: UniProtConfig::from_env()?,
            reporter: ReporterConfig::from_env()?,
            youtube: YouTubeConfig::from_env()?,
            drugbank: DrugBankConfig::from_env(),
            biositemaps: BioSiteMapsConfig::from_env(),
            reactome: ReactomeConfig::from_env(),
            omim: OmimConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the shared settings only; a connector's own section is
    /// validated when that connector is built, so one misconfigured source
    /// does not block the others.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::config("INGEST_BATCH_SIZE must be > 0"));
        }
        if self.max_elements == Some(0) {
            return Err(IngestError::config("INGEST_MAX_ELEMENTS must be > 0 when set"));
        }
        self.http.validate()
    }
}
