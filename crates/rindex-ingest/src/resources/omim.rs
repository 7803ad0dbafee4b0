//! OMIM entries from the `omim.txt` flat file
//!
//! The file is a sequence of `*RECORD*` blocks, each split into `*FIELD* XX`
//! sections, ending with `*THEEND*`. It is fetched over FTP (gzip) or read
//! from a local copy.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use rindex_common::text::normalize;
use rindex_common::{Element, Resource, Structure};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{env_opt, env_or, env_string};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::decompression::maybe_decompress;
use crate::framework::ftp::{FtpClient, FtpConfig};

pub const RESOURCE_ID: &str = "OMIM";

#[derive(Debug, Clone)]
pub struct OmimConfig {
    pub ftp: FtpConfig,
    /// Path of the dump on the FTP server
    pub remote_path: String,
    /// Local copy; when set the FTP server is not contacted
    pub local_file: Option<PathBuf>,
}

impl Default for OmimConfig {
    fn default() -> Self {
        Self {
            ftp: FtpConfig {
                host: "ftp.omim.org".to_string(),
                ..FtpConfig::default()
            },
            remote_path: "/OMIM/omim.txt.gz".to_string(),
            local_file: None,
        }
    }
}

impl OmimConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            ftp: FtpConfig {
                host: env_string("OMIM_FTP_HOST", &d.ftp.host),
                port: env_or("OMIM_FTP_PORT", d.ftp.port)?,
                username: env_string("OMIM_FTP_USER", &d.ftp.username),
                password: env_string("OMIM_FTP_PASSWORD", &d.ftp.password),
                max_retries: env_or("OMIM_FTP_MAX_RETRIES", d.ftp.max_retries)?,
                retry_delay_secs: env_or("OMIM_FTP_RETRY_DELAY_SECS", d.ftp.retry_delay_secs)?,
            },
            remote_path: env_string("OMIM_FTP_PATH", &d.remote_path),
            local_file: env_opt("OMIM_FILE").map(PathBuf::from),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.local_file {
            if !path.exists() {
                return Err(IngestError::config(format!(
                    "OMIM_FILE {} does not exist",
                    path.display()
                )));
            }
            return Ok(());
        }
        if self.ftp.host.trim().is_empty() {
            return Err(IngestError::config("OMIM_FTP_HOST is empty"));
        }
        if !self.remote_path.starts_with('/') {
            return Err(IngestError::config("OMIM_FTP_PATH must be absolute"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "OMIM".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("text", 0.7, None)
            .context("clinical_synopsis", 0.9, None)
            .build(),
        main_context: "OMIM_title".to_string(),
        url: "https://www.omim.org/".to_string(),
        element_url: "https://www.omim.org/entry/".to_string(),
        description: "Online Mendelian Inheritance in Man: human genes and genetic phenotypes."
            .to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default)]
struct OmimRecord {
    number: String,
    title: Vec<String>,
    text: Vec<String>,
    synopsis: Vec<String>,
}

impl OmimRecord {
    /// `None` for records without a number and for moved/removed entries
    fn into_element(self) -> Option<Element> {
        let number = self.number.trim().to_string();
        if number.is_empty() {
            warn!(resource_id = RESOURCE_ID, "Skipping OMIM record without a number");
            return None;
        }
        let raw_title = self.title.join(" ");
        if raw_title.trim_start().starts_with('^') {
            debug!(resource_id = RESOURCE_ID, number = %number, "Skipping moved entry");
            return None;
        }
        Some(
            Element::new(number)
                .with("OMIM_title", clean_title(&raw_title))
                .with("OMIM_text", normalize(&self.text.join(" ")))
                .with("OMIM_clinical_synopsis", normalize(&self.synopsis.join(" "))),
        )
    }
}

/// `*100100 PRUNE BELLY SYNDROME;;PBS` -> `PRUNE BELLY SYNDROME; PBS`
fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches(['*', '#', '%', '+', '^']);
    let without_number = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    normalize(&without_number.replace(";;", "; "))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Number,
    Title,
    Text,
    Synopsis,
    Other,
}

/// Read `omim.txt`, keeping records whose number is not in `known`, until
/// `max_elements` new ones were read.
pub fn parse_omim<R: BufRead>(
    source: R,
    known: &HashSet<String>,
    max_elements: Option<usize>,
) -> Result<Vec<Element>> {
    let mut elements = Vec::new();
    let mut current: Option<OmimRecord> = None;
    let mut field = Field::Other;
    let mut skipped_known = 0usize;

    let mut flush = |record: Option<OmimRecord>, elements: &mut Vec<Element>| {
        if let Some(element) = record.and_then(OmimRecord::into_element) {
            if known.contains(element.local_element_id()) {
                skipped_known += 1;
            } else {
                elements.push(element);
            }
        }
    };

    for line in source.lines() {
        let line = line?;
        if line.starts_with("*RECORD*") || line.starts_with("*THEEND*") {
            flush(current.take(), &mut elements);
            if max_elements.is_some_and(|max| elements.len() >= max) || line.starts_with("*THEEND*")
            {
                break;
            }
            current = Some(OmimRecord::default());
            field = Field::Other;
            continue;
        }
        if let Some(tag) = line.strip_prefix("*FIELD*") {
            field = match tag.trim() {
                "NO" => Field::Number,
                "TI" => Field::Title,
                "TX" => Field::Text,
                "CS" => Field::Synopsis,
                _ => Field::Other,
            };
            continue;
        }
        let Some(record) = current.as_mut() else {
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match field {
            Field::Number => record.number.push_str(line),
            Field::Title => record.title.push(line.to_string()),
            Field::Text => record.text.push(line.to_string()),
            Field::Synopsis => record.synopsis.push(line.to_string()),
            Field::Other => {},
        }
    }
    flush(current.take(), &mut elements);
    if let Some(max) = max_elements {
        elements.truncate(max);
    }

    info!(
        resource_id = RESOURCE_ID,
        parsed = elements.len(),
        skipped_known,
        "Parsed OMIM flat file"
    );
    Ok(elements)
}

pub struct OmimTool {
    resource: Resource,
    config: OmimConfig,
    ftp: FtpClient,
}

impl OmimTool {
    pub fn new(config: OmimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resource: resource(),
            ftp: FtpClient::new(config.ftp.clone()),
            config,
        })
    }

    /// Fetch the remote dump after checking it is listed in its directory
    async fn download(&self) -> Result<Vec<u8>> {
        let path = self.config.remote_path.as_str();
        let (dir, name) = path.rsplit_once('/').unwrap_or(("/", path));
        let dir = if dir.is_empty() { "/" } else { dir };

        let entries = self.ftp.list_directory(dir).await?;
        let entry = entries
            .iter()
            .find(|e| !e.is_directory && e.name == name)
            .ok_or_else(|| IngestError::Ftp(format!("{} not found in {}", name, dir)))?;
        info!(resource_id = RESOURCE_ID, path, size = ?entry.size, "Downloading OMIM dump");

        let data = self.ftp.download_file(path).await?;
        maybe_decompress(path, data)
    }
}

#[async_trait]
impl ResourceAccessTool for OmimTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let known = ctx.known_ids().clone();
        let max = ctx.max_elements();

        let parsed = match &self.config.local_file {
            Some(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || {
                    let file = File::open(&path)?;
                    if path.extension().is_some_and(|ext| ext == "gz") {
                        parse_omim(BufReader::new(GzDecoder::new(file)), &known, max)
                    } else {
                        parse_omim(BufReader::new(file), &known, max)
                    }
                })
                .await
                .map_err(|e| IngestError::parse(RESOURCE_ID, format!("parser task failed: {}", e)))??
            },
            None => {
                let data = self.download().await?;
                tokio::task::spawn_blocking(move || parse_omim(data.as_slice(), &known, max))
                    .await
                    .map_err(|e| {
                        IngestError::parse(RESOURCE_ID, format!("parser task failed: {}", e))
                    })??
            },
        };

        let mut collector = ElementCollector::new(ctx);
        for element in parsed {
            if !collector.push(element) {
                break;
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }
}
