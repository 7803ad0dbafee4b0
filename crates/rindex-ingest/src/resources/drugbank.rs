//! DrugBank drugs, streamed from the full-database XML dump
//!
//! The dump is read from a local path or downloaded from a URL; `.zip` and
//! `.gz` archives are unpacked on the fly. Only direct children of each
//! top-level `<drug>` are read, so names of interacting drugs, targets and
//! salts further down do not leak into the element.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use quick_xml::events::BytesStart;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::env_opt;
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::decompression::maybe_decompress;
use crate::framework::http::HttpClient;
use crate::framework::xml::{attribute, walk, XmlVisitor};

pub const RESOURCE_ID: &str = "DBK";

/// Where the dump comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrugBankSource {
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, Default)]
pub struct DrugBankConfig {
    pub source: Option<DrugBankSource>,
}

impl DrugBankConfig {
    /// `DRUGBANK_SOURCE`: a local path or an http(s) URL
    pub fn from_env() -> Self {
        let source = env_opt("DRUGBANK_SOURCE").map(|raw| {
            if raw.starts_with("http://") || raw.starts_with("https://") {
                DrugBankSource::Url(raw)
            } else {
                DrugBankSource::File(PathBuf::from(raw))
            }
        });
        Self { source }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.source {
            None => Err(IngestError::config("DRUGBANK_SOURCE not set")),
            Some(DrugBankSource::File(path)) if !path.exists() => Err(IngestError::config(
                format!("DRUGBANK_SOURCE {} does not exist", path.display()),
            )),
            Some(_) => Ok(()),
        }
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "DrugBank".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("name", 1.0, None)
            .context("description", 0.8, None)
            .context("indication", 0.9, Some("1009"))
            .context("pharmacology", 0.7, None)
            .build(),
        main_context: "DBK_name".to_string(),
        url: "https://go.drugbank.com/".to_string(),
        element_url: "https://go.drugbank.com/drugs/".to_string(),
        description: "Drug data combined with drug target information.".to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default)]
struct Drug {
    primary_id: Option<String>,
    first_id: Option<String>,
    name: String,
    description: String,
    indication: String,
    pharmacology: Vec<String>,
}

impl Drug {
    fn into_element(self) -> Option<Element> {
        let id = self.primary_id.or(self.first_id)?;
        Some(
            Element::new(id)
                .with("DBK_name", normalize(&self.name))
                .with("DBK_description", normalize(&self.description))
                .with("DBK_indication", normalize(&self.indication))
                .with("DBK_pharmacology", join_values(&self.pharmacology)),
        )
    }
}

struct DrugVisitor<'k> {
    known: &'k HashSet<String>,
    max_elements: Option<usize>,
    current: Option<Drug>,
    primary_flag: bool,
    elements: Vec<Element>,
    seen: HashSet<String>,
    skipped_known: usize,
}

impl XmlVisitor for DrugVisitor<'_> {
    fn start(&mut self, path: &[String], element: &BytesStart<'_>) -> Result<()> {
        match path.len() {
            2 if path[1] == "drug" => self.current = Some(Drug::default()),
            3 if path[2] == "drugbank-id" => {
                self.primary_flag = attribute(element, "primary")?.as_deref() == Some("true");
            },
            _ => {},
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) -> Result<()> {
        let Some(drug) = self.current.as_mut() else {
            return Ok(());
        };
        if path.len() != 3 {
            return Ok(());
        }
        match path[2].as_str() {
            "drugbank-id" => {
                let id = text.trim().to_string();
                if self.primary_flag {
                    drug.primary_id = Some(id);
                } else if drug.first_id.is_none() {
                    drug.first_id = Some(id);
                }
            },
            "name" => drug.name.push_str(text),
            "description" => drug.description.push_str(text),
            "indication" => drug.indication.push_str(text),
            "pharmacodynamics" | "mechanism-of-action" | "pharmacology" => {
                drug.pharmacology.push(text.to_string())
            },
            _ => {},
        }
        Ok(())
    }

    fn end(&mut self, path: &[String]) -> Result<()> {
        if path.len() == 2 && path[1] == "drug" {
            if let Some(element) = self.current.take().and_then(Drug::into_element) {
                let id = element.local_element_id().to_string();
                if self.known.contains(&id) {
                    self.skipped_known += 1;
                } else if self.seen.insert(id) {
                    self.elements.push(element);
                }
            }
        }
        Ok(())
    }

    fn done(&self) -> bool {
        self.max_elements
            .is_some_and(|max| self.elements.len() >= max)
    }
}

/// Stream a DrugBank XML document, keeping drugs whose primary ID is not in
/// `known`, and stopping once `max_elements` new drugs were read.
pub fn parse_drugbank<R: BufRead>(
    source: R,
    known: &HashSet<String>,
    max_elements: Option<usize>,
) -> Result<Vec<Element>> {
    let mut visitor = DrugVisitor {
        known,
        max_elements,
        current: None,
        primary_flag: false,
        elements: Vec::new(),
        seen: HashSet::new(),
        skipped_known: 0,
    };
    walk(source, &mut visitor)?;
    info!(
        resource_id = RESOURCE_ID,
        parsed = visitor.elements.len(),
        skipped_known = visitor.skipped_known,
        "Parsed DrugBank dump"
    );
    Ok(visitor.elements)
}

/// Open a local dump, unpacking `.gz` and `.zip` while streaming
fn parse_file(path: &Path, known: &HashSet<String>, max: Option<usize>) -> Result<Vec<Element>> {
    let name = path.to_string_lossy().to_lowercase();
    let file = File::open(path)?;

    if name.ends_with(".gz") {
        parse_drugbank(BufReader::new(GzDecoder::new(file)), known, max)
    } else if name.ends_with(".zip") {
        let mut archive = zip::ZipArchive::new(file)?;
        let index = (0..archive.len())
            .find(|&i| {
                archive
                    .by_index(i)
                    .is_ok_and(|f| f.name().to_lowercase().ends_with(".xml"))
            })
            .ok_or_else(|| IngestError::Archive("no .xml entry in DrugBank zip".to_string()))?;
        let entry = archive.by_index(index)?;
        parse_drugbank(BufReader::new(entry), known, max)
    } else {
        parse_drugbank(BufReader::new(file), known, max)
    }
}

pub struct DrugBankTool {
    resource: Resource,
    source: DrugBankSource,
    http: HttpClient,
}

impl DrugBankTool {
    pub fn new(config: DrugBankConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        let source = config
            .source
            .ok_or_else(|| IngestError::config("DRUGBANK_SOURCE not set"))?;
        Ok(Self {
            resource: resource(),
            source,
            http,
        })
    }
}

#[async_trait]
impl ResourceAccessTool for DrugBankTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        // the blocking parser needs owned inputs
        let known = ctx.known_ids().clone();
        let max = ctx.max_elements();

        let parsed = match &self.source {
            DrugBankSource::File(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || parse_file(&path, &known, max))
                    .await
                    .map_err(|e| IngestError::parse(RESOURCE_ID, format!("parser task failed: {}", e)))??
            },
            DrugBankSource::Url(url) => {
                let bytes = self.http.get_bytes(url).await?;
                tokio::task::spawn_blocking({
                    let url = url.clone();
                    move || {
                        let xml = maybe_decompress(&url, bytes)?;
                        parse_drugbank(xml.as_slice(), &known, max)
                    }
                })
                .await
                .map_err(|e| IngestError::parse(RESOURCE_ID, format!("parser task failed: {}", e)))??
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
