//! Fetch, normalize, dedupe and store the elements of one resource

use rindex_common::{Element, Structure};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::access_tool::{FetchContext, ResourceAccessTool};
use crate::config::IngestConfig;
use crate::db::{Database, ElementTable};
use crate::error::Result;
use crate::progress;

/// Longest local element ID the ET table accepts
const MAX_LOCAL_ID_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub max_elements: Option<usize>,
    /// Fetch and dedupe, but write nothing
    pub dry_run: bool,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for PipelineOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_elements: config.max_elements,
            dry_run: false,
            show_progress: config.show_progress,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Elements returned by the connector
    pub fetched: usize,
    /// Already stored, or repeated within the run
    pub duplicates: usize,
    /// No text in any context, or unusable local ID
    pub blank: usize,
    /// Rows written (would be written, on a dry run)
    pub inserted: u64,
    /// ET table size after the run
    pub total_elements: i64,
    pub dictionary_id: i32,
    pub dry_run: bool,
}

/// Elements ready for insertion plus what was dropped on the way
#[derive(Debug, Default)]
pub(crate) struct Prepared {
    pub elements: Vec<Element>,
    pub duplicates: usize,
    pub blank: usize,
}

/// Conform every element to `structure` and drop blank, known or repeated ones
pub(crate) fn prepare_elements(
    structure: &Structure,
    known: &HashSet<String>,
    fetched: Vec<Element>,
) -> Result<Prepared> {
    let mut prepared = Prepared::default();
    let mut seen = HashSet::new();

    for mut element in fetched {
        element.trim_local_element_id();
        let id = element.local_element_id();
        if id.is_empty() || id.len() > MAX_LOCAL_ID_LEN {
            warn!(
                resource_id = %structure.resource_id,
                local_element_id = id,
                "Skipping element with unusable local ID"
            );
            prepared.blank += 1;
            continue;
        }
        if known.contains(id) || !seen.insert(id.to_string()) {
            prepared.duplicates += 1;
            continue;
        }

        let element = structure.conform(element)?;
        if element.is_blank() {
            prepared.blank += 1;
            continue;
        }
        prepared.elements.push(element);
    }
    Ok(prepared)
}

pub struct ResourcePipeline {
    db: Database,
    options: PipelineOptions,
}

impl ResourcePipeline {
    pub fn new(db: Database, options: PipelineOptions) -> Self {
        Self { db, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    #[instrument(skip(self, tool), fields(resource_id = tool.resource_id()))]
    pub async fn run(&self, tool: &dyn ResourceAccessTool) -> Result<PipelineStats> {
        let started = Instant::now();
        let resource = tool.resource();
        resource.validate()?;
        let resource_id = resource.resource_id.as_str();
        let et = self.db.element_table(resource)?;
        let dry_run = self.options.dry_run;

        if !dry_run {
            self.db.resources().upsert(resource).await?;
            et.create_table().await?;
        }

        let dictionary_id = self.resolve_dictionary(&resource.structure).await?;
        let execution_id = if dry_run {
            None
        } else {
            Some(self.db.executions().begin(resource_id, dictionary_id, false).await?)
        };

        let known = et.local_element_ids().await?;
        info!(resource_id, known = known.len(), "Fetching elements");

        let spinner = if self.options.show_progress {
            progress::create_spinner(&format!("Fetching {}", resource_id))
        } else {
            progress::hidden()
        };
        let ctx = FetchContext::new(&known, self.options.max_elements);
        let fetched = tool.fetch_elements(&ctx).await;
        spinner.finish_and_clear();
        let fetched = fetched?;

        let fetched_count = fetched.len();
        let prepared = prepare_elements(&resource.structure, &known, fetched)?;

        let mut stats = PipelineStats {
            fetched: fetched_count,
            duplicates: prepared.duplicates,
            blank: prepared.blank,
            dictionary_id,
            dry_run,
            ..PipelineStats::default()
        };

        if dry_run {
            stats.inserted = prepared.elements.len() as u64;
            stats.total_elements = (known.len() + prepared.elements.len()) as i64;
        } else {
            stats.inserted = self.insert(&et, &prepared.elements, dictionary_id).await?;
            stats.total_elements = et.count().await?;
            self.db
                .resources()
                .record_update(resource_id, stats.total_elements, dictionary_id)
                .await?;
            if let Some(id) = execution_id {
                self.db.executions().finish(id, stats.inserted as i64).await?;
            }
        }

        info!(
            resource_id,
            fetched = stats.fetched,
            duplicates = stats.duplicates,
            blank = stats.blank,
            inserted = stats.inserted,
            total = stats.total_elements,
            dry_run,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resource ingestion finished"
        );
        Ok(stats)
    }

    /// Latest dictionary ID (0 when none exists); warns about structure
    /// ontologies missing from `obs_ontology`.
    async fn resolve_dictionary(&self, structure: &Structure) -> Result<i32> {
        let obs = self.db.obs();
        let dictionary_id = match obs.latest_dictionary().await? {
            Some(dictionary) => dictionary.id,
            None => {
                warn!(
                    resource_id = %structure.resource_id,
                    "No dictionary loaded; stamping elements with dictionary 0"
                );
                0
            },
        };

        for ontology_id in structure.ontology_ids() {
            if obs.ontology_by_virtual_id(ontology_id).await?.is_none() {
                warn!(
                    resource_id = %structure.resource_id,
                    ontology_id,
                    "Structure references an ontology that is not loaded"
                );
            }
        }
        Ok(dictionary_id)
    }

    async fn insert(&self, et: &ElementTable, elements: &[Element], dictionary_id: i32) -> Result<u64> {
        let chunk_size = self.options.batch_size.clamp(1, et.max_rows_per_insert());
        let pb = if self.options.show_progress {
            progress::create_progress_bar(
                elements.len() as u64,
                &format!("Inserting into {}", et.table_name()),
            )
        } else {
            progress::hidden()
        };

        let mut inserted = 0;
        for chunk in elements.chunks(chunk_size) {
            inserted += et.add_elements(chunk, dictionary_id).await?;
            pb.inc(chunk.len() as u64);
        }
        pb.finish_and_clear();

        let skipped = elements.len() as u64 - inserted;
        if skipped > 0 {
            // Another writer stored these between load and insert
            warn!(table = et.table_name(), skipped, "Rows ignored as duplicates on insert");
        }
        Ok(inserted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn structure() -> Structure {
        Structure::builder("GEO")
            .context("title", 1.0, None)
            .context("summary", 0.8, None)
            .build()
    }

    #[test]
    fn test_prepare_dedupes_and_conforms() {
        let known: HashSet<String> = ["GSE1".to_string()].into_iter().collect();
        let fetched = vec![
            Element::new("GSE1").with("GEO_title", "old"),
            Element::new("GSE2").with("GEO_title", "new"),
            Element::new("GSE2").with("GEO_title", "again"),
            Element::new("GSE3").with("GEO_summary", "   "),
            Element::new("").with("GEO_title", "no id"),
        ];

        let prepared = prepare_elements(&structure(), &known, fetched).unwrap();
        assert_eq!(prepared.elements.len(), 1);
        assert_eq!(prepared.duplicates, 2);
        assert_eq!(prepared.blank, 2);

        let element = &prepared.elements[0];
        assert_eq!(element.local_element_id(), "GSE2");
        assert_eq!(element.field("GEO_title"), Some("new"));
        assert_eq!(element.field("GEO_summary"), Some(""));
    }

    #[test]
    fn test_prepare_stores_trimmed_ids() {
        let known: HashSet<String> = ["GSE1".to_string()].into_iter().collect();
        let fetched = vec![
            Element::new(" GSE1").with("GEO_title", "stored already"),
            Element::new("GSE2 ").with("GEO_title", "padded"),
            Element::new("GSE2").with("GEO_title", "plain"),
        ];

        let prepared = prepare_elements(&structure(), &known, fetched).unwrap();
        assert_eq!(prepared.duplicates, 2);
        assert_eq!(prepared.elements.len(), 1);
        assert_eq!(prepared.elements[0].local_element_id(), "GSE2");
    }

    #[test]
    fn test_prepare_rejects_undeclared_context() {
        let fetched = vec![Element::new("GSE9").with("GEO_platform", "GPL570")];
        assert!(prepare_elements(&structure(), &HashSet::new(), fetched).is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config = IngestConfig {
            batch_size: 25,
            max_elements: Some(3),
            ..IngestConfig::default()
        };
        let options = PipelineOptions::from(&config);
        assert_eq!(options.batch_size, 25);
        assert_eq!(options.max_elements, Some(3));
        assert!(!options.dry_run);
    }
}
