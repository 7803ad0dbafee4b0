//! `rindex run`: ingest one or more resources

use colored::Colorize;
use std::time::Instant;
use tracing::{error, info};

use super::{connect, table};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::framework::pipeline::{PipelineOptions, PipelineStats, ResourcePipeline};
use crate::framework::registry;

/// Command-line overrides on top of [`IngestConfig`]
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub ids: Vec<String>,
    pub all: bool,
    pub max_elements: Option<usize>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
    pub no_progress: bool,
}

impl RunArgs {
    /// Resource IDs to run, in order
    pub fn selected_ids(&self) -> Result<Vec<&'static str>> {
        if self.all {
            return Ok(registry::tool_ids());
        }
        if self.ids.is_empty() {
            return Err(IngestError::config(
                "name at least one resource ID, or pass --all",
            ));
        }
        registry::resolve_ids(&self.ids)
    }

    pub fn apply(&self, config: &mut IngestConfig) {
        if let Some(max) = self.max_elements {
            config.max_elements = Some(max);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let ids = args.selected_ids()?;
    let mut config = IngestConfig::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    let db = connect().await?;
    db.create_shared_schema().await?;

    let options = PipelineOptions {
        dry_run: args.dry_run,
        ..PipelineOptions::from(&config)
    };
    let pipeline = ResourcePipeline::new(db, options);

    let started = Instant::now();
    let mut outcomes: Vec<(&str, std::result::Result<PipelineStats, String>)> = Vec::new();

    for id in ids {
        info!(resource_id = id, dry_run = args.dry_run, "Starting resource");
        let outcome = match registry::build_tool(id, &config) {
            Ok(tool) => pipeline.run(tool.as_ref()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            error!(resource_id = id, error = %e, "Resource failed");
        }
        outcomes.push((id, outcome.map_err(|e| e.to_string())));
    }

    print_summary(&outcomes, args.dry_run);
    info!(
        resources = outcomes.len(),
        elapsed_secs = started.elapsed().as_secs(),
        "Run finished"
    );

    let failed: Vec<String> = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_err())
        .map(|(id, _)| id.to_string())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(IngestError::ResourcesFailed(failed))
    }
}

fn print_summary(outcomes: &[(&str, std::result::Result<PipelineStats, String>)], dry_run: bool) {
    let inserted_header = if dry_run { "Would insert" } else { "Inserted" };
    let mut out = table(vec![
        "ID",
        "Status",
        "Fetched",
        "Duplicates",
        "Blank",
        inserted_header,
        "Total",
    ]);

    for (id, outcome) in outcomes {
        match outcome {
            Ok(stats) => out.add_row(vec![
                id.to_string(),
                "ok".green().to_string(),
                stats.fetched.to_string(),
                stats.duplicates.to_string(),
                stats.blank.to_string(),
                stats.inserted.to_string(),
                stats.total_elements.to_string(),
            ]),
            Err(message) => out.add_row(vec![
                id.to_string(),
                format!("{}: {}", "failed".red(), message),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
            ]),
        };
    }
    println!("{}", out);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_ids() {
        let args = RunArgs {
            ids: vec!["geo".to_string(), "ct".to_string()],
            ..RunArgs::default()
        };
        assert_eq!(args.selected_ids().unwrap(), vec!["GEO", "CT"]);

        let all = RunArgs {
            all: true,
            ..RunArgs::default()
        };
        assert_eq!(all.selected_ids().unwrap().len(), registry::tool_ids().len());

        assert!(RunArgs::default().selected_ids().is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = IngestConfig::default();
        RunArgs {
            max_elements: Some(25),
            batch_size: Some(50),
            no_progress: true,
            ..RunArgs::default()
        }
        .apply(&mut config);

        assert_eq!(config.max_elements, Some(25));
        assert_eq!(config.batch_size, 50);
        assert!(!config.show_progress);
    }
}
