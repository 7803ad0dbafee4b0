//! `rindex query`: live lookup against a resource

use colored::Colorize;
use tracing::debug;

use super::{connect, resource_for};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::framework::registry;

pub async fn run(id: String, text: Vec<String>, new_only: bool) -> Result<()> {
    let query = text.join(" ");
    let config = IngestConfig::from_env()?;
    let tool = registry::build_tool(&id, &config)?;

    let mut ids: Vec<String> = tool.query_online_resource(&query).await?.into_iter().collect();
    ids.sort();
    debug!(resource_id = tool.resource_id(), query = %query, matches = ids.len(), "Query finished");

    if new_only {
        let db = connect().await?;
        let known = db.element_table(&resource_for(&id)?)?.local_element_ids().await?;
        ids.retain(|local_id| !known.contains(local_id));
    }

    if ids.is_empty() {
        println!("No matches for '{}' in {}.", query, tool.resource_id());
        return Ok(());
    }

    for local_id in &ids {
        println!("{}\t{}", local_id.green(), tool.element_url(local_id));
    }
    println!();
    println!(
        "{} matches in {}",
        ids.len().to_string().cyan().bold(),
        tool.resource_id()
    );
    Ok(())
}
