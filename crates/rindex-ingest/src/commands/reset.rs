//! `rindex reset`: clear a resource so the next run starts over

use colored::Colorize;
use tracing::info;

use super::{connect, resource_for};
use crate::error::Result;

pub async fn run(id: String, drop: bool, purge: bool) -> Result<()> {
    let resource = resource_for(&id)?;
    let resource_id = resource.resource_id.as_str();
    let db = connect().await?;
    let et = db.element_table(&resource)?;

    if drop {
        et.drop_table().await?;
        println!("{} dropped {}", "✓".green(), et.table_name());
    } else {
        et.truncate().await?;
        println!("{} truncated {}", "✓".green(), et.table_name());
    }

    let removed = db.statistics().delete_for_resource(resource_id).await?;
    info!(resource_id, removed, "Deleted statistics");

    if purge {
        if db.resources().delete(resource_id).await? {
            println!("{} removed resource row {}", "✓".green(), resource_id);
        }
    } else {
        db.resources().reset_counters(resource_id).await?;
        println!("{} counters reset for {}", "✓".green(), resource_id);
    }
    Ok(())
}
