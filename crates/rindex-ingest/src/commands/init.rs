//! `rindex init`: create the shared schema

use colored::Colorize;
use tracing::info;

use super::connect;
use crate::error::Result;
use crate::framework::registry;

pub async fn run(element_tables: bool) -> Result<()> {
    let db = connect().await?;
    db.create_shared_schema().await?;
    println!("{} shared tables ready", "✓".green());

    if element_tables {
        for resource in registry::resources() {
            db.resources().upsert(&resource).await?;
            let et = db.element_table(&resource)?;
            et.create_table().await?;
            info!(resource_id = %resource.resource_id, table = et.table_name(), "Element table ready");
            println!("{} {}", "✓".green(), et.table_name());
        }
    }
    Ok(())
}
