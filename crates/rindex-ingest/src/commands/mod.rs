//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod complete;
pub mod init;
pub mod list;
pub mod query;
pub mod reset;
pub mod run;
pub mod stats;
pub mod status;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use rindex_common::Resource;

use crate::db::{health_check, Database, DbConfig};
use crate::error::{IngestError, Result};
use crate::framework::registry;

/// Connect with `DATABASE_URL` and the `DB_*` settings
pub async fn connect() -> Result<Database> {
    let config = DbConfig::from_env()?;
    let db = Database::connect(&config).await?;
    health_check(db.pool()).await?;
    Ok(db)
}

/// Registered description of `id`, or the unknown-resource error
pub(crate) fn resource_for(id: &str) -> Result<Resource> {
    registry::describe(id).ok_or_else(|| IngestError::UnknownResource {
        requested: id.to_string(),
        known: registry::tool_ids().join(", "),
    })
}

pub(crate) fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}
