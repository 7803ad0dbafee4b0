//! `rindex complete`: stamp the end of the annotation workflow

use colored::Colorize;

use super::{connect, resource_for};
use crate::error::Result;

pub async fn run(id: String) -> Result<()> {
    let resource = resource_for(&id)?;
    let db = connect().await?;
    db.resources()
        .mark_workflow_completed(&resource.resource_id)
        .await?;
    println!("{} workflow completed for {}", "✓".green(), resource.resource_id);
    Ok(())
}
