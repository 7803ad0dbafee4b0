//! `rindex stats`: annotation statistics of one resource

use super::{connect, resource_for, table};
use crate::error::Result;

pub async fn run(id: String) -> Result<()> {
    let resource = resource_for(&id)?;
    let db = connect().await?;
    let rows = db.statistics().for_resource(&resource.resource_id).await?;

    if rows.is_empty() {
        println!("No statistics recorded for {}.", resource.resource_id);
        return Ok(());
    }

    let mut out = table(vec![
        "Ontology",
        "Aggregated",
        "Mgrep",
        "Reported",
        "Is-a",
        "Mapping",
    ]);
    for row in &rows {
        out.add_row(vec![
            row.ontology_id.to_string(),
            row.aggregated_annotations.to_string(),
            row.mgrep_annotations.to_string(),
            row.reported_annotations.to_string(),
            row.isa_annotations.to_string(),
            row.mapping_annotations.to_string(),
        ]);
    }
    println!("{}", out);
    Ok(())
}
