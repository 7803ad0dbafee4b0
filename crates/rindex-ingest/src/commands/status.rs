//! `rindex status`: stored resources, counts and last runs

use chrono::NaiveDateTime;
use colored::Colorize;

use super::{connect, resource_for, table};
use crate::db::ResourceRow;
use crate::error::Result;

fn date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run(id: Option<String>) -> Result<()> {
    let db = connect().await?;

    let rows: Vec<ResourceRow> = match &id {
        Some(id) => {
            let resource = resource_for(id)?;
            db.resources()
                .get(&resource.resource_id)
                .await?
                .into_iter()
                .collect()
        },
        None => db.resources().list().await?,
    };

    if rows.is_empty() {
        println!("No resources stored yet.");
        println!("Run 'rindex run <ID>' to ingest one.");
        return Ok(());
    }

    let mut out = table(vec![
        "ID",
        "Name",
        "Elements",
        "Dictionary",
        "Last update",
        "Workflow completed",
        "Last run",
    ]);

    for row in &rows {
        let last_run = match db.executions().latest(&row.resource_id).await? {
            Some(execution) => format!(
                "{} (+{}{})",
                execution.execution_beginning.format("%Y-%m-%d %H:%M"),
                execution.nb_element,
                if execution.execution_end.is_none() {
                    ", unfinished"
                } else {
                    ""
                }
            ),
            None => "-".to_string(),
        };

        out.add_row(vec![
            row.resource_id.clone(),
            row.name.clone(),
            row.total_element.to_string(),
            row.dictionary_id
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            date(row.last_update_date),
            date(row.workflow_completed_date),
            last_run,
        ]);
    }

    println!("{}", out);
    let total: i64 = rows.iter().map(|r| r.total_element).sum();
    println!(
        "{} resources, {} elements",
        rows.len().to_string().cyan().bold(),
        total.to_string().cyan().bold()
    );
    Ok(())
}
