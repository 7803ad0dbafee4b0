//! `rindex list`: registered resources and their structures

use colored::Colorize;

use super::table;
use crate::error::Result;
use crate::framework::registry;

pub fn run() -> Result<()> {
    let resources = registry::resources();

    let mut out = table(vec!["ID", "Name", "Contexts", "Main context", "Element URL"]);
    for resource in &resources {
        let contexts = resource
            .structure
            .contexts
            .iter()
            .map(|c| match &c.ontology_id {
                Some(ontology) => format!("{} ({:.1}, ontology {})", c.name, c.weight, ontology),
                None => format!("{} ({:.1})", c.name, c.weight),
            })
            .collect::<Vec<_>>()
            .join("\n");

        out.add_row(vec![
            resource.resource_id.clone(),
            resource.name.clone(),
            contexts,
            resource.main_context.clone(),
            resource.element_url.clone(),
        ]);
    }

    println!("{}", out);
    println!("{} resources registered", resources.len().to_string().cyan().bold());
    Ok(())
}
