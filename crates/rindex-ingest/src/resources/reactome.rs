//! Reactome pathways, read from a partner copy of the Reactome MySQL database
//!
//! One element per pathway, keyed by its stable identifier (`R-HSA-...`),
//! falling back to the internal `DB_ID` for pathways without one.

use async_trait::async_trait;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::config::{env_opt, env_string};
use crate::db::{with_retry, RetryPolicy};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};

pub const RESOURCE_ID: &str = "REAC";

const PATHWAY_QUERY: &str = r#"
SELECT CAST(p.DB_ID AS SIGNED) AS db_id,
       st.identifier AS stable_id,
       o._displayName AS name,
       s.text AS summation,
       sp._displayName AS species
FROM Pathway p
JOIN DatabaseObject o ON o.DB_ID = p.DB_ID
LEFT JOIN StableIdentifier st ON st.DB_ID = o.stableIdentifier
LEFT JOIN Event_2_summation es ON es.DB_ID = p.DB_ID
LEFT JOIN Summation s ON s.DB_ID = es.summation
LEFT JOIN Event_2_species esp ON esp.DB_ID = p.DB_ID
LEFT JOIN DatabaseObject sp ON sp.DB_ID = esp.species
"#;

const SPECIES_FILTER: &str = r#"
WHERE EXISTS (
    SELECT 1 FROM Event_2_species f
    JOIN DatabaseObject fo ON fo.DB_ID = f.species
    WHERE f.DB_ID = p.DB_ID AND fo._displayName = ?
)
"#;

#[derive(Debug, Clone)]
pub struct ReactomeConfig {
    /// `mysql://` URL of the partner database
    pub database_url: Option<String>,
    /// Species display name; empty reads every species
    pub species: String,
}

impl Default for ReactomeConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            species: "Homo sapiens".to_string(),
        }
    }
}

impl ReactomeConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_url: env_opt("REACTOME_DATABASE_URL"),
            species: env_string("REACTOME_SPECIES", &d.species),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.database_url {
            None => Err(IngestError::config("REACTOME_DATABASE_URL not set")),
            Some(url) if !url.starts_with("mysql://") && !url.starts_with("mariadb://") => Err(
                IngestError::config("REACTOME_DATABASE_URL must start with mysql:// or mariadb://"),
            ),
            Some(_) => Ok(()),
        }
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "Reactome".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("name", 1.0, None)
            .context("summation", 0.8, None)
            .context("species", 0.5, Some("1132"))
            .build(),
        main_context: "REAC_name".to_string(),
        url: "https://reactome.org/".to_string(),
        element_url: "https://reactome.org/content/detail/".to_string(),
        description: "Curated, peer-reviewed pathways of human biology.".to_string(),
        logo: String::new(),
    }
}

/// One row of the pathway join; a pathway with several summations or species
/// spans several rows.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PathwayRow {
    pub db_id: i64,
    pub stable_id: Option<String>,
    pub name: Option<String>,
    pub summation: Option<String>,
    pub species: Option<String>,
}

#[derive(Default)]
struct Pathway {
    local_id: String,
    name: String,
    summations: Vec<String>,
    species: Vec<String>,
}

/// Merge join rows into one element per pathway, ordered by `DB_ID`
pub fn group_pathway_rows(rows: Vec<PathwayRow>) -> Vec<Element> {
    let mut pathways: BTreeMap<i64, Pathway> = BTreeMap::new();
    for row in rows {
        let entry = pathways.entry(row.db_id).or_insert_with(|| Pathway {
            local_id: row
                .stable_id
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| row.db_id.to_string()),
            ..Pathway::default()
        });
        if entry.name.is_empty() {
            if let Some(name) = row.name {
                entry.name = normalize(&name);
            }
        }
        if let Some(summation) = row.summation {
            if !entry.summations.contains(&summation) {
                entry.summations.push(summation);
            }
        }
        if let Some(species) = row.species {
            entry.species.push(species);
        }
    }

    pathways
        .into_values()
        .map(|p| {
            let summation = p
                .summations
                .iter()
                .map(|s| normalize(s))
                .collect::<Vec<_>>()
                .join(" ");
            Element::new(p.local_id)
                .with("REAC_name", p.name)
                .with("REAC_summation", summation)
                .with("REAC_species", join_values(&p.species))
        })
        .collect()
}

pub struct ReactomeTool {
    resource: Resource,
    species: String,
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl ReactomeTool {
    /// The pool connects on first use, so building the tool needs no server
    pub fn new(config: ReactomeConfig) -> Result<Self> {
        config.validate()?;
        let url = config
            .database_url
            .ok_or_else(|| IngestError::config("REACTOME_DATABASE_URL not set"))?;
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect_lazy(&url)?;
        Ok(Self {
            resource: resource(),
            species: config.species,
            pool,
            retry: RetryPolicy::default(),
        })
    }

    async fn pathway_rows(&self) -> Result<Vec<PathwayRow>> {
        let sql = if self.species.is_empty() {
            format!("{} ORDER BY p.DB_ID", PATHWAY_QUERY)
        } else {
            format!("{} {} ORDER BY p.DB_ID", PATHWAY_QUERY, SPECIES_FILTER)
        };
        let (pool, sql, species) = (&self.pool, sql.as_str(), self.species.as_str());

        let rows = with_retry(&self.retry, "reactome_pathways", || async move {
            let query = sqlx::query_as::<_, PathwayRow>(sql);
            let query = if species.is_empty() {
                query
            } else {
                query.bind(species)
            };
            query.fetch_all(pool).await
        })
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ResourceAccessTool for ReactomeTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let rows = self.pathway_rows().await?;
        let row_count = rows.len();
        let elements = group_pathway_rows(rows);
        info!(
            resource_id = RESOURCE_ID,
            species = %self.species,
            rows = row_count,
            pathways = elements.len(),
            "Read Reactome pathways"
        );

        let mut collector = ElementCollector::new(ctx);
        for element in elements {
            if !collector.push(element) {
                break;
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }

    async fn query_online_resource(&self, query: &str) -> Result<HashSet<String>> {
        let needle = query.to_lowercase();
        let rows = self.pathway_rows().await?;
        Ok(group_pathway_rows(rows)
            .into_iter()
            .filter(|e| {
                e.fields()
                    .values()
                    .any(|v| v.to_lowercase().contains(&needle))
            })
            .map(|e| e.local_element_id().to_string())
            .collect())
    }
}
