//! `obr_resource`: one row per registered resource

use chrono::NaiveDateTime;
use rindex_common::{Resource, Structure};
use sqlx::mysql::MySqlPool;
use tracing::info;

use super::{with_retry, DbError, DbResult, RetryPolicy};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS obr_resource (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    resource_id VARCHAR(32) NOT NULL,
    structure TEXT NOT NULL,
    main_context VARCHAR(64) NOT NULL,
    url VARCHAR(255) NOT NULL DEFAULT '',
    element_url VARCHAR(255) NOT NULL DEFAULT '',
    description TEXT,
    logo VARCHAR(255) NOT NULL DEFAULT '',
    dictionary_id INT NULL,
    total_element BIGINT NOT NULL DEFAULT 0,
    last_update_date DATETIME NULL,
    workflow_completed_date DATETIME NULL,
    UNIQUE KEY uq_resource_id (resource_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const SELECT_COLUMNS: &str = "id, name, resource_id, structure, main_context, url, element_url, \
     COALESCE(description, '') AS description, logo, dictionary_id, total_element, \
     last_update_date, workflow_completed_date";

/// A stored resource with its bookkeeping columns
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResourceRow {
    pub id: i32,
    pub name: String,
    pub resource_id: String,
    /// JSON-encoded [`Structure`]
    pub structure: String,
    pub main_context: String,
    pub url: String,
    pub element_url: String,
    pub description: String,
    pub logo: String,
    pub dictionary_id: Option<i32>,
    pub total_element: i64,
    pub last_update_date: Option<NaiveDateTime>,
    pub workflow_completed_date: Option<NaiveDateTime>,
}

impl ResourceRow {
    pub fn structure(&self) -> DbResult<Structure> {
        serde_json::from_str(&self.structure).map_err(|source| DbError::CorruptStructure {
            resource_id: self.resource_id.clone(),
            source,
        })
    }

    pub fn to_resource(&self) -> DbResult<Resource> {
        Ok(Resource {
            name: self.name.clone(),
            resource_id: self.resource_id.clone(),
            structure: self.structure()?,
            main_context: self.main_context.clone(),
            url: self.url.clone(),
            element_url: self.element_url.clone(),
            description: self.description.clone(),
            logo: self.logo.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResourceTable {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl ResourceTable {
    pub fn new(pool: MySqlPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub async fn create_table(&self) -> DbResult<()> {
        let pool = &self.pool;
        with_retry(&self.retry, "resource.create_table", || async move {
            sqlx::query(CREATE_TABLE).execute(pool).await
        })
        .await?;
        Ok(())
    }

    /// Insert the resource, or refresh its descriptive columns.
    ///
    /// Counters and dates are left untouched on update.
    pub async fn upsert(&self, resource: &Resource) -> DbResult<()> {
        let structure = serde_json::to_string(&resource.structure).map_err(|source| {
            DbError::CorruptStructure {
                resource_id: resource.resource_id.clone(),
                source,
            }
        })?;
        let (pool, structure) = (&self.pool, structure.as_str());

        with_retry(&self.retry, "resource.upsert", || async move {
            sqlx::query(
                "INSERT INTO obr_resource \
                 (name, resource_id, structure, main_context, url, element_url, description, logo) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                 ON DUPLICATE KEY UPDATE \
                 name = VALUES(name), structure = VALUES(structure), \
                 main_context = VALUES(main_context), url = VALUES(url), \
                 element_url = VALUES(element_url), description = VALUES(description), \
                 logo = VALUES(logo)",
            )
            .bind(&resource.name)
            .bind(&resource.resource_id)
            .bind(structure)
            .bind(&resource.main_context)
            .bind(&resource.url)
            .bind(&resource.element_url)
            .bind(&resource.description)
            .bind(&resource.logo)
            .execute(pool)
            .await
        })
        .await?;
        Ok(())
    }

    pub async fn get(&self, resource_id: &str) -> DbResult<Option<ResourceRow>> {
        let sql = format!("SELECT {} FROM obr_resource WHERE resource_id = ?", SELECT_COLUMNS);
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = with_retry(&self.retry, "resource.get", || async move {
            sqlx::query_as::<_, ResourceRow>(sql)
                .bind(resource_id)
                .fetch_optional(pool)
                .await
        })
        .await?;
        Ok(row)
    }

    pub async fn list(&self) -> DbResult<Vec<ResourceRow>> {
        let sql = format!("SELECT {} FROM obr_resource ORDER BY resource_id", SELECT_COLUMNS);
        let (pool, sql) = (&self.pool, sql.as_str());
        let rows = with_retry(&self.retry, "resource.list", || async move {
            sqlx::query_as::<_, ResourceRow>(sql).fetch_all(pool).await
        })
        .await?;
        Ok(rows)
    }

    /// Store the element total and dictionary after an ingestion run
    pub async fn record_update(
        &self,
        resource_id: &str,
        total_element: i64,
        dictionary_id: i32,
    ) -> DbResult<()> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "resource.record_update", || async move {
            sqlx::query(
                "UPDATE obr_resource SET total_element = ?, dictionary_id = ?, \
                 last_update_date = UTC_TIMESTAMP() WHERE resource_id = ?",
            )
            .bind(total_element)
            .bind(dictionary_id)
            .bind(resource_id)
            .execute(pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 && self.get(resource_id).await?.is_none() {
            return Err(DbError::not_found("Resource", resource_id));
        }
        Ok(())
    }

    pub async fn mark_workflow_completed(&self, resource_id: &str) -> DbResult<()> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "resource.workflow_completed", || async move {
            sqlx::query(
                "UPDATE obr_resource SET workflow_completed_date = UTC_TIMESTAMP() \
                 WHERE resource_id = ?",
            )
            .bind(resource_id)
            .execute(pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 && self.get(resource_id).await?.is_none() {
            return Err(DbError::not_found("Resource", resource_id));
        }
        Ok(())
    }

    /// Zero the counters and clear dates, keeping the descriptive row
    pub async fn reset_counters(&self, resource_id: &str) -> DbResult<()> {
        let pool = &self.pool;
        with_retry(&self.retry, "resource.reset_counters", || async move {
            sqlx::query(
                "UPDATE obr_resource SET total_element = 0, dictionary_id = NULL, \
                 last_update_date = NULL, workflow_completed_date = NULL \
                 WHERE resource_id = ?",
            )
            .bind(resource_id)
            .execute(pool)
            .await
        })
        .await?;
        Ok(())
    }

    /// Returns whether a row was removed
    pub async fn delete(&self, resource_id: &str) -> DbResult<bool> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "resource.delete", || async move {
            sqlx::query("DELETE FROM obr_resource WHERE resource_id = ?")
                .bind(resource_id)
                .execute(pool)
                .await
        })
        .await?;
        if result.rows_affected() > 0 {
            info!(resource_id, "Deleted resource row");
        }
        Ok(result.rows_affected() > 0)
    }
}
