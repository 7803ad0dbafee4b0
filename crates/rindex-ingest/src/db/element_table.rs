//! Per-resource element (ET) table

use rindex_common::text::{truncate_utf8, MAX_TEXT_BYTES};
use rindex_common::types::is_sql_identifier;
use rindex_common::{Element, Resource};
use sqlx::mysql::MySqlPool;
use sqlx::{MySql, QueryBuilder, Row};
use std::collections::HashSet;
use tracing::{debug, info};

use super::{table_exists, with_retry, DbError, DbResult, RetryPolicy};

/// MySQL caps a prepared statement at 65 535 placeholders
const MAX_PLACEHOLDERS: usize = 65_535;

/// `(context name, column name)` for each declared context
#[derive(Debug, Clone)]
struct ContextColumn {
    context: String,
    column: String,
}

/// DAO over `obr_<resource_id>_et`
#[derive(Debug, Clone)]
pub struct ElementTable {
    pool: MySqlPool,
    retry: RetryPolicy,
    table: String,
    columns: Vec<ContextColumn>,
}

impl ElementTable {
    pub fn new(pool: MySqlPool, retry: RetryPolicy, resource: &Resource) -> DbResult<Self> {
        let table = resource.element_table_name();
        if !is_sql_identifier(&table) {
            return Err(DbError::InvalidIdentifier(table));
        }

        let columns = resource
            .structure
            .contexts
            .iter()
            .map(|c| {
                let column = c.column_name();
                if is_sql_identifier(&column) {
                    Ok(ContextColumn {
                        context: c.name.clone(),
                        column,
                    })
                } else {
                    Err(DbError::InvalidIdentifier(column))
                }
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Self {
            pool,
            retry,
            table,
            columns,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Rows that fit one `INSERT` without exceeding the placeholder limit
    pub fn max_rows_per_insert(&self) -> usize {
        MAX_PLACEHOLDERS / (self.columns.len() + 2)
    }

    /// Create the table, or add context columns it is missing
    pub async fn create_table(&self) -> DbResult<()> {
        let context_columns: String = self
            .columns
            .iter()
            .map(|c| format!(",\n    {} TEXT", c.column))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
             id INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,\n    \
             local_element_id VARCHAR(255) NOT NULL,\n    \
             dictionary_id INT NOT NULL DEFAULT 0{},\n    \
             UNIQUE KEY uq_local_element_id (local_element_id)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.table, context_columns
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        with_retry(&self.retry, "et.create_table", || async move {
            sqlx::query(sql).execute(pool).await
        })
        .await?;

        self.add_missing_columns().await
    }

    async fn add_missing_columns(&self) -> DbResult<()> {
        let (pool, table) = (&self.pool, self.table.as_str());
        let existing: Vec<String> = with_retry(&self.retry, "et.columns", || async move {
            sqlx::query_scalar(
                "SELECT LOWER(column_name) FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ?",
            )
            .bind(table)
            .fetch_all(pool)
            .await
        })
        .await?;
        let existing: HashSet<String> = existing.into_iter().collect();

        for col in self.columns.iter().filter(|c| !existing.contains(&c.column)) {
            info!(table = %self.table, column = %col.column, "Adding context column");
            let sql = format!("ALTER TABLE {} ADD COLUMN {} TEXT", self.table, col.column);
            let sql = sql.as_str();
            with_retry(&self.retry, "et.add_column", || async move {
                sqlx::query(sql).execute(pool).await
            })
            .await?;
        }
        Ok(())
    }

    pub async fn exists(&self) -> DbResult<bool> {
        table_exists(&self.pool, &self.retry, &self.table).await
    }

    pub async fn drop_table(&self) -> DbResult<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", self.table);
        let (pool, sql) = (&self.pool, sql.as_str());
        with_retry(&self.retry, "et.drop", || async move {
            sqlx::query(sql).execute(pool).await
        })
        .await?;
        info!(table = %self.table, "Dropped element table");
        Ok(())
    }

    pub async fn truncate(&self) -> DbResult<()> {
        if !self.exists().await? {
            return Ok(());
        }
        let sql = format!("TRUNCATE TABLE {}", self.table);
        let (pool, sql) = (&self.pool, sql.as_str());
        with_retry(&self.retry, "et.truncate", || async move {
            sqlx::query(sql).execute(pool).await
        })
        .await?;
        info!(table = %self.table, "Truncated element table");
        Ok(())
    }

    /// Every stored local element ID; empty when the table does not exist
    pub async fn local_element_ids(&self) -> DbResult<HashSet<String>> {
        if !self.exists().await? {
            return Ok(HashSet::new());
        }
        let sql = format!("SELECT local_element_id FROM {}", self.table);
        let (pool, sql) = (&self.pool, sql.as_str());
        let ids: Vec<String> = with_retry(&self.retry, "et.local_element_ids", || async move {
            sqlx::query_scalar(sql).fetch_all(pool).await
        })
        .await?;
        debug!(table = %self.table, count = ids.len(), "Loaded known element IDs");
        Ok(ids.into_iter().collect())
    }

    /// Insert `elements` as one multi-row `INSERT IGNORE`.
    ///
    /// Rows whose local element ID already exists are skipped by the server;
    /// the return value counts rows actually inserted. Elements must already
    /// be conformed to the resource structure. Callers keep batches under
    /// [`max_rows_per_insert`](Self::max_rows_per_insert).
    pub async fn add_elements(&self, elements: &[Element], dictionary_id: i32) -> DbResult<u64> {
        if elements.is_empty() {
            return Ok(0);
        }

        let column_list: Vec<&str> = self.columns.iter().map(|c| c.column.as_str()).collect();
        let head = format!(
            "INSERT IGNORE INTO {} (local_element_id, dictionary_id, {}) ",
            self.table,
            column_list.join(", ")
        );
        let (pool, head, columns) = (&self.pool, head.as_str(), self.columns.as_slice());

        let result = with_retry(&self.retry, "et.add_elements", || async move {
            let mut builder: QueryBuilder<'_, MySql> = QueryBuilder::new(head);
            builder.push_values(elements, |mut row, element| {
                row.push_bind(element.local_element_id().to_string())
                    .push_bind(dictionary_id);
                for col in columns {
                    let text = element.field(&col.context).unwrap_or_default();
                    row.push_bind(truncate_utf8(text, MAX_TEXT_BYTES).to_string());
                }
            });
            builder.build().execute(pool).await
        })
        .await?;

        debug!(
            table = %self.table,
            offered = elements.len(),
            inserted = result.rows_affected(),
            "Inserted element batch"
        );
        Ok(result.rows_affected())
    }

    pub async fn element(&self, local_element_id: &str) -> DbResult<Option<Element>> {
        let column_list: Vec<&str> = self.columns.iter().map(|c| c.column.as_str()).collect();
        let sql = format!(
            "SELECT local_element_id, {} FROM {} WHERE local_element_id = ?",
            column_list.join(", "),
            self.table
        );
        let (pool, sql) = (&self.pool, sql.as_str());
        let row = with_retry(&self.retry, "et.element", || async move {
            sqlx::query(sql)
                .bind(local_element_id)
                .fetch_optional(pool)
                .await
        })
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut element = Element::new(row.try_get::<String, _>("local_element_id")?);
        for col in &self.columns {
            let text: Option<String> = row.try_get(col.column.as_str())?;
            element.set(col.context.clone(), text.unwrap_or_default());
        }
        Ok(Some(element))
    }

    /// Row count; 0 when the table does not exist
    pub async fn count(&self) -> DbResult<i64> {
        if !self.exists().await? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let (pool, sql) = (&self.pool, sql.as_str());
        let count = with_retry(&self.retry, "et.count", || async move {
            sqlx::query_scalar(sql).fetch_one(pool).await
        })
        .await?;
        Ok(count)
    }
}
