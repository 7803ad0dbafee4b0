//! `obr_execution`: one row per ingestion run

use chrono::NaiveDateTime;
use sqlx::mysql::MySqlPool;

use super::{with_retry, DbError, DbResult, RetryPolicy};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS obr_execution (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    resource_id VARCHAR(32) NOT NULL,
    dictionary_id INT NOT NULL DEFAULT 0,
    with_complete_dictionary BOOLEAN NOT NULL DEFAULT FALSE,
    nb_element BIGINT NOT NULL DEFAULT 0,
    first_execution BOOLEAN NOT NULL DEFAULT FALSE,
    execution_beginning DATETIME NOT NULL,
    execution_end DATETIME NULL,
    KEY idx_execution_resource (resource_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExecutionRow {
    pub id: i64,
    pub resource_id: String,
    pub dictionary_id: i32,
    pub with_complete_dictionary: bool,
    /// Elements added by this run
    pub nb_element: i64,
    pub first_execution: bool,
    pub execution_beginning: NaiveDateTime,
    /// `None` while the run is in progress or if it failed
    pub execution_end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct ExecutionTable {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl ExecutionTable {
    pub fn new(pool: MySqlPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub async fn create_table(&self) -> DbResult<()> {
        let pool = &self.pool;
        with_retry(&self.retry, "execution.create_table", || async move {
            sqlx::query(CREATE_TABLE).execute(pool).await
        })
        .await?;
        Ok(())
    }

    /// Open a run and return its ID
    pub async fn begin(
        &self,
        resource_id: &str,
        dictionary_id: i32,
        with_complete_dictionary: bool,
    ) -> DbResult<i64> {
        let first_execution = self.latest(resource_id).await?.is_none();
        let pool = &self.pool;
        let result = with_retry(&self.retry, "execution.begin", || async move {
            sqlx::query(
                "INSERT INTO obr_execution (resource_id, dictionary_id, with_complete_dictionary, \
                 first_execution, execution_beginning) VALUES (?, ?, ?, ?, UTC_TIMESTAMP())",
            )
            .bind(resource_id)
            .bind(dictionary_id)
            .bind(with_complete_dictionary)
            .bind(first_execution)
            .execute(pool)
            .await
        })
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    pub async fn finish(&self, execution_id: i64, nb_element: i64) -> DbResult<()> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "execution.finish", || async move {
            sqlx::query(
                "UPDATE obr_execution SET nb_element = ?, execution_end = UTC_TIMESTAMP() \
                 WHERE id = ?",
            )
            .bind(nb_element)
            .bind(execution_id)
            .execute(pool)
            .await
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Execution", &execution_id.to_string()));
        }
        Ok(())
    }

    pub async fn latest(&self, resource_id: &str) -> DbResult<Option<ExecutionRow>> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "execution.latest", || async move {
            sqlx::query_as::<_, ExecutionRow>(
                "SELECT id, resource_id, dictionary_id, with_complete_dictionary, nb_element, \
                 first_execution, execution_beginning, execution_end \
                 FROM obr_execution WHERE resource_id = ? ORDER BY id DESC LIMIT 1",
            )
            .bind(resource_id)
            .fetch_optional(pool)
            .await
        })
        .await?;
        Ok(row)
    }
}
