//! `obr_statistics`: annotation counts per (resource, ontology)

use sqlx::mysql::MySqlPool;

use super::{with_retry, DbResult, RetryPolicy};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS obr_statistics (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    resource_id INT NOT NULL,
    ontology_id INT NOT NULL,
    aggregated_annotations BIGINT NOT NULL DEFAULT 0,
    mgrep_annotations BIGINT NOT NULL DEFAULT 0,
    reported_annotations BIGINT NOT NULL DEFAULT 0,
    isa_annotations BIGINT NOT NULL DEFAULT 0,
    mapping_annotations BIGINT NOT NULL DEFAULT 0,
    UNIQUE KEY uq_resource_ontology (resource_id, ontology_id),
    CONSTRAINT fk_statistics_resource FOREIGN KEY (resource_id)
        REFERENCES obr_resource (id) ON DELETE CASCADE
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// Counts for one ontology within one resource.
///
/// `resource_id` is the numeric `obr_resource.id`, not the short code.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct AnnotationStatistics {
    pub resource_id: i32,
    pub ontology_id: i32,
    pub aggregated_annotations: i64,
    pub mgrep_annotations: i64,
    pub reported_annotations: i64,
    pub isa_annotations: i64,
    pub mapping_annotations: i64,
}

#[derive(Debug, Clone)]
pub struct StatisticsTable {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl StatisticsTable {
    pub fn new(pool: MySqlPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub async fn create_table(&self) -> DbResult<()> {
        let pool = &self.pool;
        with_retry(&self.retry, "statistics.create_table", || async move {
            sqlx::query(CREATE_TABLE).execute(pool).await
        })
        .await?;
        Ok(())
    }

    pub async fn upsert(&self, stats: &AnnotationStatistics) -> DbResult<()> {
        let pool = &self.pool;
        with_retry(&self.retry, "statistics.upsert", || async move {
            sqlx::query(
                "INSERT INTO obr_statistics (resource_id, ontology_id, aggregated_annotations, \
                 mgrep_annotations, reported_annotations, isa_annotations, mapping_annotations) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON DUPLICATE KEY UPDATE \
                 aggregated_annotations = VALUES(aggregated_annotations), \
                 mgrep_annotations = VALUES(mgrep_annotations), \
                 reported_annotations = VALUES(reported_annotations), \
                 isa_annotations = VALUES(isa_annotations), \
                 mapping_annotations = VALUES(mapping_annotations)",
            )
            .bind(stats.resource_id)
            .bind(stats.ontology_id)
            .bind(stats.aggregated_annotations)
            .bind(stats.mgrep_annotations)
            .bind(stats.reported_annotations)
            .bind(stats.isa_annotations)
            .bind(stats.mapping_annotations)
            .execute(pool)
            .await
        })
        .await?;
        Ok(())
    }

    /// Rows for a resource, looked up by its short code
    pub async fn for_resource(&self, resource_id: &str) -> DbResult<Vec<AnnotationStatistics>> {
        let pool = &self.pool;
        let rows = with_retry(&self.retry, "statistics.for_resource", || async move {
            sqlx::query_as::<_, AnnotationStatistics>(
                "SELECT s.resource_id, s.ontology_id, s.aggregated_annotations, \
                 s.mgrep_annotations, s.reported_annotations, s.isa_annotations, \
                 s.mapping_annotations \
                 FROM obr_statistics s JOIN obr_resource r ON r.id = s.resource_id \
                 WHERE r.resource_id = ? ORDER BY s.ontology_id",
            )
            .bind(resource_id)
            .fetch_all(pool)
            .await
        })
        .await?;
        Ok(rows)
    }

    /// Returns the number of rows removed
    pub async fn delete_for_resource(&self, resource_id: &str) -> DbResult<u64> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "statistics.delete_for_resource", || async move {
            sqlx::query(
                "DELETE s FROM obr_statistics s JOIN obr_resource r ON r.id = s.resource_id \
                 WHERE r.resource_id = ?",
            )
            .bind(resource_id)
            .execute(pool)
            .await
        })
        .await?;
        Ok(result.rows_affected())
    }
}
