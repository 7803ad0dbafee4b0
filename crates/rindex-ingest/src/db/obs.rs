//! OBS tables: dictionaries, ontologies, concepts and terms
//!
//! The annotation workflow owns these; ingestion only reads the latest
//! dictionary and checks that structure ontologies are loaded. The insert
//! methods exist for seeding.

use chrono::NaiveDateTime;
use sqlx::mysql::MySqlPool;

use super::{with_retry, DbResult, RetryPolicy};

const CREATE_DICTIONARY: &str = r#"
CREATE TABLE IF NOT EXISTS obs_dictionary (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    date_created DATETIME NOT NULL
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const CREATE_ONTOLOGY: &str = r#"
CREATE TABLE IF NOT EXISTS obs_ontology (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    local_ontology_id VARCHAR(64) NOT NULL,
    name VARCHAR(255) NOT NULL,
    version VARCHAR(64) NOT NULL DEFAULT '',
    description TEXT,
    status INT NOT NULL DEFAULT 0,
    virtual_ontology_id VARCHAR(64) NOT NULL,
    format VARCHAR(32) NOT NULL DEFAULT '',
    dictionary_id INT NOT NULL,
    UNIQUE KEY uq_local_ontology_id (local_ontology_id),
    KEY idx_virtual_ontology_id (virtual_ontology_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const CREATE_CONCEPT: &str = r#"
CREATE TABLE IF NOT EXISTS obs_concept (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    local_concept_id VARCHAR(246) NOT NULL,
    ontology_id INT NOT NULL,
    is_toplevel BOOLEAN NOT NULL DEFAULT FALSE,
    UNIQUE KEY uq_local_concept_id (local_concept_id),
    KEY idx_concept_ontology (ontology_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

const CREATE_TERM: &str = r#"
CREATE TABLE IF NOT EXISTS obs_term (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name TEXT NOT NULL,
    concept_id INT NOT NULL,
    is_preferred BOOLEAN NOT NULL DEFAULT FALSE,
    KEY idx_term_concept (concept_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DictionaryRow {
    pub id: i32,
    pub name: String,
    pub date_created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OntologyRow {
    pub id: i32,
    pub local_ontology_id: String,
    pub name: String,
    pub version: String,
    pub virtual_ontology_id: String,
    pub dictionary_id: i32,
}

/// Values for a new `obs_ontology` row
#[derive(Debug, Clone)]
pub struct NewOntology {
    pub local_ontology_id: String,
    pub name: String,
    pub version: String,
    pub virtual_ontology_id: String,
    pub dictionary_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ConceptRow {
    pub id: i32,
    pub local_concept_id: String,
    pub ontology_id: i32,
    pub is_toplevel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TermRow {
    pub id: i32,
    pub name: String,
    pub concept_id: i32,
    pub is_preferred: bool,
}

#[derive(Debug, Clone)]
pub struct ObsTables {
    pool: MySqlPool,
    retry: RetryPolicy,
}

impl ObsTables {
    pub fn new(pool: MySqlPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    pub async fn create_tables(&self) -> DbResult<()> {
        let pool = &self.pool;
        for ddl in [CREATE_DICTIONARY, CREATE_ONTOLOGY, CREATE_CONCEPT, CREATE_TERM] {
            with_retry(&self.retry, "obs.create_tables", || async move {
                sqlx::query(ddl).execute(pool).await
            })
            .await?;
        }
        Ok(())
    }

    pub async fn latest_dictionary(&self) -> DbResult<Option<DictionaryRow>> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "obs.latest_dictionary", || async move {
            sqlx::query_as::<_, DictionaryRow>(
                "SELECT id, name, date_created FROM obs_dictionary ORDER BY id DESC LIMIT 1",
            )
            .fetch_optional(pool)
            .await
        })
        .await?;
        Ok(row)
    }

    pub async fn add_dictionary(&self, name: &str) -> DbResult<i32> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "obs.add_dictionary", || async move {
            sqlx::query("INSERT INTO obs_dictionary (name, date_created) VALUES (?, UTC_TIMESTAMP())")
                .bind(name)
                .execute(pool)
                .await
        })
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    pub async fn add_ontology(&self, ontology: &NewOntology) -> DbResult<i32> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "obs.add_ontology", || async move {
            sqlx::query(
                "INSERT INTO obs_ontology \
                 (local_ontology_id, name, version, virtual_ontology_id, dictionary_id) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&ontology.local_ontology_id)
            .bind(&ontology.name)
            .bind(&ontology.version)
            .bind(&ontology.virtual_ontology_id)
            .bind(ontology.dictionary_id)
            .execute(pool)
            .await
        })
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    /// Most recent version of an ontology, by its stable virtual ID
    pub async fn ontology_by_virtual_id(
        &self,
        virtual_ontology_id: &str,
    ) -> DbResult<Option<OntologyRow>> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "obs.ontology_by_virtual_id", || async move {
            sqlx::query_as::<_, OntologyRow>(
                "SELECT id, local_ontology_id, name, version, virtual_ontology_id, dictionary_id \
                 FROM obs_ontology WHERE virtual_ontology_id = ? ORDER BY id DESC LIMIT 1",
            )
            .bind(virtual_ontology_id)
            .fetch_optional(pool)
            .await
        })
        .await?;
        Ok(row)
    }

    pub async fn add_concept(
        &self,
        local_concept_id: &str,
        ontology_id: i32,
        is_toplevel: bool,
    ) -> DbResult<i32> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "obs.add_concept", || async move {
            sqlx::query(
                "INSERT INTO obs_concept (local_concept_id, ontology_id, is_toplevel) \
                 VALUES (?, ?, ?)",
            )
            .bind(local_concept_id)
            .bind(ontology_id)
            .bind(is_toplevel)
            .execute(pool)
            .await
        })
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    pub async fn concept_by_local_id(&self, local_concept_id: &str) -> DbResult<Option<ConceptRow>> {
        let pool = &self.pool;
        let row = with_retry(&self.retry, "obs.concept_by_local_id", || async move {
            sqlx::query_as::<_, ConceptRow>(
                "SELECT id, local_concept_id, ontology_id, is_toplevel \
                 FROM obs_concept WHERE local_concept_id = ?",
            )
            .bind(local_concept_id)
            .fetch_optional(pool)
            .await
        })
        .await?;
        Ok(row)
    }

    pub async fn add_term(&self, name: &str, concept_id: i32, is_preferred: bool) -> DbResult<i32> {
        let pool = &self.pool;
        let result = with_retry(&self.retry, "obs.add_term", || async move {
            sqlx::query("INSERT INTO obs_term (name, concept_id, is_preferred) VALUES (?, ?, ?)")
                .bind(name)
                .bind(concept_id)
                .bind(is_preferred)
                .execute(pool)
                .await
        })
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    /// Preferred term first, then synonyms in insertion order
    pub async fn terms_for_concept(&self, concept_id: i32) -> DbResult<Vec<TermRow>> {
        let pool = &self.pool;
        let rows = with_retry(&self.retry, "obs.terms_for_concept", || async move {
            sqlx::query_as::<_, TermRow>(
                "SELECT id, name, concept_id, is_preferred FROM obs_term \
                 WHERE concept_id = ? ORDER BY is_preferred DESC, id",
            )
            .bind(concept_id)
            .fetch_all(pool)
            .await
        })
        .await?;
        Ok(rows)
    }

    pub async fn preferred_term(&self, concept_id: i32) -> DbResult<Option<String>> {
        let pool = &self.pool;
        let name = with_retry(&self.retry, "obs.preferred_term", || async move {
            sqlx::query_scalar(
                "SELECT name FROM obs_term WHERE concept_id = ? AND is_preferred = TRUE \
                 ORDER BY id LIMIT 1",
            )
            .bind(concept_id)
            .fetch_optional(pool)
            .await
        })
        .await?;
        Ok(name)
    }
}
