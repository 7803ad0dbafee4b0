//! Error types for ingestion, connectors and the CLI

use rindex_common::RiError;
use thiserror::Error;

use crate::db::DbError;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FTP error: {0}")]
    Ftp(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Domain(#[from] RiError),

    #[error("Failed to parse {resource_id} data: {message}")]
    Parse {
        resource_id: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource '{0}' does not support online queries")]
    QueryUnsupported(String),

    #[error("Unknown resource '{requested}'. Known resources: {known}")]
    UnknownResource { requested: String, known: String },

    #[error("Ingestion failed for {}", .0.join(", "))]
    ResourcesFailed(Vec<String>),
}

impl IngestError {
    pub fn parse(resource_id: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            resource_id: resource_id.to_string(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::Sqlx(err))
    }
}

impl From<quick_xml::Error> for IngestError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for IngestError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<suppaftp::FtpError> for IngestError {
    fn from(err: suppaftp::FtpError) -> Self {
        Self::Ftp(err.to_string())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = IngestError::parse("GEO", "missing Id element");
        assert_eq!(err.to_string(), "Failed to parse GEO data: missing Id element");
    }

    #[test]
    fn test_unknown_resource_lists_known() {
        let err = IngestError::UnknownResource {
            requested: "XYZ".to_string(),
            known: "CT, GEO".to_string(),
        };
        assert!(err.to_string().contains("CT, GEO"));
    }

    #[test]
    fn test_resources_failed_names_each() {
        let err = IngestError::ResourcesFailed(vec!["GEO".to_string(), "OMIM".to_string()]);
        assert_eq!(err.to_string(), "Ingestion failed for GEO, OMIM");
    }
}
