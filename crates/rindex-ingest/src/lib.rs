//! Resource index ingestion
//!
//! Loads records from external biomedical resources into per-resource MySQL
//! element tables:
//!
//! - **Connectors** ([`resources`]): one [`ResourceAccessTool`] per source,
//!   speaking HTTP, FTP, flat files or a partner database
//! - **Pipeline** ([`framework::pipeline`]): fetch, conform, dedupe and insert
//! - **DAOs** ([`db`]): element, resource, statistics, execution and OBS tables
//! - **CLI** ([`cli`], [`commands`]): the `rindex` binary

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod framework;
pub mod progress;
pub mod resources;

pub use cli::{Cli, Commands};
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use framework::{ResourceAccessTool, ResourcePipeline};
