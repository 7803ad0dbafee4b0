//! MySQL test container shared by the database tests
//!
//! Tests that use it are `#[ignore]`d by default because they need a Docker
//! daemon. Run them with:
//!
//! ```bash
//! cargo test -p rindex-ingest -- --ignored
//! ```

#![allow(dead_code)]

use anyhow::{Context, Result};
use rindex_common::{Resource, Structure};
use rindex_ingest::db::{Database, RetryPolicy};
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mysql::Mysql;
use tracing::info;

pub struct TestMysql {
    container: ContainerAsync<Mysql>,
    db: Database,
    url: String,
}

impl TestMysql {
    /// Start a container and create the shared schema
    pub async fn start() -> Result<Self> {
        info!("Starting MySQL test container...");
        let container = Mysql::default()
            .start()
            .await
            .context("Failed to start MySQL container")?;

        let host = container.get_host().await.context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(3306.tcp())
            .await
            .context("Failed to get container port")?;
        let url = format!("mysql://root@{}:{}/test", host, port);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;

        let db = Database::new(pool, RetryPolicy::new(2, Duration::from_millis(100)));
        db.create_shared_schema()
            .await
            .context("Failed to create shared schema")?;

        Ok(Self { container, db, url })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Small two-context resource for DAO tests
pub fn test_resource(resource_id: &str) -> Resource {
    Resource {
        name: format!("Test resource {}", resource_id),
        resource_id: resource_id.to_string(),
        structure: Structure::builder(resource_id)
            .context("title", 1.0, None)
            .context("summary", 0.8, Some("1009"))
            .build(),
        main_context: format!("{}_title", resource_id),
        url: "https://example.org/".to_string(),
        element_url: "https://example.org/element/".to_string(),
        description: "Resource used in tests".to_string(),
        logo: String::new(),
    }
}
