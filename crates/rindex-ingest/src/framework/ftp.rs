//! Anonymous FTP downloads for flat-file resources
//!
//! `suppaftp`'s blocking stream runs on `spawn_blocking`; every session uses
//! extended passive mode.

use std::io::Read;
use std::time::Duration;
use suppaftp::FtpStream;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Attempts per operation, including the first
    pub max_retries: u32,
    /// Multiplied by the attempt number before each retry
    pub retry_delay_secs: u64,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 21,
            username: "anonymous".to_string(),
            password: "rindex@localhost".to_string(),
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

/// One line of a Unix-style `LIST` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: Option<u64>,
}

impl FtpEntry {
    /// Parse `drwxr-xr-x 2 ftp ftp 4096 Jan 01 12:00 name`; `None` for
    /// totals and other non-entry lines.
    pub fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 9 {
            return None;
        }
        let permissions = parts[0];
        if !permissions.starts_with(['d', '-', 'l']) {
            return None;
        }
        let name = parts[8..].join(" ");
        // symlinks: "name -> target"
        let name = name.split(" -> ").next().unwrap_or(&name).to_string();
        Some(Self {
            name,
            is_directory: permissions.starts_with('d'),
            size: parts[4].parse().ok(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FtpClient {
    config: FtpConfig,
}

impl FtpClient {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    pub async fn download_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = self
            .with_retries("RETR", path, Self::download_file_sync)
            .await?;
        info!(path, bytes = data.len(), "Downloaded file over FTP");
        Ok(data)
    }

    pub async fn list_directory(&self, path: &str) -> Result<Vec<FtpEntry>> {
        let entries = self
            .with_retries("LIST", path, Self::list_directory_sync)
            .await?;
        debug!(path, entries = entries.len(), "Listed FTP directory");
        Ok(entries)
    }

    async fn with_retries<T, F>(&self, operation: &str, path: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(&FtpConfig, &str) -> Result<T> + Send + Sync + Copy + 'static,
    {
        let max_retries = self.config.max_retries.max(1);

        for attempt in 1..=max_retries {
            let config = self.config.clone();
            let owned_path = path.to_string();
            let outcome = tokio::task::spawn_blocking(move || op(&config, &owned_path))
                .await
                .map_err(|e| IngestError::Ftp(format!("{} task panicked: {}", operation, e)))?;

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_retries => {
                    let delay = self.config.retry_delay_secs * u64::from(attempt);
                    warn!(
                        operation,
                        path,
                        attempt,
                        max_retries,
                        error = %e,
                        "FTP operation failed, retrying in {}s",
                        delay
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                },
                Err(e) => {
                    return Err(IngestError::Ftp(format!(
                        "{} {} failed after {} attempts: {}",
                        operation, path, max_retries, e
                    )))
                },
            }
        }

        Err(IngestError::Ftp(format!("{} {} was never attempted", operation, path)))
    }

    fn connect(config: &FtpConfig) -> Result<FtpStream> {
        debug!(host = %config.host, port = config.port, "Connecting to FTP server");
        let mut stream = FtpStream::connect(format!("{}:{}", config.host, config.port))?;
        stream.set_mode(suppaftp::Mode::ExtendedPassive);
        stream.login(&config.username, &config.password)?;
        stream.transfer_type(suppaftp::types::FileType::Binary)?;
        Ok(stream)
    }

    fn download_file_sync(config: &FtpConfig, path: &str) -> Result<Vec<u8>> {
        let mut stream = Self::connect(config)?;
        let mut reader = stream.retr_as_buffer(path)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if let Err(e) = stream.quit() {
            warn!(error = %e, "Failed to quit FTP session gracefully");
        }
        Ok(data)
    }

    fn list_directory_sync(config: &FtpConfig, path: &str) -> Result<Vec<FtpEntry>> {
        let mut stream = Self::connect(config)?;
        let lines = stream.list(Some(path))?;

        if let Err(e) = stream.quit() {
            warn!(error = %e, "Failed to quit FTP session gracefully");
        }
        Ok(lines.iter().filter_map(|l| FtpEntry::parse(l)).collect())
    }
}
