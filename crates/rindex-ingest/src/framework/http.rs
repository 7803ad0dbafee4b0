//! HTTP client shared by the web-API connectors

use regex::Regex;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{IngestError, Result};

static NEXT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"<([^>]+)>\s*;[^,]*?rel\s*=\s*"?next"?"#).expect("static regex")
});

/// `reqwest` wrapper with timeouts, polite delays and retry on transient failures
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Send the request built by `build`, retrying connect errors,
    /// timeouts, 429 and 5xx responses with exponential backoff.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 1;

        loop {
            if self.config.request_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.request_delay_ms))
                    .await;
            }
            debug!(url, attempt, "HTTP request");

            let error = match build(&self.client).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error = IngestError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    };
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                },
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => e.into(),
                Err(e) => return Err(e.into()),
            };

            if attempt >= max_attempts {
                warn!(url, attempts = attempt, error = %error, "Giving up on request");
                return Err(error);
            }
            let delay = self.config.retry_delay(attempt);
            warn!(
                url,
                attempt,
                max_attempts,
                error = %error,
                "Request failed, retrying in {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self.send(url, |c| c.get(url).query(query)).await?;
        Ok(response.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get_text(url, query).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(url, |c| c.post(url).json(body)).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url, |c| c.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// GET returning the body and the `rel="next"` target of the `Link` header
    pub async fn get_text_with_next_link(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(String, Option<String>)> {
        let response = self.send(url, |c| c.get(url).query(query)).await?;
        let next = response
            .headers()
            .get_all(reqwest::header::LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(parse_next_link);
        Ok((response.text().await?, next))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Extract the `rel="next"` URL from an RFC 8288 `Link` header value
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        NEXT_LINK_RE
            .captures(link)
            .map(|caps| caps[1].trim().to_string())
    })
}
