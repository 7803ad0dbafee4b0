//! YouTube videos, via the Data API v3 search and videos.list endpoints

use async_trait::async_trait;
use rindex_common::text::{join_values, normalize};
use rindex_common::{Element, Resource, Structure};
use serde::Deserialize;
use tracing::debug;

use crate::config::{env_opt, env_or, env_string, require_http_url};
use crate::error::{IngestError, Result};
use crate::framework::access_tool::{ElementCollector, FetchContext, ResourceAccessTool};
use crate::framework::http::HttpClient;

pub const RESOURCE_ID: &str = "YTB";

/// videos.list accepts at most 50 IDs per call
const MAX_IDS_PER_CALL: usize = 50;

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub query: String,
    /// Restrict the search to one channel
    pub channel_id: Option<String>,
    /// Search pages to walk; each holds up to 50 videos
    pub max_pages: usize,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            api_key: None,
            query: "biomedical research lecture".to_string(),
            channel_id: None,
            max_pages: 10,
        }
    }
}

impl YouTubeConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            base_url: env_string("YOUTUBE_BASE_URL", &d.base_url),
            api_key: env_opt("YOUTUBE_API_KEY"),
            query: env_string("YOUTUBE_QUERY", &d.query),
            channel_id: env_opt("YOUTUBE_CHANNEL_ID"),
            max_pages: env_or("YOUTUBE_MAX_PAGES", d.max_pages)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_http_url("YOUTUBE_BASE_URL", &self.base_url)?;
        if self.api_key.is_none() {
            return Err(IngestError::config("YOUTUBE_API_KEY not set"));
        }
        Ok(())
    }
}

pub fn resource() -> Resource {
    Resource {
        name: "YouTube".to_string(),
        resource_id: RESOURCE_ID.to_string(),
        structure: Structure::builder(RESOURCE_ID)
            .context("title", 1.0, None)
            .context("description", 0.8, None)
            .context("tags", 0.6, None)
            .build(),
        main_context: "YTB_title".to_string(),
        url: "https://www.youtube.com/".to_string(),
        element_url: "https://www.youtube.com/watch?v=".to_string(),
        description: "Biomedical videos published on YouTube.".to_string(),
        logo: String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub next_page_token: Option<String>,
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchItemId {
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VideosResponse {
    pub items: Vec<Video>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl Video {
    pub fn to_element(&self) -> Element {
        Element::new(self.id.trim())
            .with("YTB_title", normalize(&self.snippet.title))
            .with("YTB_description", normalize(&self.snippet.description))
            .with("YTB_tags", join_values(&self.snippet.tags))
    }
}

impl SearchResponse {
    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter_map(|item| item.id.video_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

pub struct YouTubeTool {
    resource: Resource,
    config: YouTubeConfig,
    api_key: String,
    http: HttpClient,
}

impl YouTubeTool {
    pub fn new(config: YouTubeConfig, http: HttpClient) -> Result<Self> {
        config.validate()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| IngestError::config("YOUTUBE_API_KEY not set"))?;
        Ok(Self {
            resource: resource(),
            config,
            api_key,
            http,
        })
    }

    async fn search(&self, page_token: Option<&str>) -> Result<SearchResponse> {
        let url = format!("{}/search", self.config.base_url);
        let mut params = vec![
            ("part", "id".to_string()),
            ("type", "video".to_string()),
            ("maxResults", MAX_IDS_PER_CALL.to_string()),
            ("q", self.config.query.clone()),
            ("key", self.api_key.clone()),
        ];
        if let Some(channel) = &self.config.channel_id {
            params.push(("channelId", channel.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.http.get_json(&url, &params).await
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        let url = format!("{}/videos", self.config.base_url);
        let params = [
            ("part", "snippet".to_string()),
            ("id", ids.join(",")),
            ("key", self.api_key.clone()),
        ];
        let response: VideosResponse = self.http.get_json(&url, &params).await?;
        Ok(response.items)
    }
}

#[async_trait]
impl ResourceAccessTool for YouTubeTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        let mut collector = ElementCollector::new(ctx);
        let mut token: Option<String> = None;

        for page_number in 1..=self.config.max_pages {
            let page = self.search(token.as_deref()).await?;

            let mut new_ids: Vec<String> = Vec::new();
            for id in page.video_ids() {
                if collector.wants(id) && !new_ids.iter().any(|n| n == id) {
                    new_ids.push(id.to_string());
                } else {
                    collector.skip_known();
                }
            }
            if let Some(remaining) = collector.remaining() {
                new_ids.truncate(remaining);
            }
            debug!(resource_id = RESOURCE_ID, page = page_number, new = new_ids.len(), "Search page");

            if !new_ids.is_empty() {
                for video in self.videos(&new_ids).await? {
                    if !video.id.trim().is_empty() {
                        collector.push(video.to_element());
                    }
                }
            }

            match page.next_page_token {
                Some(next) if !collector.is_full() && !page.items.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(collector.finish(RESOURCE_ID))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_ids_skip_channels() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"nextPageToken": "CAUQAA", "items": [
                {"id": {"kind": "youtube#video", "videoId": "dQw4w9WgXcQ"}},
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.video_ids().collect::<Vec<_>>(), vec!["dQw4w9WgXcQ"]);
        assert_eq!(response.next_page_token.as_deref(), Some("CAUQAA"));
    }

    #[test]
    fn test_video_to_element() {
        let response: VideosResponse = serde_json::from_str(
            r#"{"items": [{"id": "abc123", "snippet": {
                "title": "CRISPR &amp; gene editing",
                "description": "Lecture\n\nnotes",
                "tags": ["CRISPR", "genetics", "crispr"]}}]}"#,
        )
        .unwrap();
        let element = response.items[0].to_element();
        assert_eq!(element.local_element_id(), "abc123");
        assert_eq!(element.field("YTB_title"), Some("CRISPR & gene editing"));
        assert_eq!(element.field("YTB_description"), Some("Lecture notes"));
        assert_eq!(element.field("YTB_tags"), Some("CRISPR, genetics"));
    }

    #[test]
    fn test_api_key_required() {
        assert!(YouTubeConfig::default().validate().is_err());
    }
}
