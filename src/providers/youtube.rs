//! YouTube Data API v3 client for educational video search.
//!
//! A search is two requests: `search.list` for ids and snippets, then one
//! `videos.list` for view counts and durations. Details for a single video
//! come from one `videos.list` call.

use crate::providers::json::parse_json_with_context;
use crate::providers::{
    QuestionContext, SearchError, SearchOptions, VideoDetails, VideoDuration, VideoSearch,
};
use crate::solutions::model::VideoResult;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Question text beyond this many characters is left out of the search query.
const QUERY_TEXT_CHARS: usize = 100;

const QUERY_SUFFIX: &str = "tutorial explanation education lecture";

const MAX_ERROR_BODY: usize = 500;

/// Build the search query for a question: subject, leading question text, and
/// keywords that steer results toward lectures.
pub fn video_query(question: &QuestionContext) -> String {
    let head: String = question.text.chars().take(QUERY_TEXT_CHARS).collect();
    let head = head.trim();
    match question.subject.as_deref().map(str::trim) {
        Some(subject) if !subject.is_empty() => format!("{subject} {head} {QUERY_SUFFIX}"),
        _ => format!("{head} {QUERY_SUFFIX}"),
    }
}

pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    channel_id: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    /// Largest available thumbnail, or empty.
    fn best(self) -> String {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    /// Only present when requested with `part=snippet`.
    snippet: Option<Snippet>,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn video_result(
    video_id: String,
    title: String,
    channel: String,
    thumbnail_url: String,
    view_count: u64,
    duration: Option<String>,
) -> VideoResult {
    VideoResult {
        watch_url: format!("https://www.youtube.com/watch?v={video_id}"),
        embed_url: format!("https://www.youtube.com/embed/{video_id}"),
        video_id,
        title,
        channel,
        thumbnail_url,
        view_count,
        duration: duration.unwrap_or_else(|| "PT0S".to_owned()),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl YouTubeClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        url::Url::parse(base_url)
            .with_context(|| format!("Invalid YouTube base URL: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build YouTube HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::NotConfigured)?;
        let resp = self
            .http
            .get(format!("{}/youtube/v3/{resource}", self.base_url))
            .query(params)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(SearchError::from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(SearchError::from_reqwest)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), resource, "YouTube request rejected");
            return Err(match status.as_u16() {
                429 => SearchError::QuotaExhausted,
                403 if text.contains("quotaExceeded") => SearchError::QuotaExhausted,
                408 | 504 => SearchError::Timeout,
                code => SearchError::Upstream {
                    status: code,
                    body: text.chars().take(MAX_ERROR_BODY).collect(),
                },
            });
        }

        parse_json_with_context(&text).map_err(SearchError::Malformed)
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        options: SearchOptions,
    ) -> Result<Vec<VideoResult>, SearchError> {
        let max_results = max_results.to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("q", query),
            ("maxResults", max_results.as_str()),
            ("type", "video"),
            ("order", options.order.as_str()),
            ("relevanceLanguage", "en"),
            ("safeSearch", "strict"),
        ];
        if options.duration != VideoDuration::Any {
            params.push(("videoDuration", options.duration.as_str()));
        }
        let search: SearchListResponse = self.get_json("search", &params).await?;

        let hits: Vec<(String, Snippet)> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id.map(|id| (id, item.snippet)))
            .collect();

        if hits.is_empty() {
            debug!(query, "YouTube search returned no videos");
            return Ok(Vec::new());
        }

        let ids = hits
            .iter()
            .map(|(id, _)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let details: VideoListResponse = self
            .get_json("videos", &[("part", "statistics,contentDetails"), ("id", &ids)])
            .await?;
        let mut details: HashMap<String, VideoItem> = details
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let videos: Vec<VideoResult> = hits
            .into_iter()
            .map(|(video_id, snippet)| {
                let detail = details.remove(&video_id);
                let view_count = parse_count(
                    detail
                        .as_ref()
                        .and_then(|d| d.statistics.view_count.as_deref()),
                );
                let duration = detail.and_then(|d| d.content_details.duration);
                video_result(
                    video_id,
                    snippet.title,
                    snippet.channel_title,
                    snippet.thumbnails.best(),
                    view_count,
                    duration,
                )
            })
            .collect();

        debug!(query, count = videos.len(), "YouTube search completed");
        Ok(videos)
    }

    async fn details(&self, video_id: &str) -> Result<Option<VideoDetails>, SearchError> {
        let response: VideoListResponse = self
            .get_json(
                "videos",
                &[("part", "snippet,statistics,contentDetails"), ("id", video_id)],
            )
            .await?;

        let Some(item) = response.items.into_iter().next() else {
            debug!(video_id, "YouTube has no such video");
            return Ok(None);
        };
        let Some(snippet) = item.snippet else {
            return Err(SearchError::Malformed(format!(
                "video {video_id} returned without a snippet"
            )));
        };

        let stats = item.statistics;
        Ok(Some(VideoDetails {
            video: video_result(
                item.id,
                snippet.title,
                snippet.channel_title,
                snippet.thumbnails.best(),
                parse_count(stats.view_count.as_deref()),
                item.content_details.duration,
            ),
            description: snippet.description,
            channel_id: snippet.channel_id,
            published_at: snippet.published_at,
            tags: snippet.tags,
            like_count: parse_count(stats.like_count.as_deref()),
            comment_count: parse_count(stats.comment_count.as_deref()),
        }))
    }
}
