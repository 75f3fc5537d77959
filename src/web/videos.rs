//! Video search by free text or topic, and single-video details. None of
//! these are tied to a question or cached server-side.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::providers::{SearchOptions, VideoDetails, VideoDuration, VideoOrder};
use crate::state::AppState;
use crate::web::error::{ApiError, OptionNotFoundExt};
use crate::web::questions::VideoLink;
use crate::web::routes::{cache, with_cache_control};

const DEFAULT_MAX_RESULTS: u32 = 6;
const MAX_RESULTS_LIMIT: u32 = 25;

const TOPIC_SUFFIX: &str = "tutorial explanation lecture";

/// YouTube ids are 11 characters; anything much longer is not an id.
const MAX_VIDEO_ID_LEN: usize = 64;

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    pub order: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicParams {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct VideoSearchResponse {
    pub success: bool,
    pub videos: Vec<VideoLink>,
    pub total_results: usize,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct VideoDetailsDto {
    #[serde(flatten)]
    pub link: VideoLink,
    pub description: String,
    pub channel_id: Option<String>,
    pub published_at: Option<String>,
    pub tags: Vec<String>,
    #[ts(type = "number")]
    pub like_count: u64,
    #[ts(type = "number")]
    pub comment_count: u64,
}

impl From<VideoDetails> for VideoDetailsDto {
    fn from(details: VideoDetails) -> Self {
        Self {
            link: VideoLink::from(details.video),
            description: details.description,
            channel_id: details.channel_id,
            published_at: details.published_at,
            tags: details.tags,
            like_count: details.like_count,
            comment_count: details.comment_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct VideoDetailsResponse {
    pub success: bool,
    pub video: VideoDetailsDto,
}

fn check_max_results(max_results: u32) -> Result<(), ApiError> {
    if (1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "max_results must be between 1 and {MAX_RESULTS_LIMIT}"
        )))
    }
}

fn parse_order(raw: Option<&str>) -> Result<VideoOrder, ApiError> {
    match raw {
        None => Ok(VideoOrder::default()),
        Some(raw) => VideoOrder::parse(raw).ok_or_else(|| {
            ApiError::bad_request("order must be one of relevance, viewCount, rating, date")
        }),
    }
}

fn parse_duration(raw: Option<&str>) -> Result<VideoDuration, ApiError> {
    match raw {
        None => Ok(VideoDuration::default()),
        Some(raw) => VideoDuration::parse(raw).ok_or_else(|| {
            ApiError::bad_request("duration must be one of any, short, medium, long")
        }),
    }
}

/// Build the free-text query for a topic, led by its subject when given.
pub fn topic_query(topic: &str, subject: &str) -> String {
    let (topic, subject) = (topic.trim(), subject.trim());
    if subject.is_empty() {
        format!("{topic} {TOPIC_SUFFIX}")
    } else {
        format!("{subject} {topic} {TOPIC_SUFFIX}")
    }
}

async fn run_search(
    state: &AppState,
    query: String,
    max_results: u32,
    options: SearchOptions,
) -> Result<Response, ApiError> {
    let videos: Vec<VideoLink> = state
        .resolver
        .search_videos(&query, max_results, options)
        .await?
        .into_iter()
        .map(VideoLink::from)
        .collect();

    let body = VideoSearchResponse {
        success: true,
        total_results: videos.len(),
        videos,
        query,
    };
    Ok(with_cache_control(body, cache::SEARCH))
}

/// `GET /videos/search?query=...&max_results=6&order=relevance&duration=any`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }
    check_max_results(params.max_results)?;
    let options = SearchOptions {
        order: parse_order(params.order.as_deref())?,
        duration: parse_duration(params.duration.as_deref())?,
    };

    run_search(&state, query.to_owned(), params.max_results, options).await
}

/// `GET /videos/topic?topic=...&subject=...&max_results=6&order=relevance`
pub async fn topic(
    State(state): State<AppState>,
    Query(params): Query<TopicParams>,
) -> Result<Response, ApiError> {
    if params.topic.trim().is_empty() {
        return Err(ApiError::bad_request("Topic is required"));
    }
    check_max_results(params.max_results)?;
    let options = SearchOptions {
        order: parse_order(params.order.as_deref())?,
        duration: VideoDuration::Any,
    };

    let query = topic_query(&params.topic, &params.subject);
    run_search(&state, query, params.max_results, options).await
}

/// `GET /videos/{video_id}`
pub async fn details(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Response, ApiError> {
    let valid = !video_id.is_empty()
        && video_id.len() <= MAX_VIDEO_ID_LEN
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::bad_request("Invalid video id"));
    }

    let details = state
        .resolver
        .video_details(&video_id)
        .await?
        .or_not_found("Video not found")?;

    let body = VideoDetailsResponse {
        success: true,
        video: VideoDetailsDto::from(details),
    };
    Ok(with_cache_control(body, cache::SEARCH))
}
