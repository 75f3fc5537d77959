//! Per-question AI solution and video endpoints.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::data::QuestionRecord;
use crate::providers::youtube::video_query;
use crate::solutions::{QuestionId, VideoResult};
use crate::state::AppState;
use crate::web::error::{ApiError, OptionNotFoundExt, storage_error};
use crate::web::routes::{cache, with_cache_control};

#[derive(Debug, Default, Deserialize)]
pub struct SolutionParams {
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoParams {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct AiSolutionDto {
    pub text: String,
    pub model: String,
    /// True when no provider call was made for this request.
    pub cached: bool,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct AiSolutionResponse {
    pub success: bool,
    pub ai_solution: AiSolutionDto,
    pub message: String,
}

/// A video as rendered by the question page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct VideoLink {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub url: String,
    pub embed_url: String,
    #[ts(type = "number")]
    pub views: u64,
    pub duration: String,
}

impl From<VideoResult> for VideoLink {
    fn from(video: VideoResult) -> Self {
        Self {
            video_id: video.video_id,
            title: video.title,
            channel: video.channel,
            thumbnail: video.thumbnail_url,
            url: video.watch_url,
            embed_url: video.embed_url,
            views: video.view_count,
            duration: video.duration,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct VideoLinksResponse {
    pub success: bool,
    pub video_links: Vec<VideoLink>,
    pub cached: bool,
    pub fetched_at: String,
    pub message: String,
}

/// Resolve a path id to a known question, or fail with 400/404.
async fn load_question(
    state: &AppState,
    raw_id: &str,
) -> Result<(QuestionId, QuestionRecord), ApiError> {
    let id =
        QuestionId::parse(raw_id).ok_or_else(|| ApiError::bad_request("Invalid question id"))?;
    let record = state
        .questions
        .get(&id)
        .await
        .map_err(|e| storage_error("Question lookup", e))?
        .or_not_found("Question not found")?;
    if record.text.trim().is_empty() {
        return Err(ApiError::bad_request("Question has no text to solve"));
    }
    Ok((id, record))
}

/// `POST /questions/{id}/ai-solution[?regenerate=true]`
pub async fn ai_solution(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<SolutionParams>,
) -> Result<Response, ApiError> {
    let (id, record) = load_question(&state, &raw_id).await?;
    let context = record.context();

    let outcome = if params.regenerate {
        info!(question = %id, "regenerating AI solution");
        state.resolver.regenerate_solution(&id, &context).await?
    } else {
        state.resolver.get_or_generate_solution(&id, &context).await?
    };

    let message = if outcome.cached {
        "AI solution retrieved from cache"
    } else {
        "AI solution generated successfully"
    };

    let body = AiSolutionResponse {
        success: true,
        ai_solution: AiSolutionDto {
            text: outcome.solution.text,
            model: outcome.solution.model,
            cached: outcome.cached,
            generated_at: outcome.solution.generated_at.to_rfc3339(),
        },
        message: message.to_owned(),
    };
    Ok(with_cache_control(body, cache::NO_STORE))
}

/// `GET /questions/{id}/videos[?refresh=true]`
pub async fn video_links(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<VideoParams>,
) -> Result<Response, ApiError> {
    let (id, record) = load_question(&state, &raw_id).await?;
    let query = video_query(&record.context());

    let outcome = state
        .resolver
        .get_or_fetch_videos(&id, &query, params.refresh)
        .await?;

    let message = if outcome.videos.is_empty() {
        "No videos found for this question".to_owned()
    } else {
        format!("Found {} videos", outcome.videos.len())
    };

    let body = VideoLinksResponse {
        success: true,
        video_links: outcome.videos.into_iter().map(VideoLink::from).collect(),
        cached: outcome.cached,
        fetched_at: outcome.fetched_at.to_rfc3339(),
        message,
    };
    Ok(with_cache_control(body, cache::NO_STORE))
}
