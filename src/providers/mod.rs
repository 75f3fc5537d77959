//! External solution providers: AI text generation and video search.
//!
//! Both are opaque, failure-prone collaborators behind object-safe traits so
//! the resolution layer can be driven by fakes in tests.

pub mod errors;
pub mod gemini;
pub mod json;
pub mod youtube;

pub use errors::{GenerationError, SearchError};
pub use gemini::GeminiClient;
pub use youtube::YouTubeClient;

use crate::solutions::model::VideoResult;
use async_trait::async_trait;

/// The question as handed to the AI provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionContext {
    pub text: String,
    pub subject: Option<String>,
}

impl QuestionContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Raw provider output before it becomes a cached artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSolution {
    pub text: String,
    pub model: String,
}

#[async_trait]
pub trait SolutionGenerator: Send + Sync {
    async fn generate(&self, question: &QuestionContext) -> Result<GeneratedSolution, GenerationError>;
}

/// Result ordering for a video search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoOrder {
    #[default]
    Relevance,
    ViewCount,
    Rating,
    Date,
}

impl VideoOrder {
    pub const ALL: [VideoOrder; 4] = [
        VideoOrder::Relevance,
        VideoOrder::ViewCount,
        VideoOrder::Rating,
        VideoOrder::Date,
    ];

    /// Wire form, shared by the HTTP query string and the YouTube API.
    pub fn as_str(self) -> &'static str {
        match self {
            VideoOrder::Relevance => "relevance",
            VideoOrder::ViewCount => "viewCount",
            VideoOrder::Rating => "rating",
            VideoOrder::Date => "date",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.as_str() == raw)
    }
}

/// Video length filter. `Any` applies no filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoDuration {
    #[default]
    Any,
    /// Under four minutes.
    Short,
    /// Four to twenty minutes.
    Medium,
    /// Over twenty minutes.
    Long,
}

impl VideoDuration {
    pub const ALL: [VideoDuration; 4] = [
        VideoDuration::Any,
        VideoDuration::Short,
        VideoDuration::Medium,
        VideoDuration::Long,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoDuration::Any => "any",
            VideoDuration::Short => "short",
            VideoDuration::Medium => "medium",
            VideoDuration::Long => "long",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|duration| duration.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub order: VideoOrder,
    pub duration: VideoDuration,
}

/// Everything the provider reports about a single video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDetails {
    pub video: VideoResult,
    pub description: String,
    pub channel_id: Option<String>,
    pub published_at: Option<String>,
    pub tags: Vec<String>,
    pub like_count: u64,
    pub comment_count: u64,
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Search for videos, preserving the provider's ordering. May return nothing.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        options: SearchOptions,
    ) -> Result<Vec<VideoResult>, SearchError>;

    /// Look up one video by id. `None` when the provider does not know it.
    async fn details(&self, video_id: &str) -> Result<Option<VideoDetails>, SearchError>;
}
