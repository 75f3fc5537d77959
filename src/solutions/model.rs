//! Artifact types shared by the cache, the stores, and the providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque question identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Trim and validate a raw identifier (e.g. a path segment).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two derived artifact kinds. Each has its own cache namespace and provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    AiSolution,
    VideoSet,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::AiSolution => "ai_solution",
            ArtifactKind::VideoSet => "video_set",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: one entry per question per artifact kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub question_id: QuestionId,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    pub fn new(question_id: QuestionId, kind: ArtifactKind) -> Self {
        Self { question_id, kind }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.question_id, self.kind)
    }
}

/// An AI-generated explanation for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSolution {
    pub text: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

/// A single video returned by the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail_url: String,
    pub embed_url: String,
    pub watch_url: String,
    pub view_count: u64,
    /// ISO 8601 duration as reported by the provider, e.g. `PT12M5S`.
    pub duration: String,
}

/// An ordered set of videos for a question, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSet {
    pub videos: Vec<VideoResult>,
    pub fetched_at: DateTime<Utc>,
}

/// A derived, cacheable result for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    AiSolution(AiSolution),
    VideoSet(VideoSet),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::AiSolution(_) => ArtifactKind::AiSolution,
            Artifact::VideoSet(_) => ArtifactKind::VideoSet,
        }
    }

    pub fn as_solution(&self) -> Option<&AiSolution> {
        match self {
            Artifact::AiSolution(solution) => Some(solution),
            Artifact::VideoSet(_) => None,
        }
    }
}
