//! Public entry points for resolving question artifacts.
//!
//! Composes the single-flight cache with one provider per artifact kind and
//! caps the number of concurrent provider calls. The cap applies only to real
//! provider work; cache and store hits never wait for a permit.

use crate::providers::{
    QuestionContext, SearchOptions, SolutionGenerator, VideoDetails, VideoDuration, VideoOrder,
    VideoSearch,
};
use crate::solutions::errors::ResolveError;
use crate::solutions::model::{
    AiSolution, Artifact, ArtifactKey, ArtifactKind, QuestionId, VideoResult, VideoSet,
};
use crate::solutions::singleflight::{CacheStats, RefreshPolicy, Resolution, SingleFlightCache};
use crate::solutions::store::ArtifactStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Per-question searches prefer medium-length videos.
const QUESTION_SEARCH: SearchOptions = SearchOptions {
    order: VideoOrder::Relevance,
    duration: VideoDuration::Medium,
};

/// Tunables for [`ResolutionService`].
#[derive(Debug, Clone)]
pub struct ResolutionOptions {
    /// Upper bound on simultaneous provider calls across both kinds.
    pub max_concurrent_calls: usize,
    /// How long a provider call may queue for a permit before it is rejected.
    pub queue_timeout: Duration,
    /// Number of videos requested per cached search.
    pub video_max_results: u32,
    pub refresh_policy: RefreshPolicy,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 8,
            queue_timeout: Duration::from_secs(10),
            video_max_results: 5,
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

/// An AI solution and whether a provider call was needed to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionOutcome {
    pub solution: AiSolution,
    pub cached: bool,
}

/// A video set and whether a provider call was needed to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutcome {
    pub videos: Vec<VideoResult>,
    pub fetched_at: DateTime<Utc>,
    pub cached: bool,
}

/// Semaphore with a bounded wait; excess callers are rejected as overloaded.
#[derive(Clone)]
struct ProviderLimiter {
    permits: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl ProviderLimiter {
    fn new(max_concurrent_calls: usize, queue_timeout: Duration) -> Self {
        let permits = max_concurrent_calls.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(permits)),
            queue_timeout,
        }
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, ResolveError> {
        let start = Instant::now();
        match tokio::time::timeout(self.queue_timeout, self.permits.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(ResolveError::Internal(
                "provider limiter closed".to_owned(),
            )),
            Err(_elapsed) => {
                warn!(
                    waited = crate::utils::fmt_duration(start.elapsed()),
                    "provider capacity exhausted, rejecting call"
                );
                Err(ResolveError::Overloaded {
                    waited: start.elapsed(),
                })
            }
        }
    }
}

pub struct ResolutionService {
    cache: SingleFlightCache,
    generator: Arc<dyn SolutionGenerator>,
    videos: Arc<dyn VideoSearch>,
    limiter: ProviderLimiter,
    video_max_results: u32,
}

impl ResolutionService {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        generator: Arc<dyn SolutionGenerator>,
        videos: Arc<dyn VideoSearch>,
        options: ResolutionOptions,
    ) -> Self {
        Self {
            cache: SingleFlightCache::new(store, options.refresh_policy),
            generator,
            videos,
            limiter: ProviderLimiter::new(options.max_concurrent_calls, options.queue_timeout),
            video_max_results: options.video_max_results,
        }
    }

    /// Return the cached solution for a question, generating it once if needed.
    pub async fn get_or_generate_solution(
        &self,
        question_id: &QuestionId,
        question: &QuestionContext,
    ) -> Result<SolutionOutcome, ResolveError> {
        self.resolve_solution(question_id, question, false).await
    }

    /// Replace the cached solution with a freshly generated one.
    pub async fn regenerate_solution(
        &self,
        question_id: &QuestionId,
        question: &QuestionContext,
    ) -> Result<SolutionOutcome, ResolveError> {
        self.resolve_solution(question_id, question, true).await
    }

    /// Return the cached video set for a question, searching once if needed
    /// (or unconditionally when `force_refresh` is set).
    pub async fn get_or_fetch_videos(
        &self,
        question_id: &QuestionId,
        query: &str,
        force_refresh: bool,
    ) -> Result<VideoOutcome, ResolveError> {
        let key = ArtifactKey::new(question_id.clone(), ArtifactKind::VideoSet);
        let videos = self.videos.clone();
        let limiter = self.limiter.clone();
        let query = query.to_owned();
        let max_results = self.video_max_results;

        let source = move || async move {
            let _permit = limiter.acquire().await?;
            let found = videos.search(&query, max_results, QUESTION_SEARCH).await?;
            Ok::<_, ResolveError>(Artifact::VideoSet(VideoSet {
                videos: found,
                fetched_at: Utc::now(),
            }))
        };

        let resolution = self.cache.resolve(key, force_refresh, source).await?;
        let cached = resolution.is_cached();
        let set = expect_videos(resolution)?;
        debug!(question = %question_id, cached, count = set.videos.len(), "videos resolved");
        Ok(VideoOutcome {
            videos: set.videos,
            fetched_at: set.fetched_at,
            cached,
        })
    }

    /// Uncached search, still bounded by the provider concurrency limit.
    pub async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
        options: SearchOptions,
    ) -> Result<Vec<VideoResult>, ResolveError> {
        let _permit = self.limiter.acquire().await?;
        Ok(self.videos.search(query, max_results, options).await?)
    }

    /// Uncached single-video lookup, bounded like [`Self::search_videos`].
    pub async fn video_details(
        &self,
        video_id: &str,
    ) -> Result<Option<VideoDetails>, ResolveError> {
        let _permit = self.limiter.acquire().await?;
        Ok(self.videos.details(video_id).await?)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn resolve_solution(
        &self,
        question_id: &QuestionId,
        question: &QuestionContext,
        force_refresh: bool,
    ) -> Result<SolutionOutcome, ResolveError> {
        let key = ArtifactKey::new(question_id.clone(), ArtifactKind::AiSolution);
        let generator = self.generator.clone();
        let limiter = self.limiter.clone();
        let question = question.clone();

        let source = move || async move {
            let _permit = limiter.acquire().await?;
            let generated = generator.generate(&question).await?;
            Ok::<_, ResolveError>(Artifact::AiSolution(AiSolution {
                text: generated.text,
                model: generated.model,
                generated_at: Utc::now(),
            }))
        };

        let resolution = self.cache.resolve(key, force_refresh, source).await?;
        let cached = resolution.is_cached();
        let solution = expect_solution(resolution)?;
        debug!(question = %question_id, cached, force_refresh, "solution resolved");
        Ok(SolutionOutcome { solution, cached })
    }
}

fn expect_solution(resolution: Resolution) -> Result<AiSolution, ResolveError> {
    match Arc::unwrap_or_clone(resolution.artifact) {
        Artifact::AiSolution(solution) => Ok(solution),
        other => Err(ResolveError::Internal(format!(
            "expected ai_solution artifact, found {}",
            other.kind()
        ))),
    }
}

fn expect_videos(resolution: Resolution) -> Result<VideoSet, ResolveError> {
    match Arc::unwrap_or_clone(resolution.artifact) {
        Artifact::VideoSet(set) => Ok(set),
        other => Err(ResolveError::Internal(format!(
            "expected video_set artifact, found {}",
            other.kind()
        ))),
    }
}
