//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use examverse::data::{MemoryQuestionStore, QuestionRecord};
use examverse::providers::{
    GeneratedSolution, GenerationError, QuestionContext, SearchError, SearchOptions,
    SolutionGenerator, VideoDetails, VideoSearch,
};
use examverse::solutions::{
    Artifact, ArtifactStore, MemoryArtifactStore, QuestionId, ResolutionOptions,
    ResolutionService, VideoResult, VideoSet,
};
use examverse::state::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counts calls, optionally sleeps, and fails while a failure is queued.
#[derive(Default)]
pub struct FakeGenerator {
    pub calls: AtomicUsize,
    delay: Duration,
    fail_with: Mutex<Option<GenerationError>>,
}

impl FakeGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn fail_next(&self, err: GenerationError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SolutionGenerator for FakeGenerator {
    async fn generate(
        &self,
        question: &QuestionContext,
    ) -> Result<GeneratedSolution, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        Ok(GeneratedSolution {
            text: format!("Solution #{n} for: {}", question.text),
            model: "fake-model".to_owned(),
        })
    }
}

#[derive(Default)]
pub struct FakeSearch {
    pub calls: AtomicUsize,
    delay: Duration,
    fail_with: Mutex<Option<SearchError>>,
    pub queries: Mutex<Vec<(String, u32)>>,
    pub options: Mutex<Vec<SearchOptions>>,
}

impl FakeSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn fail_next(&self, err: SearchError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSearch for FakeSearch {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        options: SearchOptions,
    ) -> Result<Vec<VideoResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((query.to_owned(), max_results));
        self.options.lock().unwrap().push(options);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        Ok((0..max_results.min(3)).map(|i| video(&format!("vid{i}"))).collect())
    }

    /// Knows every id starting with `vid`.
    async fn details(&self, video_id: &str) -> Result<Option<VideoDetails>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        if !video_id.starts_with("vid") {
            return Ok(None);
        }
        Ok(Some(VideoDetails {
            video: video(video_id),
            description: format!("About {video_id}"),
            channel_id: Some("UCopen".to_owned()),
            published_at: None,
            tags: vec!["lecture".to_owned()],
            like_count: 30,
            comment_count: 4,
        }))
    }
}

pub fn video(id: &str) -> VideoResult {
    VideoResult {
        video_id: id.to_owned(),
        title: format!("Lecture {id}"),
        channel: "Open Courseware".to_owned(),
        thumbnail_url: format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"),
        embed_url: format!("https://www.youtube.com/embed/{id}"),
        watch_url: format!("https://www.youtube.com/watch?v={id}"),
        view_count: 1200,
        duration: "PT10M".to_owned(),
    }
}

pub fn qid(raw: &str) -> QuestionId {
    QuestionId::parse(raw).unwrap()
}

/// Store a video set for `question_id` as if a previous process had fetched it.
pub async fn seed_videos(store: &MemoryArtifactStore, question_id: &str, ids: &[&str]) {
    let set = Artifact::VideoSet(VideoSet {
        videos: ids.iter().map(|id| video(id)).collect(),
        fetched_at: Utc::now(),
    });
    store.put(&qid(question_id), &set).await.unwrap();
}

pub struct Harness {
    pub store: Arc<MemoryArtifactStore>,
    pub questions: Arc<MemoryQuestionStore>,
    pub generator: Arc<FakeGenerator>,
    pub search: Arc<FakeSearch>,
    pub service: Arc<ResolutionService>,
}

impl Harness {
    pub fn new(generator: Arc<FakeGenerator>, search: Arc<FakeSearch>) -> Self {
        Self::with_options(generator, search, ResolutionOptions::default())
    }

    pub fn with_options(
        generator: Arc<FakeGenerator>,
        search: Arc<FakeSearch>,
        options: ResolutionOptions,
    ) -> Self {
        Self::with_store(Arc::new(MemoryArtifactStore::new()), generator, search, options)
    }

    pub fn with_store(
        store: Arc<MemoryArtifactStore>,
        generator: Arc<FakeGenerator>,
        search: Arc<FakeSearch>,
        options: ResolutionOptions,
    ) -> Self {
        let service = Arc::new(ResolutionService::new(
            store.clone(),
            generator.clone(),
            search.clone(),
            options,
        ));
        let questions = Arc::new(MemoryQuestionStore::new());
        questions.insert(QuestionRecord {
            id: "q1".to_owned(),
            text: "What is TCP?".to_owned(),
            subject: Some("Computer Networks".to_owned()),
        });
        questions.insert(QuestionRecord {
            id: "q2".to_owned(),
            text: "Explain the second law of thermodynamics.".to_owned(),
            subject: None,
        });
        questions.insert(QuestionRecord {
            id: "blank".to_owned(),
            text: "   ".to_owned(),
            subject: None,
        });
        Self {
            store,
            questions,
            generator,
            search,
            service,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.service.clone(), self.questions.clone(), None)
    }
}
