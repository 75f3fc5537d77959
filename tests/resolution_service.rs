//! End-to-end behavior of the resolution service against fake providers.

mod helpers;

use chrono::Utc;
use examverse::providers::{
    GenerationError, QuestionContext, SearchError, SearchOptions, VideoDuration, VideoOrder,
};
use examverse::solutions::{
    AiSolution, Artifact, ArtifactKind, ArtifactStore, RefreshPolicy, ResolutionOptions,
    ResolveError,
};
use helpers::{FakeGenerator, FakeSearch, Harness, qid, seed_videos};
use std::time::Duration;

fn tcp_question() -> QuestionContext {
    QuestionContext::new("What is TCP?")
}

#[tokio::test]
async fn concurrent_first_requests_share_one_generation() {
    let h = Harness::new(
        FakeGenerator::with_delay(Duration::from_millis(500)),
        FakeSearch::new(),
    );
    let id = qid("q1");
    let question = tcp_question();

    let (a, b) = tokio::join!(
        h.service.get_or_generate_solution(&id, &question),
        h.service.get_or_generate_solution(&id, &question),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(h.generator.calls(), 1);
    assert_eq!(a.solution.text, b.solution.text);
    assert!(!a.cached && !b.cached);

    let stored = h
        .store
        .get(&id, ArtifactKind::AiSolution)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.as_solution().unwrap().text, a.solution.text);
}

#[tokio::test]
async fn stored_video_set_is_served_without_provider_call() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    seed_videos(&h.store, "q2", &["a", "b", "c"]).await;

    let first = h
        .service
        .get_or_fetch_videos(&qid("q2"), "thermodynamics", false)
        .await
        .unwrap();
    let second = h
        .service
        .get_or_fetch_videos(&qid("q2"), "thermodynamics", false)
        .await
        .unwrap();

    assert_eq!(h.search.calls(), 0);
    assert_eq!(first.videos.len(), 3);
    assert!(first.cached && second.cached);
    let ids: Vec<_> = second.videos.iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn failed_generation_is_retried_on_next_request() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    h.generator.fail_next(GenerationError::QuotaExhausted);
    let id = qid("q3");

    let err = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap_err();
    assert_eq!(err, ResolveError::Generation(GenerationError::QuotaExhausted));

    let retry = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap();
    assert_eq!(h.generator.calls(), 2);
    assert!(!retry.cached);
}

#[tokio::test]
async fn concurrent_waiters_receive_the_same_error() {
    let generator = FakeGenerator::with_delay(Duration::from_millis(100));
    generator.fail_next(GenerationError::Timeout);
    let h = Harness::new(generator, FakeSearch::new());
    let id = qid("q1");
    let question = tcp_question();

    let (a, b) = tokio::join!(
        h.service.get_or_generate_solution(&id, &question),
        h.service.get_or_generate_solution(&id, &question),
    );
    assert_eq!(a.unwrap_err(), b.unwrap_err());
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn second_request_is_a_cache_hit() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    let id = qid("q1");

    let first = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap();
    let second = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.solution, second.solution);
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn regenerate_replaces_the_cached_solution() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    let id = qid("q1");

    let first = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap();
    let regenerated = h
        .service
        .regenerate_solution(&id, &tcp_question())
        .await
        .unwrap();
    let after = h
        .service
        .get_or_generate_solution(&id, &tcp_question())
        .await
        .unwrap();

    assert_eq!(h.generator.calls(), 2);
    assert_ne!(first.solution.text, regenerated.solution.text);
    assert!(!regenerated.cached);
    assert_eq!(after.solution.text, regenerated.solution.text);
    assert!(after.cached);
}

#[tokio::test]
async fn concurrent_regenerations_share_one_call() {
    let h = Harness::new(
        FakeGenerator::with_delay(Duration::from_millis(200)),
        FakeSearch::new(),
    );
    let id = qid("q1");
    let question = tcp_question();
    h.service
        .get_or_generate_solution(&id, &question)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.service.regenerate_solution(&id, &question),
        h.service.regenerate_solution(&id, &question),
    );
    assert_eq!(a.unwrap().solution, b.unwrap().solution);
    assert_eq!(h.generator.calls(), 2);
}

#[tokio::test]
async fn video_refresh_calls_provider_again() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    seed_videos(&h.store, "q2", &["old"]).await;
    let id = qid("q2");

    let stale = h
        .service
        .get_or_fetch_videos(&id, "entropy", false)
        .await
        .unwrap();
    assert!(stale.cached);

    let fresh = h
        .service
        .get_or_fetch_videos(&id, "entropy", true)
        .await
        .unwrap();
    assert!(!fresh.cached);
    assert_eq!(h.search.calls(), 1);
    assert_ne!(fresh.videos, stale.videos);
    assert_eq!(h.search.queries.lock().unwrap()[0], ("entropy".to_owned(), 5));
}

#[tokio::test]
async fn empty_search_result_is_cached() {
    let h = Harness::with_options(
        FakeGenerator::new(),
        FakeSearch::new(),
        ResolutionOptions {
            video_max_results: 0,
            ..ResolutionOptions::default()
        },
    );
    let id = qid("q1");

    let first = h.service.get_or_fetch_videos(&id, "tcp", false).await.unwrap();
    let second = h.service.get_or_fetch_videos(&id, "tcp", false).await.unwrap();

    assert!(first.videos.is_empty());
    assert!(second.cached);
    assert_eq!(h.search.calls(), 1);
}

#[tokio::test]
async fn kinds_and_questions_resolve_independently() {
    let h = Harness::new(
        FakeGenerator::with_delay(Duration::from_secs(5)),
        FakeSearch::new(),
    );
    let service = h.service.clone();
    let slow = tokio::spawn(async move {
        service
            .get_or_generate_solution(&qid("q1"), &tcp_question())
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Videos for the same question are not blocked by the pending solution.
    let videos = tokio::time::timeout(
        Duration::from_secs(1),
        h.service.get_or_fetch_videos(&qid("q1"), "tcp", false),
    )
    .await
    .expect("video resolution blocked behind solution")
    .unwrap();
    assert_eq!(videos.videos.len(), 3);

    // Nor is a stored solution for a different question.
    let stored = Artifact::AiSolution(AiSolution {
        text: "Entropy never decreases in an isolated system.".to_owned(),
        model: "fake-model".to_owned(),
        generated_at: Utc::now(),
    });
    h.store.put(&qid("q2"), &stored).await.unwrap();
    let other = tokio::time::timeout(
        Duration::from_secs(1),
        h.service.get_or_generate_solution(
            &qid("q2"),
            &QuestionContext::new("Explain the second law of thermodynamics."),
        ),
    )
    .await
    .expect("other question blocked behind q1")
    .unwrap();
    assert!(other.cached);

    let stats = h.service.cache_stats();
    assert_eq!(stats.in_flight, 1);
    assert_eq!(stats.ready, 2);
    assert_eq!(h.generator.calls(), 1);

    slow.abort();
}

#[tokio::test]
async fn provider_calls_beyond_the_limit_are_rejected() {
    let h = Harness::with_options(
        FakeGenerator::with_delay(Duration::from_millis(500)),
        FakeSearch::new(),
        ResolutionOptions {
            max_concurrent_calls: 1,
            queue_timeout: Duration::from_millis(50),
            ..ResolutionOptions::default()
        },
    );
    let question = tcp_question();
    let (q1, q2) = (qid("q1"), qid("q2"));

    let (a, b) = tokio::join!(
        h.service.get_or_generate_solution(&q1, &question),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.service.get_or_generate_solution(&q2, &question).await
        },
    );

    assert!(a.is_ok());
    assert!(matches!(b, Err(ResolveError::Overloaded { .. })));
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn cache_hits_do_not_wait_for_provider_capacity() {
    let h = Harness::with_options(
        FakeGenerator::with_delay(Duration::from_millis(500)),
        FakeSearch::new(),
        ResolutionOptions {
            max_concurrent_calls: 1,
            queue_timeout: Duration::from_millis(50),
            ..ResolutionOptions::default()
        },
    );
    seed_videos(&h.store, "q2", &["a"]).await;
    let question = tcp_question();
    let (q1, q2) = (qid("q1"), qid("q2"));

    let (solution, videos) = tokio::join!(
        h.service.get_or_generate_solution(&q1, &question),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.service.get_or_fetch_videos(&q2, "entropy", false).await
        },
    );
    assert!(solution.is_ok());
    assert!(videos.unwrap().cached);
}

#[tokio::test]
async fn search_failure_surfaces_and_resets() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    h.search.fail_next(SearchError::Upstream {
        status: 500,
        body: "backend error".to_owned(),
    });

    let err = h
        .service
        .get_or_fetch_videos(&qid("q1"), "tcp", false)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Search(SearchError::Upstream { status: 500, .. })));

    let ok = h
        .service
        .get_or_fetch_videos(&qid("q1"), "tcp", false)
        .await
        .unwrap();
    assert!(!ok.cached);
    assert_eq!(h.search.calls(), 2);
}

#[tokio::test]
async fn wait_policy_blocks_readers_during_refresh() {
    let h = Harness::with_options(
        FakeGenerator::with_delay(Duration::from_millis(200)),
        FakeSearch::new(),
        ResolutionOptions {
            refresh_policy: RefreshPolicy::Wait,
            ..ResolutionOptions::default()
        },
    );
    let id = qid("q1");
    let question = tcp_question();
    let first = h
        .service
        .get_or_generate_solution(&id, &question)
        .await
        .unwrap();

    let (refreshed, reader) = tokio::join!(h.service.regenerate_solution(&id, &question), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.service.get_or_generate_solution(&id, &question).await
    });
    let (refreshed, reader) = (refreshed.unwrap(), reader.unwrap());

    assert_ne!(refreshed.solution.text, first.solution.text);
    assert_eq!(reader.solution.text, refreshed.solution.text);
}

#[tokio::test]
async fn question_videos_prefer_medium_length() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());
    h.service
        .get_or_fetch_videos(&qid("q1"), "tcp", false)
        .await
        .unwrap();

    let options = h.search.options.lock().unwrap().clone();
    assert_eq!(
        options,
        [SearchOptions {
            order: VideoOrder::Relevance,
            duration: VideoDuration::Medium,
        }]
    );
}

#[tokio::test]
async fn video_details_are_looked_up_uncached() {
    let h = Harness::new(FakeGenerator::new(), FakeSearch::new());

    let found = h.service.video_details("vid7").await.unwrap().unwrap();
    assert_eq!(found.video.video_id, "vid7");
    assert!(h.service.video_details("missing").await.unwrap().is_none());
    h.service.video_details("vid7").await.unwrap();

    assert_eq!(h.search.calls(), 3);
    assert_eq!(h.service.cache_stats().ready, 0);
}
