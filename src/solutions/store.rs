//! Durable artifact storage seam.
//!
//! The store owns artifact bytes and nothing else: no TTLs, no merging, no
//! locking guarantees the cache depends on. See `data::artifacts` for the
//! Postgres implementation.

use crate::solutions::errors::StorageError;
use crate::solutions::model::{Artifact, ArtifactKey, ArtifactKind, QuestionId};
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch the artifact for a question, or `None` if nothing has been stored.
    async fn get(
        &self,
        question_id: &QuestionId,
        kind: ArtifactKind,
    ) -> Result<Option<Artifact>, StorageError>;

    /// Store an artifact under its kind, replacing whatever was there.
    async fn put(&self, question_id: &QuestionId, artifact: &Artifact) -> Result<(), StorageError>;
}

/// Process-local store. Used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: DashMap<ArtifactKey, Artifact>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(
        &self,
        question_id: &QuestionId,
        kind: ArtifactKind,
    ) -> Result<Option<Artifact>, StorageError> {
        let key = ArtifactKey::new(question_id.clone(), kind);
        Ok(self.entries.get(&key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, question_id: &QuestionId, artifact: &Artifact) -> Result<(), StorageError> {
        let key = ArtifactKey::new(question_id.clone(), artifact.kind());
        self.entries.insert(key, artifact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::model::{AiSolution, VideoSet};
    use chrono::Utc;

    fn solution(text: &str) -> Artifact {
        Artifact::AiSolution(AiSolution {
            text: text.to_owned(),
            model: "test-model".to_owned(),
            generated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn missing_key_is_absent_not_an_error() {
        let store = MemoryArtifactStore::new();
        let q = QuestionId::parse("q1").unwrap();
        assert_eq!(store.get(&q, ArtifactKind::AiSolution).await, Ok(None));
    }

    #[tokio::test]
    async fn put_overwrites_and_kinds_are_separate() {
        let store = MemoryArtifactStore::new();
        let q = QuestionId::parse("q1").unwrap();

        store.put(&q, &solution("first")).await.unwrap();
        store.put(&q, &solution("second")).await.unwrap();
        store
            .put(
                &q,
                &Artifact::VideoSet(VideoSet {
                    videos: vec![],
                    fetched_at: Utc::now(),
                }),
            )
            .await
            .unwrap();

        let stored = store.get(&q, ArtifactKind::AiSolution).await.unwrap();
        assert_eq!(stored.unwrap().as_solution().unwrap().text, "second");
        assert!(
            store
                .get(&q, ArtifactKind::VideoSet)
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(store.len(), 2);
    }
}
