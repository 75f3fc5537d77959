//! Postgres-backed artifact store.
//!
//! Backed by the `question_artifacts` table: one JSONB payload per question
//! per artifact kind, overwritten on every put.

use crate::solutions::errors::StorageError;
use crate::solutions::model::{Artifact, ArtifactKind, QuestionId};
use crate::solutions::store::ArtifactStore;
use crate::utils::log_if_slow;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use std::time::{Duration, Instant};

const SLOW_QUERY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct PgArtifactStore {
    pool: PgPool,
}

impl PgArtifactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Retrieve the stored payload for a question and kind, or `None` if absent.
pub async fn get(
    pool: &PgPool,
    question_id: &str,
    kind: ArtifactKind,
) -> Result<Option<Json<Artifact>>, sqlx::Error> {
    sqlx::query_scalar::<_, Json<Artifact>>(
        "SELECT payload FROM question_artifacts WHERE question_id = $1 AND kind = $2",
    )
    .bind(question_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await
}

/// Insert or replace the payload for a question and kind.
pub async fn upsert(
    pool: &PgPool,
    question_id: &str,
    artifact: &Artifact,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO question_artifacts (question_id, kind, payload)
        VALUES ($1, $2, $3)
        ON CONFLICT (question_id, kind)
        DO UPDATE SET payload = EXCLUDED.payload, updated_at = now()
        "#,
    )
    .bind(question_id)
    .bind(artifact.kind().as_str())
    .bind(Json(artifact))
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn get(
        &self,
        question_id: &QuestionId,
        kind: ArtifactKind,
    ) -> Result<Option<Artifact>, StorageError> {
        let start = Instant::now();
        let stored = get(&self.pool, question_id.as_str(), kind)
            .await
            .map_err(|e| StorageError::new("artifact get", e))?;
        log_if_slow(start, SLOW_QUERY, "artifact get");

        match stored {
            Some(Json(artifact)) if artifact.kind() == kind => Ok(Some(artifact)),
            Some(Json(artifact)) => Err(StorageError::new(
                "artifact get",
                format!("row for {kind} holds a {} payload", artifact.kind()),
            )),
            None => Ok(None),
        }
    }

    async fn put(&self, question_id: &QuestionId, artifact: &Artifact) -> Result<(), StorageError> {
        let start = Instant::now();
        upsert(&self.pool, question_id.as_str(), artifact)
            .await
            .map_err(|e| StorageError::new("artifact put", e))?;
        log_if_slow(start, SLOW_QUERY, "artifact put");
        Ok(())
    }
}
