//! Read-only question lookup.
//!
//! Questions are created by the paper pipeline; this service only needs the
//! text (and subject, when known) to build provider input.

use crate::providers::QuestionContext;
use crate::solutions::errors::StorageError;
use crate::solutions::model::QuestionId;
use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use sqlx::PgPool;
use std::path::Path;

/// A question as stored by the paper pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, sqlx::FromRow)]
pub struct QuestionRecord {
    pub id: String,
    #[sqlx(rename = "question_text")]
    #[serde(alias = "question_text")]
    pub text: String,
    pub subject: Option<String>,
}

impl QuestionRecord {
    pub fn context(&self) -> QuestionContext {
        QuestionContext {
            text: self.text.clone(),
            subject: self.subject.clone(),
        }
    }
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, StorageError>;
}

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Fetch a single question by id.
pub async fn get_question(pool: &PgPool, id: &str) -> Result<Option<QuestionRecord>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRecord>(
        "SELECT id, question_text, subject FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn get(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, StorageError> {
        get_question(&self.pool, id.as_str())
            .await
            .map_err(|e| StorageError::new("question lookup", e))
    }
}

/// In-memory question lookup, optionally seeded from a JSON file.
#[derive(Debug, Default)]
pub struct MemoryQuestionStore {
    questions: DashMap<String, QuestionRecord>,
}

impl MemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: QuestionRecord) {
        self.questions.insert(record.id.clone(), record);
    }

    /// Load a JSON array of `{id, text | question_text, subject?}` objects.
    pub fn load_seed_file(&self, path: &Path) -> anyhow::Result<usize> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question seed file {}", path.display()))?;
        let records: Vec<QuestionRecord> =
            crate::providers::json::parse_json_with_context(&body)
                .map_err(|e| anyhow::anyhow!("Invalid question seed file: {e}"))?;
        let count = records.len();
        for record in records {
            self.insert(record);
        }
        Ok(count)
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn get(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, StorageError> {
        Ok(self.questions.get(id.as_str()).map(|r| r.value().clone()))
    }
}
