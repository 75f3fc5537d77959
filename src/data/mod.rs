//! Postgres persistence: questions, cached artifacts, and health checks.

pub mod artifacts;
pub mod health;
pub mod questions;

pub use artifacts::PgArtifactStore;
pub use questions::{MemoryQuestionStore, PgQuestionStore, QuestionRecord, QuestionStore};
