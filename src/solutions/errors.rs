//! Error taxonomy for solution resolution.

use crate::providers::{GenerationError, SearchError};
use std::fmt::Display;
use std::time::Duration;

/// A backing store (artifacts or questions) could not be read or written.
///
/// Fatal to the resolution that hit it; never retried inside the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("storage {operation} failed: {message}")]
pub struct StorageError {
    pub operation: &'static str,
    pub message: String,
}

impl StorageError {
    pub fn new(operation: &'static str, err: impl Display) -> Self {
        Self {
            operation,
            message: err.to_string(),
        }
    }
}

/// Outcome of a failed resolution, shared verbatim by every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("provider capacity exhausted after waiting {waited:.2?}")]
    Overloaded { waited: Duration },
    #[error("resolution task failed: {0}")]
    Internal(String),
}
