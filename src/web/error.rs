//! API error type and its mapping from resolution failures.
//!
//! Failures while resolving an artifact are answered with 200 and
//! `success: false`, which the question page renders as an inline banner.
//! Request errors (unknown question, bad input) keep their 4xx/5xx status and
//! also carry `detail` for clients that read error bodies that way.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};
use ts_rs::TS;

use crate::providers::{GenerationError, SearchError};
use crate::solutions::{ResolveError, StorageError};

/// Machine-readable error codes, exported for the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    NotFound,
    BadRequest,
    ProviderFailed,
    ProviderNotConfigured,
    StorageUnavailable,
    Overloaded,
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::ProviderFailed
            | ApiErrorCode::ProviderNotConfigured
            | ApiErrorCode::StorageUnavailable
            | ApiErrorCode::Overloaded => StatusCode::OK,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body: `{ "success": false, "code": ..., "message": ... }`, plus
/// `detail` when the status is not 2xx.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    #[ts(type = "false")]
    success: bool,
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let detail = (!code.status().is_success()).then(|| message.clone());
        Self {
            success: false,
            code,
            message,
            detail,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Log a storage failure and hide its details from the client.
pub fn storage_error(context: &str, err: StorageError) -> ApiError {
    error!(error = %err, "{context} failed");
    ApiError::new(
        ApiErrorCode::StorageUnavailable,
        "Storage is temporarily unavailable",
    )
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Generation(GenerationError::NotConfigured) => ApiError::new(
                ApiErrorCode::ProviderNotConfigured,
                "AI solution generation is not configured",
            ),
            ResolveError::Search(SearchError::NotConfigured) => ApiError::new(
                ApiErrorCode::ProviderNotConfigured,
                "Video search is not configured",
            ),
            ResolveError::Generation(e) => {
                warn!(error = %e, "AI provider failed");
                ApiError::new(
                    ApiErrorCode::ProviderFailed,
                    format!("Failed to generate AI solution: {e}"),
                )
            }
            ResolveError::Search(e) => {
                warn!(error = %e, "video search failed");
                ApiError::new(
                    ApiErrorCode::ProviderFailed,
                    format!("Failed to fetch videos: {e}"),
                )
            }
            ResolveError::Storage(e) => storage_error("artifact resolution", e),
            ResolveError::Overloaded { .. } => ApiError::new(
                ApiErrorCode::Overloaded,
                "Too many requests in progress, try again shortly",
            ),
            ResolveError::Internal(message) => {
                error!(detail = %message, "resolution task failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Convert `Option<T>` into `Result<T, ApiError>` with a 404 on `None`.
pub trait OptionNotFoundExt<T> {
    fn or_not_found(self, message: impl Into<String>) -> Result<T, ApiError>;
}

impl<T> OptionNotFoundExt<T> for Option<T> {
    fn or_not_found(self, message: impl Into<String>) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(message))
    }
}
