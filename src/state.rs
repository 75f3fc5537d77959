//! Application state shared by the HTTP handlers.

use crate::data::QuestionStore;
use crate::solutions::ResolutionService;
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use ts_rs::TS;

/// Health status of a service or upstream dependency.
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Active,
    Connected,
    /// Present but not usable, e.g. a provider without an API key.
    Disabled,
    Error,
}

/// Thread-safe registry of component health, reported on `/status`.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, ServiceStatus>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(name.to_owned(), status);
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.value().clone())
    }

    /// Snapshot of all statuses, sorted by name for stable output.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        let mut all: Vec<_> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ResolutionService>,
    pub questions: Arc<dyn QuestionStore>,
    /// `None` when running on in-memory stores.
    pub db_pool: Option<PgPool>,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(
        resolver: Arc<ResolutionService>,
        questions: Arc<dyn QuestionStore>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            resolver,
            questions,
            db_pool,
            service_statuses: ServiceStatusRegistry::new(),
        }
    }
}
