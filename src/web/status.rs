//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{trace, warn};
use ts_rs::TS;

use crate::solutions::CacheStats;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize, TS)]
#[ts(export)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct CacheInfo {
    ready: u32,
    in_flight: u32,
}

impl From<CacheStats> for CacheInfo {
    fn from(stats: CacheStats) -> Self {
        Self {
            ready: u32::try_from(stats.ready).unwrap_or(u32::MAX),
            in_flight: u32::try_from(stats.in_flight).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    services: BTreeMap<String, ServiceInfo>,
    cache: CacheInfo,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Component statuses, build info, and cache occupancy.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    if let Some(pool) = &state.db_pool {
        let db_status = match crate::data::health::ping(pool).await {
            Ok(()) => ServiceStatus::Connected,
            Err(e) => {
                warn!(error = ?e, "database ping failed");
                ServiceStatus::Error
            }
        };
        state.service_statuses.set("database", db_status);
    }

    let services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status)| (name.clone(), ServiceInfo { name, status }))
        .collect();

    let overall_status = if services
        .values()
        .any(|s| matches!(s.status, ServiceStatus::Error))
    {
        ServiceStatus::Error
    } else if services.is_empty() {
        ServiceStatus::Disabled
    } else {
        ServiceStatus::Active
    };

    Json(StatusResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        services,
        cache: state.resolver.cache_stats().into(),
    })
}
