//! Single-flight, store-backed cache for question artifacts.
//!
//! Each `(question, kind)` key is either absent (EMPTY), `Ready` with an
//! artifact, or `InFlight` with one shared resolution that every concurrent
//! caller awaits. Transitions happen under the map's per-shard lock, so two
//! callers can never both start a resolution for the same key.
//!
//! The shared resolution runs on its own task. A caller that goes away only
//! drops its own wait; the provider call, the store write, and the other
//! waiters carry on. Failures are handed to the waiters of that resolution and
//! then forgotten, so the next request retries.

use crate::solutions::errors::ResolveError;
use crate::solutions::model::{Artifact, ArtifactKey};
use crate::solutions::store::ArtifactStore;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Where a resolved artifact came from for a particular caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Held in the in-memory entry; nothing was awaited.
    Memory,
    /// Read back from the artifact store (e.g. after a restart).
    Store,
    /// Produced by a provider call during this resolution.
    Provider,
}

/// A resolved artifact plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub artifact: Arc<Artifact>,
    pub origin: Origin,
}

impl Resolution {
    /// True when no provider call was made on behalf of this request.
    pub fn is_cached(&self) -> bool {
        self.origin != Origin::Provider
    }
}

/// What plain (non-refresh) readers see while a forced refresh is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Serve the previous artifact immediately.
    #[default]
    ServeStale,
    /// Wait for the refresh and receive its result.
    Wait,
}

/// Observable state of a single cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    InFlight,
    Ready,
}

/// Entry counts for the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub ready: usize,
    pub in_flight: usize,
}

type Outcome = Result<Resolution, ResolveError>;
type Flight = Shared<BoxFuture<'static, Outcome>>;

struct InFlight {
    id: u64,
    flight: Flight,
    /// Refresh resolutions skip the store and always call the provider.
    refresh: bool,
    /// The artifact this resolution will replace, if any.
    previous: Option<Arc<Artifact>>,
}

enum Slot {
    Ready(Arc<Artifact>),
    InFlight(InFlight),
}

enum Action {
    Hit(Arc<Artifact>),
    Join { flight: Flight, refresh: bool },
    Lead(Flight),
}

/// Shared cache handle. Clone-cheap (all `Arc`-wrapped internals).
#[derive(Clone)]
pub struct SingleFlightCache {
    entries: Arc<DashMap<ArtifactKey, Slot>>,
    store: Arc<dyn ArtifactStore>,
    policy: RefreshPolicy,
    next_flight: Arc<AtomicU64>,
}

impl SingleFlightCache {
    pub fn new(store: Arc<dyn ArtifactStore>, policy: RefreshPolicy) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            store,
            policy,
            next_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolve `key`, invoking `source` at most once across all concurrent callers.
    ///
    /// `source` is only called if this caller ends up starting the provider
    /// call; otherwise it is dropped unused.
    pub async fn resolve<F, Fut>(
        &self,
        key: ArtifactKey,
        force_refresh: bool,
        source: F,
    ) -> Result<Resolution, ResolveError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Artifact, ResolveError>> + Send + 'static,
    {
        let mut source = Some(source);

        loop {
            match self.enter(&key, force_refresh, &mut source)? {
                Action::Hit(artifact) => {
                    debug!(key = %key, "artifact served from memory");
                    return Ok(Resolution {
                        artifact,
                        origin: Origin::Memory,
                    });
                }
                Action::Lead(flight) => return flight.await,
                Action::Join { flight, refresh } => {
                    debug!(key = %key, force_refresh, "joining in-flight resolution");
                    let outcome = flight.await;

                    // A refresh that piggybacked on a store read still owes the
                    // caller a provider result. The entry is READY now, so the
                    // next pass starts one.
                    if force_refresh
                        && !refresh
                        && let Ok(resolution) = &outcome
                        && resolution.origin != Origin::Provider
                    {
                        continue;
                    }
                    return outcome;
                }
            }
        }
    }

    /// Current state of an entry.
    pub fn entry_state(&self, key: &ArtifactKey) -> EntryState {
        match self.entries.get(key).as_deref() {
            None => EntryState::Empty,
            Some(Slot::InFlight(_)) => EntryState::InFlight,
            Some(Slot::Ready(_)) => EntryState::Ready,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.entries.iter() {
            match entry.value() {
                Slot::Ready(_) => stats.ready += 1,
                Slot::InFlight(_) => stats.in_flight += 1,
            }
        }
        stats
    }

    /// Decide what this caller does, atomically with respect to the key.
    ///
    /// A leading caller's task is spawned only after the shard lock is released.
    fn enter<F, Fut>(
        &self,
        key: &ArtifactKey,
        force_refresh: bool,
        source: &mut Option<F>,
    ) -> Result<Action, ResolveError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Artifact, ResolveError>> + Send + 'static,
    {
        let (action, task) = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => match occupied.get() {
                Slot::Ready(artifact) if !force_refresh => (Action::Hit(artifact.clone()), None),
                Slot::Ready(artifact) => {
                    let previous = Some(artifact.clone());
                    let source = take_source(source)?;
                    let (in_flight, task) = self.prepare(key.clone(), true, previous, source);
                    let flight = in_flight.flight.clone();
                    occupied.insert(Slot::InFlight(in_flight));
                    debug!(key = %key, "refresh started");
                    (Action::Lead(flight), Some(task))
                }
                Slot::InFlight(in_flight) => match &in_flight.previous {
                    Some(previous) if !force_refresh && self.policy == RefreshPolicy::ServeStale => {
                        (Action::Hit(previous.clone()), None)
                    }
                    _ => (
                        Action::Join {
                            flight: in_flight.flight.clone(),
                            refresh: in_flight.refresh,
                        },
                        None,
                    ),
                },
            },
            Entry::Vacant(vacant) => {
                let source = take_source(source)?;
                let (in_flight, task) = self.prepare(key.clone(), force_refresh, None, source);
                let flight = in_flight.flight.clone();
                vacant.insert(Slot::InFlight(in_flight));
                debug!(key = %key, force_refresh, "resolution started");
                (Action::Lead(flight), Some(task))
            }
        };

        if let Some(task) = task {
            tokio::spawn(task);
        }
        Ok(action)
    }

    /// Build the in-flight slot and the task that will drive it.
    fn prepare<F, Fut>(
        &self,
        key: ArtifactKey,
        refresh: bool,
        previous: Option<Arc<Artifact>>,
        source: F,
    ) -> (InFlight, BoxFuture<'static, ()>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Artifact, ResolveError>> + Send + 'static,
    {
        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel::<Outcome>();

        let flight = rx
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(ResolveError::Internal("resolution task dropped".to_owned()))
                })
            })
            .boxed()
            .shared();

        let cache = self.clone();
        let task = async move {
            let work = run_resolution(cache.store.clone(), key.clone(), refresh, source);
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ResolveError::Internal("provider task panicked".to_owned())));

            // Settle the entry before waking waiters so they observe the final state.
            cache.settle(&key, id, &outcome);
            let _ = tx.send(outcome);
        }
        .boxed();

        let in_flight = InFlight {
            id,
            flight,
            refresh,
            previous,
        };
        (in_flight, task)
    }

    /// Record the outcome of resolution `id`: READY on success, EMPTY on failure.
    fn settle(&self, key: &ArtifactKey, id: u64, outcome: &Outcome) {
        let Entry::Occupied(mut occupied) = self.entries.entry(key.clone()) else {
            return;
        };
        if !matches!(occupied.get(), Slot::InFlight(in_flight) if in_flight.id == id) {
            return;
        }

        match outcome {
            Ok(resolution) => {
                occupied.insert(Slot::Ready(resolution.artifact.clone()));
            }
            Err(e) => {
                occupied.remove();
                warn!(key = %key, error = %e, "resolution failed, entry reset");
            }
        }
    }
}

fn take_source<F>(source: &mut Option<F>) -> Result<F, ResolveError> {
    source
        .take()
        .ok_or_else(|| ResolveError::Internal("source already consumed".to_owned()))
}

/// Store read (plain resolutions only), then provider call and store write.
async fn run_resolution<F, Fut>(
    store: Arc<dyn ArtifactStore>,
    key: ArtifactKey,
    refresh: bool,
    source: F,
) -> Outcome
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Artifact, ResolveError>> + Send + 'static,
{
    if !refresh && let Some(artifact) = store.get(&key.question_id, key.kind).await? {
        debug!(key = %key, "artifact restored from store");
        return Ok(Resolution {
            artifact: Arc::new(artifact),
            origin: Origin::Store,
        });
    }

    let start = std::time::Instant::now();
    let artifact = source().await?;
    store.put(&key.question_id, &artifact).await?;
    info!(
        key = %key,
        refresh,
        elapsed = crate::utils::fmt_duration(start.elapsed()),
        "artifact produced by provider"
    );

    Ok(Resolution {
        artifact: Arc::new(artifact),
        origin: Origin::Provider,
    })
}
