//! Solution resolution: the single-flight cache for AI solutions and video
//! sets, the artifact store seam, and the service that ties them to providers.

pub mod errors;
pub mod model;
pub mod service;
pub mod singleflight;
pub mod store;

pub use errors::{ResolveError, StorageError};
pub use model::{
    AiSolution, Artifact, ArtifactKey, ArtifactKind, QuestionId, VideoResult, VideoSet,
};
pub use service::{ResolutionOptions, ResolutionService, SolutionOutcome, VideoOutcome};
pub use singleflight::{
    CacheStats, EntryState, Origin, RefreshPolicy, Resolution, SingleFlightCache,
};
pub use store::{ArtifactStore, MemoryArtifactStore};
