use loam_chunk::{ChunkError, ChunkState};
use loam_world::{ChunkCoord, WorldError};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The claim/commit protocol was broken. Indicates a bug, not bad input.
    #[error("invariant violation at chunk {coord}: {reason}")]
    InvariantViolation { coord: ChunkCoord, reason: String },
    #[error("chunk {coord} is not ready")]
    NotReady {
        coord: ChunkCoord,
        state: Option<ChunkState>,
    },
    #[error(transparent)]
    Edit(#[from] ChunkError),
}

impl StoreError {
    pub(crate) fn invariant(coord: ChunkCoord, reason: impl Into<String>) -> Self {
        StoreError::InvariantViolation {
            coord,
            reason: reason.into(),
        }
    }
}

/// Why a single chunk build did not produce a chunk.
#[derive(Debug, Error)]
pub enum BuildFailure {
    /// Worth another attempt: resource trouble or a panic in the builder.
    #[error("transient build failure: {0}")]
    Transient(String),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BuildFailure {
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, BuildFailure::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("chunk {coord} failed after {attempts} attempt(s): {source}")]
    BuildFailed {
        coord: ChunkCoord,
        attempts: u32,
        #[source]
        source: BuildFailure,
    },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
