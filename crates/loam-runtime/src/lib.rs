//! Chunk store, build workers and observer-driven streaming.
#![forbid(unsafe_code)]

mod error;
mod source;
mod store;
mod streaming;
mod worker;

pub use error::{BuildFailure, StoreError, StreamError};
pub use source::ChunkSource;
pub use store::{
    ChunkStore, CommitOutcome, EditOutcome, EvictOutcome, RequestOutcome, StoreStats,
};
pub use streaming::{Observer, StreamStats, StreamingManager, TickReport};
pub use worker::{BuildJob, JobOut, JobResult, Runtime};
