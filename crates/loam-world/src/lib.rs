//! World seed, chunk coordinates, generation parameters and height sampling.
#![forbid(unsafe_code)]

mod chunk_coord;
pub mod config;
mod error;
pub mod height;
mod seed;

pub use chunk_coord::ChunkCoord;
pub use config::WorldConfig;
pub use error::WorldError;
pub use height::HeightSampler;
pub use seed::{ChunkRng, WorldSeed, chunk_stream_seed};
