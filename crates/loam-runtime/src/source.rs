use loam_chunk::{Chunk, ChunkBuilder};
use loam_world::ChunkCoord;

use crate::BuildFailure;

/// Anything the workers can ask for a ready chunk.
pub trait ChunkSource: Send + Sync {
    fn build_chunk(&self, coord: ChunkCoord) -> Result<Chunk, BuildFailure>;
}

impl ChunkSource for ChunkBuilder {
    fn build_chunk(&self, coord: ChunkCoord) -> Result<Chunk, BuildFailure> {
        Ok(self.build(coord, self.seed())?)
    }
}
