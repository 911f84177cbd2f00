use loam_world::ChunkCoord;
use thiserror::Error;

use crate::ChunkState;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("block ({x}, {y}, {z}) is outside chunk {coord}")]
    OutOfBounds {
        coord: ChunkCoord,
        x: i64,
        y: i64,
        z: i64,
    },
    #[error("chunk {coord} is {state}, edits need a ready chunk")]
    NotReady { coord: ChunkCoord, state: ChunkState },
}
