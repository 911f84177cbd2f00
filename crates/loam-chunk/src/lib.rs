//! Chunk grid, feature passes and the chunk builder.
#![forbid(unsafe_code)]

mod builder;
mod error;
pub mod features;

use std::fmt;

use loam_blocks::BlockKind;
use loam_world::ChunkCoord;

pub use builder::{BuildReport, ChunkBuilder};
pub use error::ChunkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    Requested,
    Generating,
    Ready,
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChunkState::Requested => "requested",
            ChunkState::Generating => "generating",
            ChunkState::Ready => "ready",
        })
    }
}

/// One world column: `size` x `height` x `size` blocks stored y-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    coord: ChunkCoord,
    size: usize,
    height: usize,
    blocks: Vec<BlockKind>,
    // Grass height per column as generated; later edits do not move it.
    surface: Vec<Option<u16>>,
    state: ChunkState,
    revision: u64,
}

impl Chunk {
    /// Empty grid in the Generating state, ready to be filled by a builder.
    pub fn new(coord: ChunkCoord, size: usize, height: usize) -> Self {
        Self {
            coord,
            size,
            height,
            blocks: vec![BlockKind::Air; size * height * size],
            surface: vec![None; size * size],
            state: ChunkState::Generating,
            revision: 0,
        }
    }

    /// Ready chunk from an existing y-major block vector. Short input is padded
    /// with air; the surface map is taken from the topmost grass per column.
    pub fn from_blocks_local(
        coord: ChunkCoord,
        size: usize,
        height: usize,
        blocks: Vec<BlockKind>,
    ) -> Self {
        let mut b = blocks;
        b.resize(size * height * size, BlockKind::Air);
        let mut chunk = Self {
            coord,
            size,
            height,
            blocks: b,
            surface: vec![None; size * size],
            state: ChunkState::Ready,
            revision: 0,
        };
        for z in 0..size {
            for x in 0..size {
                let top = (0..height)
                    .rev()
                    .find(|&y| chunk.get_local(x, y, z) == BlockKind::Grass);
                if let Some(y) = top {
                    chunk.set_surface(x, z, y);
                }
            }
        }
        chunk
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Number of edits applied since the chunk became ready.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockKind] {
        &self.blocks
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size + z) * self.size + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> BlockKind {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && z >= 0
            && y >= 0
            && (x as u64) < self.size as u64
            && (z as u64) < self.size as u64
            && (y as u64) < self.height as u64
    }

    /// Bounds-checked read with signed local coordinates.
    #[inline]
    pub fn get(&self, x: i64, y: i64, z: i64) -> Option<BlockKind> {
        if !self.in_bounds(x, y, z) {
            return None;
        }
        Some(self.get_local(x as usize, y as usize, z as usize))
    }

    #[inline]
    fn base(&self) -> (i64, i64) {
        (
            self.coord.cx as i64 * self.size as i64,
            self.coord.cz as i64 * self.size as i64,
        )
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        let (bx, bz) = self.base();
        self.in_bounds(wx as i64 - bx, wy as i64, wz as i64 - bz)
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockKind> {
        let (bx, bz) = self.base();
        self.get(wx as i64 - bx, wy as i64, wz as i64 - bz)
    }

    /// Generation-time write. No revision bump.
    #[inline]
    pub(crate) fn put(&mut self, x: usize, y: usize, z: usize, kind: BlockKind) {
        let i = self.idx(x, y, z);
        self.blocks[i] = kind;
    }

    #[inline]
    pub(crate) fn set_surface(&mut self, x: usize, z: usize, y: usize) {
        self.surface[z * self.size + x] = u16::try_from(y).ok();
    }

    #[inline]
    pub(crate) fn mark_ready(&mut self) {
        self.state = ChunkState::Ready;
    }

    #[inline]
    pub fn surface_height(&self, x: usize, z: usize) -> Option<usize> {
        self.surface
            .get(z * self.size + x)
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Replaces one block of a ready chunk and returns the previous kind.
    /// The revision only moves when the block actually changes.
    pub fn set_local(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        kind: BlockKind,
    ) -> Result<BlockKind, ChunkError> {
        if self.state != ChunkState::Ready {
            return Err(ChunkError::NotReady {
                coord: self.coord,
                state: self.state,
            });
        }
        if x >= self.size || z >= self.size || y >= self.height {
            return Err(ChunkError::OutOfBounds {
                coord: self.coord,
                x: x as i64,
                y: y as i64,
                z: z as i64,
            });
        }
        let i = self.idx(x, y, z);
        let prev = self.blocks[i];
        if prev != kind {
            self.blocks[i] = kind;
            self.revision += 1;
        }
        Ok(prev)
    }

    pub fn set_world(
        &mut self,
        wx: i32,
        wy: i32,
        wz: i32,
        kind: BlockKind,
    ) -> Result<BlockKind, ChunkError> {
        let (bx, bz) = self.base();
        let (x, y, z) = (wx as i64 - bx, wy as i64, wz as i64 - bz);
        if !self.in_bounds(x, y, z) {
            return Err(ChunkError::OutOfBounds {
                coord: self.coord,
                x,
                y,
                z,
            });
        }
        self.set_local(x as usize, y as usize, z as usize, kind)
    }

    /// Applies recorded world-space edits that fall inside this chunk and
    /// returns how many landed.
    pub fn apply_world_edits(&mut self, edits: &[((i32, i32, i32), BlockKind)]) -> usize {
        let mut applied = 0;
        for &((wx, wy, wz), kind) in edits {
            if self.contains_world(wx, wy, wz) && self.set_world(wx, wy, wz, kind).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Visible block with a face neighbour that is non-solid or beyond the
    /// chunk. Renderers only need faces for these.
    pub fn is_exposed(&self, x: usize, y: usize, z: usize) -> bool {
        if !self.get_local(x, y, z).is_visible() {
            return false;
        }
        const FACES: [(i64, i64, i64); 6] = [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ];
        FACES.iter().any(|&(dx, dy, dz)| {
            match self.get(x as i64 + dx, y as i64 + dy, z as i64 + dz) {
                Some(n) => !n.is_solid(),
                None => true,
            }
        })
    }

    pub fn exposed_count(&self) -> usize {
        let mut n = 0;
        for y in 0..self.height {
            for z in 0..self.size {
                for x in 0..self.size {
                    if self.is_exposed(x, y, z) {
                        n += 1;
                    }
                }
            }
        }
        n
    }

    #[inline]
    pub fn count(&self, kind: BlockKind) -> usize {
        self.blocks.iter().filter(|b| **b == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(size: usize, height: usize) -> Chunk {
        Chunk::from_blocks_local(ChunkCoord::new(0, 0), size, height, Vec::new())
    }

    #[test]
    fn edits_require_ready_state() {
        let mut c = Chunk::new(ChunkCoord::new(1, 1), 2, 2);
        let err = c.set_local(0, 0, 0, BlockKind::Stone).unwrap_err();
        assert!(matches!(err, ChunkError::NotReady { state: ChunkState::Generating, .. }));
    }

    #[test]
    fn edit_bumps_revision_only_on_change() {
        let mut c = ready(2, 3);
        assert_eq!(c.set_local(1, 2, 1, BlockKind::Wood), Ok(BlockKind::Air));
        assert_eq!(c.revision(), 1);
        assert_eq!(c.set_local(1, 2, 1, BlockKind::Wood), Ok(BlockKind::Wood));
        assert_eq!(c.revision(), 1);
        assert!(matches!(
            c.set_local(2, 0, 0, BlockKind::Wood),
            Err(ChunkError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn world_edits_skip_other_chunks() {
        let mut c = Chunk::from_blocks_local(ChunkCoord::new(-1, 0), 4, 4, Vec::new());
        let edits = [
            ((-1, 0, 0), BlockKind::Stone),
            ((0, 0, 0), BlockKind::Stone),
            ((-4, 3, 3), BlockKind::Leaves),
            ((-4, 4, 3), BlockKind::Leaves),
        ];
        assert_eq!(c.apply_world_edits(&edits), 2);
        assert_eq!(c.get_local(3, 0, 0), BlockKind::Stone);
        assert_eq!(c.get_local(0, 3, 3), BlockKind::Leaves);
        assert_eq!(c.get_world(-1, 0, 0), Some(BlockKind::Stone));
        assert_eq!(c.get_world(0, 0, 0), None);
    }

    #[test]
    fn exposure_follows_solid_neighbours() {
        // 3x3x3 solid cube: only the center is hidden.
        let c = Chunk::from_blocks_local(
            ChunkCoord::new(0, 0),
            3,
            3,
            vec![BlockKind::Stone; 27],
        );
        assert!(!c.is_exposed(1, 1, 1));
        assert!(c.is_exposed(0, 1, 1));
        assert_eq!(c.exposed_count(), 26);

        let mut c = c;
        c.set_local(1, 2, 1, BlockKind::Air).unwrap();
        assert!(c.is_exposed(1, 1, 1));
        assert!(!c.is_exposed(1, 2, 1));
    }

    #[test]
    fn surface_map_tracks_topmost_grass() {
        let mut blocks = vec![BlockKind::Air; 2 * 4 * 2];
        let c0 = Chunk::new(ChunkCoord::new(0, 0), 2, 4);
        blocks[c0.idx(1, 0, 1)] = BlockKind::Stone;
        blocks[c0.idx(1, 2, 1)] = BlockKind::Grass;
        let c = Chunk::from_blocks_local(ChunkCoord::new(0, 0), 2, 4, blocks);
        assert_eq!(c.surface_height(1, 1), Some(2));
        assert_eq!(c.surface_height(0, 0), None);
    }
}
