//! In-memory block edits that outlive chunk eviction.
#![forbid(unsafe_code)]

use loam_blocks::BlockKind;
use loam_world::ChunkCoord;
use std::collections::HashMap;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditLogStats {
    pub chunk_entries: usize,
    pub block_edits: usize,
}

/// Latest block kind per edited world position, grouped by chunk.
pub struct EditLog {
    chunk_size: u32,
    inner: HashMap<ChunkCoord, HashMap<(i32, i32, i32), BlockKind>>,
}

impl EditLog {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            inner: HashMap::new(),
        }
    }

    pub fn stats(&self) -> EditLogStats {
        EditLogStats {
            chunk_entries: self.inner.len(),
            block_edits: self.inner.values().map(|m| m.len()).sum(),
        }
    }

    #[inline]
    fn chunk_key(&self, wx: i32, wz: i32) -> ChunkCoord {
        ChunkCoord::from_block(wx, wz, self.chunk_size)
    }

    /// Records an edit, returning whatever was logged there before.
    pub fn set(&mut self, wx: i32, wy: i32, wz: i32, kind: BlockKind) -> Option<BlockKind> {
        let k = self.chunk_key(wx, wz);
        self.inner.entry(k).or_default().insert((wx, wy, wz), kind)
    }

    /// Every edit inside `coord`, sorted by position so replay order is stable.
    pub fn snapshot_for_chunk(&self, coord: ChunkCoord) -> Vec<((i32, i32, i32), BlockKind)> {
        let mut out: Vec<_> = match self.inner.get(&coord) {
            Some(m) => m.iter().map(|(k, v)| (*k, *v)).collect(),
            None => Vec::new(),
        };
        out.sort_unstable_by_key(|(p, _)| *p);
        out
    }
}
