use std::sync::Arc;

use hashbrown::HashMap;
use loam_blocks::BlockKind;
use loam_chunk::{Chunk, ChunkState};
use loam_world::ChunkCoord;
use parking_lot::RwLock;

use crate::StoreError;

const SHARDS: usize = 16;

#[derive(Clone, Copy, Debug)]
struct PendingEdit {
    x: usize,
    y: usize,
    z: usize,
    kind: BlockKind,
}

enum Slot {
    Requested,
    Generating {
        evict_pending: bool,
        pending_edits: Vec<PendingEdit>,
    },
    Ready(Arc<Chunk>),
}

impl Slot {
    #[inline]
    fn state(&self) -> ChunkState {
        match self {
            Slot::Requested => ChunkState::Requested,
            Slot::Generating { .. } => ChunkState::Generating,
            Slot::Ready(_) => ChunkState::Ready,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Inserted,
    AlreadyPresent,
    /// A Generating slot flagged for eviction was wanted again.
    Reinstated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Installed,
    /// The slot was evicted while generating; the chunk was dropped.
    EvictedOnCommit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictOutcome {
    Evicted,
    /// A request that no worker had claimed yet.
    Cancelled,
    /// Generating: removal happens right after commit.
    Deferred,
    NotPresent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Applied { previous: BlockKind },
    /// Held on the generating slot and applied at commit.
    Queued,
    /// Chunk not resident; only the edit log has it.
    Logged,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub requested: usize,
    pub generating: usize,
    pub ready: usize,
    pub evict_pending: usize,
}

/// Coordinate-keyed chunk slots. Each coordinate holds at most one slot, and
/// every transition on it happens under its shard's write lock.
pub struct ChunkStore {
    shards: Vec<RwLock<HashMap<ChunkCoord, Slot>>>,
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    #[inline]
    fn shard(&self, coord: ChunkCoord) -> &RwLock<HashMap<ChunkCoord, Slot>> {
        let h = (coord.cx as u32).wrapping_mul(0x9e37_79b1)
            ^ (coord.cz as u32).wrapping_mul(0x85eb_ca77);
        &self.shards[(h >> 16) as usize % SHARDS]
    }

    /// Ready chunk at `coord`. Readers share the chunk; later edits copy it.
    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        match self.shard(coord).read().get(&coord) {
            Some(Slot::Ready(chunk)) => Some(Arc::clone(chunk)),
            _ => None,
        }
    }

    #[inline]
    pub fn state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.shard(coord).read().get(&coord).map(Slot::state)
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.shard(coord).read().contains_key(&coord)
    }

    pub fn request(&self, coord: ChunkCoord) -> RequestOutcome {
        let mut map = self.shard(coord).write();
        match map.get_mut(&coord) {
            None => {
                map.insert(coord, Slot::Requested);
                RequestOutcome::Inserted
            }
            Some(Slot::Generating { evict_pending, .. }) if *evict_pending => {
                *evict_pending = false;
                RequestOutcome::Reinstated
            }
            Some(_) => RequestOutcome::AlreadyPresent,
        }
    }

    /// Moves an absent or requested coordinate to Generating. True for
    /// exactly one caller per coordinate until the slot is released.
    pub fn try_claim(&self, coord: ChunkCoord) -> bool {
        let mut map = self.shard(coord).write();
        match map.get(&coord) {
            None | Some(Slot::Requested) => {
                map.insert(coord, generating());
                true
            }
            Some(_) => false,
        }
    }

    /// Like [`try_claim`](Self::try_claim) but only from Requested, so a
    /// request evicted before a worker reached it stays cancelled.
    pub fn try_claim_requested(&self, coord: ChunkCoord) -> bool {
        let mut map = self.shard(coord).write();
        match map.get(&coord) {
            Some(Slot::Requested) => {
                map.insert(coord, generating());
                true
            }
            _ => false,
        }
    }

    pub fn commit(&self, coord: ChunkCoord, mut chunk: Chunk) -> Result<CommitOutcome, StoreError> {
        if chunk.coord() != coord {
            return Err(StoreError::invariant(
                coord,
                format!("commit carried chunk {}", chunk.coord()),
            ));
        }
        if chunk.state() != ChunkState::Ready {
            return Err(StoreError::invariant(
                coord,
                format!("commit of a {} chunk", chunk.state()),
            ));
        }
        let mut map = self.shard(coord).write();
        let (evict_pending, pending_edits) = match map.get_mut(&coord) {
            Some(Slot::Generating {
                evict_pending,
                pending_edits,
            }) => (*evict_pending, std::mem::take(pending_edits)),
            other => {
                let found = other.map(|s| s.state().to_string());
                return Err(StoreError::invariant(
                    coord,
                    format!(
                        "commit without claim (slot is {})",
                        found.as_deref().unwrap_or("absent")
                    ),
                ));
            }
        };
        if evict_pending {
            map.remove(&coord);
            log::debug!(target: "store", "chunk {coord} evicted on commit");
            return Ok(CommitOutcome::EvictedOnCommit);
        }
        for e in pending_edits {
            if let Err(err) = chunk.set_local(e.x, e.y, e.z, e.kind) {
                log::warn!(target: "store", "dropping queued edit: {err}");
            }
        }
        map.insert(coord, Slot::Ready(Arc::new(chunk)));
        Ok(CommitOutcome::Installed)
    }

    /// Gives a claim back so the coordinate can be retried. Returns false when
    /// the slot was flagged for eviction and has been removed instead.
    pub fn release(&self, coord: ChunkCoord) -> Result<bool, StoreError> {
        let mut map = self.shard(coord).write();
        match map.get(&coord) {
            Some(Slot::Generating { evict_pending, .. }) => {
                if *evict_pending {
                    map.remove(&coord);
                    Ok(false)
                } else {
                    map.insert(coord, Slot::Requested);
                    Ok(true)
                }
            }
            _ => Err(StoreError::invariant(coord, "release without claim")),
        }
    }

    /// Drops a claim after a build that will not be retried.
    pub fn abandon(&self, coord: ChunkCoord) -> Result<(), StoreError> {
        let mut map = self.shard(coord).write();
        match map.get(&coord) {
            Some(Slot::Generating { .. }) => {
                map.remove(&coord);
                Ok(())
            }
            _ => Err(StoreError::invariant(coord, "abandon without claim")),
        }
    }

    pub fn evict(&self, coord: ChunkCoord) -> EvictOutcome {
        let mut map = self.shard(coord).write();
        match map.get_mut(&coord) {
            None => EvictOutcome::NotPresent,
            Some(Slot::Generating { evict_pending, .. }) => {
                *evict_pending = true;
                EvictOutcome::Deferred
            }
            Some(Slot::Requested) => {
                map.remove(&coord);
                EvictOutcome::Cancelled
            }
            Some(Slot::Ready(_)) => {
                map.remove(&coord);
                EvictOutcome::Evicted
            }
        }
    }

    /// Replaces one block at chunk-local (`x`, `y`, `z`). Ready chunks are
    /// copied on write, so snapshots handed out earlier never change.
    pub fn edit(
        &self,
        coord: ChunkCoord,
        x: usize,
        y: usize,
        z: usize,
        kind: BlockKind,
    ) -> Result<EditOutcome, StoreError> {
        let mut map = self.shard(coord).write();
        match map.get_mut(&coord) {
            Some(Slot::Ready(chunk)) => {
                let previous = Arc::make_mut(chunk).set_local(x, y, z, kind)?;
                Ok(EditOutcome::Applied { previous })
            }
            Some(Slot::Generating { pending_edits, .. }) => {
                pending_edits.push(PendingEdit { x, y, z, kind });
                Ok(EditOutcome::Queued)
            }
            other => Err(StoreError::NotReady {
                coord,
                state: other.map(|s| s.state()),
            }),
        }
    }

    /// Every coordinate with a slot, in no particular order.
    pub fn coords(&self) -> Vec<ChunkCoord> {
        let mut out = Vec::new();
        for shard in &self.shards {
            out.extend(shard.read().keys().copied());
        }
        out
    }

    pub fn ready_coords(&self) -> Vec<ChunkCoord> {
        let mut out = Vec::new();
        for shard in &self.shards {
            out.extend(
                shard
                    .read()
                    .iter()
                    .filter(|(_, s)| matches!(s, Slot::Ready(_)))
                    .map(|(c, _)| *c),
            );
        }
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let mut st = StoreStats::default();
        for shard in &self.shards {
            for slot in shard.read().values() {
                match slot {
                    Slot::Requested => st.requested += 1,
                    Slot::Generating { evict_pending, .. } => {
                        st.generating += 1;
                        if *evict_pending {
                            st.evict_pending += 1;
                        }
                    }
                    Slot::Ready(_) => st.ready += 1,
                }
            }
        }
        st
    }
}

#[inline]
fn generating() -> Slot {
    Slot::Generating {
        evict_pending: false,
        pending_edits: Vec::new(),
    }
}
