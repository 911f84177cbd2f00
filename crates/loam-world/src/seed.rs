use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ChunkCoord;

/// Random stream owned by a single chunk build.
pub type ChunkRng = ChaCha8Rng;

/// Process-wide world seed. Every random draw in generation derives from this
/// plus a chunk coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSeed(u64);

impl WorldSeed {
    #[inline]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Seed for the coherent noise generators, which take 32 bits.
    #[inline]
    pub const fn noise_seed(self) -> i32 {
        let folded = self.0 ^ (self.0 >> 32);
        folded as u32 as i32
    }

    /// Fresh random stream for `coord`. Independent of call order and of any
    /// other chunk's stream.
    #[inline]
    pub fn chunk_stream(self, coord: ChunkCoord) -> ChunkRng {
        ChaCha8Rng::seed_from_u64(chunk_stream_seed(self, coord))
    }
}

#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Stable hash of (seed, cx, cz). Part of the world format: changing it
/// changes every generated chunk.
pub fn chunk_stream_seed(seed: WorldSeed, coord: ChunkCoord) -> u64 {
    let mut h = mix64(seed.value().wrapping_add(0x9e37_79b9_7f4a_7c15));
    h = mix64(h ^ (coord.cx as i64 as u64).wrapping_mul(0x85eb_ca6b_27d4_eb2f));
    h = mix64(h ^ (coord.cz as i64 as u64).wrapping_mul(0xc2b2_ae3d_165e_67b1));
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn stream_seed_depends_on_every_input() {
        let s = WorldSeed::new(42);
        let base = chunk_stream_seed(s, ChunkCoord::new(0, 0));
        assert_ne!(base, chunk_stream_seed(WorldSeed::new(43), ChunkCoord::new(0, 0)));
        assert_ne!(base, chunk_stream_seed(s, ChunkCoord::new(1, 0)));
        assert_ne!(base, chunk_stream_seed(s, ChunkCoord::new(0, 1)));
        // Swapped axes must not collide.
        assert_ne!(
            chunk_stream_seed(s, ChunkCoord::new(3, -7)),
            chunk_stream_seed(s, ChunkCoord::new(-7, 3))
        );
    }

    #[test]
    fn streams_replay_identically() {
        let s = WorldSeed::new(7);
        let coord = ChunkCoord::new(-12, 5);
        let draw = |c: ChunkCoord| -> Vec<u32> {
            s.chunk_stream(c)
                .sample_iter(rand::distributions::Standard)
                .take(32)
                .collect()
        };
        let a = draw(coord);
        // Draw from an unrelated stream in between; it must not disturb the replay.
        let _ = s.chunk_stream(ChunkCoord::new(0, 0)).gen_range(0..10);
        let b = draw(coord);
        assert_eq!(a, b);
    }
}
