use std::ops::RangeInclusive;

use loam_blocks::BlockKind;
use loam_world::ChunkRng;
use rand::Rng;

use super::FeatureParams;
use crate::Chunk;

/// Spherical cave in chunk-local block coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cave {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub radius: f64,
}

impl Cave {
    #[inline]
    pub fn distance(&self, x: i64, y: i64, z: i64) -> f64 {
        let dx = (x - self.x) as f64;
        let dy = (y - self.y) as f64;
        let dz = (z - self.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Inclusive: a block exactly `radius` away is inside.
    #[inline]
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        let dx = (x - self.x) as f64;
        let dy = (y - self.y) as f64;
        let dz = (z - self.z) as f64;
        dx * dx + dy * dy + dz * dz <= self.radius * self.radius
    }

    /// Block ranges covering the sphere grown by `margin`, clipped to the
    /// chunk above bedrock. Empty ranges when nothing overlaps.
    pub(crate) fn clipped_bounds(
        &self,
        margin: f64,
        chunk: &Chunk,
    ) -> (RangeInclusive<i64>, RangeInclusive<i64>, RangeInclusive<i64>) {
        // Float to int casts saturate, so huge radii stay finite here.
        let r = (self.radius + margin).ceil() as i64;
        let top_x = chunk.size() as i64 - 1;
        let top_y = chunk.height() as i64 - 1;
        let span = |c: i64, lo: i64, hi: i64| {
            c.saturating_sub(r).max(lo)..=c.saturating_add(r).min(hi)
        };
        (
            span(self.x, 0, top_x),
            span(self.y, 1, top_y),
            span(self.z, 0, top_x),
        )
    }
}

// Height of the contiguous stone run starting just above bedrock.
fn stone_run(chunk: &Chunk, x: usize, z: usize) -> usize {
    (1..chunk.height())
        .take_while(|&y| chunk.get_local(x, y, z) == BlockKind::Stone)
        .count()
}

/// Picks cave seeds in the stone band and carves each sphere to air, clipped
/// to the chunk. Bedrock survives.
pub fn carve_caves(chunk: &mut Chunk, params: &FeatureParams, rng: &mut ChunkRng) -> Vec<Cave> {
    let size = chunk.size();
    let columns = size * size;
    let mut seeds = 0usize;
    for _ in 0..columns {
        if rng.gen_bool(params.cave_chance) {
            seeds += 1;
        }
    }
    let seeds = seeds.min(params.max_caves);

    let mut caves = Vec::with_capacity(seeds);
    for _ in 0..seeds {
        let x = rng.gen_range(0..size);
        let z = rng.gen_range(0..size);
        let run = stone_run(chunk, x, z);
        if run == 0 {
            continue;
        }
        let y = rng.gen_range(1..=run);
        let radius = rng.gen_range(params.cave_radius_min..=params.cave_radius_max);
        let cave = Cave {
            x: x as i64,
            y: y as i64,
            z: z as i64,
            radius,
        };
        carve(chunk, &cave);
        caves.push(cave);
    }
    caves
}

fn carve(chunk: &mut Chunk, cave: &Cave) {
    let (xs, ys, zs) = cave.clipped_bounds(0.0, chunk);
    for y in ys {
        for z in zs.clone() {
            for x in xs.clone() {
                if cave.contains(x, y, z) {
                    chunk.put(x as usize, y as usize, z as usize, BlockKind::Air);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_world::{ChunkCoord, WorldSeed};

    fn stone_chunk(size: usize, height: usize) -> Chunk {
        let mut c = Chunk::new(ChunkCoord::new(0, 0), size, height);
        for y in 0..height {
            for z in 0..size {
                for x in 0..size {
                    c.put(x, y, z, BlockKind::Stone);
                }
            }
        }
        c
    }

    fn params(cave_chance: f64, max_caves: usize) -> FeatureParams {
        FeatureParams {
            tree_chance: 0.0,
            cave_chance,
            iron_ore_chance: 0.0,
            cluster_min: 1,
            cluster_max: 1,
            cave_radius_min: 2.0,
            cave_radius_max: 5.0,
            max_caves,
        }
    }

    #[test]
    fn inclusive_sphere_edge() {
        let cave = Cave { x: 0, y: 0, z: 0, radius: 2.0 };
        assert!(cave.contains(2, 0, 0));
        assert!(cave.contains(0, -2, 0));
        assert!(!cave.contains(2, 1, 0));
    }

    #[test]
    fn carved_blocks_stay_within_their_cave() {
        for seed in 0..16u64 {
            let before = stone_chunk(16, 24);
            let mut after = before.clone();
            let mut rng = WorldSeed::new(seed).chunk_stream(ChunkCoord::new(3, -2));
            let caves = carve_caves(&mut after, &params(0.05, 4), &mut rng);
            assert!(caves.len() <= 4);
            for y in 0..24 {
                for z in 0..16 {
                    for x in 0..16 {
                        if before.get_local(x, y, z) != after.get_local(x, y, z) {
                            assert_eq!(after.get_local(x, y, z), BlockKind::Air);
                            let (x, y, z) = (x as i64, y as i64, z as i64);
                            assert!(
                                caves.iter().any(|c| c.contains(x, y, z)),
                                "block ({x}, {y}, {z}) carved outside every cave"
                            );
                        }
                    }
                }
            }
            for z in 0..16 {
                for x in 0..16 {
                    assert_eq!(after.get_local(x, 0, z), BlockKind::Stone);
                }
            }
        }
    }

    #[test]
    fn certain_chance_hits_the_cap() {
        let mut c = stone_chunk(8, 16);
        let mut rng = WorldSeed::new(1).chunk_stream(ChunkCoord::new(0, 0));
        let caves = carve_caves(&mut c, &params(1.0, 3), &mut rng);
        assert_eq!(caves.len(), 3);
        for cave in &caves {
            assert!((2.0..=5.0).contains(&cave.radius));
            assert!(cave.y >= 1);
            let (x, y, z) = (cave.x as usize, cave.y as usize, cave.z as usize);
            assert_eq!(c.get_local(x, y, z), BlockKind::Air);
        }
    }

    #[test]
    fn zero_chance_carves_nothing() {
        let before = stone_chunk(8, 16);
        let mut after = before.clone();
        let mut rng = WorldSeed::new(1).chunk_stream(ChunkCoord::new(0, 0));
        assert!(carve_caves(&mut after, &params(0.0, 3), &mut rng).is_empty());
        assert_eq!(before, after);
    }

    #[test]
    fn huge_radius_only_walks_the_chunk() {
        let mut c = stone_chunk(8, 12);
        let cave = Cave {
            x: 3,
            y: 4,
            z: 5,
            radius: 1.0e12,
        };
        carve(&mut c, &cave);
        assert_eq!(c.count(BlockKind::Stone), 8 * 8);
        assert_eq!(c.count(BlockKind::Air), 8 * 8 * 11);
    }

    #[test]
    fn bounds_clip_to_the_chunk() {
        let c = stone_chunk(8, 12);
        let cave = Cave {
            x: 1,
            y: 1,
            z: 6,
            radius: 2.5,
        };
        let (xs, ys, zs) = cave.clipped_bounds(1.0, &c);
        assert_eq!((xs, ys, zs), (0..=5, 1..=5, 2..=7));
        let far = Cave { x: -40, ..cave };
        assert!(far.clipped_bounds(0.0, &c).0.is_empty());
    }
}
