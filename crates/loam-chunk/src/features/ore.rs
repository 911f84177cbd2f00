use loam_blocks::BlockKind;
use loam_world::ChunkRng;
use rand::Rng;

use super::{Cave, FeatureParams};
use crate::Chunk;

/// Rolls every stone block in a cave wall (within one block outside the
/// sphere) and grows an iron cluster from each hit. Returns blocks converted.
pub fn plant_ore(
    chunk: &mut Chunk,
    caves: &[Cave],
    params: &FeatureParams,
    rng: &mut ChunkRng,
) -> usize {
    let mut planted = 0;
    for cave in caves {
        let reach = cave.radius + 1.0;
        let (xs, ys, zs) = cave.clipped_bounds(1.0, chunk);
        for y in ys {
            for z in zs.clone() {
                for x in xs.clone() {
                    if chunk.get(x, y, z) != Some(BlockKind::Stone) {
                        continue;
                    }
                    let d = cave.distance(x, y, z);
                    if d <= cave.radius || d > reach {
                        continue;
                    }
                    if rng.gen_bool(params.iron_ore_chance) {
                        planted += grow_cluster(chunk, (x, y, z), params, rng);
                    }
                }
            }
        }
    }
    planted
}

// Random walk of unit steps on each axis. Only stone above bedrock converts;
// revisiting a converted block does not count again.
fn grow_cluster(
    chunk: &mut Chunk,
    start: (i64, i64, i64),
    params: &FeatureParams,
    rng: &mut ChunkRng,
) -> usize {
    let target = rng.gen_range(params.cluster_min..=params.cluster_max) as usize;
    let max_steps = target * 8;
    let (mut x, mut y, mut z) = start;
    let mut placed = 0;
    let mut steps = 0;
    while placed < target && steps < max_steps {
        x += rng.gen_range(-1..=1);
        y += rng.gen_range(-1..=1);
        z += rng.gen_range(-1..=1);
        steps += 1;
        if y >= 1 && chunk.get(x, y, z) == Some(BlockKind::Stone) {
            chunk.put(x as usize, y as usize, z as usize, BlockKind::IronOre);
            placed += 1;
        }
    }
    placed
}
