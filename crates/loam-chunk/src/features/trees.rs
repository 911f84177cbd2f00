use loam_blocks::BlockKind;
use loam_world::ChunkRng;
use rand::Rng;

use super::FeatureParams;
use crate::Chunk;

const CANOPY_RADIUS: i64 = 2;

/// Grows trees on surface grass. Trunks need clear air above the grass and
/// must fit under the world ceiling; leaves fill air only.
pub fn plant_trees(chunk: &mut Chunk, params: &FeatureParams, rng: &mut ChunkRng) -> usize {
    let size = chunk.size();
    let height = chunk.height();
    let mut planted = 0;
    for z in 0..size {
        for x in 0..size {
            let Some(surface) = chunk.surface_height(x, z) else {
                continue;
            };
            if chunk.get_local(x, surface, z) != BlockKind::Grass {
                continue;
            }
            if !rng.gen_bool(params.tree_chance) {
                continue;
            }
            let trunk = rng.gen_range(4..8usize);
            let crown = rng.gen_range(2..5usize);
            let base = surface + 1;
            if base + trunk > height {
                continue;
            }
            if (base..base + trunk).any(|y| chunk.get_local(x, y, z) != BlockKind::Air) {
                continue;
            }
            for y in base..base + trunk {
                chunk.put(x, y, z, BlockKind::Wood);
            }
            let top = base + trunk - 1;
            place_canopy(chunk, (x as i64, top as i64, z as i64), crown as i64);
            planted += 1;
        }
    }
    planted
}

fn place_canopy(chunk: &mut Chunk, (tx, top, tz): (i64, i64, i64), crown: i64) {
    for y in top..=top + crown {
        for dz in -CANOPY_RADIUS..=CANOPY_RADIUS {
            for dx in -CANOPY_RADIUS..=CANOPY_RADIUS {
                if dx.abs() + dz.abs() > CANOPY_RADIUS {
                    continue;
                }
                if dx == 0 && dz == 0 && y <= top {
                    continue;
                }
                let (x, z) = (tx + dx, tz + dz);
                if chunk.get(x, y, z) == Some(BlockKind::Air) {
                    chunk.put(x as usize, y as usize, z as usize, BlockKind::Leaves);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_world::{ChunkCoord, WorldSeed};

    // Flat world: stone to y=1, grass at y=2.
    fn meadow(size: usize, height: usize) -> Chunk {
        let mut c = Chunk::new(ChunkCoord::new(0, 0), size, height);
        for z in 0..size {
            for x in 0..size {
                c.put(x, 0, z, BlockKind::Stone);
                c.put(x, 1, z, BlockKind::Dirt);
                c.put(x, 2, z, BlockKind::Grass);
                c.set_surface(x, z, 2);
            }
        }
        c
    }

    fn params(tree_chance: f64) -> FeatureParams {
        FeatureParams {
            tree_chance,
            cave_chance: 0.0,
            iron_ore_chance: 0.0,
            cluster_min: 1,
            cluster_max: 1,
            cave_radius_min: 1.0,
            cave_radius_max: 1.0,
            max_caves: 1,
        }
    }

    #[test]
    fn single_tree_has_trunk_and_diamond_canopy() {
        // One column of grass, surrounded by air, so exactly one tree can root.
        let mut c = Chunk::new(ChunkCoord::new(0, 0), 7, 20);
        c.put(3, 0, 3, BlockKind::Stone);
        c.put(3, 1, 3, BlockKind::Grass);
        c.set_surface(3, 3, 1);
        let mut rng = WorldSeed::new(3).chunk_stream(ChunkCoord::new(0, 0));
        assert_eq!(plant_trees(&mut c, &params(1.0), &mut rng), 1);

        let trunk = (2..20).take_while(|&y| c.get_local(3, y, 3) == BlockKind::Wood).count();
        assert!((4..8).contains(&trunk), "trunk {trunk}");
        let top = 1 + trunk;
        assert_eq!(c.get_local(3, top + 1, 3), BlockKind::Leaves);
        // Diamond: corners of the 5x5 layer stay empty, edge midpoints fill.
        assert_eq!(c.get_local(1, top, 1), BlockKind::Air);
        assert_eq!(c.get_local(2, top, 2), BlockKind::Leaves);
        assert_eq!(c.get_local(1, top, 3), BlockKind::Leaves);
        assert_eq!(c.get_local(5, top, 3), BlockKind::Leaves);
        let crown = (top..20).take_while(|&y| c.get_local(2, y, 3) == BlockKind::Leaves).count();
        assert!((3..=5).contains(&crown), "canopy layers {crown}");
        for y in 0..20 {
            for z in 0..7 {
                for x in 0..7 {
                    let d = (x as i64 - 3).abs() + (z as i64 - 3).abs();
                    if c.get_local(x, y, z) == BlockKind::Leaves {
                        assert!(d <= CANOPY_RADIUS);
                    }
                }
            }
        }
    }

    #[test]
    fn trees_never_pierce_the_ceiling() {
        let mut c = meadow(8, 8);
        let mut rng = WorldSeed::new(77).chunk_stream(ChunkCoord::new(0, 0));
        plant_trees(&mut c, &params(1.0), &mut rng);
        for z in 0..8 {
            for x in 0..8 {
                assert_eq!(c.get_local(x, 2, z), BlockKind::Grass);
            }
        }
    }

    #[test]
    fn zero_chance_plants_nothing() {
        let before = meadow(8, 16);
        let mut after = before.clone();
        let mut rng = WorldSeed::new(77).chunk_stream(ChunkCoord::new(0, 0));
        assert_eq!(plant_trees(&mut after, &params(0.0), &mut rng), 0);
        assert_eq!(before, after);
    }

    #[test]
    fn carved_surface_does_not_grow_trees() {
        let mut c = meadow(4, 16);
        for z in 0..4 {
            for x in 0..4 {
                c.put(x, 2, z, BlockKind::Air);
            }
        }
        let mut rng = WorldSeed::new(1).chunk_stream(ChunkCoord::new(0, 0));
        assert_eq!(plant_trees(&mut c, &params(1.0), &mut rng), 0);
    }
}
