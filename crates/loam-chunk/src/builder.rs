use std::time::Instant;

use loam_blocks::BlockKind;
use loam_world::{ChunkCoord, ChunkRng, HeightSampler, WorldConfig, WorldError, WorldSeed};
use rand::Rng;

use crate::Chunk;
use crate::features::{self, Cave, FeatureParams};

/// What a build placed, for logs and tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildReport {
    pub hills: usize,
    pub caves: Vec<Cave>,
    pub ore_blocks: usize,
    pub trees: usize,
    pub t_gen_ms: u32,
}

/// Turns a chunk coordinate into a fully populated, ready chunk. Holds no
/// mutable state, so one builder can be shared across worker threads.
pub struct ChunkBuilder {
    config: WorldConfig,
    heights: HeightSampler,
    params: FeatureParams,
}

impl ChunkBuilder {
    pub fn new(config: &WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(Self {
            heights: HeightSampler::from_config(config)?,
            params: FeatureParams::from(config),
            config: config.clone(),
        })
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn seed(&self) -> WorldSeed {
        self.config.world_seed()
    }

    pub fn build(&self, coord: ChunkCoord, seed: WorldSeed) -> Result<Chunk, WorldError> {
        self.build_with_report(coord, seed).map(|(chunk, _)| chunk)
    }

    pub fn build_with_report(
        &self,
        coord: ChunkCoord,
        seed: WorldSeed,
    ) -> Result<(Chunk, BuildReport), WorldError> {
        if seed != self.seed() {
            return Err(WorldError::Configuration(format!(
                "builder was configured for seed {} but asked to build with {}",
                self.seed().value(),
                seed.value()
            )));
        }
        let t0 = Instant::now();
        let (ox, oz) = coord.origin(self.config.chunk_size)?;
        let size = self.config.chunk_size as usize;
        let height = self.config.max_height as usize;
        let mut rng = seed.chunk_stream(coord);
        let mut chunk = Chunk::new(coord, size, height);
        let mut report = BuildReport::default();

        for z in 0..size {
            for x in 0..size {
                // origin() checked the far edge, so these cannot overflow.
                let wx = ox + x as i32;
                let wz = oz + z as i32;
                let h = self.heights.height(wx, wz) as usize;
                let hill_chance = self.config.hill_chance;
                report.hills += fill_column(&mut chunk, x, z, h, hill_chance, &mut rng);
            }
        }

        report.caves = features::carve_caves(&mut chunk, &self.params, &mut rng);
        report.ore_blocks = features::plant_ore(&mut chunk, &report.caves, &self.params, &mut rng);
        report.trees = features::plant_trees(&mut chunk, &self.params, &mut rng);
        chunk.mark_ready();

        report.t_gen_ms = t0.elapsed().as_millis().min(u32::MAX as u128) as u32;
        log::trace!(
            target: "worldgen",
            "built {} hills={} caves={} ore={} trees={} in {}ms",
            coord,
            report.hills,
            report.caves.len(),
            report.ore_blocks,
            report.trees,
            report.t_gen_ms
        );
        Ok((chunk, report))
    }
}

#[inline]
fn column_kind(y: usize, h: usize) -> BlockKind {
    if y == 0 || y + 4 < h {
        BlockKind::Stone
    } else if y + 1 < h {
        BlockKind::Dirt
    } else if y + 1 == h {
        BlockKind::Grass
    } else {
        BlockKind::Air
    }
}

// Dirt-band blocks roll for the grassy hill variant; the column height and
// the surface block stay put. Returns how many blocks were substituted.
fn fill_column(
    chunk: &mut Chunk,
    x: usize,
    z: usize,
    h: usize,
    hill_chance: f64,
    rng: &mut ChunkRng,
) -> usize {
    let mut hills = 0;
    for y in 0..h.max(1) {
        let mut kind = column_kind(y, h);
        if kind == BlockKind::Dirt && rng.gen_bool(hill_chance) {
            kind = BlockKind::Grass;
            hills += 1;
        }
        chunk.put(x, y, z, kind);
    }
    if h >= 2 {
        chunk.set_surface(x, z, h - 1);
    }
    hills
}
