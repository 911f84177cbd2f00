use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{WorldError, WorldSeed};

/// Generation and streaming parameters. The first block of fields has no
/// defaults; a config that omits one of them is rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    pub seed: u64,
    pub chunk_size: u32,
    pub max_height: u32,
    pub view_distance: u32,
    pub tree_chance: f64,
    pub cave_chance: f64,
    pub hill_chance: f64,
    pub iron_ore_chance: f64,
    pub iron_ore_cluster_min_size: u32,
    pub iron_ore_cluster_max_size: u32,

    /// Noise frequency in cycles per block.
    #[serde(default = "default_height_scale")]
    pub height_scale: f64,
    #[serde(default = "default_cave_radius_min")]
    pub cave_radius_min: f64,
    #[serde(default = "default_cave_radius_max")]
    pub cave_radius_max: f64,
    /// Blocks of chunk volume per permitted cave seed.
    #[serde(default = "default_cave_volume_per_seed")]
    pub cave_volume_per_seed: u32,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_build_retries")]
    pub max_build_retries: u32,
}

fn default_height_scale() -> f64 {
    1.0 / 16.0
}
fn default_cave_radius_min() -> f64 {
    2.0
}
fn default_cave_radius_max() -> f64 {
    5.0
}
fn default_cave_volume_per_seed() -> u32 {
    2048
}
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_max_build_retries() -> u32 {
    2
}

const MAX_CHUNK_SIZE: u32 = 1024;
const MAX_WORLD_HEIGHT: u32 = 4096;
const MAX_VIEW_DISTANCE: u32 = 256;

impl WorldConfig {
    /// Preset matching the classic world: 32x32 columns, 32 blocks tall.
    pub fn classic(seed: u64) -> Self {
        Self {
            seed,
            chunk_size: 32,
            max_height: 32,
            view_distance: 2,
            tree_chance: 0.1,
            cave_chance: 0.05,
            hill_chance: 0.2,
            iron_ore_chance: 0.05,
            iron_ore_cluster_min_size: 4,
            iron_ore_cluster_max_size: 8,
            height_scale: default_height_scale(),
            cave_radius_min: default_cave_radius_min(),
            cave_radius_max: default_cave_radius_max(),
            cave_volume_per_seed: default_cave_volume_per_seed(),
            workers: default_workers(),
            max_build_retries: default_max_build_retries(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WorldError> {
        let cfg: WorldConfig =
            toml::from_str(text).map_err(|e| WorldError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        let bad = |msg: String| Err(WorldError::Configuration(msg));
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return bad(format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            ));
        }
        if self.max_height == 0 || self.max_height > MAX_WORLD_HEIGHT {
            return bad(format!(
                "max_height must be in 1..={MAX_WORLD_HEIGHT}, got {}",
                self.max_height
            ));
        }
        if self.view_distance > MAX_VIEW_DISTANCE {
            return bad(format!(
                "view_distance must be at most {MAX_VIEW_DISTANCE}, got {}",
                self.view_distance
            ));
        }
        for (name, v) in [
            ("tree_chance", self.tree_chance),
            ("cave_chance", self.cave_chance),
            ("hill_chance", self.hill_chance),
            ("iron_ore_chance", self.iron_ore_chance),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("{name} must be in [0, 1], got {v}"));
            }
        }
        if self.iron_ore_cluster_min_size > self.iron_ore_cluster_max_size {
            return bad(format!(
                "iron_ore_cluster_min_size ({}) exceeds iron_ore_cluster_max_size ({})",
                self.iron_ore_cluster_min_size, self.iron_ore_cluster_max_size
            ));
        }
        if !(self.height_scale.is_finite() && self.height_scale > 0.0) {
            return bad(format!("height_scale must be positive, got {}", self.height_scale));
        }
        if !(self.cave_radius_min.is_finite()
            && self.cave_radius_max.is_finite()
            && self.cave_radius_min > 0.0
            && self.cave_radius_min <= self.cave_radius_max)
        {
            return bad(format!(
                "cave radius range [{}, {}] is invalid",
                self.cave_radius_min, self.cave_radius_max
            ));
        }
        if self.cave_volume_per_seed == 0 {
            return bad("cave_volume_per_seed must be at least 1".into());
        }
        if self.workers == 0 {
            return bad("workers must be at least 1".into());
        }
        Ok(())
    }

    #[inline]
    pub fn world_seed(&self) -> WorldSeed {
        WorldSeed::new(self.seed)
    }

    #[inline]
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size as usize * self.chunk_size as usize * self.max_height as usize
    }

    /// Loaded chunks further than this (Chebyshev) are evicted.
    #[inline]
    pub fn retention_radius(&self) -> u32 {
        self.view_distance.saturating_add(1)
    }

    #[inline]
    pub fn max_caves_per_chunk(&self) -> usize {
        (self.chunk_volume() / self.cave_volume_per_seed.max(1) as usize).max(1)
    }
}
