//! Feature passes run after the terrain fill. Each pass is a free function
//! over a chunk grid, its parameters and the chunk's own random stream.

mod caves;
mod ore;
mod trees;

pub use caves::{Cave, carve_caves};
pub use ore::plant_ore;
pub use trees::plant_trees;

use loam_world::WorldConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureParams {
    pub tree_chance: f64,
    pub cave_chance: f64,
    pub iron_ore_chance: f64,
    pub cluster_min: u32,
    pub cluster_max: u32,
    pub cave_radius_min: f64,
    pub cave_radius_max: f64,
    pub max_caves: usize,
}

impl From<&WorldConfig> for FeatureParams {
    fn from(cfg: &WorldConfig) -> Self {
        Self {
            tree_chance: cfg.tree_chance,
            cave_chance: cfg.cave_chance,
            iron_ore_chance: cfg.iron_ore_chance,
            cluster_min: cfg.iron_ore_cluster_min_size,
            cluster_max: cfg.iron_ore_cluster_max_size,
            cave_radius_min: cfg.cave_radius_min,
            cave_radius_max: cfg.cave_radius_max,
            max_caves: cfg.max_caves_per_chunk(),
        }
    }
}
