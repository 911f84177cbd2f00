use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::{WorldConfig, WorldError, WorldSeed};

/// Terrain height as a pure function of seed and world column.
pub struct HeightSampler {
    noise: FastNoiseLite,
    max_height: u32,
}

impl HeightSampler {
    pub fn new(seed: WorldSeed, max_height: u32, scale: f64) -> Result<Self, WorldError> {
        if max_height == 0 {
            return Err(WorldError::Configuration(
                "height sampler needs max_height >= 1".into(),
            ));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(WorldError::Configuration(format!(
                "height sampler scale must be positive, got {scale}"
            )));
        }
        let mut noise = FastNoiseLite::with_seed(seed.noise_seed());
        noise.set_noise_type(Some(NoiseType::Perlin));
        noise.set_frequency(Some(scale as f32));
        Ok(Self { noise, max_height })
    }

    pub fn from_config(cfg: &WorldConfig) -> Result<Self, WorldError> {
        Self::new(cfg.world_seed(), cfg.max_height, cfg.height_scale)
    }

    #[inline]
    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    /// Height in `[0, max_height)` for world column (`wx`, `wz`).
    #[inline]
    pub fn height(&self, wx: i32, wz: i32) -> u32 {
        let n = self.noise.get_noise_2d(wx as f32, wz as f32);
        let t = ((n + 1.0) * 0.5).clamp(0.0, 1.0);
        let h = (t * self.max_height as f32).round() as u32;
        h.min(self.max_height - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(HeightSampler::new(WorldSeed::new(1), 0, 0.1).is_err());
        assert!(HeightSampler::new(WorldSeed::new(1), 8, 0.0).is_err());
        assert!(HeightSampler::new(WorldSeed::new(1), 8, f64::INFINITY).is_err());
    }

    #[test]
    fn same_seed_same_heights() {
        let a = HeightSampler::new(WorldSeed::new(42), 32, 1.0 / 16.0).unwrap();
        let b = HeightSampler::new(WorldSeed::new(42), 32, 1.0 / 16.0).unwrap();
        for wz in -20..20 {
            for wx in -20..20 {
                assert_eq!(a.height(wx, wz), b.height(wx, wz));
            }
        }
    }

    #[test]
    fn terrain_is_smooth_between_neighbours() {
        let s = HeightSampler::new(WorldSeed::new(9), 64, 1.0 / 32.0).unwrap();
        let mut heights = std::collections::BTreeSet::new();
        for wx in -64..64 {
            let a = s.height(wx, 5) as i64;
            let b = s.height(wx + 1, 5) as i64;
            assert!((a - b).abs() <= 8, "jump {a} -> {b} at {wx}");
            heights.insert(a);
        }
        assert!(heights.len() > 1, "noise should vary along a line");
    }
}
