use std::fmt;

use serde::{Deserialize, Serialize};

use crate::WorldError;

/// Horizontal chunk address. Chunks span the full world height, so two
/// components are enough.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn checked_offset(self, dx: i32, dz: i32) -> Option<Self> {
        Some(Self {
            cx: self.cx.checked_add(dx)?,
            cz: self.cz.checked_add(dz)?,
        })
    }

    #[inline]
    pub fn chebyshev(self, other: Self) -> u64 {
        let dx = (self.cx as i64 - other.cx as i64).unsigned_abs();
        let dz = (self.cz as i64 - other.cz as i64).unsigned_abs();
        dx.max(dz)
    }

    /// Chunk containing block column (`wx`, `wz`). Floors toward negative
    /// infinity, so block -1 lives in chunk -1.
    #[inline]
    pub fn from_block(wx: i32, wz: i32, chunk_size: u32) -> Self {
        let s = chunk_size.max(1) as i64;
        Self {
            cx: (wx as i64).div_euclid(s) as i32,
            cz: (wz as i64).div_euclid(s) as i32,
        }
    }

    /// Chunk containing the continuous world position (`x`, `z`).
    pub fn from_world_pos(x: f64, z: f64, chunk_size: u32) -> Result<Self, WorldError> {
        let bx = block_from_f64(x)?;
        let bz = block_from_f64(z)?;
        Ok(Self::from_block(bx, bz, chunk_size))
    }

    /// World block coordinate of this chunk's (0, 0) column.
    pub fn origin(self, chunk_size: u32) -> Result<(i32, i32), WorldError> {
        let s = i32::try_from(chunk_size)
            .map_err(|_| WorldError::OutOfRange(format!("chunk size {chunk_size}")))?;
        let overflow = || WorldError::OutOfRange(format!("origin of chunk {self}"));
        let ox = self.cx.checked_mul(s).ok_or_else(overflow)?;
        let oz = self.cz.checked_mul(s).ok_or_else(overflow)?;
        // The far edge must be addressable as well.
        ox.checked_add(s - 1).ok_or_else(overflow)?;
        oz.checked_add(s - 1).ok_or_else(overflow)?;
        Ok((ox, oz))
    }
}

fn block_from_f64(v: f64) -> Result<i32, WorldError> {
    let f = v.floor();
    if !f.is_finite() || f < i32::MIN as f64 || f > i32::MAX as f64 {
        return Err(WorldError::OutOfRange(format!("world position {v}")));
    }
    Ok(f as i32)
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    #[inline]
    fn from(v: (i32, i32)) -> Self {
        Self::new(v.0, v.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_positions_floor() {
        assert_eq!(ChunkCoord::from_block(-1, -1, 16), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_block(-16, 15, 16), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::from_block(-17, 16, 16), ChunkCoord::new(-2, 1));
        let c = ChunkCoord::from_world_pos(-0.25, 3.9, 4).unwrap();
        assert_eq!(c, ChunkCoord::new(-1, 0));
    }

    #[test]
    fn chebyshev_is_max_axis() {
        let a = ChunkCoord::new(0, 0);
        assert_eq!(a.chebyshev(ChunkCoord::new(3, -1)), 3);
        assert_eq!(a.chebyshev(ChunkCoord::new(-2, 2)), 2);
        let far = ChunkCoord::new(i32::MIN, i32::MAX);
        assert_eq!(far.chebyshev(ChunkCoord::new(i32::MAX, 0)), u32::MAX as u64);
    }

    #[test]
    fn extreme_coordinates_are_rejected() {
        assert!(ChunkCoord::from_world_pos(f64::NAN, 0.0, 16).is_err());
        assert!(ChunkCoord::from_world_pos(1e12, 0.0, 16).is_err());
        assert!(ChunkCoord::new(i32::MAX, 0).origin(16).is_err());
        assert!(ChunkCoord::new(0, i32::MIN).checked_offset(0, -1).is_none());
        assert_eq!(ChunkCoord::new(-2, 3).origin(16).unwrap(), (-32, 48));
    }
}
