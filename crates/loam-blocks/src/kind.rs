use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flags a renderer or physics step reads for a block kind.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockProperties {
    pub visible: bool,
    pub solid: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlockKind {
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Wood = 4,
    Leaves = 5,
    IronOre = 6,
}

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Air,
        BlockKind::Stone,
        BlockKind::Dirt,
        BlockKind::Grass,
        BlockKind::Wood,
        BlockKind::Leaves,
        BlockKind::IronOre,
    ];

    #[inline]
    pub const fn properties(self) -> BlockProperties {
        match self {
            BlockKind::Air => BlockProperties {
                visible: false,
                solid: false,
            },
            BlockKind::Stone
            | BlockKind::Dirt
            | BlockKind::Grass
            | BlockKind::Wood
            | BlockKind::Leaves
            | BlockKind::IronOre => BlockProperties {
                visible: true,
                solid: true,
            },
        }
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, BlockKind::Air)
    }

    #[inline]
    pub const fn is_visible(self) -> bool {
        self.properties().visible
    }

    #[inline]
    pub const fn is_solid(self) -> bool {
        self.properties().solid
    }

    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<BlockKind> {
        match id {
            0 => Some(BlockKind::Air),
            1 => Some(BlockKind::Stone),
            2 => Some(BlockKind::Dirt),
            3 => Some(BlockKind::Grass),
            4 => Some(BlockKind::Wood),
            5 => Some(BlockKind::Leaves),
            6 => Some(BlockKind::IronOre),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BlockKind::Air => "air",
            BlockKind::Stone => "stone",
            BlockKind::Dirt => "dirt",
            BlockKind::Grass => "grass",
            BlockKind::Wood => "wood",
            BlockKind::Leaves => "leaves",
            BlockKind::IronOre => "iron_ore",
        }
    }
}

/// Free-function form of [`BlockKind::properties`].
#[inline]
pub fn block_kind_properties(kind: BlockKind) -> BlockProperties {
    kind.properties()
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown block kind '{0}'")]
pub struct UnknownBlockKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownBlockKind(s.to_string()))
    }
}
