//! Block kinds and the per-kind flags consumed by meshing and physics.
#![forbid(unsafe_code)]

pub mod kind;

pub use kind::{BlockKind, BlockProperties, UnknownBlockKind, block_kind_properties};
