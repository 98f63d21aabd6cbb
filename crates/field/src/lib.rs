//! Field geometry and segmentation
//!
//! Turns operator-selected rectangles into ordered bands the worker can walk.

use thiserror::Error;

pub mod geometry;
pub mod registry;
pub mod segment;

pub use geometry::{Coord, Rect, Region, TileRange, TILE_SIZE};
pub use registry::{Field, FieldRegistry};
pub use segment::{segment_for_harvest, segment_for_planting, Granularity, Segment};

/// Field errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("region corners are inverted: {nw} -> {se}")]
    Inverted { nw: Coord, se: Coord },

    #[error("region is smaller than one tile: {width}x{height} units")]
    TooSmall { width: i32, height: i32 },
}

pub type Result<T> = std::result::Result<T, FieldError>;
