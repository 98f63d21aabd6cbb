//! Boustrophedon segmentation of a region into horizontal bands

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::{area, Coord, Rect, Region, TileRange, TILE_SIZE};

/// Horizontal inset of the anchor from the band's starting edge
const ANCHOR_INSET_X: i32 = 4;
/// Vertical inset for bands of one or two rows (middle of the first row)
const ANCHOR_INSET_NARROW: i32 = 5;
/// Vertical inset for wider bands (middle of the second row)
const ANCHOR_INSET_WIDE: i32 = 16;

/// Band granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Three tile-rows per band
    Harvest,
    /// Two tile-rows per band
    Planting,
}

impl Granularity {
    pub fn band_rows(self) -> i32 {
        match self {
            Granularity::Harvest => 3,
            Granularity::Planting => 2,
        }
    }
}

/// One band of a field, walked in a single direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    start: Coord,
    end: Coord,
    bounds: Rect,
    anchor: Coord,
    starts_left: bool,
    tile_width: i32,
    tile_height: i32,
}

impl Segment {
    /// Band from `start` (the corner the walk begins at) to the opposite corner `end`
    pub fn new(start: Coord, end: Coord, starts_left: bool) -> Self {
        let tile_width = (end.x - start.x).abs() / TILE_SIZE;
        let tile_height = (end.y - start.y).abs() / TILE_SIZE;

        let inset_y = if tile_height <= 2 {
            ANCHOR_INSET_NARROW
        } else {
            ANCHOR_INSET_WIDE
        };
        let inset_x = if starts_left {
            ANCHOR_INSET_X
        } else {
            -ANCHOR_INSET_X
        };

        Self {
            start,
            end,
            bounds: Rect::spanning(start, end),
            anchor: start + Coord::new(inset_x, inset_y),
            starts_left,
            tile_width,
            tile_height,
        }
    }

    pub fn start(&self) -> Coord {
        self.start
    }

    pub fn end(&self) -> Coord {
        self.end
    }

    pub fn top_left(&self) -> Coord {
        self.bounds.top_left
    }

    pub fn bottom_right(&self) -> Coord {
        self.bounds.bottom_right
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Navigation target just inside the starting edge
    pub fn anchor(&self) -> Coord {
        self.anchor
    }

    pub fn starts_left(&self) -> bool {
        self.starts_left
    }

    pub fn tile_width(&self) -> i32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> i32 {
        self.tile_height
    }

    /// Number of plants the band holds when fully worked
    pub fn expected_occupancy(&self) -> usize {
        area(self.tile_width.into(), self.tile_height.into())
    }

    /// Tiles to select when batch-confirming an action over the band
    pub fn tiles(&self) -> TileRange {
        TileRange::covering(self.bounds)
    }

    pub fn contains(&self, point: Coord) -> bool {
        self.bounds.contains(point)
    }
}

/// Split a region into bands of `granularity.band_rows()` rows, top to bottom,
/// alternating the walking direction between consecutive bands.
pub fn segment(region: &Region, granularity: Granularity) -> Vec<Segment> {
    let nw = region.nw();
    let se = region.se();
    let rows = granularity.band_rows();

    let mut segments = Vec::new();
    let mut starts_left = true;
    let mut row = 0;
    while row < region.tile_height() {
        let top = nw.y + row * TILE_SIZE;
        let bottom = (top + rows * TILE_SIZE).min(se.y);

        let (from_x, to_x) = if starts_left {
            (nw.x, se.x)
        } else {
            (se.x, nw.x)
        };
        segments.push(Segment::new(
            Coord::new(from_x, top),
            Coord::new(to_x, bottom),
            starts_left,
        ));

        starts_left = !starts_left;
        row += rows;
    }

    trace!(
        "Segmented {} into {} {:?} bands",
        region,
        segments.len(),
        granularity
    );
    segments
}

pub fn segment_for_harvest(region: &Region) -> Vec<Segment> {
    segment(region, Granularity::Harvest)
}

pub fn segment_for_planting(region: &Region) -> Vec<Segment> {
    segment(region, Granularity::Planting)
}
