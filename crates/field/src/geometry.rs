//! World coordinates, rectangles and tile ranges

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::{FieldError, Result};

/// Edge length of one map tile in world units
pub const TILE_SIZE: i32 = 11;

/// A point in world units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing this point
    pub fn tile(self) -> Coord {
        Coord::new(self.x.div_euclid(TILE_SIZE), self.y.div_euclid(TILE_SIZE))
    }

    /// World position of the north-west corner of a tile
    pub fn from_tile(tile: Coord) -> Coord {
        Coord::new(tile.x * TILE_SIZE, tile.y * TILE_SIZE)
    }

    pub fn distance(self, other: Coord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, both corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub top_left: Coord,
    pub bottom_right: Coord,
}

impl Rect {
    /// Build from any two opposite corners
    pub fn spanning(a: Coord, b: Coord) -> Self {
        Self {
            top_left: Coord::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Coord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, point: Coord) -> bool {
        point.x >= self.top_left.x
            && point.x <= self.bottom_right.x
            && point.y >= self.top_left.y
            && point.y <= self.bottom_right.y
    }
}

/// Inclusive range of tiles, used for batch selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub first: Coord,
    pub last: Coord,
}

impl TileRange {
    /// Tiles covered by the world-space rectangle `[top_left, bottom_right)`
    pub fn covering(rect: Rect) -> Self {
        Self {
            first: rect.top_left.tile(),
            last: (rect.bottom_right - Coord::new(1, 1)).tile(),
        }
    }

    pub fn contains(&self, tile: Coord) -> bool {
        tile.x >= self.first.x && tile.x <= self.last.x && tile.y >= self.first.y && tile.y <= self.last.y
    }

    pub fn tiles(&self) -> impl Iterator<Item = Coord> + '_ {
        (self.first.y..=self.last.y)
            .flat_map(move |y| (self.first.x..=self.last.x).map(move |x| Coord::new(x, y)))
    }

    pub fn len(&self) -> usize {
        let w = i64::from(self.last.x) - i64::from(self.first.x) + 1;
        let h = i64::from(self.last.y) - i64::from(self.first.y) + 1;
        area(w, h)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Operator-selected rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    nw: Coord,
    se: Coord,
    tile_width: i32,
    tile_height: i32,
}

impl Region {
    /// Region between the north-west and south-east corners
    pub fn new(nw: Coord, se: Coord) -> Result<Self> {
        if se.x < nw.x || se.y < nw.y {
            return Err(FieldError::Inverted { nw, se });
        }

        let tile_width = (se.x - nw.x) / TILE_SIZE;
        let tile_height = (se.y - nw.y) / TILE_SIZE;
        if tile_width < 1 || tile_height < 1 {
            return Err(FieldError::TooSmall {
                width: se.x - nw.x,
                height: se.y - nw.y,
            });
        }

        Ok(Self {
            nw,
            se,
            tile_width,
            tile_height,
        })
    }

    /// Region spanning tile `a` up to (not including) tile `b`
    pub fn from_tiles(a: Coord, b: Coord) -> Result<Self> {
        Self::new(Coord::from_tile(a), Coord::from_tile(b))
    }

    pub fn nw(&self) -> Coord {
        self.nw
    }

    pub fn se(&self) -> Coord {
        self.se
    }

    pub fn tile_width(&self) -> i32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> i32 {
        self.tile_height
    }

    pub fn tile_count(&self) -> usize {
        area(self.tile_width.into(), self.tile_height.into())
    }

    pub fn bounds(&self) -> Rect {
        Rect::spanning(self.nw, self.se)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} tiles at {} -> {}",
            self.tile_width, self.tile_height, self.nw, self.se
        )
    }
}

/// Tile count of a `width` x `height` block; negative sides count as empty
pub(crate) fn area(width: i64, height: i64) -> usize {
    let tiles = width.max(0).saturating_mul(height.max(0));
    usize::try_from(tiles).unwrap_or(usize::MAX)
}
